use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hard cap on results per scan, across all query variations.
pub const MAX_SCAN_RESULTS: usize = 50;

// --- Scan request ---

/// Where a scan looks for material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceScope {
    Web,
    News,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Immutable description of one user-triggered scan.
///
/// Built once from the configuration panel inputs and passed through the
/// whole pipeline. `keywords` may be empty here; the query builder rejects
/// that at scan time with a configuration error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    pub keywords: Vec<String>,
    pub date_range: Option<DateRange>,
    pub scope: SourceScope,
    /// Geographic focus, e.g. ["UK"]. Drives site restriction and gl/hl hints.
    pub geographic_scope: Vec<String>,
    /// Industry sector context, e.g. "Water".
    pub sector: Option<String>,
    /// Market categories under analysis (Infrastructure, Technology, ...).
    pub categories: Vec<String>,
    /// Suppliers of interest, surfaced to the synthesizer prompt.
    pub suppliers: Vec<String>,
    pub max_results: usize,
}

impl ScanRequest {
    pub fn new(keywords: Vec<String>) -> Self {
        Self {
            keywords,
            date_range: None,
            scope: SourceScope::Web,
            geographic_scope: vec!["UK".to_string()],
            sector: None,
            categories: Vec::new(),
            suppliers: Vec::new(),
            max_results: 10,
        }
    }

    pub fn with_scope(mut self, scope: SourceScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_suppliers(mut self, suppliers: Vec<String>) -> Self {
        self.suppliers = suppliers;
        self
    }

    pub fn with_geographic_scope(mut self, scope: Vec<String>) -> Self {
        self.geographic_scope = scope;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.min(MAX_SCAN_RESULTS);
        self
    }

    pub fn is_uk_focused(&self) -> bool {
        self.geographic_scope.iter().any(|g| g == "UK")
    }
}

// --- Search results ---

/// One ranked hit from the search API. Rank is ascending (0 = most
/// relevant); ties keep the API's original order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub rank: u32,
}

// --- Extracted documents ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Ok,
    Empty,
    Failed,
}

/// Main-content text pulled from one search result URL.
///
/// Construct through `ok`/`empty`/`failed`; a failed extraction always
/// carries empty text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub source_url: String,
    pub raw_text: String,
    pub status: ExtractionStatus,
}

impl ExtractedDocument {
    pub fn ok(source_url: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            raw_text: raw_text.into(),
            status: ExtractionStatus::Ok,
        }
    }

    pub fn empty(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            raw_text: String::new(),
            status: ExtractionStatus::Empty,
        }
    }

    pub fn failed(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            raw_text: String::new(),
            status: ExtractionStatus::Failed,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ExtractionStatus::Ok
    }
}

// --- Insights ---

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImpactLevel::Low => write!(f, "Low"),
            ImpactLevel::Medium => write!(f, "Medium"),
            ImpactLevel::High => write!(f, "High"),
        }
    }
}

/// A synthesized, sourced market-intelligence finding.
///
/// Immutable after creation. `source_urls` always traces back to real
/// extracted documents from the same scan; the synthesizer drops anything
/// the model invents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub summary: String,
    pub impact_level: ImpactLevel,
    pub key_points: Vec<String>,
    pub recommended_actions: Vec<String>,
    pub suppliers_mentioned: Vec<String>,
    /// 0.0-1.0 procurement-relevance estimate from the model.
    pub relevance_score: f64,
    pub source_urls: BTreeSet<String>,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_results_clamped() {
        let req = ScanRequest::new(vec!["leakage".into()]).with_max_results(500);
        assert_eq!(req.max_results, MAX_SCAN_RESULTS);
    }

    #[test]
    fn failed_document_has_empty_text() {
        let doc = ExtractedDocument::failed("https://example.co.uk/a");
        assert_eq!(doc.status, ExtractionStatus::Failed);
        assert!(doc.raw_text.is_empty());
    }

    #[test]
    fn uk_focus_detection() {
        let req = ScanRequest::new(vec!["mains renewal".into()]);
        assert!(req.is_uk_focused());
        let req = req.with_geographic_scope(vec!["Global".into()]);
        assert!(!req.is_uk_focused());
    }

    #[test]
    fn impact_level_ordering() {
        assert!(ImpactLevel::High > ImpactLevel::Medium);
        assert!(ImpactLevel::Medium > ImpactLevel::Low);
    }
}
