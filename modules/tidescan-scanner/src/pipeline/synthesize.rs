//! Insight synthesis via the language model.
//!
//! Successfully extracted documents are grouped into bounded batches and
//! sent to OpenAI with a fixed market-analysis prompt. Each batch yields
//! zero or more `Insight` records; a failing batch only loses its own
//! documents. Every returned insight must cite at least one real document
//! from its batch: cited URLs the model invented are filtered out, and an
//! insight left without sources is dropped.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use openai_client::{OpenAi, OpenAiError};
use tidescan_common::{ExtractedDocument, ImpactLevel, Insight, ScanError, ScanRequest};

/// Documents per LLM call.
const MAX_BATCH_DOCS: usize = 5;
/// Total document text per LLM call.
const MAX_BATCH_CHARS: usize = 24_000;
/// Per-document truncation before prompting.
const MAX_DOC_CHARS: usize = 8_000;

// --- LLM response shape ---

/// What the model returns for each insight.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SynthesizedInsight {
    /// Concise, descriptive headline
    pub title: String,
    /// Category: Infrastructure, Technology, Services, Materials, Equipment,
    /// Financial, Regulatory, or Competitive
    pub category: String,
    /// "low", "medium", or "high"
    pub impact_level: String,
    /// 2-3 sentences covering the intelligence value and procurement implications
    pub summary: String,
    /// 3-5 specific, actionable intelligence points
    #[serde(default)]
    pub key_points: Vec<String>,
    /// 2-3 concrete procurement actions
    #[serde(default)]
    pub recommended_actions: Vec<String>,
    /// Company names mentioned in the sources
    #[serde(default)]
    pub suppliers_mentioned: Vec<String>,
    /// 0.0-1.0 procurement relevance
    #[serde(default = "default_relevance")]
    pub relevance_score: f64,
    /// Source URLs this insight derives from. Only cite the documents provided.
    #[serde(default)]
    pub source_urls: Vec<String>,
}

fn default_relevance() -> f64 {
    0.7
}

/// The full synthesis response from the LLM.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SynthesisResponse {
    #[serde(default)]
    pub insights: Vec<SynthesizedInsight>,
}

// --- InsightSynthesizer trait ---

#[async_trait]
pub trait InsightSynthesizer: Send + Sync {
    /// Synthesize insights from one batch of successfully extracted documents.
    async fn synthesize(
        &self,
        documents: &[ExtractedDocument],
        request: &ScanRequest,
    ) -> Result<Vec<Insight>, ScanError>;
}

// --- Batching ---

/// Group documents into synthesis batches bounded by document count and
/// total text volume. Order is preserved.
pub fn partition_batches(documents: &[ExtractedDocument]) -> Vec<Vec<ExtractedDocument>> {
    let mut batches: Vec<Vec<ExtractedDocument>> = Vec::new();
    let mut current: Vec<ExtractedDocument> = Vec::new();
    let mut current_chars = 0usize;

    for doc in documents.iter().filter(|d| d.is_ok()) {
        let len = doc.raw_text.len().min(MAX_DOC_CHARS);
        let full = current.len() >= MAX_BATCH_DOCS
            || (!current.is_empty() && current_chars + len > MAX_BATCH_CHARS);
        if full {
            batches.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        current_chars += len;
        current.push(doc.clone());
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

// --- OpenAI-backed synthesizer ---

pub struct OpenAiSynthesizer {
    ai: OpenAi,
}

impl OpenAiSynthesizer {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            ai: OpenAi::new(api_key, model),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.ai = self.ai.with_base_url(url);
        self
    }

    fn system_prompt(request: &ScanRequest) -> String {
        let suppliers = if request.suppliers.is_empty() {
            "any suppliers mentioned".to_string()
        } else {
            request.suppliers.join(", ")
        };
        let categories = if request.categories.is_empty() {
            "all market categories".to_string()
        } else {
            request.categories.join(", ")
        };
        let sector = request.sector.as_deref().unwrap_or("water utility");

        format!(
            "You are a market-intelligence analyst for a {sector} procurement team. \
             Analyze the supplied web documents for procurement insights.\n\
             Focus on suppliers: {suppliers}.\n\
             Analysis categories: {categories}.\n\
             For each relevant finding produce an insight with a descriptive title, \
             a category, an impact level, a 2-3 sentence summary explaining the \
             intelligence value and procurement implications, specific key points, \
             concrete recommended actions, suppliers mentioned, a relevance score, \
             and the source URLs it draws on. Cite only the documents provided. \
             Skip documents with no procurement relevance."
        )
    }

    fn user_prompt(documents: &[ExtractedDocument]) -> String {
        let mut prompt = String::from("Documents:\n");
        for doc in documents {
            let text = truncate_at_boundary(&doc.raw_text, MAX_DOC_CHARS);
            prompt.push_str(&format!(
                "\n--- Source URL: {}\n{}\n",
                doc.source_url, text
            ));
        }
        prompt
    }
}

/// Truncate to at most `max` bytes without splitting a UTF-8 character.
fn truncate_at_boundary(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[async_trait]
impl InsightSynthesizer for OpenAiSynthesizer {
    async fn synthesize(
        &self,
        documents: &[ExtractedDocument],
        request: &ScanRequest,
    ) -> Result<Vec<Insight>, ScanError> {
        let documents: Vec<&ExtractedDocument> =
            documents.iter().filter(|d| d.is_ok()).collect();
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        info!(documents = documents.len(), "Synthesizing insights");

        let docs: Vec<ExtractedDocument> = documents.into_iter().cloned().collect();
        let response: SynthesisResponse = self
            .ai
            .extract(Self::system_prompt(request), Self::user_prompt(&docs))
            .await
            .map_err(classify_llm_error)?;

        let known: BTreeSet<String> = docs.iter().map(|d| d.source_url.clone()).collect();
        Ok(to_insights(response, &known))
    }
}

/// Invalid LLM credentials are fatal to the scan; everything else is a
/// synthesis failure scoped to the batch.
fn classify_llm_error(err: OpenAiError) -> ScanError {
    match err.status() {
        Some(401) | Some(403) => ScanError::Auth(format!(
            "Language-model API rejected the credentials. Check OPENAI_API_KEY. ({err})"
        )),
        _ => ScanError::Synthesis(err.to_string()),
    }
}

/// Convert the model response into `Insight` records, enforcing sourcing:
/// cited URLs are intersected with the batch's real document URLs and
/// unsourced insights are dropped.
fn to_insights(response: SynthesisResponse, known_urls: &BTreeSet<String>) -> Vec<Insight> {
    let now = Utc::now();
    let mut insights = Vec::new();

    for raw in response.insights {
        let source_urls: BTreeSet<String> = raw
            .source_urls
            .iter()
            .filter(|u| known_urls.contains(*u))
            .cloned()
            .collect();

        if source_urls.is_empty() {
            warn!(title = %raw.title, "Dropped insight with no traceable sources");
            continue;
        }

        insights.push(Insight {
            id: Uuid::new_v4(),
            title: raw.title,
            category: raw.category,
            summary: raw.summary,
            impact_level: parse_impact(&raw.impact_level),
            key_points: raw.key_points,
            recommended_actions: raw.recommended_actions,
            suppliers_mentioned: raw.suppliers_mentioned,
            relevance_score: raw.relevance_score.clamp(0.0, 1.0),
            source_urls,
            generated_at: now,
        });
    }

    insights
}

fn parse_impact(value: &str) -> ImpactLevel {
    match value.to_ascii_lowercase().as_str() {
        "high" => ImpactLevel::High,
        "low" => ImpactLevel::Low,
        _ => ImpactLevel::Medium,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(url: &str, chars: usize) -> ExtractedDocument {
        ExtractedDocument::ok(url, "x".repeat(chars))
    }

    fn raw_insight(urls: &[&str]) -> SynthesizedInsight {
        SynthesizedInsight {
            title: "Mains renewal framework retendered".into(),
            category: "Infrastructure".into(),
            impact_level: "High".into(),
            summary: "A major framework is being retendered.".into(),
            key_points: vec![],
            recommended_actions: vec![],
            suppliers_mentioned: vec![],
            relevance_score: 0.9,
            source_urls: urls.iter().map(|u| u.to_string()).collect(),
        }
    }

    #[test]
    fn batches_respect_document_cap() {
        let docs: Vec<_> = (0..12)
            .map(|i| doc(&format!("https://example.co.uk/{i}"), 500))
            .collect();
        let batches = partition_batches(&docs);
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| b.len() <= MAX_BATCH_DOCS));
        // Order preserved across batches
        assert_eq!(batches[0][0].source_url, "https://example.co.uk/0");
        assert_eq!(batches[2][1].source_url, "https://example.co.uk/11");
    }

    #[test]
    fn batches_respect_char_budget() {
        let docs: Vec<_> = (0..4)
            .map(|i| doc(&format!("https://example.co.uk/{i}"), 9_000))
            .collect();
        let batches = partition_batches(&docs);
        // 9k docs truncate to 8k each; three fit the 24k budget, not four.
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 3);
    }

    #[test]
    fn non_ok_documents_never_reach_a_batch() {
        let docs = vec![
            doc("https://example.co.uk/good", 500),
            ExtractedDocument::failed("https://example.co.uk/bad"),
            ExtractedDocument::empty("https://example.co.uk/blank"),
        ];
        let batches = partition_batches(&docs);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
    }

    #[test]
    fn fabricated_sources_are_filtered() {
        let known: BTreeSet<String> = ["https://ofwat.gov.uk/real".to_string()].into();
        let response = SynthesisResponse {
            insights: vec![raw_insight(&[
                "https://ofwat.gov.uk/real",
                "https://invented.example.com/page",
            ])],
        };
        let insights = to_insights(response, &known);
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].source_urls.len(), 1);
        assert!(insights[0].source_urls.contains("https://ofwat.gov.uk/real"));
    }

    #[test]
    fn unsourced_insight_is_dropped() {
        let known: BTreeSet<String> = ["https://ofwat.gov.uk/real".to_string()].into();
        let response = SynthesisResponse {
            insights: vec![raw_insight(&["https://invented.example.com/page"])],
        };
        assert!(to_insights(response, &known).is_empty());
    }

    #[test]
    fn impact_parsing_defaults_to_medium() {
        assert_eq!(parse_impact("HIGH"), ImpactLevel::High);
        assert_eq!(parse_impact("low"), ImpactLevel::Low);
        assert_eq!(parse_impact("substantial"), ImpactLevel::Medium);
    }

    #[test]
    fn relevance_is_clamped() {
        let known: BTreeSet<String> = ["https://ofwat.gov.uk/real".to_string()].into();
        let mut raw = raw_insight(&["https://ofwat.gov.uk/real"]);
        raw.relevance_score = 3.5;
        let insights = to_insights(SynthesisResponse { insights: vec![raw] }, &known);
        assert_eq!(insights[0].relevance_score, 1.0);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "水道料金の改定について".repeat(1_000);
        let cut = truncate_at_boundary(&text, MAX_DOC_CHARS);
        assert!(cut.len() <= MAX_DOC_CHARS);
        assert!(!cut.is_empty());
    }
}
