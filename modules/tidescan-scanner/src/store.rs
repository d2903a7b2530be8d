//! In-session result store.
//!
//! Append-only while a scan runs; `clear` is the only removing mutation and
//! is invoked before a new scan starts. Alongside insights it keeps the
//! per-scan document log so failed and empty extractions stay auditable.

use tidescan_common::{ExtractedDocument, Insight};

#[derive(Debug, Default)]
pub struct ResultStore {
    insights: Vec<Insight>,
    documents: Vec<ExtractedDocument>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, insight: Insight) {
        self.insights.push(insight);
    }

    /// Insights in append order.
    pub fn list(&self) -> &[Insight] {
        &self.insights
    }

    /// Record a document outcome, whatever its status.
    pub fn record_document(&mut self, document: ExtractedDocument) {
        self.documents.push(document);
    }

    /// The scan's document log, in extraction order.
    pub fn documents(&self) -> &[ExtractedDocument] {
        &self.documents
    }

    /// Drop all insights and the document log.
    pub fn clear(&mut self) {
        self.insights.clear();
        self.documents.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.insights.is_empty()
    }

    pub fn len(&self) -> usize {
        self.insights.len()
    }
}
