//! Scan orchestration.
//!
//! One scan runs the full pipeline sequentially: build queries, search,
//! extract every result with bounded concurrency, then synthesize insight
//! batches. Search failures abort the scan before any extraction; a failed
//! synthesis batch only loses its own documents.

use std::collections::HashSet;

use tracing::{info, warn};

use tidescan_common::{Config, ExtractionStatus, ScanError, ScanRequest, SearchResult};

use crate::pipeline::extract::{extract_all, HttpFetcher, PageFetcher};
use crate::pipeline::query::build_queries;
use crate::pipeline::search::{GoogleSearcher, WebSearcher};
use crate::pipeline::synthesize::{partition_batches, InsightSynthesizer, OpenAiSynthesizer};
use crate::session::ScanSession;
use crate::stats::ScanStats;

pub struct Scanner {
    searcher: Box<dyn WebSearcher>,
    fetcher: Box<dyn PageFetcher>,
    synthesizer: Box<dyn InsightSynthesizer>,
}

impl Scanner {
    pub fn new(
        searcher: Box<dyn WebSearcher>,
        fetcher: Box<dyn PageFetcher>,
        synthesizer: Box<dyn InsightSynthesizer>,
    ) -> Self {
        Self {
            searcher,
            fetcher,
            synthesizer,
        }
    }

    /// Wire up the production pipeline. Missing credentials surface here,
    /// at scan time, as configuration errors with remediation guidance.
    pub fn from_config(config: &Config) -> Result<Self, ScanError> {
        let (search_key, engine_id) = config.search_credentials()?;
        let llm_key = config.llm_credentials()?;

        Ok(Self::new(
            Box::new(GoogleSearcher::new(search_key, engine_id)),
            Box::new(HttpFetcher::new()),
            Box::new(OpenAiSynthesizer::new(llm_key, &config.llm_model)),
        ))
    }

    /// Run one scan to completion against the session's store.
    pub async fn run(
        &self,
        session: &ScanSession,
        request: &ScanRequest,
    ) -> Result<ScanStats, ScanError> {
        let _guard = session.begin_scan()?;
        let mut stats = ScanStats::default();

        session.store().clear();

        // 1. Queries
        let queries = build_queries(request)?;
        stats.queries_issued = queries.len() as u32;

        // 2. Search, deduplicating URLs across queries and re-ranking in
        //    concatenation order so rank stays monotonic.
        let mut seen: HashSet<String> = HashSet::new();
        let mut results: Vec<SearchResult> = Vec::new();
        for query in &queries {
            if results.len() >= request.max_results {
                break;
            }
            let hits = self.searcher.search(query, request.max_results).await?;
            for hit in hits {
                if results.len() >= request.max_results {
                    break;
                }
                if seen.insert(hit.url.clone()) {
                    results.push(SearchResult {
                        rank: results.len() as u32,
                        ..hit
                    });
                }
            }
        }
        stats.results_found = results.len() as u32;
        info!(results = results.len(), "Search phase complete");

        if results.is_empty() {
            warn!("No search results to extract");
            return Ok(stats);
        }

        // 3. Extract every result; record all outcomes for auditability.
        let urls: Vec<String> = results.iter().map(|r| r.url.clone()).collect();
        let documents = extract_all(self.fetcher.as_ref(), &urls).await;
        for doc in &documents {
            match doc.status {
                ExtractionStatus::Ok => stats.documents_extracted += 1,
                ExtractionStatus::Empty => stats.documents_empty += 1,
                ExtractionStatus::Failed => stats.documents_failed += 1,
            }
            session.store().record_document(doc.clone());
        }

        // 4. Synthesize batch by batch. Auth failures abort; a synthesis
        //    failure is scoped to its batch.
        for batch in partition_batches(&documents) {
            match self.synthesizer.synthesize(&batch, request).await {
                Ok(insights) => {
                    stats.batches_synthesized += 1;
                    for insight in insights {
                        session.store().append(insight);
                        stats.insights_stored += 1;
                    }
                }
                Err(ScanError::Synthesis(message)) => {
                    warn!(error = %message, "Synthesis batch failed, continuing");
                    stats.batches_failed += 1;
                }
                Err(other) => return Err(other),
            }
        }

        info!(insights = stats.insights_stored, "Scan complete");
        Ok(stats)
    }
}
