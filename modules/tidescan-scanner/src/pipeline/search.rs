//! Search client for the Google Custom Search JSON API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use tidescan_common::{ScanError, SearchResult};

use super::query::SearchQuery;

/// The API returns at most this many results per request; larger result
/// counts paginate via the `start` parameter.
const PAGE_SIZE: usize = 10;

const GOOGLE_CSE_URL: &str = "https://www.googleapis.com/customsearch/v1";

#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Run one finalized query, returning results ordered by ascending rank.
    async fn search(
        &self,
        query: &SearchQuery,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, ScanError>;
}

pub struct GoogleSearcher {
    api_key: String,
    engine_id: String,
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Debug, Deserialize)]
struct CseItem {
    #[serde(default)]
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

impl GoogleSearcher {
    pub fn new(api_key: &str, engine_id: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            engine_id: engine_id.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: GOOGLE_CSE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    async fn fetch_page(
        &self,
        query: &SearchQuery,
        num: usize,
        start: usize,
    ) -> Result<Vec<CseItem>, ScanError> {
        let mut params: Vec<(&str, String)> = vec![
            ("key", self.api_key.clone()),
            ("cx", self.engine_id.clone()),
            ("q", query.text.clone()),
            ("num", num.to_string()),
            ("start", start.to_string()),
        ];
        if let Some(ref d) = query.date_restrict {
            params.push(("dateRestrict", d.clone()));
        }
        if let Some(ref gl) = query.gl {
            params.push(("gl", gl.clone()));
        }
        if let Some(ref hl) = query.hl {
            params.push(("hl", hl.clone()));
        }

        let resp = self
            .client
            .get(self.base_url.as_str())
            .query(&params)
            .send()
            .await
            .map_err(|e| ScanError::TransientApi(format!("Search request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &body));
        }

        let data: CseResponse = resp
            .json()
            .await
            .map_err(|e| ScanError::TransientApi(format!("Unreadable search response: {e}")))?;
        Ok(data.items)
    }
}

/// Map a non-2xx search API status onto the scan error taxonomy.
fn classify_status(status: u16, body: &str) -> ScanError {
    match status {
        401 | 403 => ScanError::Auth(format!(
            "Search API rejected the credentials (status {status}). \
             Check GOOGLE_API_KEY and GOOGLE_CX_ID."
        )),
        408 | 429 | 500..=599 => ScanError::TransientApi(format!(
            "Search API unavailable (status {status}): {body}"
        )),
        _ => ScanError::TransientApi(format!("Search API error (status {status}): {body}")),
    }
}

#[async_trait]
impl WebSearcher for GoogleSearcher {
    async fn search(
        &self,
        query: &SearchQuery,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, ScanError> {
        info!(query = %query.text, max_results, "Google search");

        let mut results: Vec<SearchResult> = Vec::new();
        // Items consumed from the index, kept or not. Pagination advances by
        // this, not by accepted results, so a skipped link-less item never
        // makes the next page overlap what was already fetched.
        let mut fetched = 0usize;

        while results.len() < max_results {
            let num = (max_results - results.len()).min(PAGE_SIZE);
            // The start parameter is 1-based.
            let start = fetched + 1;
            let items = self.fetch_page(query, num, start).await?;
            let page_len = items.len();
            fetched += page_len;

            let accepted_before = results.len();
            for item in items {
                if item.link.is_empty() {
                    continue;
                }
                results.push(SearchResult {
                    url: item.link,
                    title: item.title,
                    snippet: item.snippet,
                    rank: results.len() as u32,
                });
            }

            // Short page means the index is exhausted; a page that accepted
            // nothing is not worth paging past.
            if page_len < num || results.len() == accepted_before {
                break;
            }
        }

        info!(query = %query.text, count = results.len(), "Google search complete");
        Ok(results)
    }
}
