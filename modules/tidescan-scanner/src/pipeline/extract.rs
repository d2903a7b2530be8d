//! Content extraction: fetch a result URL and strip boilerplate down to
//! main-content text.
//!
//! Failures here never abort the batch. A fetch or parse problem yields a
//! `Failed` document, a page with nothing worth reading yields `Empty`, and
//! the scan carries on either way.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use spider_transformations::transformation::content::{
    transform_content_input, ReturnFormat, TransformConfig, TransformInput,
};
use tracing::{info, warn};

use tidescan_common::ExtractedDocument;

/// Concurrent page fetches per scan. Independent network calls, no shared
/// state; kept low to respect target sites.
const FETCH_CONCURRENCY: usize = 4;

/// Extracted text shorter than this counts as an empty page.
const MIN_CONTENT_CHARS: usize = 100;

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

// --- PageFetcher trait ---

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch raw HTML for a URL. Single attempt; callers re-run the whole
    /// scan rather than retrying individual pages.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Plain HTTP fetcher with a browser user agent.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to build HTTP client");
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let parsed = url::Url::parse(url).context("Invalid URL")?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            anyhow::bail!("Only http/https URLs are allowed, got: {}", parsed.scheme());
        }

        let resp = self.client.get(url).send().await.context("Page fetch failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("Page fetch returned status {status} for {url}");
        }

        resp.text().await.context("Failed to read page body")
    }
}

// --- Readability extraction ---

/// Strip a page down to its main content as markdown. Falls back to a
/// whole-page pass when Readability finds nothing, since sparse pages
/// (press releases, notices) often fail the main-content heuristics.
fn readable_text(html: &str, url: &str) -> String {
    let parsed_url = url::Url::parse(url).ok();

    let config = TransformConfig {
        readability: true,
        main_content: true,
        return_format: ReturnFormat::Markdown,
        filter_images: true,
        filter_svg: true,
        clean_html: true,
    };
    let input = TransformInput {
        url: parsed_url.as_ref(),
        content: html.as_bytes(),
        screenshot_bytes: None,
        encoding: None,
        selector_config: None,
        ignore_tags: None,
    };
    let text = transform_content_input(input, &config);
    if text.trim().len() >= MIN_CONTENT_CHARS {
        return text;
    }

    let fallback_config = TransformConfig {
        readability: false,
        main_content: false,
        return_format: ReturnFormat::Markdown,
        filter_images: true,
        filter_svg: true,
        clean_html: true,
    };
    let fallback_input = TransformInput {
        url: parsed_url.as_ref(),
        content: html.as_bytes(),
        screenshot_bytes: None,
        encoding: None,
        selector_config: None,
        ignore_tags: None,
    };
    transform_content_input(fallback_input, &fallback_config)
}

/// Fetch and extract one URL, absorbing all failures into the document status.
pub async fn extract_document(fetcher: &dyn PageFetcher, url: &str) -> ExtractedDocument {
    let html = match fetcher.fetch(url).await {
        Ok(html) => html,
        Err(e) => {
            warn!(url, error = %e, "Page fetch failed");
            return ExtractedDocument::failed(url);
        }
    };

    if html.trim().is_empty() {
        warn!(url, "Fetched page was empty");
        return ExtractedDocument::empty(url);
    }

    let text = readable_text(&html, url);
    if text.trim().len() < MIN_CONTENT_CHARS {
        warn!(url, "No extractable content after Readability pass");
        return ExtractedDocument::empty(url);
    }

    info!(url, bytes = text.len(), "Extracted page content");
    ExtractedDocument::ok(url, text)
}

/// Extract a batch of URLs with bounded concurrency, preserving input order.
pub async fn extract_all(fetcher: &dyn PageFetcher, urls: &[String]) -> Vec<ExtractedDocument> {
    stream::iter(urls)
        .map(|url| extract_document(fetcher, url))
        .buffered(FETCH_CONCURRENCY)
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidescan_common::ExtractionStatus;

    struct FixtureFetcher;

    #[async_trait]
    impl PageFetcher for FixtureFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            match url {
                u if u.ends_with("/article") => Ok(article_html()),
                u if u.ends_with("/blank") => Ok("<html><body></body></html>".to_string()),
                _ => anyhow::bail!("connection refused"),
            }
        }
    }

    fn article_html() -> String {
        let para = "Ofwat confirmed the AMP8 determination will require water companies \
                    to cut leakage by a further sixteen percent across the period, with \
                    capital programmes weighted toward mains renewal and smart metering. "
            .repeat(4);
        format!(
            "<html><head><title>AMP8 leakage targets</title></head>\
             <body><article><h1>AMP8 leakage targets</h1><p>{para}</p></article></body></html>"
        )
    }

    #[tokio::test]
    async fn article_extracts_ok() {
        let doc = extract_document(&FixtureFetcher, "https://ofwat.gov.uk/article").await;
        assert_eq!(doc.status, ExtractionStatus::Ok);
        assert!(doc.raw_text.contains("leakage"));
    }

    #[tokio::test]
    async fn blank_page_is_empty_not_failed() {
        let doc = extract_document(&FixtureFetcher, "https://ofwat.gov.uk/blank").await;
        assert_eq!(doc.status, ExtractionStatus::Empty);
        assert!(doc.raw_text.is_empty());
    }

    #[tokio::test]
    async fn fetch_error_is_failed_with_empty_text() {
        let doc = extract_document(&FixtureFetcher, "https://ofwat.gov.uk/missing").await;
        assert_eq!(doc.status, ExtractionStatus::Failed);
        assert!(doc.raw_text.is_empty());
    }

    #[tokio::test]
    async fn batch_preserves_input_order() {
        let urls = vec![
            "https://ofwat.gov.uk/missing".to_string(),
            "https://ofwat.gov.uk/article".to_string(),
            "https://ofwat.gov.uk/blank".to_string(),
        ];
        let docs = extract_all(&FixtureFetcher, &urls).await;
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].status, ExtractionStatus::Failed);
        assert_eq!(docs[1].status, ExtractionStatus::Ok);
        assert_eq!(docs[2].status, ExtractionStatus::Empty);
        assert_eq!(docs[1].source_url, urls[1]);
    }
}
