use thiserror::Error;

/// Error taxonomy for a market scan.
///
/// `Configuration` and `Auth` are fatal to the scan and non-retryable.
/// `TransientApi` means the caller may re-trigger the whole scan.
/// `Synthesis` is scoped to one LLM batch; sibling batches proceed.
/// Per-document extraction failures are never raised as errors; they are
/// absorbed into `ExtractionStatus` and recorded in the result store.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transient API error: {0}")]
    TransientApi(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Scan conflict: another scan is already in progress")]
    ScanInProgress,

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl ScanError {
    /// Whether re-triggering the scan may succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScanError::TransientApi(_) | ScanError::ScanInProgress)
    }
}
