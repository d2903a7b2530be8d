use thiserror::Error;

pub type Result<T> = std::result::Result<T, OpenAiError>;

#[derive(Debug, Error)]
pub enum OpenAiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Failed to deserialize model output: {0}")]
    Deserialize(String),
}

impl From<reqwest::Error> for OpenAiError {
    fn from(err: reqwest::Error) -> Self {
        OpenAiError::Network(err.to_string())
    }
}

impl OpenAiError {
    /// HTTP status for API errors, so callers can tell auth failures
    /// (401/403) apart from rate limits and server errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            OpenAiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
