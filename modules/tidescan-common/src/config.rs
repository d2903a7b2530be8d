use std::env;

use tracing::info;

use crate::error::ScanError;

/// Application configuration loaded from environment variables.
///
/// Credentials are optional at load time: a missing key only becomes a
/// `ScanError::Configuration` when a scan actually needs the component,
/// so the message can tell the user exactly what to set.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Google Custom Search API key (`GOOGLE_API_KEY`).
    pub search_api_key: Option<String>,
    /// Google programmable search engine id (`GOOGLE_CX_ID`).
    pub search_engine_id: Option<String>,
    /// OpenAI API key (`OPENAI_API_KEY`).
    pub llm_api_key: Option<String>,
    /// Chat model for synthesis (`OPENAI_MODEL`, default "gpt-4o").
    pub llm_model: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            search_api_key: optional_env("GOOGLE_API_KEY"),
            search_engine_id: optional_env("GOOGLE_CX_ID"),
            llm_api_key: optional_env("OPENAI_API_KEY"),
            llm_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
        }
    }

    /// Search credentials, or a configuration error with remediation guidance.
    pub fn search_credentials(&self) -> Result<(&str, &str), ScanError> {
        match (&self.search_api_key, &self.search_engine_id) {
            (Some(key), Some(cx)) => Ok((key, cx)),
            _ => Err(ScanError::Configuration(
                "Google search is not configured. Set GOOGLE_API_KEY and GOOGLE_CX_ID \
                 to the Custom Search API key and search engine id."
                    .to_string(),
            )),
        }
    }

    /// LLM credentials, or a configuration error with remediation guidance.
    pub fn llm_credentials(&self) -> Result<&str, ScanError> {
        self.llm_api_key.as_deref().ok_or_else(|| {
            ScanError::Configuration(
                "OpenAI is not configured. Set OPENAI_API_KEY to enable insight synthesis."
                    .to_string(),
            )
        })
    }

    /// Check everything a full scan needs in one pass.
    pub fn validate_for_scan(&self) -> Result<(), ScanError> {
        self.search_credentials()?;
        self.llm_credentials()?;
        Ok(())
    }

    /// Log which credentials are present without leaking their values.
    pub fn log_redacted(&self) {
        info!(
            search_key = self.search_api_key.is_some(),
            search_engine = self.search_engine_id.is_some(),
            llm_key = self.llm_api_key.is_some(),
            llm_model = %self.llm_model,
            "Loaded configuration"
        );
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
