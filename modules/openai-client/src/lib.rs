mod client;
pub mod error;
mod schema;
mod types;

pub use error::{OpenAiError, Result};
pub use schema::StructuredOutput;

use tracing::debug;

use client::OpenAiHttp;
use types::{ChatRequest, JsonSchemaFormat, ResponseFormat, WireMessage};

/// OpenAI chat-completions client.
#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    base_url: Option<String>,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
        }
    }

    /// Point at a different endpoint (test servers, proxies).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> OpenAiHttp {
        let client = OpenAiHttp::new(&self.api_key);
        match self.base_url {
            Some(ref url) => client.with_base_url(url),
            None => client,
        }
    }

    /// Plain chat completion.
    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![WireMessage::system(system), WireMessage::user(user)],
            temperature: self.default_temperature(),
            max_tokens: None,
            response_format: None,
        };

        let response = self.client().chat(&request).await?;
        response.text().ok_or(OpenAiError::EmptyResponse)
    }

    /// Type-safe structured output via the strict json_schema response format.
    pub async fn extract<T: StructuredOutput>(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<T> {
        debug!(model = %self.model, output = %T::output_name(), "Structured extraction");

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![WireMessage::system(system), WireMessage::user(user)],
            temperature: self.default_temperature(),
            max_tokens: None,
            response_format: Some(ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: "structured_response".to_string(),
                    strict: true,
                    schema: T::strict_schema(),
                },
            }),
        };

        let response = self.client().chat(&request).await?;
        let json = response.text().ok_or(OpenAiError::EmptyResponse)?;

        serde_json::from_str(&json).map_err(|e| OpenAiError::Deserialize(e.to_string()))
    }

    // Reasoning models reject explicit temperature.
    fn default_temperature(&self) -> Option<f32> {
        if self.model.starts_with("gpt-5") || self.model.starts_with("o") {
            None
        } else {
            Some(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_holds_model() {
        let ai = OpenAi::new("sk-test", "gpt-4o");
        assert_eq!(ai.model(), "gpt-4o");
    }

    #[test]
    fn base_url_override() {
        let ai = OpenAi::new("sk-test", "gpt-4o").with_base_url("http://localhost:9999/v1");
        assert_eq!(ai.base_url.as_deref(), Some("http://localhost:9999/v1"));
    }

    #[test]
    fn reasoning_models_omit_temperature() {
        assert_eq!(OpenAi::new("k", "gpt-4o").default_temperature(), Some(0.0));
        assert_eq!(OpenAi::new("k", "gpt-5-mini").default_temperature(), None);
        assert_eq!(OpenAi::new("k", "o3").default_temperature(), None);
    }
}
