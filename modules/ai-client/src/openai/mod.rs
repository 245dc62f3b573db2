mod client;
pub(crate) mod schema;
pub(crate) mod types;

pub use schema::StructuredOutput;

use std::time::Duration;

use crate::error::AiError;
use client::OpenAiClient;
use types::{deterministic_temperature, ChatRequest, WireMessage};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_OUTPUT_TOKENS: u32 = 4096;

// =============================================================================
// OpenAi Agent
// =============================================================================

#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    pub(crate) model: String,
    base_url: Option<String>,
    timeout: Duration,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Per-request HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn client(&self) -> Result<OpenAiClient, AiError> {
        let client = OpenAiClient::new(&self.api_key, self.timeout)?;
        Ok(match self.base_url {
            Some(ref url) => client.with_base_url(url),
            None => client,
        })
    }

    fn base_request(&self, system: String, user: String) -> ChatRequest {
        ChatRequest::new(&self.model)
            .message(WireMessage::system(system))
            .message(WireMessage::user(user))
            .temperature(deterministic_temperature(&self.model))
            .token_limit(MAX_OUTPUT_TOKENS)
    }

    /// Chat completion constrained by a JSON schema. Returns the raw JSON text
    /// so callers decide how strictly to parse it.
    pub async fn structured_output(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
        schema_name: &str,
        schema: serde_json::Value,
    ) -> Result<String, AiError> {
        let request = self
            .base_request(system.into(), user.into())
            .json_schema(schema_name, schema);
        self.client()?.chat(&request).await
    }
}
