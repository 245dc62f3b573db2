use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use super::types::*;
use crate::error::AiError;

pub(crate) const OPENAI_API_URL: &str = "https://api.openai.com/v1";

pub(crate) struct OpenAiClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AiError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            api_key: api_key.to_string(),
            http,
            base_url: OPENAI_API_URL.to_string(),
            timeout,
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn headers(&self) -> Result<HeaderMap, AiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| AiError::Config(format!("invalid API key header: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// POST a chat completion and return the first choice's content.
    pub async fn chat(&self, request: &ChatRequest) -> Result<String, AiError> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            model = %request.model,
            structured = request.response_format.is_some(),
            "OpenAI chat request"
        );

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api { status, body });
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| self.classify(e))?;

        if let Some(ref usage) = chat_response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "OpenAI usage"
            );
        }

        chat_response
            .into_content()
            .ok_or_else(|| AiError::EmptyResponse("no content in first choice".to_string()))
    }

    fn classify(&self, e: reqwest::Error) -> AiError {
        if e.is_timeout() {
            AiError::Timeout(self.timeout)
        } else if e.is_decode() {
            AiError::Parse(e.to_string())
        } else {
            AiError::Network(e.to_string())
        }
    }
}
