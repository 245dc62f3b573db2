use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Empty response: {0}")]
    EmptyResponse(String),
}

impl AiError {
    /// True for failures of the call itself (as opposed to the payload it returned).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AiError::Network(_) | AiError::Timeout(_) | AiError::Api { .. }
        )
    }
}
