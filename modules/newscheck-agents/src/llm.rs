use async_trait::async_trait;
use serde_json::Value;

use ai_client::{AiError, OpenAi};

use crate::PromptKind;

/// A fully rendered agent call.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub kind: PromptKind,
    pub system: String,
    pub user: String,
    pub schema_name: &'static str,
    pub schema: Value,
}

/// The chat model behind the agents. Returns the raw response text; parsing
/// happens in the agent so every backend is held to the same contract.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: &PromptRequest) -> Result<String, AiError>;
}

#[async_trait]
impl LanguageModel for OpenAi {
    async fn complete(&self, request: &PromptRequest) -> Result<String, AiError> {
        self.structured_output(
            request.system.clone(),
            request.user.clone(),
            request.schema_name,
            request.schema.clone(),
        )
        .await
    }
}
