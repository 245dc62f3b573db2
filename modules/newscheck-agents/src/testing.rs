// Test mocks for the agents.
//
// ScriptedModel (LanguageModel): PromptKind → canned reply or failure, with
// optional latency, recording every request it receives.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use ai_client::AiError;

use crate::{LanguageModel, PromptKind, PromptRequest};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Network(String),
}

/// Canned replies per prompt kind. Unregistered kinds fail with an API error.
/// Builder pattern: `.on()`, `.fail()`, `.delay()`, `.delay_on()`.
#[derive(Default)]
pub struct ScriptedModel {
    replies: HashMap<PromptKind, Reply>,
    delays: HashMap<PromptKind, Duration>,
    default_delay: Option<Duration>,
    requests: Mutex<Vec<PromptRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, kind: PromptKind, reply: &str) -> Self {
        self.replies.insert(kind, Reply::Text(reply.to_string()));
        self
    }

    /// Fail `kind` with a network error.
    pub fn fail(mut self, kind: PromptKind, message: &str) -> Self {
        self.replies.insert(kind, Reply::Network(message.to_string()));
        self
    }

    /// Latency applied to every call.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    pub fn delay_on(mut self, kind: PromptKind, delay: Duration) -> Self {
        self.delays.insert(kind, delay);
        self
    }

    pub fn requests(&self) -> Vec<PromptRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self, kind: PromptKind) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.kind == kind)
            .count()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: &PromptRequest) -> Result<String, AiError> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(delay) = self.delays.get(&request.kind).copied().or(self.default_delay) {
            tokio::time::sleep(delay).await;
        }

        match self.replies.get(&request.kind) {
            Some(Reply::Text(text)) => Ok(text.clone()),
            Some(Reply::Network(message)) => Err(AiError::Network(message.clone())),
            None => Err(AiError::Api {
                status: 404,
                body: format!("ScriptedModel: no reply registered for {}", request.kind),
            }),
        }
    }
}
