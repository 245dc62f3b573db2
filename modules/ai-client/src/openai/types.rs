use serde::{Deserialize, Serialize};

// =============================================================================
// Chat Completion
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireMessage {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl WireMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
        }
    }
}

// =============================================================================
// Chat Request
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: None,
            max_tokens: None,
            max_completion_tokens: None,
            response_format: None,
        }
    }

    pub fn message(mut self, message: WireMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the output token cap using whichever field the model family accepts.
    pub fn token_limit(mut self, limit: u32) -> Self {
        if uses_max_completion_tokens(&self.model) {
            self.max_completion_tokens = Some(limit);
        } else {
            self.max_tokens = Some(limit);
        }
        self
    }

    pub fn json_schema(mut self, name: impl Into<String>, schema: serde_json::Value) -> Self {
        self.response_format = Some(ResponseFormat {
            format_type: "json_schema".to_string(),
            json_schema: JsonSchemaFormat {
                name: name.into(),
                strict: true,
                schema,
            },
        });
        self
    }
}

// =============================================================================
// Chat Response
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    pub fn into_content(self) -> Option<String> {
        self.choices.into_iter().next().and_then(|c| c.message.content)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Choice {
    pub message: WireMessage,
    #[allow(dead_code)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

// =============================================================================
// Structured Output
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
    pub json_schema: JsonSchemaFormat,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct JsonSchemaFormat {
    pub name: String,
    pub strict: bool,
    pub schema: serde_json::Value,
}

// =============================================================================
// Utilities
// =============================================================================

/// Check if a model requires max_completion_tokens instead of max_tokens.
pub(crate) fn uses_max_completion_tokens(model: &str) -> bool {
    model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("gpt-5")
        || model.contains("-o1")
        || model.contains("-o3")
}

/// Reasoning models reject an explicit temperature; everything else runs at zero.
pub(crate) fn deterministic_temperature(model: &str) -> Option<f32> {
    if uses_max_completion_tokens(model) {
        None
    } else {
        Some(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_limit_picks_field_by_model() {
        let legacy = ChatRequest::new("gpt-4o-mini").token_limit(512);
        assert_eq!(legacy.max_tokens, Some(512));
        assert_eq!(legacy.max_completion_tokens, None);

        let reasoning = ChatRequest::new("o3-mini").token_limit(512);
        assert_eq!(reasoning.max_tokens, None);
        assert_eq!(reasoning.max_completion_tokens, Some(512));
    }

    #[test]
    fn reasoning_models_have_no_temperature() {
        assert_eq!(deterministic_temperature("gpt-4o"), Some(0.0));
        assert_eq!(deterministic_temperature("gpt-5-mini"), None);
    }

    #[test]
    fn request_serializes_response_format() {
        let request = ChatRequest::new("gpt-4o")
            .message(WireMessage::user("hola"))
            .json_schema("filter_response", serde_json::json!({"type": "object"}));
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["response_format"]["type"], "json_schema");
        assert_eq!(value["response_format"]["json_schema"]["name"], "filter_response");
        assert_eq!(value["messages"][0]["role"], "user");
        assert!(value.get("temperature").is_none());
    }

    #[test]
    fn response_content_takes_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"{\"times\": 2}"},"finish_reason":"stop"}]}"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.into_content().as_deref(), Some("{\"times\": 2}"));
    }
}
