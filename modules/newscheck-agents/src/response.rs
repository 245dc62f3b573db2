//! Response payloads and the strict parser every agent goes through.
//!
//! A response must be one bare JSON object with exactly the documented keys.
//! Markdown fences, surrounding prose and extra keys are all rejected.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use newscheck_common::{AlignmentLabel, VerdictCategory};

use crate::AgentError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FilterResponse {
    /// Number of context entries containing the headline word by word.
    pub times: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct HeadlineResponse {
    pub label: AlignmentLabel,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DecisionResponse {
    pub category: VerdictCategory,
    pub reasoning: String,
}

pub fn parse_strict<T: DeserializeOwned>(agent: &'static str, raw: &str) -> Result<T, AgentError> {
    if !ai_client::is_bare_json_object(raw) {
        return Err(AgentError::Parse {
            agent,
            reason: format!("expected a bare JSON object, got: {}", preview(raw)),
        });
    }
    serde_json::from_str(raw.trim()).map_err(|e| AgentError::Parse {
        agent,
        reason: e.to_string(),
    })
}

fn preview(raw: &str) -> String {
    let head = ai_client::truncate_to_char_boundary(raw.trim(), 80);
    if head.len() < raw.trim().len() {
        format!("{head}...")
    } else {
        head.to_string()
    }
}
