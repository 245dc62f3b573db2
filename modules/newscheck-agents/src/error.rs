use std::time::Duration;

use ai_client::AiError;
use thiserror::Error;

/// Run-time agent failures. Each one degrades a single signal; none of them
/// aborts a pipeline run.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The model answered, but not with the documented JSON object.
    #[error("{agent} agent returned an unusable response: {reason}")]
    Parse { agent: &'static str, reason: String },

    #[error("{agent} agent transport error: {source}")]
    Transport {
        agent: &'static str,
        #[source]
        source: AiError,
    },

    #[error("{agent} agent timed out after {after:?}")]
    Timeout { agent: &'static str, after: Duration },

    #[error("{agent} prompt could not be rendered: {reason}")]
    Prompt { agent: &'static str, reason: String },
}

impl AgentError {
    pub fn agent(&self) -> &'static str {
        match self {
            AgentError::Parse { agent, .. }
            | AgentError::Transport { agent, .. }
            | AgentError::Timeout { agent, .. }
            | AgentError::Prompt { agent, .. } => agent,
        }
    }

    /// Timeouts count as transport failures.
    pub fn is_transport(&self) -> bool {
        matches!(self, AgentError::Transport { .. } | AgentError::Timeout { .. })
    }

    pub(crate) fn from_ai(agent: &'static str, err: AiError) -> Self {
        match err {
            AiError::Parse(reason) | AiError::EmptyResponse(reason) => {
                AgentError::Parse { agent, reason }
            }
            AiError::Timeout(after) => AgentError::Timeout { agent, after },
            other => AgentError::Transport {
                agent,
                source: other,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ai_errors_map_to_agent_errors() {
        let parse = AgentError::from_ai("filter", AiError::Parse("bad".into()));
        assert!(matches!(parse, AgentError::Parse { agent: "filter", .. }));
        assert!(!parse.is_transport());

        let timeout = AgentError::from_ai("class", AiError::Timeout(Duration::from_secs(3)));
        assert!(timeout.is_transport());
        assert_eq!(timeout.agent(), "class");

        let api = AgentError::from_ai(
            "decision",
            AiError::Api {
                status: 500,
                body: "boom".into(),
            },
        );
        assert!(matches!(api, AgentError::Transport { .. }));
        assert!(api.to_string().contains("decision"));
    }
}
