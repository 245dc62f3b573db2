use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use newscheck_common::Signal;

use crate::prompts::SYSTEM_PROMPT;
use crate::response::parse_strict;
use crate::{AgentError, LanguageModel, PromptKind, PromptRequest, PromptSet};

const DEFAULT_MAX_PROMPT_BYTES: usize = 12_000;

/// Renders a prompt, calls the model under a timeout and parses the reply
/// strictly. Shared by every agent.
#[derive(Clone)]
pub struct AgentRunner {
    model: Arc<dyn LanguageModel>,
    prompts: Arc<PromptSet>,
    timeout: Duration,
    max_prompt_bytes: usize,
}

impl AgentRunner {
    pub fn new(model: Arc<dyn LanguageModel>, prompts: Arc<PromptSet>, timeout: Duration) -> Self {
        Self {
            model,
            prompts,
            timeout,
            max_prompt_bytes: DEFAULT_MAX_PROMPT_BYTES,
        }
    }

    /// Byte budget for each free-text value placed in a prompt.
    pub fn with_max_prompt_bytes(mut self, max_prompt_bytes: usize) -> Self {
        self.max_prompt_bytes = max_prompt_bytes.max(1);
        self
    }

    pub fn prompts(&self) -> &PromptSet {
        &self.prompts
    }

    pub fn clip<'a>(&self, text: &'a str) -> &'a str {
        ai_client::truncate_to_char_boundary(text, self.max_prompt_bytes)
    }

    pub async fn invoke<T: DeserializeOwned>(
        &self,
        kind: PromptKind,
        vars: &HashMap<&str, &str>,
    ) -> Result<T, AgentError> {
        let agent = kind.name();
        let request = PromptRequest {
            kind,
            system: SYSTEM_PROMPT.to_string(),
            user: self.prompts.get(kind).render(vars)?,
            schema_name: kind.schema_name(),
            schema: kind.response_schema(),
        };
        debug!(agent, prompt_bytes = request.user.len(), "Agent request");

        let raw = tokio::time::timeout(self.timeout, self.model.complete(&request))
            .await
            .map_err(|_| AgentError::Timeout {
                agent,
                after: self.timeout,
            })?
            .map_err(|e| AgentError::from_ai(agent, e))?;

        debug!(agent, response_bytes = raw.len(), "Agent response");
        parse_strict(agent, &raw)
    }
}

/// Catch an agent failure at the component boundary.
pub(crate) fn into_signal<T>(result: Result<T, AgentError>) -> Signal<T> {
    match result {
        Ok(value) => Signal::computed(value),
        Err(e) => {
            warn!(agent = e.agent(), transport = e.is_transport(), error = %e, "Signal degraded");
            Signal::degraded(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::FilterResponse;
    use crate::testing::ScriptedModel;

    fn runner(model: ScriptedModel, timeout: Duration) -> AgentRunner {
        AgentRunner::new(
            Arc::new(model),
            Arc::new(PromptSet::defaults().unwrap()),
            timeout,
        )
    }

    fn vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([("headline", "Titular"), ("context", "1. Titular")])
    }

    #[tokio::test]
    async fn parses_model_reply() {
        let model = ScriptedModel::new().on(PromptKind::Filter, r#"{"times": 1}"#);
        let reply: FilterResponse = runner(model, Duration::from_secs(1))
            .invoke(PromptKind::Filter, &vars())
            .await
            .unwrap();
        assert_eq!(reply.times, 1);
    }

    #[tokio::test]
    async fn slow_model_times_out() {
        let model = ScriptedModel::new()
            .on(PromptKind::Filter, r#"{"times": 1}"#)
            .delay(Duration::from_millis(200));
        let err = runner(model, Duration::from_millis(20))
            .invoke::<FilterResponse>(PromptKind::Filter, &vars())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Timeout { agent: "filter", .. }));
    }

    #[tokio::test]
    async fn request_carries_schema_and_rendered_prompt() {
        let model = Arc::new(ScriptedModel::new().on(PromptKind::Filter, r#"{"times": 0}"#));
        let runner = AgentRunner::new(
            model.clone(),
            Arc::new(PromptSet::defaults().unwrap()),
            Duration::from_secs(1),
        );
        runner
            .invoke::<FilterResponse>(PromptKind::Filter, &vars())
            .await
            .unwrap();

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].schema_name, "filter_response");
        assert!(requests[0].user.contains("1. Titular"));
        assert_eq!(requests[0].system, SYSTEM_PROMPT);
    }

    #[test]
    fn clip_respects_char_boundaries() {
        let runner = runner(ScriptedModel::new(), Duration::from_secs(1)).with_max_prompt_bytes(3);
        assert_eq!(runner.clip("añob"), "añ");
    }

    #[test]
    fn errors_become_degraded_signals() {
        let signal: Signal<u32> = into_signal(Err(AgentError::Parse {
            agent: "class",
            reason: "not json".into(),
        }));
        assert!(signal.degraded_reason().unwrap().contains("not json"));
        assert_eq!(into_signal::<u32>(Ok(2)).into_value(), Some(2));
    }
}
