use std::collections::HashMap;

use newscheck_common::{AlignmentLabel, Signal};

use crate::agent::into_signal;
use crate::response::HeadlineResponse;
use crate::{AgentError, AgentRunner, PromptKind};

/// Whether a headline states what its body reports.
#[derive(Clone)]
pub struct AlignmentChecker {
    runner: AgentRunner,
}

impl AlignmentChecker {
    pub fn new(runner: AgentRunner) -> Self {
        Self { runner }
    }

    pub async fn check(&self, headline: &str, body: &str) -> Signal<AlignmentLabel> {
        into_signal(self.ask(headline, body).await)
    }

    async fn ask(&self, headline: &str, body: &str) -> Result<AlignmentLabel, AgentError> {
        let vars = HashMap::from([
            ("headline", self.runner.clip(headline)),
            ("news", self.runner.clip(body)),
        ]);
        let reply: HeadlineResponse = self.runner.invoke(PromptKind::Headline, &vars).await?;
        Ok(reply.label)
    }
}
