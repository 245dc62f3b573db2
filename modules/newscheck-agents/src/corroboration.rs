use std::collections::HashMap;

use tracing::{debug, warn};

use newscheck_common::file_config::{CorroborationMode, MatchPolicy};
use newscheck_common::{ContextSet, CorroborationCount, Signal};

use crate::agent::into_signal;
use crate::prompts::format_context;
use crate::response::FilterResponse;
use crate::{AgentError, AgentRunner, PromptKind};

/// Counts the context entries that contain the headline verbatim.
#[derive(Clone)]
pub struct CorroborationCounter {
    runner: AgentRunner,
    mode: CorroborationMode,
    policy: MatchPolicy,
}

impl CorroborationCounter {
    pub fn new(runner: AgentRunner, mode: CorroborationMode, policy: MatchPolicy) -> Self {
        Self {
            runner,
            mode,
            policy,
        }
    }

    pub async fn count(&self, headline: &str, context: &ContextSet) -> Signal<CorroborationCount> {
        if context.is_empty() {
            debug!("No context entries, corroboration count is zero");
            return Signal::computed(CorroborationCount { times: 0 });
        }

        match self.mode {
            CorroborationMode::Literal => Signal::computed(CorroborationCount {
                times: literal_count(headline, context, self.policy),
            }),
            CorroborationMode::Agent => into_signal(self.ask(headline, context).await),
        }
    }

    async fn ask(&self, headline: &str, context: &ContextSet) -> Result<CorroborationCount, AgentError> {
        let rendered = format_context(context);
        let vars = HashMap::from([
            ("headline", self.runner.clip(headline)),
            ("context", self.runner.clip(&rendered)),
        ]);
        let reply: FilterResponse = self.runner.invoke(PromptKind::Filter, &vars).await?;

        let max = context.len() as u32;
        if reply.times > max {
            warn!(reported = reply.times, entries = max, "Filter agent over-counted, clamping");
        }
        Ok(CorroborationCount {
            times: reply.times.min(max),
        })
    }
}

/// Local count under `policy`. An empty headline matches nothing.
pub fn literal_count(headline: &str, context: &ContextSet, policy: MatchPolicy) -> u32 {
    if headline.is_empty() {
        return 0;
    }
    context
        .entries()
        .iter()
        .filter(|entry| contains(&entry.text(), headline, policy))
        .count() as u32
}

fn contains(text: &str, needle: &str, policy: MatchPolicy) -> bool {
    match policy {
        MatchPolicy::Substring => text.contains(needle),
        MatchPolicy::WordBoundary => text.match_indices(needle).any(|(start, _)| {
            let before = text[..start].chars().next_back();
            let after = text[start + needle.len()..].chars().next();
            !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        }),
    }
}
