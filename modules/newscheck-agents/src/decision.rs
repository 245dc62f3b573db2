use std::collections::HashMap;

use tracing::info;

use newscheck_common::{
    AlignmentLabel, ContextSet, CorroborationCount, Signal, Verdict, VerdictCategory,
    VeracitySignal,
};

use crate::prompts::format_context;
use crate::response::DecisionResponse;
use crate::{AgentError, AgentRunner, PromptKind};

/// Corroboration count at which identical headlines look like a campaign.
pub const CAMPAIGN_THRESHOLD: u32 = 5;

const DEGRADED_NOTE: &str = "Some inputs are marked UNKNOWN because they could not be computed. \
An UNKNOWN input is not evidence either way: decide on the remaining criteria.";

/// Everything the verdict is based on. Every signal is present, computed or not.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInputs<'a> {
    pub article_text: &'a str,
    pub context: &'a Signal<ContextSet>,
    pub veracity: &'a Signal<VeracitySignal>,
    pub alignment: &'a Signal<AlignmentLabel>,
    pub corroboration: &'a Signal<CorroborationCount>,
}

impl DecisionInputs<'_> {
    /// Names of the signals that could not be computed.
    pub fn degraded(&self) -> Vec<&'static str> {
        [
            ("context", self.context.is_degraded()),
            ("veracity", self.veracity.is_degraded()),
            ("alignment", self.alignment.is_degraded()),
            ("corroboration", self.corroboration.is_degraded()),
        ]
        .into_iter()
        .filter_map(|(name, degraded)| degraded.then_some(name))
        .collect()
    }
}

/// Final Fake/Real decision with reasoning in the configured language.
#[derive(Clone)]
pub struct VerdictAggregator {
    runner: AgentRunner,
    language: String,
    flag_degraded: bool,
}

impl VerdictAggregator {
    pub fn new(runner: AgentRunner, language: impl Into<String>) -> Self {
        Self {
            runner,
            language: language.into(),
            flag_degraded: true,
        }
    }

    /// Whether degraded inputs carry their reason and an instruction to
    /// discount them.
    pub fn with_degraded_flagging(mut self, flag_degraded: bool) -> Self {
        self.flag_degraded = flag_degraded;
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub async fn decide(&self, inputs: &DecisionInputs<'_>) -> Result<Verdict, AgentError> {
        let context = match inputs.context {
            Signal::Computed { value } => format_context(value),
            Signal::Degraded { reason } => self.unknown(reason),
        };
        let probability = self.render(inputs.veracity, |v| format!("{:.4}", v.probability));
        let alignment = self.render(inputs.alignment, |a| a.to_string());
        let times = self.render(inputs.corroboration, |c| c.times.to_string());
        let notes = if self.flag_degraded && !inputs.degraded().is_empty() {
            format!("\n{DEGRADED_NOTE}\n")
        } else {
            String::new()
        };

        let vars = HashMap::from([
            ("news", self.runner.clip(inputs.article_text)),
            ("filtered_context", self.runner.clip(&context)),
            ("probability", probability.as_str()),
            ("alignment", alignment.as_str()),
            ("times", times.as_str()),
            ("notes", notes.as_str()),
            ("language", self.language.as_str()),
        ]);

        let reply: DecisionResponse = self.runner.invoke(PromptKind::Decision, &vars).await?;
        if reply.reasoning.trim().is_empty() {
            return Err(AgentError::Parse {
                agent: PromptKind::Decision.name(),
                reason: "reasoning is empty".to_string(),
            });
        }

        info!(category = %reply.category, "Verdict rendered");
        Ok(Verdict {
            category: reply.category,
            reasoning: reply.reasoning,
        })
    }

    fn render<T>(&self, signal: &Signal<T>, show: impl Fn(&T) -> String) -> String {
        match signal {
            Signal::Computed { value } => show(value),
            Signal::Degraded { reason } => self.unknown(reason),
        }
    }

    fn unknown(&self, reason: &str) -> String {
        if self.flag_degraded {
            format!("UNKNOWN ({reason})")
        } else {
            "UNKNOWN".to_string()
        }
    }
}

/// Deterministic verdict from the signals, used when the aggregator itself is
/// unavailable. Any fake indicator makes the article Fake; so does having no
/// computed signal at all.
pub fn fallback_verdict(inputs: &DecisionInputs<'_>, language: &str) -> Verdict {
    let spanish = is_spanish(language);
    let mut indicators = Vec::new();

    if let Some(v) = inputs.veracity.value() {
        if v.probability < 0.5 {
            indicators.push(if spanish {
                format!("el clasificador estima una probabilidad de veracidad de {:.2}", v.probability)
            } else {
                format!("the classifier estimates a probability of {:.2} that it is real", v.probability)
            });
        }
    }
    if inputs.alignment.value() == Some(&AlignmentLabel::NotAligned) {
        indicators.push(if spanish {
            "el titular no se corresponde con el cuerpo".to_string()
        } else {
            "the headline is not aligned with the body".to_string()
        });
    }
    if let Some(c) = inputs.corroboration.value() {
        if c.times >= CAMPAIGN_THRESHOLD {
            indicators.push(if spanish {
                format!("el titular aparece idéntico en {} fuentes", c.times)
            } else {
                format!("the exact headline appears in {} sources", c.times)
            });
        }
    }

    let no_evidence = inputs.veracity.is_degraded() && inputs.alignment.is_degraded();

    let (category, reasoning) = if !indicators.is_empty() {
        let joined = indicators.join("; ");
        let text = if spanish {
            format!("Veredicto automático sin agente de decisión: {joined}.")
        } else {
            format!("Automatic verdict without the decision agent: {joined}.")
        };
        (VerdictCategory::Fake, text)
    } else if no_evidence {
        let text = if spanish {
            "Veredicto automático sin agente de decisión: no hay señales suficientes para verificar la noticia."
        } else {
            "Automatic verdict without the decision agent: there are not enough signals to verify the news."
        };
        (VerdictCategory::Fake, text.to_string())
    } else {
        let text = if spanish {
            "Veredicto automático sin agente de decisión: ninguna señal disponible indica desinformación."
        } else {
            "Automatic verdict without the decision agent: no available signal indicates misinformation."
        };
        (VerdictCategory::Real, text.to_string())
    };

    Verdict {
        category,
        reasoning,
    }
}

fn is_spanish(language: &str) -> bool {
    let lang = language.trim().to_lowercase();
    lang.starts_with("span") || lang.starts_with("españ") || lang.starts_with("espan") || lang == "es"
}
