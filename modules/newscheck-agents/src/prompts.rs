use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;

use ai_client::StructuredOutput;
use newscheck_common::file_config::PromptsConfig;
use newscheck_common::{ContextSet, HeadlineSubject, NewsCheckError};

use crate::response::{DecisionResponse, FilterResponse, HeadlineResponse};
use crate::template::{render, validate_template};
use crate::AgentError;

/// Instruction shared by every agent call.
pub const SYSTEM_PROMPT: &str = "You answer strictly with a single JSON object and nothing else: \
no markdown, no code fences, no text before or after the object.";

const FILTER_TEMPLATE: &str = r#"You are an agent that counts literal matches.

Headline:
{{headline}}

Context entries:
{{context}}

Review every context entry and decide whether the headline appears inside it exactly, word by word and with the same capitalisation. A semantically similar sentence does not count.

Respond with a JSON object holding the number of entries where this happens:
{"times": <number of entries containing the headline verbatim>}"#;

const CLASS_TEMPLATE: &str = r#"You are an agent that analyses news headlines.

Headline:
{{headline}}

Identify the subject of the news, the event it describes, and the field it belongs to: Politics, Economics or Social.

Respond with a JSON object:
{"subject": "<subject of the news>", "event": "<event described>", "topic": "Politics" | "Economics" | "Social"}"#;

const HEADLINE_TEMPLATE: &str = r#"You are an agent that checks whether a headline matches the story it introduces.

Headline:
{{headline}}

Body of the news:
{{news}}

Decide whether the headline is aligned with the body: it must state what the body reports, without exaggerating, contradicting or inventing facts.

Respond with a JSON object:
{"label": "Aligned" | "NotAligned"}"#;

const DECISION_TEMPLATE: &str = r#"You are an information verification agent.

News:
{{news}}

Information gathered from the internet:
{{filtered_context}}

Decide whether the news is Real or Fake using only these criteria, listed in order of importance:
1. How well the news corresponds to the information gathered from the internet, weighting each source by its reliability.
2. The probability that the news is real according to a trained classifier: {{probability}}
3. Whether the headline is aligned with the body: {{alignment}}. A headline that is not aligned is a sign of fake news.
4. The number of other outlets publishing the exact same headline: {{times}}. A high number can indicate a coordinated misinformation campaign.
{{notes}}
Write a reasoned argument for your decision in {{language}}.

Respond with a JSON object:
{"category": "Fake" | "Real", "reasoning": "<your reasoning>"}"#;

/// The fixed set of agent prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Filter,
    Class,
    Headline,
    Decision,
}

impl PromptKind {
    pub const ALL: [PromptKind; 4] = [
        PromptKind::Filter,
        PromptKind::Class,
        PromptKind::Headline,
        PromptKind::Decision,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PromptKind::Filter => "filter",
            PromptKind::Class => "class",
            PromptKind::Headline => "headline",
            PromptKind::Decision => "decision",
        }
    }

    /// Slots the template must contain, and the only ones it may contain.
    pub fn slots(self) -> &'static [&'static str] {
        match self {
            PromptKind::Filter => &["headline", "context"],
            PromptKind::Class => &["headline"],
            PromptKind::Headline => &["headline", "news"],
            PromptKind::Decision => &[
                "news",
                "filtered_context",
                "probability",
                "alignment",
                "times",
                "notes",
                "language",
            ],
        }
    }

    pub fn default_template(self) -> &'static str {
        match self {
            PromptKind::Filter => FILTER_TEMPLATE,
            PromptKind::Class => CLASS_TEMPLATE,
            PromptKind::Headline => HEADLINE_TEMPLATE,
            PromptKind::Decision => DECISION_TEMPLATE,
        }
    }

    pub fn schema_name(self) -> &'static str {
        match self {
            PromptKind::Filter => "filter_response",
            PromptKind::Class => "headline_subject",
            PromptKind::Headline => "alignment_response",
            PromptKind::Decision => "decision_response",
        }
    }

    /// JSON schema of the response, in OpenAI strict form.
    pub fn response_schema(self) -> Value {
        match self {
            PromptKind::Filter => FilterResponse::openai_schema(),
            PromptKind::Class => HeadlineSubject::openai_schema(),
            PromptKind::Headline => HeadlineResponse::openai_schema(),
            PromptKind::Decision => DecisionResponse::openai_schema(),
        }
    }
}

impl std::fmt::Display for PromptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated template for one prompt kind.
#[derive(Debug, Clone)]
pub struct PromptSpec {
    kind: PromptKind,
    template: String,
}

impl PromptSpec {
    pub fn new(kind: PromptKind, template: impl Into<String>) -> Result<Self, NewsCheckError> {
        let template = template.into();
        if template.trim().is_empty() {
            return Err(NewsCheckError::Prompt {
                prompt: kind.name().to_string(),
                reason: "template is empty".to_string(),
            });
        }
        validate_template(&template, kind.slots()).map_err(|e| NewsCheckError::Prompt {
            prompt: kind.name().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { kind, template })
    }

    pub fn kind(&self) -> PromptKind {
        self.kind
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn render(&self, vars: &HashMap<&str, &str>) -> Result<String, AgentError> {
        render(&self.template, vars).map_err(|e| AgentError::Prompt {
            agent: self.kind.name(),
            reason: e.to_string(),
        })
    }
}

/// One validated spec per prompt kind.
#[derive(Debug, Clone)]
pub struct PromptSet {
    filter: PromptSpec,
    class: PromptSpec,
    headline: PromptSpec,
    decision: PromptSpec,
}

impl PromptSet {
    pub fn defaults() -> Result<Self, NewsCheckError> {
        Ok(Self {
            filter: PromptSpec::new(PromptKind::Filter, FILTER_TEMPLATE)?,
            class: PromptSpec::new(PromptKind::Class, CLASS_TEMPLATE)?,
            headline: PromptSpec::new(PromptKind::Headline, HEADLINE_TEMPLATE)?,
            decision: PromptSpec::new(PromptKind::Decision, DECISION_TEMPLATE)?,
        })
    }

    /// Defaults, with any override files from `config` loaded and validated.
    pub fn load(config: &PromptsConfig) -> Result<Self, NewsCheckError> {
        let mut set = Self::defaults()?;
        for (kind, path) in [
            (PromptKind::Filter, &config.filter),
            (PromptKind::Class, &config.class),
            (PromptKind::Headline, &config.headline),
            (PromptKind::Decision, &config.decision),
        ] {
            if let Some(path) = path {
                set = set.with_override(kind, load_template(kind, path)?)?;
            }
        }
        Ok(set)
    }

    pub fn with_override(mut self, kind: PromptKind, template: impl Into<String>) -> Result<Self, NewsCheckError> {
        let spec = PromptSpec::new(kind, template)?;
        match kind {
            PromptKind::Filter => self.filter = spec,
            PromptKind::Class => self.class = spec,
            PromptKind::Headline => self.headline = spec,
            PromptKind::Decision => self.decision = spec,
        }
        Ok(self)
    }

    pub fn get(&self, kind: PromptKind) -> &PromptSpec {
        match kind {
            PromptKind::Filter => &self.filter,
            PromptKind::Class => &self.class,
            PromptKind::Headline => &self.headline,
            PromptKind::Decision => &self.decision,
        }
    }
}

/// Context entries as a numbered list for the prompts.
pub fn format_context(context: &ContextSet) -> String {
    if context.is_empty() {
        return "(no entries)".to_string();
    }
    context
        .entries()
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let mut block = format!("[{}] {}", i + 1, entry.text());
            if let Some(url) = &entry.url {
                block.push_str(&format!("\nSource: {url}"));
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn load_template(kind: PromptKind, path: &Path) -> Result<String, NewsCheckError> {
    std::fs::read_to_string(path).map_err(|e| NewsCheckError::Prompt {
        prompt: kind.name().to_string(),
        reason: format!("failed to read {}: {e}", path.display()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let set = PromptSet::defaults().unwrap();
        for kind in PromptKind::ALL {
            assert_eq!(set.get(kind).kind(), kind);
        }
    }

    #[test]
    fn decision_template_keeps_priority_order() {
        let template = PromptKind::Decision.default_template();
        let order = ["{{filtered_context}}", "{{probability}}", "{{alignment}}", "{{times}}"];
        let positions: Vec<usize> = order
            .iter()
            .map(|slot| template.rfind(slot).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn schemas_are_closed_objects() {
        for kind in PromptKind::ALL {
            let schema = kind.response_schema();
            assert_eq!(schema["type"], "object", "{kind}");
            assert_eq!(schema["additionalProperties"], false, "{kind}");
        }
        let filter = PromptKind::Filter.response_schema();
        assert!(filter["properties"].get("times").is_some());
    }

    #[test]
    fn override_with_unknown_slot_is_rejected() {
        let err = PromptSet::defaults()
            .unwrap()
            .with_override(PromptKind::Class, "Titular: {{headline}} en {{region}}")
            .unwrap_err();
        assert!(matches!(err, NewsCheckError::Prompt { .. }));
    }

    #[test]
    fn override_missing_a_slot_is_rejected() {
        let err = PromptSet::defaults()
            .unwrap()
            .with_override(PromptKind::Filter, "Cuenta {{headline}}")
            .unwrap_err();
        assert!(err.to_string().contains("context"));
    }

    #[test]
    fn load_reads_override_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Clasifica este titular: {{{{headline}}}}").unwrap();
        let config = PromptsConfig {
            class: Some(file.path().to_path_buf()),
            ..PromptsConfig::default()
        };
        let set = PromptSet::load(&config).unwrap();
        assert_eq!(set.get(PromptKind::Class).template(), "Clasifica este titular: {{headline}}");
        assert_eq!(
            set.get(PromptKind::Filter).template(),
            PromptKind::Filter.default_template()
        );
    }

    #[test]
    fn missing_override_file_is_a_prompt_error() {
        let config = PromptsConfig {
            decision: Some("/nonexistent/decision.txt".into()),
            ..PromptsConfig::default()
        };
        assert!(matches!(
            PromptSet::load(&config),
            Err(NewsCheckError::Prompt { .. })
        ));
    }

    #[test]
    fn context_is_numbered_with_sources() {
        use newscheck_common::ContextEntry;

        let context = ContextSet::new(vec![
            ContextEntry::new("Uno", "primero").with_url("https://a.example"),
            ContextEntry::new("Dos", ""),
        ]);
        assert_eq!(
            format_context(&context),
            "[1] Uno\nprimero\nSource: https://a.example\n\n[2] Dos"
        );
        assert_eq!(format_context(&ContextSet::empty()), "(no entries)");
    }

    #[test]
    fn render_fills_every_slot() {
        let set = PromptSet::defaults().unwrap();
        let text = set
            .get(PromptKind::Headline)
            .render(&HashMap::from([("headline", "Titular"), ("news", "Cuerpo")]))
            .unwrap();
        assert!(text.contains("Titular"));
        assert!(text.contains("Cuerpo"));
        assert!(!text.contains("{{"));
    }
}
