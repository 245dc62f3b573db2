use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::NewsCheckError;

/// TOML-backed configuration loaded from disk. Every section has defaults,
/// so an empty file (or no file) yields a working configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub models: ModelsConfig,
    pub pipeline: PipelineConfig,
    pub prompts: PromptsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelsConfig {
    /// Chat model used by every agent.
    pub agent_model: String,
    /// Directory holding the topic model and vocabulary exports.
    pub model_dir: PathBuf,
    pub topic_model: PathBuf,
    pub dictionary: PathBuf,
    pub classifier: ClassifierConfig,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            agent_model: "gpt-4o-mini".to_string(),
            model_dir: PathBuf::from("models"),
            topic_model: PathBuf::from("lda_model.json"),
            dictionary: PathBuf::from("dictionary.json"),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl ModelsConfig {
    pub fn topic_model_path(&self) -> PathBuf {
        self.model_dir.join(&self.topic_model)
    }

    pub fn dictionary_path(&self) -> PathBuf {
        self.model_dir.join(&self.dictionary)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Object-store id of the exported classifier weights.
    pub content_id: String,
    /// Local cache location; the download is skipped when this file exists.
    pub cache_path: PathBuf,
    /// Download URL; `{content_id}` is substituted.
    pub download_url: String,
    /// Optional hex SHA-256 of the weights file.
    pub sha256: Option<String>,
    pub domain_count: u32,
    pub default_domain: u32,
    /// Maximum number of tokens fed to the classifier.
    pub max_len: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            content_id: "17u8fXwxm5JVWqEJwdcxzea2LhVl0KR5m".to_string(),
            cache_path: PathBuf::from("models/model_10_experts_20_epoch_best.json"),
            download_url: "https://drive.google.com/uc?export=download&id={content_id}"
                .to_string(),
            sha256: None,
            domain_count: 11,
            default_domain: 0,
            max_len: 250,
        }
    }
}

impl ClassifierConfig {
    pub fn resolved_download_url(&self) -> String {
        self.download_url.replace("{content_id}", &self.content_id)
    }
}

/// How the corroboration count is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorroborationMode {
    /// Ask the filter agent.
    #[default]
    Agent,
    /// Count locally with the configured match policy.
    Literal,
}

/// What "the headline is found in an entry" means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Case-sensitive substring containment.
    #[default]
    Substring,
    /// Case-sensitive containment delimited by non-alphanumeric characters.
    WordBoundary,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub agent_timeout_secs: u64,
    pub inference_timeout_secs: u64,
    pub retrieval_timeout_secs: u64,
    pub download_timeout_secs: u64,
    /// Number of search results requested as context.
    pub search_results: usize,
    pub corroboration_mode: CorroborationMode,
    pub match_policy: MatchPolicy,
    /// Use the dominant topic as the classifier domain when the article has none.
    ///
    /// The topic id is passed through unchanged, so this only makes sense when
    /// the topic model was trained with topics numbered like the classifier's
    /// domains. Ids outside the domain range fall back to `default_domain`.
    pub domain_from_topic: bool,
    /// Language of the verdict reasoning.
    pub verdict_language: String,
    /// Tell the verdict agent which inputs are unavailable.
    pub flag_degraded_inputs: bool,
    /// Byte budget for article and context text inside prompts.
    pub max_prompt_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            agent_timeout_secs: 60,
            inference_timeout_secs: 30,
            retrieval_timeout_secs: 30,
            download_timeout_secs: 600,
            search_results: 10,
            corroboration_mode: CorroborationMode::default(),
            match_policy: MatchPolicy::default(),
            domain_from_topic: false,
            verdict_language: "Spanish".to_string(),
            flag_degraded_inputs: true,
            max_prompt_bytes: 12_000,
        }
    }
}

impl PipelineConfig {
    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_timeout_secs)
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_secs)
    }

    pub fn retrieval_timeout(&self) -> Duration {
        Duration::from_secs(self.retrieval_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

/// Optional operator overrides for the agent templates, one file per agent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PromptsConfig {
    pub filter: Option<PathBuf>,
    pub class: Option<PathBuf>,
    pub headline: Option<PathBuf>,
    pub decision: Option<PathBuf>,
}

impl FileConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml(content: &str) -> Result<Self, NewsCheckError> {
        let config: FileConfig = toml::from_str(content)
            .map_err(|e| NewsCheckError::Config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, NewsCheckError> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    NewsCheckError::Config(format!(
                        "failed to read config file {}: {e}",
                        path.display()
                    ))
                })?;
                Self::from_toml(&content)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), NewsCheckError> {
        let classifier = &self.models.classifier;
        if classifier.domain_count == 0 {
            return Err(NewsCheckError::Config(
                "models.classifier.domain_count must be positive".into(),
            ));
        }
        if classifier.default_domain >= classifier.domain_count {
            return Err(NewsCheckError::Config(format!(
                "models.classifier.default_domain {} is outside 0..{}",
                classifier.default_domain, classifier.domain_count
            )));
        }
        if classifier.max_len == 0 {
            return Err(NewsCheckError::Config(
                "models.classifier.max_len must be positive".into(),
            ));
        }
        let pipeline = &self.pipeline;
        for (name, secs) in [
            ("agent_timeout_secs", pipeline.agent_timeout_secs),
            ("inference_timeout_secs", pipeline.inference_timeout_secs),
            ("retrieval_timeout_secs", pipeline.retrieval_timeout_secs),
            ("download_timeout_secs", pipeline.download_timeout_secs),
        ] {
            if secs == 0 {
                return Err(NewsCheckError::Config(format!(
                    "pipeline.{name} must be positive"
                )));
            }
        }
        if pipeline.search_results == 0 {
            return Err(NewsCheckError::Config(
                "pipeline.search_results must be positive".into(),
            ));
        }
        if pipeline.verdict_language.trim().is_empty() {
            return Err(NewsCheckError::Config(
                "pipeline.verdict_language must not be empty".into(),
            ));
        }
        Ok(())
    }
}
