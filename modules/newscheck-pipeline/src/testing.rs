// Test mocks for the pipeline.
//
// Three mocks matching the three external boundaries:
// - ScriptedModel (LanguageModel): PromptKind → canned reply, from the agents crate
// - FixedVeracity (VeracityModel): constant probability, records the domains it saw
// - StaticRetriever (ContextRetriever): canned context, failure or latency
//
// Plus helpers that assemble a Pipeline around them with the fixture topic model.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use newscheck_agents::{ContextRetriever, PromptSet};
use newscheck_common::file_config::PipelineConfig;
use newscheck_common::{ContextEntry, ContextSet};
use newscheck_models::{fixtures, ModelContext, VeracityModel, VeracityScorer};

use crate::{Pipeline, PipelineDeps};

pub use newscheck_agents::testing::ScriptedModel;

// ---------------------------------------------------------------------------
// FixedVeracity
// ---------------------------------------------------------------------------

/// Classifier that always answers `probability` over 11 domains.
pub struct FixedVeracity {
    probability: f32,
    seen_domains: Mutex<Vec<u32>>,
}

impl FixedVeracity {
    pub fn new(probability: f32) -> Self {
        Self {
            probability,
            seen_domains: Mutex::new(Vec::new()),
        }
    }

    pub fn seen_domains(&self) -> Vec<u32> {
        self.seen_domains.lock().unwrap().clone()
    }
}

impl VeracityModel for FixedVeracity {
    fn predict(&self, _text: &str, domain: u32) -> f32 {
        self.seen_domains.lock().unwrap().push(domain);
        self.probability
    }

    fn domain_count(&self) -> u32 {
        11
    }
}

// ---------------------------------------------------------------------------
// StaticRetriever
// ---------------------------------------------------------------------------

/// Returns the same context for every headline, or fails when built with
/// `failing()`.
pub struct StaticRetriever {
    context: Option<ContextSet>,
    error: String,
    delay: Option<Duration>,
}

impl StaticRetriever {
    pub fn new(context: ContextSet) -> Self {
        Self {
            context: Some(context),
            error: String::new(),
            delay: None,
        }
    }

    /// Snippets as context entries, each titled after its position.
    pub fn with_snippets(snippets: &[&str]) -> Self {
        Self::new(
            snippets
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    ContextEntry::new(format!("Fuente {}", i + 1), *s)
                        .with_url(format!("https://medio{}.example/noticia", i + 1))
                })
                .collect(),
        )
    }

    pub fn failing(error: &str) -> Self {
        Self {
            context: None,
            error: error.to_string(),
            delay: None,
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl ContextRetriever for StaticRetriever {
    async fn retrieve(&self, _headline: &str, max_results: usize) -> Result<ContextSet> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.context {
            Some(context) => Ok(context.entries().iter().take(max_results).cloned().collect()),
            None => anyhow::bail!("StaticRetriever: {}", self.error),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline helpers
// ---------------------------------------------------------------------------

/// Fixture topic model plus the given classifier.
pub fn test_models(veracity: Arc<FixedVeracity>) -> ModelContext {
    let scorer = VeracityScorer::new(veracity, 0).expect("default domain 0 exists");
    ModelContext::new(fixtures::topic_classifier(), scorer)
}

pub fn test_pipeline(
    model: Arc<ScriptedModel>,
    retriever: StaticRetriever,
    veracity: Arc<FixedVeracity>,
    config: PipelineConfig,
) -> Pipeline {
    Pipeline::new(
        PipelineDeps::builder()
            .models(test_models(veracity))
            .model(model)
            .retriever(Arc::new(retriever))
            .prompts(Arc::new(PromptSet::defaults().expect("default prompts are valid")))
            .config(config)
            .build(),
    )
}

/// Short timeouts so failure paths finish quickly.
pub fn fast_config() -> PipelineConfig {
    PipelineConfig {
        agent_timeout_secs: 2,
        inference_timeout_secs: 5,
        retrieval_timeout_secs: 1,
        ..PipelineConfig::default()
    }
}
