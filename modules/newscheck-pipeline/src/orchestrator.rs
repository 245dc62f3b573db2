use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, info_span, warn, Instrument};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use ai_client::OpenAi;
use newscheck_agents::{
    fallback_verdict, AgentRunner, AlignmentChecker, ContextRetriever, CorroborationCounter,
    DecisionInputs, LanguageModel, NoopRetriever, PromptSet, SerperRetriever, SubjectClassifier,
    VerdictAggregator,
};
use newscheck_common::file_config::PipelineConfig;
use newscheck_common::{
    AppConfig, Article, ContextSet, FileConfig, NewsCheckError, Signal, TopicResult,
    VerdictSource, VeracitySignal,
};
use newscheck_models::ModelContext;

use crate::stage::{PipelineStage, StageTracker};
use crate::{PipelineError, PipelineReport};

/// Long-lived collaborators of the pipeline.
#[derive(Clone, TypedBuilder)]
pub struct PipelineDeps {
    pub models: ModelContext,
    pub model: Arc<dyn LanguageModel>,
    pub retriever: Arc<dyn ContextRetriever>,
    pub prompts: Arc<PromptSet>,
    #[builder(default)]
    pub config: PipelineConfig,
}

/// Runs one article through preprocessing, scoring, retrieval, the agents
/// and the verdict.
pub struct Pipeline {
    models: ModelContext,
    retriever: Arc<dyn ContextRetriever>,
    counter: CorroborationCounter,
    subject: SubjectClassifier,
    alignment: AlignmentChecker,
    aggregator: VerdictAggregator,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(deps: PipelineDeps) -> Self {
        let config = deps.config;
        let runner = AgentRunner::new(deps.model, deps.prompts, config.agent_timeout())
            .with_max_prompt_bytes(config.max_prompt_bytes);

        Self {
            models: deps.models,
            retriever: deps.retriever,
            counter: CorroborationCounter::new(
                runner.clone(),
                config.corroboration_mode,
                config.match_policy,
            ),
            subject: SubjectClassifier::new(runner.clone()),
            alignment: AlignmentChecker::new(runner.clone()),
            aggregator: VerdictAggregator::new(runner, config.verdict_language.clone())
                .with_degraded_flagging(config.flag_degraded_inputs),
            config,
        }
    }

    /// Production wiring: models from disk and cache, OpenAI agents, Serper
    /// search when a key is configured.
    pub async fn from_config(file: &FileConfig, app: &AppConfig) -> Result<Self, PipelineError> {
        let api_key = app.require_openai_key().map_err(NewsCheckError::from)?;
        let prompts = PromptSet::load(&file.prompts)?;
        let models = ModelContext::load(file).await?;

        let mut openai = OpenAi::new(api_key, &file.models.agent_model)
            .with_timeout(file.pipeline.agent_timeout());
        if let Some(url) = &app.openai_base_url {
            openai = openai.with_base_url(url);
        }

        let retriever: Arc<dyn ContextRetriever> = match &app.serper_api_key {
            Some(key) => {
                info!("Serper search enabled");
                let serper = SerperRetriever::new(key, file.pipeline.retrieval_timeout())
                    .map_err(NewsCheckError::from)?;
                Arc::new(serper)
            }
            None => {
                warn!("No SERPER_API_KEY set, context retrieval disabled");
                Arc::new(NoopRetriever)
            }
        };

        Ok(Self::new(
            PipelineDeps::builder()
                .models(models)
                .model(Arc::new(openai))
                .retriever(retriever)
                .prompts(Arc::new(prompts))
                .config(file.pipeline.clone())
                .build(),
        ))
    }

    pub fn infer_topic(&self, text: &str) -> TopicResult {
        self.models.topic.infer_topic(text)
    }

    pub fn score(&self, text: &str, domain: Option<u32>) -> VeracitySignal {
        self.models.veracity.score(text, domain)
    }

    pub async fn run_pipeline(&self, article: &Article) -> Result<PipelineReport, PipelineError> {
        let run_id = Uuid::new_v4();
        self.run(article, run_id)
            .instrument(info_span!("pipeline_run", %run_id))
            .await
    }

    async fn run(&self, article: &Article, run_id: Uuid) -> Result<PipelineReport, PipelineError> {
        let started_at = Utc::now();
        let mut stages = StageTracker::new(run_id);
        info!(headline = %article.headline, domain = ?article.domain, "Pipeline started");

        // --- Preprocess ---
        // Topic comes from the body alone; veracity and the verdict see the full text.
        let text = article.full_text();
        let tokens = {
            let topic = self.models.topic.clone();
            let body = article.body.clone();
            blocking("preprocessing", self.config.inference_timeout(), move || {
                topic.preprocessor().normalize(&body)
            })
            .await
        };
        stages.advance(PipelineStage::Preprocessed)?;

        // --- Topic and veracity ---
        let (topic, veracity) = if self.config.domain_from_topic && article.domain.is_none() {
            let topic = self.topic_signal(tokens).await;
            // Topic ids double as domain ids here, see `PipelineConfig::domain_from_topic`.
            let domain = topic.value().map(|t| t.topic_id as u32);
            let veracity = self.veracity_signal(text.clone(), domain).await;
            (topic, veracity)
        } else {
            tokio::join!(
                self.topic_signal(tokens),
                self.veracity_signal(text.clone(), article.domain)
            )
        };
        stages.advance(PipelineStage::Scored)?;

        // --- Context ---
        let context = self.retrieve(&article.headline).await;
        stages.advance(PipelineStage::ContextRetrieved)?;

        // --- Agents ---
        let corroboration = async {
            match &context {
                Signal::Computed { value } => self.counter.count(&article.headline, value).await,
                Signal::Degraded { reason } => {
                    Signal::degraded(format!("context unavailable: {reason}"))
                }
            }
        };
        let (alignment, corroboration, subject) = tokio::join!(
            self.alignment.check(&article.headline, &article.body),
            corroboration,
            self.subject.classify(&article.headline),
        );
        stages.advance(PipelineStage::SignalsComplete)?;

        // --- Verdict ---
        let inputs = DecisionInputs {
            article_text: &text,
            context: &context,
            veracity: &veracity,
            alignment: &alignment,
            corroboration: &corroboration,
        };
        let (verdict, verdict_source) = match self.aggregator.decide(&inputs).await {
            Ok(verdict) => (verdict, VerdictSource::Agent),
            Err(e) => {
                warn!(error = %e, "Decision agent unavailable, using fallback verdict");
                (
                    fallback_verdict(&inputs, self.aggregator.language()),
                    VerdictSource::Fallback,
                )
            }
        };
        stages.advance(PipelineStage::Verdicted)?;

        let degraded: Vec<String> = [
            ("topic", topic.is_degraded()),
            ("veracity", veracity.is_degraded()),
            ("context", context.is_degraded()),
            ("subject", subject.is_degraded()),
            ("alignment", alignment.is_degraded()),
            ("corroboration", corroboration.is_degraded()),
        ]
        .into_iter()
        .filter_map(|(name, is_degraded)| is_degraded.then(|| name.to_string()))
        .collect();

        stages.advance(PipelineStage::Done)?;
        info!(
            category = %verdict.category,
            source = ?verdict_source,
            degraded = ?degraded,
            "Pipeline complete"
        );

        Ok(PipelineReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            headline: article.headline.clone(),
            domain: article.domain,
            stages: stages.trace().to_vec(),
            topic,
            veracity,
            context,
            subject,
            alignment,
            corroboration,
            degraded,
            verdict,
            verdict_source,
        })
    }

    async fn topic_signal(&self, tokens: Signal<Vec<String>>) -> Signal<TopicResult> {
        let tokens = match tokens {
            Signal::Computed { value } => value,
            Signal::Degraded { reason } => return Signal::degraded(reason),
        };
        let topic = self.models.topic.clone();
        blocking("topic inference", self.config.inference_timeout(), move || {
            topic.infer_tokens(&tokens)
        })
        .await
    }

    async fn veracity_signal(&self, text: String, domain: Option<u32>) -> Signal<VeracitySignal> {
        let veracity = self.models.veracity.clone();
        blocking("veracity inference", self.config.inference_timeout(), move || {
            veracity.score(&text, domain)
        })
        .await
    }

    async fn retrieve(&self, headline: &str) -> Signal<ContextSet> {
        let timeout = self.config.retrieval_timeout();
        let search = self.retriever.retrieve(headline, self.config.search_results);
        match tokio::time::timeout(timeout, search).await {
            Ok(Ok(context)) => {
                info!(entries = context.len(), "Context retrieved");
                Signal::computed(context)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Context retrieval failed");
                Signal::degraded(format!("context retrieval failed: {e:#}"))
            }
            Err(_) => {
                warn!(?timeout, "Context retrieval timed out");
                Signal::degraded(format!("context retrieval timed out after {timeout:?}"))
            }
        }
    }
}

/// Run CPU-bound model work on the blocking pool under a timeout.
async fn blocking<T, F>(what: &str, timeout: Duration, f: F) -> Signal<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(f)).await {
        Ok(Ok(value)) => Signal::computed(value),
        Ok(Err(e)) => {
            warn!(what, error = %e, "Model task failed");
            Signal::degraded(format!("{what} failed: {e}"))
        }
        Err(_) => {
            warn!(what, ?timeout, "Model task timed out");
            Signal::degraded(format!("{what} timed out after {timeout:?}"))
        }
    }
}
