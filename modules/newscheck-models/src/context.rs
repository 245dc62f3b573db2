use std::sync::Arc;

use tracing::info;

use newscheck_common::{FileConfig, NewsCheckError};

use crate::{
    ArtifactFetcher, ArtifactSpec, MdfendClassifier, TopicClassifier, VeracityModel, VeracityScorer,
};

/// Read-only model state shared by every pipeline run.
#[derive(Clone)]
pub struct ModelContext {
    pub topic: Arc<TopicClassifier>,
    pub veracity: Arc<VeracityScorer>,
}

impl ModelContext {
    pub fn new(topic: TopicClassifier, veracity: VeracityScorer) -> Self {
        Self {
            topic: Arc::new(topic),
            veracity: Arc::new(veracity),
        }
    }

    /// Load the topic model from disk and the classifier weights from cache,
    /// downloading them on first use. Any failure is fatal.
    pub async fn load(config: &FileConfig) -> Result<Self, NewsCheckError> {
        let models = config.models.clone();
        let topic = tokio::task::spawn_blocking(move || TopicClassifier::load(&models))
            .await
            .map_err(|e| NewsCheckError::model_unavailable("topic model", e))??;

        let classifier = &config.models.classifier;
        let fetcher = ArtifactFetcher::new(config.pipeline.download_timeout())?;
        let weights = fetcher
            .ensure_cached(&ArtifactSpec::classifier_weights(classifier))
            .await?;

        let max_len = classifier.max_len;
        let model = tokio::task::spawn_blocking(move || MdfendClassifier::load(&weights, max_len))
            .await
            .map_err(|e| NewsCheckError::model_unavailable("classifier", e))??;

        if model.domain_count() != classifier.domain_count {
            return Err(NewsCheckError::model_unavailable(
                "classifier",
                format!(
                    "weights cover {} domains, configuration expects {}",
                    model.domain_count(),
                    classifier.domain_count
                ),
            ));
        }

        let veracity = VeracityScorer::new(Arc::new(model), classifier.default_domain)?;
        info!(
            topics = topic.num_topics(),
            domains = veracity.domain_count(),
            "Models ready"
        );
        Ok(Self::new(topic, veracity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[tokio::test]
    async fn loads_from_cached_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig {
            models: fixtures::write_model_dir(dir.path()).unwrap(),
            ..FileConfig::default()
        };

        let models = ModelContext::load(&config).await.unwrap();
        assert_eq!(models.topic.infer_topic("inflación").topic_id, 1);
        let signal = models.veracity.score("confirma oficial", Some(4));
        assert!(signal.probability > 0.5);
        assert!(!signal.domain_substituted);
    }

    #[tokio::test]
    async fn domain_count_mismatch_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FileConfig {
            models: fixtures::write_model_dir(dir.path()).unwrap(),
            ..FileConfig::default()
        };
        config.models.classifier.domain_count = 5;

        let err = ModelContext::load(&config).await.err().unwrap();
        assert!(err.to_string().contains("domains"));
    }

    #[tokio::test]
    async fn missing_weights_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FileConfig {
            models: fixtures::write_model_dir(dir.path()).unwrap(),
            ..FileConfig::default()
        };
        std::fs::remove_file(&config.models.classifier.cache_path).unwrap();
        config.models.classifier.download_url = "http://127.0.0.1:9/{content_id}".to_string();

        assert!(matches!(
            ModelContext::load(&config).await,
            Err(NewsCheckError::ModelUnavailable { .. })
        ));
    }

    #[test]
    fn fixture_classifier_has_eleven_domains() {
        let model = MdfendClassifier::from_json(&fixtures::classifier_json(), 10).unwrap();
        assert_eq!(model.domain_count(), 11);
    }
}
