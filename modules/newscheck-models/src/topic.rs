use newscheck_common::file_config::ModelsConfig;
use newscheck_common::{NewsCheckError, TopicResult};
use tracing::{debug, info};

use crate::{Dictionary, LdaModel, TextPreprocessor};

/// Dominant-topic inference: normalize, map to bag-of-words, run LDA.
pub struct TopicClassifier {
    preprocessor: TextPreprocessor,
    dictionary: Dictionary,
    model: LdaModel,
}

impl TopicClassifier {
    /// Load the dictionary and topic model exports named in `config`.
    pub fn load(config: &ModelsConfig) -> Result<Self, NewsCheckError> {
        let dictionary = Dictionary::load(&config.dictionary_path())?;
        let model = LdaModel::load(&config.topic_model_path())?;
        info!(
            topics = model.num_topics(),
            terms = model.num_terms(),
            vocabulary = dictionary.len(),
            "Topic model loaded"
        );
        Self::from_parts(TextPreprocessor::new(), dictionary, model)
    }

    pub fn from_parts(
        preprocessor: TextPreprocessor,
        dictionary: Dictionary,
        model: LdaModel,
    ) -> Result<Self, NewsCheckError> {
        if let Some(max_id) = dictionary.max_id() {
            if max_id as usize >= model.num_terms() {
                return Err(NewsCheckError::model_unavailable(
                    "dictionary",
                    format!(
                        "token id {max_id} exceeds the topic model's {} terms",
                        model.num_terms()
                    ),
                ));
            }
        }
        Ok(Self {
            preprocessor,
            dictionary,
            model,
        })
    }

    pub fn preprocessor(&self) -> &TextPreprocessor {
        &self.preprocessor
    }

    pub fn num_topics(&self) -> usize {
        self.model.num_topics()
    }

    pub fn infer_topic(&self, text: &str) -> TopicResult {
        let tokens = self.preprocessor.normalize(text);
        self.infer_tokens(&tokens)
    }

    /// Dominant topic for already-normalized tokens. A document with no known
    /// tokens gets the model's prior.
    pub fn infer_tokens(&self, tokens: &[String]) -> TopicResult {
        let bow = self.dictionary.doc2bow(tokens);
        let result = self.model.dominant_topic(&bow);
        debug!(
            tokens = tokens.len(),
            known = bow.len(),
            topic = result.topic_id,
            probability = result.probability,
            "Topic inferred"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use std::collections::HashMap;

    #[test]
    fn political_text_maps_to_politics_topic() {
        let classifier = fixtures::topic_classifier();
        let result = classifier.infer_topic("El gobierno convoca elecciones y el congreso debate");
        assert_eq!(result.topic_id, 0);
        assert!(result.probability > 0.5);
    }

    #[test]
    fn economic_text_maps_to_economy_topic() {
        let classifier = fixtures::topic_classifier();
        let result = classifier.infer_topic("La inflación frena los salarios y los mercados caen");
        assert_eq!(result.topic_id, 1);
        assert!(result.probability <= 1.0);
    }

    #[test]
    fn empty_text_still_yields_a_topic() {
        let classifier = fixtures::topic_classifier();
        let result = classifier.infer_topic("");
        assert!(result.topic_id < classifier.num_topics());
        assert!((0.0..=1.0).contains(&result.probability));
    }

    #[test]
    fn same_text_same_topic() {
        let classifier = fixtures::topic_classifier();
        let text = "Los salarios del gobierno";
        assert_eq!(classifier.infer_topic(text), classifier.infer_topic(text));
    }

    #[test]
    fn dictionary_must_fit_model() {
        let dictionary = Dictionary::new(HashMap::from([("gobiern".to_string(), 40)]));
        let err = TopicClassifier::from_parts(
            TextPreprocessor::new(),
            dictionary,
            fixtures::two_topic_lda(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, NewsCheckError::ModelUnavailable { .. }));
    }

    #[test]
    fn load_reads_exports_from_model_dir() {
        let dir = tempfile::tempdir().unwrap();
        let models = fixtures::write_model_dir(dir.path()).unwrap();
        let classifier = TopicClassifier::load(&models).unwrap();
        assert_eq!(classifier.num_topics(), 2);
        assert_eq!(classifier.infer_topic("congreso").topic_id, 0);
    }

    #[test]
    fn missing_exports_are_model_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let models = ModelsConfig {
            model_dir: dir.path().to_path_buf(),
            ..ModelsConfig::default()
        };
        assert!(matches!(
            TopicClassifier::load(&models),
            Err(NewsCheckError::ModelUnavailable { .. })
        ));
    }
}
