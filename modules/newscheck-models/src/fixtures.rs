//! Small, hand-built model artifacts for tests.
//!
//! The topic fixture has two topics: political vocabulary
//! ([`POLITICS_WORDS`]) and economic vocabulary ([`ECONOMY_WORDS`]). The
//! classifier fixture scores credible vocabulary above 0.5 and dubious
//! vocabulary below it, for every domain.

use std::collections::HashMap;
use std::path::Path;

use serde_json::json;

use newscheck_common::file_config::{ClassifierConfig, ModelsConfig};

use crate::{Dictionary, LdaModel, TextPreprocessor, TopicClassifier};

pub const POLITICS_WORDS: [&str; 3] = ["gobierno", "elecciones", "congreso"];
pub const ECONOMY_WORDS: [&str; 3] = ["inflación", "salarios", "mercados"];

fn lambda() -> Vec<Vec<f64>> {
    vec![
        vec![50.0, 50.0, 50.0, 0.1, 0.1, 0.1],
        vec![0.1, 0.1, 0.1, 50.0, 50.0, 50.0],
    ]
}

pub fn two_topic_lda() -> LdaModel {
    LdaModel::from_parameters(vec![0.5, 0.5], lambda()).expect("fixture parameters are valid")
}

fn token2id() -> HashMap<String, u32> {
    let pre = TextPreprocessor::new();
    POLITICS_WORDS
        .iter()
        .chain(ECONOMY_WORDS.iter())
        .enumerate()
        .map(|(id, word)| {
            let stem = pre
                .normalize(word)
                .into_iter()
                .next()
                .expect("fixture words are not stopwords");
            (stem, id as u32)
        })
        .collect()
}

/// Stems of the fixture vocabulary mapped to ids 0..6 (politics first).
pub fn dictionary() -> Dictionary {
    Dictionary::new(token2id())
}

pub fn topic_classifier() -> TopicClassifier {
    TopicClassifier::from_parts(TextPreprocessor::new(), dictionary(), two_topic_lda())
        .expect("fixture dictionary fits the fixture model")
}

pub fn lda_json() -> String {
    json!({
        "num_topics": 2,
        "num_terms": 6,
        "alpha": [0.5, 0.5],
        "lambda": lambda(),
    })
    .to_string()
}

pub fn dictionary_json() -> String {
    json!({ "token2id": token2id() }).to_string()
}

/// Classifier weights over an 11-domain, two-expert network with a
/// two-dimensional embedding: credible words point along the first axis,
/// dubious words along the second.
pub fn classifier_json() -> String {
    let vocab = json!({
        "[UNK]": 0,
        "confirma": 1,
        "oficial": 2,
        "fuentes": 3,
        "bulo": 4,
        "viral": 5,
        "increíble": 6,
    });
    let embeddings = vec![
        vec![0.0, 0.0],
        vec![1.0, 0.0],
        vec![1.0, 0.0],
        vec![1.0, 0.0],
        vec![0.0, 1.0],
        vec![0.0, 1.0],
        vec![0.0, 1.0],
    ];
    let domain_embeddings: Vec<Vec<f64>> = (0..11).map(|d| vec![d as f64 * 0.1]).collect();

    json!({
        "vocab": vocab,
        "unk_id": 0,
        "lowercase": true,
        "embeddings": embeddings,
        "domain_embeddings": domain_embeddings,
        "experts": [
            { "weights": [[1.0, 0.0], [0.0, 1.0]], "bias": [0.0, 0.0] },
            { "weights": [[2.0, 0.0], [0.0, 2.0]], "bias": [0.0, 0.0] },
        ],
        "gate": { "weights": [[1.0, 0.0, 0.0], [0.0, 0.0, 0.0]], "bias": [0.0, 0.0] },
        "classifier": { "weights": [[4.0, -4.0]], "bias": [0.0] },
    })
    .to_string()
}

/// Write the topic model, dictionary and classifier weights into `dir` and
/// return a models section pointing at them.
pub fn write_model_dir(dir: &Path) -> std::io::Result<ModelsConfig> {
    std::fs::write(dir.join("lda_model.json"), lda_json())?;
    std::fs::write(dir.join("dictionary.json"), dictionary_json())?;
    let cache_path = dir.join("classifier.json");
    std::fs::write(&cache_path, classifier_json())?;

    Ok(ModelsConfig {
        model_dir: dir.to_path_buf(),
        classifier: ClassifierConfig {
            cache_path,
            // never contacted while the cache file exists
            download_url: "http://127.0.0.1:9/{content_id}".to_string(),
            ..ClassifierConfig::default()
        },
        ..ModelsConfig::default()
    })
}
