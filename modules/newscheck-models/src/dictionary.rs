use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;

use newscheck_common::NewsCheckError;

/// Token → id mapping exported from the training corpus.
#[derive(Debug, Clone, Deserialize)]
pub struct Dictionary {
    token2id: HashMap<String, u32>,
}

impl Dictionary {
    pub fn new(token2id: HashMap<String, u32>) -> Self {
        Self { token2id }
    }

    pub fn load(path: &Path) -> Result<Self, NewsCheckError> {
        let artifact = path.display().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|e| NewsCheckError::model_unavailable(&artifact, e))?;
        let dictionary: Dictionary = serde_json::from_str(&content)
            .map_err(|e| NewsCheckError::model_unavailable(&artifact, e))?;
        if dictionary.token2id.is_empty() {
            return Err(NewsCheckError::model_unavailable(artifact, "dictionary is empty"));
        }
        Ok(dictionary)
    }

    pub fn len(&self) -> usize {
        self.token2id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.token2id.is_empty()
    }

    pub fn max_id(&self) -> Option<u32> {
        self.token2id.values().copied().max()
    }

    pub fn id(&self, token: &str) -> Option<u32> {
        self.token2id.get(token).copied()
    }

    /// Sparse `(token_id, count)` vector sorted by id. Unknown tokens are dropped.
    pub fn doc2bow<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<(u32, u32)> {
        let mut counts: BTreeMap<u32, u32> = BTreeMap::new();
        for token in tokens {
            if let Some(id) = self.id(token.as_ref()) {
                *counts.entry(id).or_default() += 1;
            }
        }
        counts.into_iter().collect()
    }
}
