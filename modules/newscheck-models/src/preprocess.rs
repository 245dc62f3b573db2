use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};

use crate::stopwords;

fn non_letters() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[^a-zA-ZáéíóúüÁÉÍÓÚÜÑñ\s]").expect("static regex is valid")
    })
}

fn is_punctuation(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_punctuation())
}

/// Turns Spanish news text into the stemmed token stream the topic model was
/// trained on.
pub struct TextPreprocessor {
    stopwords: HashSet<&'static str>,
    stemmer: Stemmer,
}

impl Default for TextPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextPreprocessor {
    pub fn new() -> Self {
        Self {
            stopwords: stopwords::SPANISH.iter().copied().collect(),
            stemmer: Stemmer::create(Algorithm::Spanish),
        }
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    /// Strip non-letters, tokenize, lowercase, drop punctuation and stopwords,
    /// then stem. Token order follows the input.
    pub fn normalize(&self, text: &str) -> Vec<String> {
        let letters_only = non_letters().replace_all(text, "");

        letters_only
            .split_whitespace()
            .filter(|token| !is_punctuation(token))
            .map(str::to_lowercase)
            .filter(|token| !self.is_stopword(token))
            .map(|token| self.stemmer.stem(&token).into_owned())
            // a stem can collapse onto a stopword ("unas" style endings)
            .filter(|stem| !stem.is_empty() && !self.is_stopword(stem))
            .collect()
    }
}
