use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use newscheck_common::{NewsCheckError, VeracitySignal};

// ---------------------------------------------------------------------------
// VeracityModel: the classifier boundary
// ---------------------------------------------------------------------------

/// A pretrained multi-domain classifier. Implementations are immutable and
/// safe to share across threads.
pub trait VeracityModel: Send + Sync {
    /// Probability that `text` is authentic news, conditioned on `domain`.
    /// `domain` is always below `domain_count()`.
    fn predict(&self, text: &str, domain: u32) -> f32;

    fn domain_count(&self) -> u32;
}

// ---------------------------------------------------------------------------
// VeracityScorer
// ---------------------------------------------------------------------------

/// Resolves the domain (substituting the default with a warning) and clamps
/// the classifier output.
#[derive(Clone)]
pub struct VeracityScorer {
    model: Arc<dyn VeracityModel>,
    default_domain: u32,
}

impl VeracityScorer {
    pub fn new(model: Arc<dyn VeracityModel>, default_domain: u32) -> Result<Self, NewsCheckError> {
        if default_domain >= model.domain_count() {
            return Err(NewsCheckError::Config(format!(
                "default domain {default_domain} is outside 0..{}",
                model.domain_count()
            )));
        }
        Ok(Self {
            model,
            default_domain,
        })
    }

    pub fn domain_count(&self) -> u32 {
        self.model.domain_count()
    }

    pub fn score(&self, text: &str, domain: Option<u32>) -> VeracitySignal {
        let (domain, domain_substituted) = match domain {
            Some(d) if d < self.model.domain_count() => (d, false),
            Some(d) => {
                warn!(
                    domain = d,
                    domain_count = self.model.domain_count(),
                    default_domain = self.default_domain,
                    "News domain out of range; using default domain. Classifier accuracy is reduced."
                );
                (self.default_domain, true)
            }
            None => {
                warn!(
                    default_domain = self.default_domain,
                    "The news domain was not identified; using default domain. Classifier accuracy is reduced."
                );
                (self.default_domain, true)
            }
        };

        let raw = self.model.predict(text, domain);
        let probability = if raw.is_nan() {
            warn!(domain, "Classifier returned NaN; reporting 0.5");
            0.5
        } else {
            raw.clamp(0.0, 1.0)
        };

        debug!(domain, probability, "Veracity scored");

        VeracitySignal {
            probability,
            domain,
            domain_substituted,
        }
    }
}

// ---------------------------------------------------------------------------
// MdfendClassifier: domain-gated mixture of experts
// ---------------------------------------------------------------------------

fn token_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+|[^\w\s]").expect("static regex is valid"))
}

#[derive(Debug, Clone, Deserialize)]
struct DenseLayer {
    /// `out × in` weight matrix.
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

impl DenseLayer {
    fn input_dim(&self) -> usize {
        self.weights.first().map(Vec::len).unwrap_or(0)
    }

    fn output_dim(&self) -> usize {
        self.weights.len()
    }

    fn validate(&self, name: &str, input_dim: usize) -> Result<(), String> {
        if self.weights.is_empty() {
            return Err(format!("{name} has no outputs"));
        }
        if self.bias.len() != self.weights.len() {
            return Err(format!(
                "{name} bias has {} entries, expected {}",
                self.bias.len(),
                self.weights.len()
            ));
        }
        if self.weights.iter().any(|row| row.len() != input_dim) {
            return Err(format!("{name} rows must all have {input_dim} inputs"));
        }
        let finite = self
            .weights
            .iter()
            .flatten()
            .chain(&self.bias)
            .all(|w| w.is_finite());
        if !finite {
            return Err(format!("{name} contains non-finite weights"));
        }
        Ok(())
    }

    fn forward(&self, input: &[f32]) -> Vec<f32> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ClassifierExport {
    vocab: HashMap<String, u32>,
    unk_id: u32,
    #[serde(default)]
    lowercase: bool,
    /// `vocab_size × embedding_dim` token embeddings.
    embeddings: Vec<Vec<f32>>,
    /// `domain_count × domain_dim` domain embeddings.
    domain_embeddings: Vec<Vec<f32>>,
    experts: Vec<DenseLayer>,
    /// Maps `[domain_embedding ; text_embedding]` to one logit per expert.
    gate: DenseLayer,
    /// Maps the mixed expert representation to a single authenticity logit.
    classifier: DenseLayer,
}

/// Multi-domain fake-news classifier: mean-pooled token embeddings feed a set
/// of experts whose outputs are mixed by a gate conditioned on the domain.
pub struct MdfendClassifier {
    export: ClassifierExport,
    max_len: usize,
}

impl MdfendClassifier {
    pub fn load(path: &Path, max_len: usize) -> Result<Self, NewsCheckError> {
        let artifact = path.display().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|e| NewsCheckError::model_unavailable(&artifact, e))?;
        Self::from_json(&content, max_len)
            .map_err(|e| match e {
                NewsCheckError::ModelUnavailable { reason, .. } => {
                    NewsCheckError::model_unavailable(artifact, reason)
                }
                other => other,
            })
    }

    pub fn from_json(json: &str, max_len: usize) -> Result<Self, NewsCheckError> {
        let export: ClassifierExport = serde_json::from_str(json)
            .map_err(|e| NewsCheckError::model_unavailable("classifier", e))?;
        validate(&export).map_err(|reason| NewsCheckError::model_unavailable("classifier", reason))?;
        Ok(Self {
            export,
            max_len: max_len.max(1),
        })
    }

    fn embedding_dim(&self) -> usize {
        self.export.embeddings[0].len()
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let dim = self.embedding_dim();
        let mut pooled = vec![0.0f32; dim];
        let mut n = 0usize;

        for m in token_pattern().find_iter(text).take(self.max_len) {
            let id = if self.export.lowercase {
                self.export.vocab.get(&m.as_str().to_lowercase())
            } else {
                self.export.vocab.get(m.as_str())
            }
            .copied()
            .unwrap_or(self.export.unk_id);

            for (acc, v) in pooled.iter_mut().zip(&self.export.embeddings[id as usize]) {
                *acc += v;
            }
            n += 1;
        }

        if n > 0 {
            pooled.iter_mut().for_each(|v| *v /= n as f32);
        }
        pooled
    }
}

fn validate(export: &ClassifierExport) -> Result<(), String> {
    let vocab_size = export.embeddings.len();
    if vocab_size == 0 {
        return Err("embedding table is empty".to_string());
    }
    let dim = export.embeddings[0].len();
    if dim == 0 || export.embeddings.iter().any(|row| row.len() != dim) {
        return Err("embedding rows must share a positive dimension".to_string());
    }
    if export.embeddings.iter().flatten().any(|v| !v.is_finite()) {
        return Err("embedding table contains non-finite values".to_string());
    }
    if export.unk_id as usize >= vocab_size {
        return Err(format!("unk_id {} outside vocabulary of {vocab_size}", export.unk_id));
    }
    if let Some((token, id)) = export.vocab.iter().find(|(_, id)| **id as usize >= vocab_size) {
        return Err(format!("token {token:?} maps to id {id} outside vocabulary of {vocab_size}"));
    }

    let domain_dim = export.domain_embeddings.first().map(Vec::len).unwrap_or(0);
    if export.domain_embeddings.is_empty()
        || domain_dim == 0
        || export.domain_embeddings.iter().any(|row| row.len() != domain_dim)
    {
        return Err("domain embeddings must be a non-empty rectangular table".to_string());
    }
    if export.domain_embeddings.iter().flatten().any(|v| !v.is_finite()) {
        return Err("domain embeddings contain non-finite values".to_string());
    }

    if export.experts.is_empty() {
        return Err("classifier has no experts".to_string());
    }
    let hidden = export.experts[0].output_dim();
    for (i, expert) in export.experts.iter().enumerate() {
        expert.validate(&format!("expert {i}"), dim)?;
        if expert.output_dim() != hidden {
            return Err(format!("expert {i} output differs from expert 0"));
        }
    }

    export.gate.validate("gate", domain_dim + dim)?;
    if export.gate.output_dim() != export.experts.len() {
        return Err(format!(
            "gate produces {} weights for {} experts",
            export.gate.output_dim(),
            export.experts.len()
        ));
    }

    export.classifier.validate("classifier", hidden)?;
    if export.classifier.output_dim() != 1 || export.classifier.input_dim() != hidden {
        return Err("classifier head must map the expert output to one logit".to_string());
    }
    Ok(())
}

impl VeracityModel for MdfendClassifier {
    fn predict(&self, text: &str, domain: u32) -> f32 {
        let text_vec = self.encode(text);
        let domain_vec = &self.export.domain_embeddings[domain as usize];

        let expert_out: Vec<Vec<f32>> = self
            .export
            .experts
            .iter()
            .map(|expert| expert.forward(&text_vec).into_iter().map(relu).collect())
            .collect();

        let gate_input: Vec<f32> = domain_vec.iter().chain(&text_vec).copied().collect();
        let gate = softmax(&self.export.gate.forward(&gate_input));

        let hidden = expert_out[0].len();
        let mut mixed = vec![0.0f32; hidden];
        for (weight, out) in gate.iter().zip(&expert_out) {
            for (m, v) in mixed.iter_mut().zip(out) {
                *m += weight * v;
            }
        }

        sigmoid(self.export.classifier.forward(&mixed)[0])
    }

    fn domain_count(&self) -> u32 {
        self.export.domain_embeddings.len() as u32
    }
}

fn relu(x: f32) -> f32 {
    x.max(0.0)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}
