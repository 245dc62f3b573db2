//! Latent Dirichlet Allocation inference over a fixed, pretrained
//! topic-word distribution.
//!
//! The export carries the variational parameters of the trained model
//! (`alpha` and the topic-word `lambda` matrix). Inference follows the
//! online-LDA E-step: iterate the per-document `gamma` until the mean
//! absolute change falls under `gamma_threshold`. `gamma` starts at ones so
//! the same document always produces the same distribution.

use std::path::Path;

use serde::Deserialize;

use newscheck_common::{NewsCheckError, TopicResult};

const DEFAULT_ITERATIONS: usize = 50;
const DEFAULT_GAMMA_THRESHOLD: f64 = 0.001;
const DEFAULT_MINIMUM_PROBABILITY: f64 = 0.01;
const PHI_EPSILON: f64 = 1e-100;

#[derive(Debug, Deserialize)]
struct LdaExport {
    num_topics: usize,
    num_terms: usize,
    alpha: Vec<f64>,
    /// `num_topics` rows of `num_terms` variational topic-word weights.
    lambda: Vec<Vec<f64>>,
    #[serde(default)]
    iterations: Option<usize>,
    #[serde(default)]
    gamma_threshold: Option<f64>,
    #[serde(default)]
    minimum_probability: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct LdaModel {
    num_topics: usize,
    num_terms: usize,
    alpha: Vec<f64>,
    /// exp(E[log beta]) per topic, `num_topics × num_terms`.
    exp_elog_beta: Vec<Vec<f64>>,
    iterations: usize,
    gamma_threshold: f64,
    minimum_probability: f64,
}

impl LdaModel {
    pub fn load(path: &Path) -> Result<Self, NewsCheckError> {
        let artifact = path.display().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|e| NewsCheckError::model_unavailable(&artifact, e))?;
        let export: LdaExport = serde_json::from_str(&content)
            .map_err(|e| NewsCheckError::model_unavailable(&artifact, e))?;
        Self::from_export(export).map_err(|reason| NewsCheckError::model_unavailable(artifact, reason))
    }

    /// Build a model from `alpha` and the topic-word `lambda` rows.
    pub fn from_parameters(alpha: Vec<f64>, lambda: Vec<Vec<f64>>) -> Result<Self, NewsCheckError> {
        let export = LdaExport {
            num_topics: lambda.len(),
            num_terms: lambda.first().map(Vec::len).unwrap_or(0),
            alpha,
            lambda,
            iterations: None,
            gamma_threshold: None,
            minimum_probability: None,
        };
        Self::from_export(export).map_err(|reason| NewsCheckError::model_unavailable("lda", reason))
    }

    fn from_export(export: LdaExport) -> Result<Self, String> {
        if export.num_topics == 0 || export.num_terms == 0 {
            return Err("topic model has no topics or no terms".to_string());
        }
        if export.alpha.len() != export.num_topics {
            return Err(format!(
                "alpha has {} entries, expected {}",
                export.alpha.len(),
                export.num_topics
            ));
        }
        if export.alpha.iter().any(|a| !a.is_finite() || *a <= 0.0) {
            return Err("alpha must be finite and positive".to_string());
        }
        if export.lambda.len() != export.num_topics {
            return Err(format!(
                "lambda has {} rows, expected {}",
                export.lambda.len(),
                export.num_topics
            ));
        }
        for (topic, row) in export.lambda.iter().enumerate() {
            if row.len() != export.num_terms {
                return Err(format!(
                    "lambda row {topic} has {} terms, expected {}",
                    row.len(),
                    export.num_terms
                ));
            }
            if row.iter().any(|w| !w.is_finite() || *w <= 0.0) {
                return Err(format!("lambda row {topic} must be finite and positive"));
            }
        }

        let exp_elog_beta = export
            .lambda
            .iter()
            .map(|row| exp_dirichlet_expectation(row))
            .collect();

        Ok(Self {
            num_topics: export.num_topics,
            num_terms: export.num_terms,
            alpha: export.alpha,
            exp_elog_beta,
            iterations: export.iterations.unwrap_or(DEFAULT_ITERATIONS).max(1),
            gamma_threshold: export.gamma_threshold.unwrap_or(DEFAULT_GAMMA_THRESHOLD),
            minimum_probability: export
                .minimum_probability
                .unwrap_or(DEFAULT_MINIMUM_PROBABILITY)
                .max(1e-8),
        })
    }

    pub fn num_topics(&self) -> usize {
        self.num_topics
    }

    pub fn num_terms(&self) -> usize {
        self.num_terms
    }

    /// Variational `gamma` for one bag-of-words document.
    pub fn inference(&self, bow: &[(u32, u32)]) -> Vec<f64> {
        let k = self.num_topics;
        let (ids, counts): (Vec<usize>, Vec<f64>) = bow
            .iter()
            .filter(|(id, _)| (*id as usize) < self.num_terms)
            .map(|(id, count)| (*id as usize, f64::from(*count)))
            .unzip();

        let beta_d: Vec<Vec<f64>> = self
            .exp_elog_beta
            .iter()
            .map(|row| ids.iter().map(|&id| row[id]).collect())
            .collect();

        let mut gamma = vec![1.0; k];
        let mut exp_elog_theta = exp_dirichlet_expectation(&gamma);
        let mut phinorm = phi_norm(&exp_elog_theta, &beta_d, ids.len());

        for _ in 0..self.iterations {
            let last_gamma = gamma.clone();
            let ratio: Vec<f64> = counts
                .iter()
                .zip(&phinorm)
                .map(|(count, norm)| count / norm)
                .collect();

            for t in 0..k {
                let dot: f64 = beta_d[t].iter().zip(&ratio).map(|(b, r)| b * r).sum();
                gamma[t] = self.alpha[t] + exp_elog_theta[t] * dot;
            }

            exp_elog_theta = exp_dirichlet_expectation(&gamma);
            phinorm = phi_norm(&exp_elog_theta, &beta_d, ids.len());

            let mean_change = gamma
                .iter()
                .zip(&last_gamma)
                .map(|(g, l)| (g - l).abs())
                .sum::<f64>()
                / k as f64;
            if mean_change < self.gamma_threshold {
                break;
            }
        }

        gamma
    }

    /// Normalized topic distribution with topics under `minimum_probability`
    /// removed, in topic-id order.
    pub fn document_topics(&self, bow: &[(u32, u32)]) -> Vec<(usize, f64)> {
        let gamma = self.inference(bow);
        let total: f64 = gamma.iter().sum();
        gamma
            .iter()
            .enumerate()
            .map(|(topic, g)| (topic, g / total))
            .filter(|(_, p)| *p >= self.minimum_probability)
            .collect()
    }

    /// Topic with the highest posterior probability; ties go to the lowest id.
    pub fn dominant_topic(&self, bow: &[(u32, u32)]) -> TopicResult {
        let mut distribution = self.document_topics(bow);
        if distribution.is_empty() {
            // every topic fell under the threshold; compare them unfiltered
            let gamma = self.inference(bow);
            let total: f64 = gamma.iter().sum();
            distribution = gamma.iter().map(|g| g / total).enumerate().collect();
        }

        let mut best = TopicResult {
            topic_id: distribution[0].0,
            probability: distribution[0].1,
        };
        for &(topic_id, probability) in &distribution[1..] {
            if probability > best.probability {
                best = TopicResult {
                    topic_id,
                    probability,
                };
            }
        }
        best
    }
}

fn phi_norm(exp_elog_theta: &[f64], beta_d: &[Vec<f64>], n_words: usize) -> Vec<f64> {
    (0..n_words)
        .map(|j| {
            exp_elog_theta
                .iter()
                .zip(beta_d)
                .map(|(theta, row)| theta * row[j])
                .sum::<f64>()
                + PHI_EPSILON
        })
        .collect()
}

/// exp(E[log X]) for X ~ Dirichlet(params).
fn exp_dirichlet_expectation(params: &[f64]) -> Vec<f64> {
    let psi_total = digamma(params.iter().sum());
    params
        .iter()
        .map(|p| (digamma(*p) - psi_total).exp())
        .collect()
}

/// Digamma via recurrence up to x >= 6 and the asymptotic series.
pub(crate) fn digamma(mut x: f64) -> f64 {
    let mut result = 0.0;
    while x < 6.0 {
        result -= 1.0 / x;
        x += 1.0;
    }
    let f = 1.0 / (x * x);
    result + x.ln()
        - 0.5 / x
        - f * (1.0 / 12.0 - f * (1.0 / 120.0 - f * (1.0 / 252.0 - f * (1.0 / 240.0 - f / 132.0))))
}
