use thiserror::Error;

#[derive(Error, Debug)]
pub enum NewsCheckError {
    /// A pretrained artifact could not be fetched, read or validated.
    /// Fatal: the pipeline cannot be constructed without it.
    #[error("Model unavailable ({artifact}): {reason}")]
    ModelUnavailable { artifact: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Prompt template error ({prompt}): {reason}")]
    Prompt { prompt: String, reason: String },

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl NewsCheckError {
    pub fn model_unavailable(artifact: impl Into<String>, reason: impl ToString) -> Self {
        NewsCheckError::ModelUnavailable {
            artifact: artifact.into(),
            reason: reason.to_string(),
        }
    }
}
