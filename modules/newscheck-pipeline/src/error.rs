use thiserror::Error;

use newscheck_common::NewsCheckError;

use crate::PipelineStage;

/// Fatal pipeline errors. Agent and retrieval failures never show up here:
/// they degrade a signal instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Models, prompts or credentials could not be set up.
    #[error(transparent)]
    Setup(#[from] NewsCheckError),

    #[error("Invalid stage transition {from} -> {to}")]
    InvalidTransition {
        from: PipelineStage,
        to: PipelineStage,
    },

    #[error("Run already failed: {0}")]
    AlreadyFailed(String),
}
