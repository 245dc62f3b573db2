pub mod error;
pub mod orchestrator;
pub mod report;
pub mod stage;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

#[cfg(test)]
mod chain_tests;

pub use error::PipelineError;
pub use orchestrator::{Pipeline, PipelineDeps};
pub use report::PipelineReport;
pub use stage::{PipelineStage, StageTracker};
