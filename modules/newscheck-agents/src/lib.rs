pub mod agent;
pub mod alignment;
pub mod corroboration;
pub mod decision;
pub mod error;
pub mod llm;
pub mod prompts;
pub mod response;
pub mod retriever;
pub mod subject;
pub mod template;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use agent::AgentRunner;
pub use alignment::AlignmentChecker;
pub use corroboration::{literal_count, CorroborationCounter};
pub use decision::{fallback_verdict, DecisionInputs, VerdictAggregator};
pub use error::AgentError;
pub use llm::{LanguageModel, PromptRequest};
pub use prompts::{format_context, PromptKind, PromptSet, PromptSpec};
pub use retriever::{ContextRetriever, NoopRetriever, SerperRetriever};
pub use subject::SubjectClassifier;
