pub mod artifact;
pub mod context;
pub mod dictionary;
pub mod lda;
pub mod preprocess;
mod stopwords;
pub mod topic;
pub mod veracity;

#[cfg(any(test, feature = "test-support"))]
pub mod fixtures;

pub use artifact::{ArtifactFetcher, ArtifactSpec};
pub use context::ModelContext;
pub use dictionary::Dictionary;
pub use lda::LdaModel;
pub use preprocess::TextPreprocessor;
pub use topic::TopicClassifier;
pub use veracity::{MdfendClassifier, VeracityModel, VeracityScorer};
