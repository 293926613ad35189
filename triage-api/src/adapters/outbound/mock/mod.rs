//! Scriptable port implementations for tests.

mod knowledge;
mod model;
mod similarity;

pub use knowledge::MockKnowledgeSource;
pub use model::MockTriageModel;
pub use similarity::MockSimilarityIndex;
