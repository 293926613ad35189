mod cost_ledger;
mod issue_catalog;
mod knowledge_source;
mod response_cache;
mod search_cache;
mod similarity_index;
mod triage_model;
mod verdict_repository;

pub use cost_ledger::*;
pub use issue_catalog::*;
pub use knowledge_source::*;
pub use response_cache::*;
pub use search_cache::*;
pub use similarity_index::*;
pub use triage_model::*;
pub use verdict_repository::*;
