//! In-process adapters with the same contracts as the Postgres ones.

mod cost_ledger;
mod issue_catalog;
mod response_cache;
mod search_cache;
mod verdicts;

pub use cost_ledger::InMemoryCostLedger;
pub use issue_catalog::InMemoryIssueCatalog;
pub use response_cache::InMemoryResponseCache;
pub use search_cache::InMemorySearchCache;
pub use verdicts::InMemoryVerdictRepository;
