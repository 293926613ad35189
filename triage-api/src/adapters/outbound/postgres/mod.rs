//! PostgreSQL implementations of the outbound ports.

mod cost_ledger;
mod issue_catalog;
mod response_cache;
mod search_cache;
mod similarity;
mod verdicts;

pub use cost_ledger::PgCostLedger;
pub use issue_catalog::PgIssueCatalog;
pub use response_cache::PgResponseCache;
pub use search_cache::PgSearchCache;
pub use similarity::PgSimilarityIndex;
pub use verdicts::PgVerdictRepository;

/// BIGINT counter to u64. Negative values read as zero.
fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
