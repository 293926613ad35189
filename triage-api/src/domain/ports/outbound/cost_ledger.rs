//! Cost ledger port (outbound).

use async_trait::async_trait;
use time::Date;

use crate::domain::{
    models::{CostRecord, UsageEntry},
    LedgerError,
};

/// Daily, additive record of model usage and cache effectiveness.
///
/// Implementations accumulate rather than overwrite, so concurrent `record`
/// calls for the same day must all be reflected in the total.
#[async_trait]
pub trait CostLedger: Send + Sync + 'static {
    async fn record(&self, entry: &UsageEntry) -> Result<(), LedgerError>;

    /// The record for `date`, zeroed when nothing was recorded.
    async fn day(&self, date: Date) -> Result<CostRecord, LedgerError>;

    /// Records for every day in `from..=to` that has any usage, oldest first.
    async fn range(&self, from: Date, to: Date) -> Result<Vec<CostRecord>, LedgerError>;
}
