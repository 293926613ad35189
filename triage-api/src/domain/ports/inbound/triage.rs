use async_trait::async_trait;

use crate::domain::{
    models::{CostRecord, CostSummary, Dashboard, IssueKey, ProjectId, StoredVerdict, TriageOutcome},
    TriageError,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriageOptions {
    /// Skip the response cache and always re-analyze.
    pub force: bool,
}

/// Inbound port for single-issue triage and its read models.
///
/// HTTP handlers call this; it orchestrates the catalog, the decision engine
/// and the stored verdicts.
#[async_trait]
pub trait TriageService: Send + Sync + 'static {
    async fn analyze(
        &self,
        key: &IssueKey,
        options: TriageOptions,
    ) -> Result<TriageOutcome, TriageError>;

    async fn current_verdict(&self, key: &IssueKey) -> Result<StoredVerdict, TriageError>;

    async fn dashboard(&self, project: &ProjectId) -> Result<Dashboard, TriageError>;

    /// Summary over the last `days` days, today included, plus the per-day records.
    async fn costs(&self, days: u32) -> Result<(CostSummary, Vec<CostRecord>), TriageError>;
}
