use async_trait::async_trait;

use crate::domain::{
    models::{IssueKey, ProjectId, StoredVerdict},
    TriageError,
};

/// Outbound port for verdict history.
///
/// Saving supersedes the issue's previous current verdict; rows are never updated in place.
#[async_trait]
pub trait VerdictRepository: Send + Sync + 'static {
    async fn save(&self, verdict: &StoredVerdict) -> Result<(), TriageError>;

    async fn current(&self, key: &IssueKey) -> Result<Option<StoredVerdict>, TriageError>;

    async fn current_for_project(
        &self,
        project: &ProjectId,
    ) -> Result<Vec<StoredVerdict>, TriageError>;
}
