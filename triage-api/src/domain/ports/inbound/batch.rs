use async_trait::async_trait;

use crate::domain::{
    models::{BatchHandle, BatchStatus, ProjectId},
    TriageError,
};

/// Inbound port for background triage of every untriaged open issue in a project.
#[async_trait]
pub trait BatchService: Send + Sync + 'static {
    async fn start(&self, project: &ProjectId) -> Result<BatchHandle, TriageError>;

    async fn status(&self, project: &ProjectId) -> BatchStatus;

    /// Returns whether a running job was cancelled.
    async fn cancel(&self, project: &ProjectId) -> bool;
}
