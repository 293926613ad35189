use serde::Serialize;
use strum::Display;
use time::OffsetDateTime;

pub type BatchJobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BatchState {
    NotStarted,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl BatchState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchIssueError {
    pub issue_number: i32,
    pub error: String,
}

/// Progress snapshot of a project's most recent batch job.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchStatus {
    pub job_id: Option<BatchJobId>,
    pub status: BatchState,
    pub total: usize,
    pub processed: usize,
    pub in_flight: Vec<i32>,
    pub errors: Vec<BatchIssueError>,
    pub started_at: Option<OffsetDateTime>,
    pub finished_at: Option<OffsetDateTime>,
    /// Set when the job failed as a whole.
    pub failure: Option<String>,
}

impl BatchStatus {
    pub fn not_started() -> Self {
        Self {
            job_id: None,
            status: BatchState::NotStarted,
            total: 0,
            processed: 0,
            in_flight: Vec::new(),
            errors: Vec::new(),
            started_at: None,
            finished_at: None,
            failure: None,
        }
    }

    pub fn running(job_id: BatchJobId, total: usize, started_at: OffsetDateTime) -> Self {
        Self {
            job_id: Some(job_id),
            status: BatchState::Running,
            total,
            started_at: Some(started_at),
            ..Self::not_started()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchHandle {
    pub job_id: BatchJobId,
    pub total: usize,
}
