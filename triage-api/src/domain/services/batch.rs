use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use futures::{stream, StreamExt};
use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::domain::{
    models::{BatchHandle, BatchIssueError, BatchState, BatchStatus, Issue, ProjectId},
    ports::{
        inbound::{BatchService, TriageOptions},
        outbound::IssueCatalog,
    },
    triage::TriageEngine,
    TriageError,
};

pub const DEFAULT_BATCH_WORKERS: usize = 3;

struct BatchJob {
    status: Arc<RwLock<BatchStatus>>,
    cancel: CancellationToken,
}

/// Triages every untriaged open issue of a project in the background.
///
/// At most one job runs per project. Progress is kept in memory and readable
/// through [`BatchService::status`] until the next job for the project starts.
pub struct BatchTriageService<C> {
    catalog: Arc<C>,
    engine: Arc<TriageEngine>,
    worker_count: usize,
    jobs: Mutex<HashMap<ProjectId, BatchJob>>,
    next_job_id: AtomicU64,
}

impl<C> BatchTriageService<C> {
    pub fn new(catalog: Arc<C>, engine: Arc<TriageEngine>) -> Self {
        Self::with_workers(catalog, engine, DEFAULT_BATCH_WORKERS)
    }

    pub fn with_workers(catalog: Arc<C>, engine: Arc<TriageEngine>, worker_count: usize) -> Self {
        Self {
            catalog,
            engine,
            worker_count: worker_count.max(1),
            jobs: Mutex::new(HashMap::new()),
            next_job_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl<C: IssueCatalog> BatchService for BatchTriageService<C> {
    #[instrument(name = "batch_start", skip(self))]
    async fn start(&self, project: &ProjectId) -> Result<BatchHandle, TriageError> {
        if job_running(&*self.jobs.lock().await, project).await {
            return Err(TriageError::BatchAlreadyRunning(project.clone()));
        }

        // Listed without holding `jobs`.
        let started_at = OffsetDateTime::now_utc();
        let listed = self.catalog.untriaged_open(project).await;

        let mut jobs = self.jobs.lock().await;
        if job_running(&jobs, project).await {
            return Err(TriageError::BatchAlreadyRunning(project.clone()));
        }
        let job_id = self.next_job_id.fetch_add(1, Ordering::Relaxed);

        let issues = match listed {
            Ok(issues) => issues,
            Err(err) => {
                error!(%project, job_id, "Failed to list untriaged issues: {err}");
                let mut failed = BatchStatus::running(job_id, 0, started_at);
                failed.status = BatchState::Failed;
                failed.finished_at = Some(OffsetDateTime::now_utc());
                failed.failure = Some(err.to_string());
                jobs.insert(
                    project.clone(),
                    BatchJob {
                        status: Arc::new(RwLock::new(failed)),
                        cancel: CancellationToken::new(),
                    },
                );
                return Err(err);
            }
        };

        let total = issues.len();
        let mut initial = BatchStatus::running(job_id, total, started_at);
        if total == 0 {
            initial.status = BatchState::Completed;
            initial.finished_at = Some(started_at);
        }
        let status = Arc::new(RwLock::new(initial));
        let cancel = CancellationToken::new();
        jobs.insert(
            project.clone(),
            BatchJob {
                status: status.clone(),
                cancel: cancel.clone(),
            },
        );

        info!(%project, job_id, total, "Batch triage started");
        if total > 0 {
            tokio::spawn(run_job(
                self.engine.clone(),
                issues,
                status,
                cancel,
                self.worker_count,
            ));
        }

        Ok(BatchHandle { job_id, total })
    }

    async fn status(&self, project: &ProjectId) -> BatchStatus {
        let status = self
            .jobs
            .lock()
            .await
            .get(project)
            .map(|job| job.status.clone());
        match status {
            Some(status) => status.read().await.clone(),
            None => BatchStatus::not_started(),
        }
    }

    async fn cancel(&self, project: &ProjectId) -> bool {
        let jobs = self.jobs.lock().await;
        let Some(job) = jobs.get(project) else {
            return false;
        };

        let mut status = job.status.write().await;
        if status.status != BatchState::Running {
            return false;
        }
        job.cancel.cancel();
        status.status = BatchState::Cancelled;
        status.finished_at = Some(OffsetDateTime::now_utc());
        info!(%project, job_id = ?status.job_id, processed = status.processed, "Batch triage cancelled");
        true
    }
}

async fn job_running(jobs: &HashMap<ProjectId, BatchJob>, project: &ProjectId) -> bool {
    match jobs.get(project) {
        Some(job) => job.status.read().await.status == BatchState::Running,
        None => false,
    }
}

async fn run_job(
    engine: Arc<TriageEngine>,
    issues: Vec<Issue>,
    status: Arc<RwLock<BatchStatus>>,
    cancel: CancellationToken,
    worker_count: usize,
) {
    stream::iter(issues)
        .map(|issue| {
            let engine = engine.clone();
            let status = status.clone();
            let cancel = cancel.clone();
            async move { triage_one(&engine, issue, &status, &cancel).await }
        })
        .buffer_unordered(worker_count)
        .collect::<Vec<()>>()
        .await;

    let mut status = status.write().await;
    status.in_flight.clear();
    if status.status == BatchState::Running {
        status.status = if status.failure.is_some() {
            BatchState::Failed
        } else {
            BatchState::Completed
        };
        status.finished_at = Some(OffsetDateTime::now_utc());
    }
    info!(
        job_id = ?status.job_id,
        state = %status.status,
        processed = status.processed,
        errors = status.errors.len(),
        "Batch triage finished"
    );
}

async fn triage_one(
    engine: &TriageEngine,
    issue: Issue,
    status: &RwLock<BatchStatus>,
    cancel: &CancellationToken,
) {
    if cancel.is_cancelled() {
        return;
    }
    let number = issue.key.number;
    status.write().await.in_flight.push(number);

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        result = engine.triage(&issue, TriageOptions::default()) => Some(result),
    };

    let mut status = status.write().await;
    status.in_flight.retain(|n| *n != number);
    match result {
        None => {}
        Some(Ok(_)) => status.processed += 1,
        Some(Err(err)) => {
            warn!(issue = %issue.key, "Batch triage failed for issue: {err}");
            status.processed += 1;
            status.errors.push(BatchIssueError {
                issue_number: number,
                error: err.to_string(),
            });
            // Every remaining issue would hit the same ceiling.
            if matches!(err, TriageError::BudgetExceeded { .. }) {
                status.failure = Some(err.to_string());
                cancel.cancel();
            }
        }
    }
}
