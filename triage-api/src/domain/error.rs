use std::time::Duration;

use thiserror::Error;

use super::models::{IssueKey, ProjectId};

/// Errors a triage request can surface to its caller.
#[derive(Debug, Error)]
pub enum TriageError {
    #[error("triage model unavailable: {message}")]
    UpstreamUnavailable {
        message: String,
        retry_after: Option<Duration>,
    },
    #[error("rate limit exceeded, retry in {}s", retry_after.as_secs().max(1))]
    RateLimited { retry_after: Duration },
    #[error("Daily budget of ${ceiling:.2} reached (spent ${spent:.2}). Resumes at midnight UTC.")]
    BudgetExceeded { spent: f64, ceiling: f64 },
    #[error("issue not found: {0}")]
    IssueNotFound(IssueKey),
    #[error("a batch triage is already running for {0}")]
    BatchAlreadyRunning(ProjectId),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("{0}")]
    Unknown(String),
}

impl TriageError {
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

impl From<ModelError> for TriageError {
    fn from(err: ModelError) -> Self {
        let retry_after = err.retry_after();
        Self::UpstreamUnavailable {
            message: err.to_string(),
            retry_after,
        }
    }
}

impl From<LedgerError> for TriageError {
    fn from(err: LedgerError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// A similarity lookup that could not be answered. Absorbed while gathering.
#[derive(Debug, Error)]
pub enum EvidenceError {
    #[error("no stored embedding for {0}")]
    MissingVector(IssueKey),
    #[error("similarity lookup timed out")]
    Timeout,
    #[error("similarity index error: {0}")]
    Index(String),
    #[error("{0}")]
    Unknown(String),
}

impl EvidenceError {
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }
}

/// Failure talking to the hosted triage model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model transport error: {message}")]
    Unavailable {
        message: String,
        retry_after: Option<Duration>,
    },
    #[error("model rejected request: {0}")]
    Rejected(String),
    #[error("{0}")]
    Unknown(String),
}

impl ModelError {
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Unavailable { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("knowledge source {source_name} failed: {message}")]
    Source {
        source_name: String,
        message: String,
    },
    #[error("knowledge lookup timed out")]
    Timeout,
    #[error("{0}")]
    Unknown(String),
}

impl KnowledgeError {
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache storage error: {0}")]
    Storage(String),
    #[error("cached value could not be decoded: {0}")]
    Decode(String),
    #[error("{0}")]
    Unknown(String),
}

impl CacheError {
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger storage error: {0}")]
    Storage(String),
    #[error("{0}")]
    Unknown(String),
}

impl LedgerError {
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }
}
