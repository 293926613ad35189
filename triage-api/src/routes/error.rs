use std::{fmt, time::Duration};

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::TriageError;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    UpstreamUnavailable,
    RateLimited,
    BudgetExceeded,
    IssueNotFound,
    BatchAlreadyRunning,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<ErrorCode>,
}

pub struct ApiError {
    status: StatusCode,
    message: String,
    code: Option<ErrorCode>,
    retry_after: Option<Duration>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: None,
            retry_after: None,
        }
    }

    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            code: self.code,
        };
        let mut response = (self.status, Json(body)).into_response();
        if let Some(retry_after) = self.retry_after {
            // Whole seconds, rounded up.
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs.max(1)));
        }
        response
    }
}

impl From<TriageError> for ApiError {
    fn from(err: TriageError) -> Self {
        match err {
            TriageError::UpstreamUnavailable { retry_after, .. } => {
                tracing::warn!("Triage model unavailable: {err}");
                Self::service_unavailable(err.to_string())
                    .with_code(ErrorCode::UpstreamUnavailable)
                    .with_retry_after(retry_after)
            }
            TriageError::RateLimited { retry_after } => {
                Self::new(StatusCode::TOO_MANY_REQUESTS, err.to_string())
                    .with_code(ErrorCode::RateLimited)
                    .with_retry_after(Some(retry_after))
            }
            TriageError::BudgetExceeded { .. } => Self::new(StatusCode::PAYMENT_REQUIRED, err.to_string())
                .with_code(ErrorCode::BudgetExceeded),
            TriageError::IssueNotFound(_) => {
                Self::not_found(err.to_string()).with_code(ErrorCode::IssueNotFound)
            }
            TriageError::BatchAlreadyRunning(_) => {
                Self::conflict(err.to_string()).with_code(ErrorCode::BatchAlreadyRunning)
            }
            TriageError::Storage(ref e) => {
                tracing::error!("Storage error: {e}");
                Self::internal(err.to_string())
            }
            TriageError::Unknown(ref e) => {
                tracing::error!("Unexpected triage error: {e}");
                Self::internal(err.to_string())
            }
        }
    }
}
