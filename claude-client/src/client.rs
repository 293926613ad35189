use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, RETRY_AFTER},
    StatusCode,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{ApiErrorResponse, MessageRequest, MessageResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Client for the Anthropic Messages API.
///
/// Transient statuses (429, 500, 503, 529) are retried once after a short delay.
#[derive(Debug, Clone)]
pub struct ClaudeClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl ClaudeClient {
    pub fn new(api_key: &str, api_version: &str) -> Result<Self, ClaudeError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| ClaudeError::Config(format!("invalid API key header: {e}")))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_str(api_version)
                .map_err(|e| ClaudeError::Config(format!("invalid API version header: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ClaudeError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }

    /// Sends a non-streaming message request.
    pub async fn create_message(
        &self,
        request: &MessageRequest,
    ) -> Result<MessageResponse, ClaudeError> {
        let url = self.messages_url();
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "Retrying message request after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }

            let resp = self
                .client
                .post(&url)
                .json(request)
                .send()
                .await
                .map_err(|e| ClaudeError::ResponseError(e.to_string()))?;

            let status = resp.status();
            debug!(status = %status, attempt, "Message response received");

            if status.is_success() {
                return resp.json::<MessageResponse>().await.map_err(|e| {
                    ClaudeError::ParsingError(format!("Failed to parse response as JSON: {}", e))
                });
            }

            let retry_after = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let body = resp.text().await.unwrap_or_default();
            let error = ClaudeError::Api {
                status: status.as_u16(),
                message: api_error_message(status, &body),
                retry_after,
            };

            if is_transient(status) && attempt < self.max_retries {
                warn!(status = %status, "Transient API error, will retry");
                last_error = Some(error);
                continue;
            }

            return Err(error);
        }

        Err(last_error
            .unwrap_or_else(|| ClaudeError::Other("message request failed after retries".into())))
    }
}

fn is_transient(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503 | 529)
}

fn api_error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_err) => format!("{}: {}", api_err.error.kind, api_err.error.message),
        Err(_) => format!("API returned {status}: {body}"),
    }
}

#[derive(Error, Debug)]
pub enum ClaudeError {
    #[error("Config: {0}")]
    Config(String),
    #[error("ResponseError: {0}")]
    ResponseError(String),
    #[error("Api ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        retry_after: Option<Duration>,
    },
    #[error("ParsingError: {0}")]
    ParsingError(String),
    #[error("Other: {0}")]
    Other(String),
}

impl ClaudeError {
    /// Server-provided backoff, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Whether retrying the same request later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ResponseError(_) => true,
            Self::Api { status, .. } => {
                is_transient(StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST))
            }
            _ => false,
        }
    }
}
