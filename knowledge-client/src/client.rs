use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;

pub(crate) const USER_AGENT: &str = "issue-triage/0.1";
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, KnowledgeFetchError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| KnowledgeFetchError::Other(format!("Failed to build HTTP client: {}", e)))
}

/// GET `url` and parse the body as JSON, mapping statuses to fetch errors.
pub(crate) async fn fetch<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, KnowledgeFetchError> {
    let resp = request.send().await.map_err(|e| {
        if e.is_timeout() {
            KnowledgeFetchError::Timeout
        } else {
            KnowledgeFetchError::ResponseError(e.to_string())
        }
    })?;

    let status = resp.status();
    if status == 401 || status == 403 {
        return Err(KnowledgeFetchError::Unauthorized);
    }
    if status == 429 {
        return Err(KnowledgeFetchError::Throttled);
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(KnowledgeFetchError::ResponseError(format!(
            "Unexpected status {}: {}",
            status, body
        )));
    }

    resp.json::<T>().await.map_err(|e| {
        KnowledgeFetchError::ParsingError(format!("Failed to parse response as JSON: {}", e))
    })
}

#[derive(Error, Debug)]
pub enum KnowledgeFetchError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Throttled by source")]
    Throttled,
    #[error("Timed out")]
    Timeout,
    #[error("ResponseError: {0}")]
    ResponseError(String),
    #[error("ParsingError: {0}")]
    ParsingError(String),
    #[error("Other: {0}")]
    Other(String),
}
