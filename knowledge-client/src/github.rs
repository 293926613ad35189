use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::{
    client::{build_http_client, fetch, DEFAULT_TIMEOUT},
    text::truncate_chars,
    ExternalReference, KnowledgeFetchError, ReferenceSource, SearchURL,
};

pub const GITHUB_API_URL: &str = "https://api.github.com";
const SNIPPET_CHARS: usize = 300;

/// Searches public GitHub issues, ranked by reactions.
#[derive(Debug, Clone)]
pub struct GithubIssueSearch {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GithubIssueSearch {
    pub fn new(token: Option<String>) -> Result<Self, KnowledgeFetchError> {
        Self::with_timeout(token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, KnowledgeFetchError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: GITHUB_API_URL.to_string(),
            token,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ExternalReference>, KnowledgeFetchError> {
        let url = SearchURL::parse(&self.base_url)?
            .append_path("search/issues")
            .with_param("q", format!("{} type:issue", query))
            .with_param("sort", "reactions")
            .with_param("per_page", limit.to_string());

        let mut request = self
            .client
            .get(url.as_ref())
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response: IssueSearchResponse = fetch(request).await?;
        debug!(
            total = response.total_count,
            returned = response.items.len(),
            "GitHub issue search completed"
        );

        Ok(response
            .items
            .into_iter()
            .take(limit)
            .map(ExternalReference::from)
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct IssueSearchResponse {
    #[serde(default)]
    total_count: i64,
    #[serde(default)]
    items: Vec<IssueItem>,
}

#[derive(Debug, Deserialize)]
struct IssueItem {
    title: String,
    html_url: String,
    repository_url: String,
    state: String,
    #[serde(default)]
    comments: i64,
    body: Option<String>,
}

impl From<IssueItem> for ExternalReference {
    fn from(item: IssueItem) -> Self {
        let repo = item
            .repository_url
            .rsplit('/')
            .take(2)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join("/");
        let body = item
            .body
            .as_deref()
            .map(|b| truncate_chars(b.trim(), SNIPPET_CHARS))
            .unwrap_or_default();

        Self {
            source: ReferenceSource::Github,
            title: item.title,
            url: item.html_url,
            snippet: format!("{}, {}, {} comments. {}", repo, item.state, item.comments, body)
                .trim_end()
                .to_string(),
        }
    }
}
