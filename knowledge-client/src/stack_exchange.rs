use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::{
    client::{build_http_client, fetch, DEFAULT_TIMEOUT},
    text::{html_to_text, truncate_chars},
    ExternalReference, KnowledgeFetchError, ReferenceSource, SearchURL,
};

pub const STACK_EXCHANGE_URL: &str = "https://api.stackexchange.com/2.3";
const SNIPPET_CHARS: usize = 300;

/// Searches Stack Overflow questions through the Stack Exchange advanced search API.
#[derive(Debug, Clone)]
pub struct StackExchangeSearch {
    client: reqwest::Client,
    base_url: String,
    key: Option<String>,
    site: String,
}

impl StackExchangeSearch {
    pub fn new(key: Option<String>) -> Result<Self, KnowledgeFetchError> {
        Self::with_timeout(key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(key: Option<String>, timeout: Duration) -> Result<Self, KnowledgeFetchError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: STACK_EXCHANGE_URL.to_string(),
            key,
            site: "stackoverflow".to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Returns up to `limit` questions ordered by relevance.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ExternalReference>, KnowledgeFetchError> {
        let url = SearchURL::parse(&self.base_url)?
            .append_path("search/advanced")
            .with_param("order", "desc")
            .with_param("sort", "relevance")
            .with_param("q", query)
            .with_param("site", &self.site)
            .with_param("filter", "withbody")
            .with_param("pagesize", limit.to_string())
            .with_optional_param("key", self.key.as_deref());

        let response: QuestionsResponse = fetch(self.client.get(url.as_ref())).await?;
        debug!(
            items = response.items.len(),
            quota_remaining = response.quota_remaining,
            "Stack Exchange search completed"
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
struct QuestionsResponse {
    #[serde(default)]
    items: Vec<Question>,
    quota_remaining: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Question {
    title: String,
    link: String,
    score: i64,
    #[serde(default)]
    is_answered: bool,
    body: Option<String>,
}

impl From<Question> for ExternalReference {
    fn from(question: Question) -> Self {
        let body = question
            .body
            .as_deref()
            .map(html_to_text)
            .map(|text| truncate_chars(&text, SNIPPET_CHARS))
            .unwrap_or_default();
        let answered = if question.is_answered {
            "answered"
        } else {
            "unanswered"
        };

        Self {
            source: ReferenceSource::StackOverflow,
            title: html_to_text(&question.title),
            url: question.link,
            snippet: format!("score {}, {}. {}", question.score, answered, body)
                .trim_end()
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn search_maps_questions_in_order() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search/advanced"))
            .and(query_param("q", "Crash on startup"))
            .and(query_param("sort", "relevance"))
            .and(query_param("site", "stackoverflow"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {
                        "title": "App crashes with &quot;null pointer&quot;",
                        "link": "https://stackoverflow.com/q/1",
                        "score": 42,
                        "is_answered": true,
                        "body": "<p>It crashes on start.</p>"
                    },
                    {
                        "title": "Startup segfault",
                        "link": "https://stackoverflow.com/q/2",
                        "score": 3,
                        "is_answered": false
                    }
                ],
                "quota_remaining": 9000
            })))
            .mount(&server)
            .await;

        let search = StackExchangeSearch::new(None)
            .unwrap()
            .with_base_url(server.uri());
        let results = search.search("Crash on startup", 5).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "App crashes with \"null pointer\"");
        assert_eq!(results[0].url, "https://stackoverflow.com/q/1");
        assert!(results[0].snippet.starts_with("score 42, answered."));
        assert!(results[0].snippet.contains("It crashes on start."));
        assert_eq!(results[1].source, ReferenceSource::StackOverflow);
        assert_eq!(results[1].snippet, "score 3, unanswered.");
    }

    #[tokio::test]
    async fn search_reports_throttling() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let search = StackExchangeSearch::new(Some("key".into()))
            .unwrap()
            .with_base_url(server.uri());

        assert!(matches!(
            search.search("anything", 5).await,
            Err(KnowledgeFetchError::Throttled)
        ));
    }
}
