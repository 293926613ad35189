//! Knowledge source adapters over the public search clients.

use async_trait::async_trait;

use knowledge_client::{
    ExternalReference, GithubIssueSearch, KnowledgeFetchError, StackExchangeSearch,
};

use crate::domain::{models::KnowledgeHit, ports::outbound::KnowledgeSource, KnowledgeError};

pub struct StackOverflowSource {
    client: StackExchangeSearch,
}

impl StackOverflowSource {
    pub fn new(client: StackExchangeSearch) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KnowledgeSource for StackOverflowSource {
    fn name(&self) -> &str {
        "stackoverflow"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<KnowledgeHit>, KnowledgeError> {
        let references = self
            .client
            .search(query, limit)
            .await
            .map_err(|e| map_fetch_error(self.name(), e))?;
        Ok(references.into_iter().map(to_knowledge_hit).collect())
    }
}

pub struct GithubIssuesSource {
    client: GithubIssueSearch,
}

impl GithubIssuesSource {
    pub fn new(client: GithubIssueSearch) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KnowledgeSource for GithubIssuesSource {
    fn name(&self) -> &str {
        "github"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<KnowledgeHit>, KnowledgeError> {
        let references = self
            .client
            .search(query, limit)
            .await
            .map_err(|e| map_fetch_error(self.name(), e))?;
        Ok(references.into_iter().map(to_knowledge_hit).collect())
    }
}

/// Relevance is assigned later from the rank within the source.
fn to_knowledge_hit(reference: ExternalReference) -> KnowledgeHit {
    KnowledgeHit {
        source: reference.source.to_string(),
        title: reference.title,
        url: reference.url,
        snippet: reference.snippet,
        relevance: 0.0,
    }
}

fn map_fetch_error(source_name: &str, e: KnowledgeFetchError) -> KnowledgeError {
    match e {
        KnowledgeFetchError::Timeout => KnowledgeError::Timeout,
        other => KnowledgeError::Source {
            source_name: source_name.to_string(),
            message: other.to_string(),
        },
    }
}
