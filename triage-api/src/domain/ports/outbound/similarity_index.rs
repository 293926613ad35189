//! Similarity search port (outbound).
//!
//! Nearest-neighbour lookups over the stored issue, PR and code embeddings.

use async_trait::async_trait;

use crate::domain::{
    models::{Collection, IssueKey, ProjectId, SimilarityHit},
    EvidenceError,
};

/// A nearest-neighbour query against one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityQuery {
    pub project: ProjectId,
    pub vector: Vec<f32>,
    pub collection: Collection,
    /// Inclusive lower bound on similarity.
    pub threshold: f64,
    pub limit: usize,
    /// Issue number to leave out of issue results, usually the issue being triaged.
    pub exclude_issue: Option<i32>,
}

/// Outbound port for vector similarity search.
///
/// # Example
///
/// ```ignore
/// let vector = index.query_vector(&key).await?.unwrap_or_default();
/// let hits = index.search_similar(&SimilarityQuery { vector, ..query }).await?;
/// assert!(hits.windows(2).all(|w| w[0].similarity >= w[1].similarity));
/// ```
#[async_trait]
pub trait SimilarityIndex: Send + Sync + 'static {
    /// The stored embedding of an issue, if it has been embedded.
    async fn query_vector(&self, key: &IssueKey) -> Result<Option<Vec<f32>>, EvidenceError>;

    /// Hits with `similarity >= threshold`, highest similarity first.
    async fn search_similar(
        &self,
        query: &SimilarityQuery,
    ) -> Result<Vec<SimilarityHit>, EvidenceError>;
}
