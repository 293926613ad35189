use async_trait::async_trait;

use crate::domain::{models::KnowledgeHit, KnowledgeError};

/// Outbound port for a public knowledge site searched by issue title.
///
/// Hits come back in the source's own relevance order.
#[async_trait]
pub trait KnowledgeSource: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<KnowledgeHit>, KnowledgeError>;
}
