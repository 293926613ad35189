use async_trait::async_trait;
use time::{Duration, OffsetDateTime};

use crate::domain::{models::KnowledgeHit, CacheError};

/// Outbound port caching external knowledge results per `(source, query)` key.
#[async_trait]
pub trait SearchCache: Send + Sync + 'static {
    async fn get(
        &self,
        key: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Vec<KnowledgeHit>>, CacheError>;

    async fn put(
        &self,
        key: &str,
        hits: &[KnowledgeHit],
        ttl: Duration,
        now: OffsetDateTime,
    ) -> Result<(), CacheError>;

    async fn sweep(&self, now: OffsetDateTime) -> Result<usize, CacheError>;
}
