//! Response cache port (outbound).
//!
//! Verdicts keyed by issue fingerprint, served only while `now < expires_at`.

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};

use crate::domain::{models::TriageVerdict, CacheError};

#[derive(Debug, Clone, PartialEq)]
pub struct CachedVerdict {
    pub verdict: TriageVerdict,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    /// Hits including the one that returned this value.
    pub hit_count: i64,
}

#[async_trait]
pub trait ResponseCache: Send + Sync + 'static {
    /// Returns a live entry and counts the hit.
    async fn lookup(
        &self,
        fingerprint: &str,
        now: OffsetDateTime,
    ) -> Result<Option<CachedVerdict>, CacheError>;

    /// Upserts an entry, resetting its timestamps and hit count.
    async fn store(
        &self,
        fingerprint: &str,
        verdict: &TriageVerdict,
        ttl: Duration,
        now: OffsetDateTime,
    ) -> Result<(), CacheError>;

    /// Removes expired entries and returns how many were removed.
    async fn sweep(&self, now: OffsetDateTime) -> Result<usize, CacheError>;
}
