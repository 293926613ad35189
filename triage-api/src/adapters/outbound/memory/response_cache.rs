use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};

use crate::domain::{
    models::TriageVerdict,
    ports::outbound::{CachedVerdict, ResponseCache},
    CacheError,
};

/// Expiring map keyed by fingerprint.
#[derive(Clone, Default)]
pub struct InMemoryResponseCache {
    entries: Arc<RwLock<HashMap<String, CachedVerdict>>>,
}

impl InMemoryResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }
}

#[async_trait]
impl ResponseCache for InMemoryResponseCache {
    async fn lookup(
        &self,
        fingerprint: &str,
        now: OffsetDateTime,
    ) -> Result<Option<CachedVerdict>, CacheError> {
        let mut entries = self.entries.write().unwrap();
        Ok(entries
            .get_mut(fingerprint)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| {
                entry.hit_count += 1;
                entry.clone()
            }))
    }

    async fn store(
        &self,
        fingerprint: &str,
        verdict: &TriageVerdict,
        ttl: Duration,
        now: OffsetDateTime,
    ) -> Result<(), CacheError> {
        self.entries.write().unwrap().insert(
            fingerprint.to_string(),
            CachedVerdict {
                verdict: verdict.clone(),
                created_at: now,
                expires_at: now + ttl,
                hit_count: 0,
            },
        );
        Ok(())
    }

    async fn sweep(&self, now: OffsetDateTime) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at >= now);
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{fixtures, Category};

    #[tokio::test]
    async fn entry_is_not_served_at_expiry() {
        let cache = InMemoryResponseCache::new();
        let now = OffsetDateTime::now_utc();
        let verdict = fixtures::verdict(Category::Bug);
        cache
            .store("fp", &verdict, Duration::hours(1), now)
            .await
            .unwrap();

        let just_before = now + Duration::hours(1) - Duration::milliseconds(1);
        assert!(cache.lookup("fp", just_before).await.unwrap().is_some());
        assert!(cache
            .lookup("fp", now + Duration::hours(1))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn hits_are_counted_and_reset_on_store() {
        let cache = InMemoryResponseCache::new();
        let now = OffsetDateTime::now_utc();
        let verdict = fixtures::verdict(Category::Question);
        cache.store("fp", &verdict, Duration::days(7), now).await.unwrap();

        cache.lookup("fp", now).await.unwrap();
        let second = cache.lookup("fp", now).await.unwrap().unwrap();
        assert_eq!(second.hit_count, 2);

        cache.store("fp", &verdict, Duration::days(7), now).await.unwrap();
        let after_store = cache.lookup("fp", now).await.unwrap().unwrap();
        assert_eq!(after_store.hit_count, 1);
    }

    #[tokio::test]
    async fn store_overwrites_last_writer_wins() {
        let cache = InMemoryResponseCache::new();
        let now = OffsetDateTime::now_utc();
        cache
            .store("fp", &fixtures::verdict(Category::Bug), Duration::days(7), now)
            .await
            .unwrap();
        cache
            .store("fp", &fixtures::verdict(Category::Critical), Duration::days(7), now)
            .await
            .unwrap();

        let entry = cache.lookup("fp", now).await.unwrap().unwrap();
        assert_eq!(entry.verdict.category, Category::Critical);
        assert_eq!(cache.len(), 1);
    }
}
