use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};

use crate::domain::{models::KnowledgeHit, ports::outbound::SearchCache, CacheError};

#[derive(Clone, Default)]
pub struct InMemorySearchCache {
    entries: Arc<RwLock<HashMap<String, (Vec<KnowledgeHit>, OffsetDateTime)>>>,
}

impl InMemorySearchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }
}

#[async_trait]
impl SearchCache for InMemorySearchCache {
    async fn get(
        &self,
        key: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Vec<KnowledgeHit>>, CacheError> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .get(key)
            .filter(|(_, expires_at)| now < *expires_at)
            .map(|(hits, _)| hits.clone()))
    }

    async fn put(
        &self,
        key: &str,
        hits: &[KnowledgeHit],
        ttl: Duration,
        now: OffsetDateTime,
    ) -> Result<(), CacheError> {
        self.entries
            .write()
            .unwrap()
            .insert(key.to_string(), (hits.to_vec(), now + ttl));
        Ok(())
    }

    async fn sweep(&self, now: OffsetDateTime) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|_, (_, expires_at)| *expires_at >= now);
        Ok(before - entries.len())
    }
}
