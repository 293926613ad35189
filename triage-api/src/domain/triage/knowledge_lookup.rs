//! External knowledge lookup with a per-source search cache in front.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use futures::future::join_all;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::domain::{
    models::KnowledgeHit,
    ports::outbound::{KnowledgeSource, SearchCache},
};

use super::fingerprint::{normalize, search_cache_key};

#[derive(Debug, Clone)]
pub struct KnowledgeLookupConfig {
    pub cache_ttl: time::Duration,
    pub timeout: std::time::Duration,
    pub per_source_limit: usize,
    pub max_results: usize,
}

impl Default for KnowledgeLookupConfig {
    fn default() -> Self {
        Self {
            cache_ttl: time::Duration::hours(24),
            timeout: std::time::Duration::from_secs(5),
            per_source_limit: 5,
            max_results: 5,
        }
    }
}

/// Fans a query out to every configured source, serving repeats from the search cache.
///
/// Failed or timed-out sources contribute nothing and are not cached.
///
/// # Example
///
/// ```ignore
/// let lookup = CachedKnowledgeLookup::new(sources, search_cache, KnowledgeLookupConfig::default());
/// let hits = lookup.search("tokio runtime panics on shutdown", OffsetDateTime::now_utc()).await;
/// assert!(hits.len() <= 5);
/// ```
pub struct CachedKnowledgeLookup {
    sources: Vec<Arc<dyn KnowledgeSource>>,
    cache: Arc<dyn SearchCache>,
    config: KnowledgeLookupConfig,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl CachedKnowledgeLookup {
    pub fn new(
        sources: Vec<Arc<dyn KnowledgeSource>>,
        cache: Arc<dyn SearchCache>,
        config: KnowledgeLookupConfig,
    ) -> Self {
        Self {
            sources,
            cache,
            config,
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        }
    }

    pub fn has_sources(&self) -> bool {
        !self.sources.is_empty()
    }

    /// Search cache `(hits, misses)` since construction.
    pub fn cache_stats(&self) -> (u64, u64) {
        (
            self.cache_hits.load(Ordering::Relaxed),
            self.cache_misses.load(Ordering::Relaxed),
        )
    }

    /// Merged hits, most relevant first, capped at `max_results`.
    pub async fn search(&self, query: &str, now: OffsetDateTime) -> Vec<KnowledgeHit> {
        if normalize(query).is_empty() {
            return Vec::new();
        }

        let per_source = join_all(
            self.sources
                .iter()
                .map(|source| self.search_source(source.as_ref(), query, now)),
        )
        .await;

        let mut ranked: Vec<(usize, usize, KnowledgeHit)> = per_source
            .into_iter()
            .enumerate()
            .flat_map(|(source_idx, hits)| {
                hits.into_iter()
                    .enumerate()
                    .map(move |(rank, hit)| (source_idx, rank, hit))
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.2.relevance
                .total_cmp(&a.2.relevance)
                .then(a.0.cmp(&b.0))
                .then(a.1.cmp(&b.1))
        });

        let (hits, misses) = self.cache_stats();
        debug!(
            results = ranked.len(),
            cache_hits = hits,
            cache_misses = misses,
            "Knowledge lookup completed"
        );

        ranked
            .into_iter()
            .take(self.config.max_results)
            .map(|(_, _, hit)| hit)
            .collect()
    }

    async fn search_source(
        &self,
        source: &dyn KnowledgeSource,
        query: &str,
        now: OffsetDateTime,
    ) -> Vec<KnowledgeHit> {
        let key = search_cache_key(source.name(), query);

        match self.cache.get(&key, now).await {
            Ok(Some(hits)) => {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                return hits;
            }
            Ok(None) => {}
            Err(e) => warn!(source = source.name(), error = %e, "Search cache read failed"),
        }
        self.cache_misses.fetch_add(1, Ordering::Relaxed);

        let result = tokio::time::timeout(
            self.config.timeout,
            source.search(query, self.config.per_source_limit),
        )
        .await;

        let hits = match result {
            Ok(Ok(hits)) => hits,
            Ok(Err(e)) => {
                warn!(source = source.name(), error = %e, "Knowledge source failed");
                return Vec::new();
            }
            Err(_) => {
                warn!(source = source.name(), "Knowledge source timed out");
                return Vec::new();
            }
        };

        let hits: Vec<KnowledgeHit> = hits
            .into_iter()
            .enumerate()
            .map(|(rank, hit)| KnowledgeHit {
                relevance: 1.0 / (1.0 + rank as f64),
                ..hit
            })
            .collect();

        if let Err(e) = self
            .cache
            .put(&key, &hits, self.config.cache_ttl, now)
            .await
        {
            warn!(source = source.name(), error = %e, "Search cache write failed");
        }

        hits
    }
}
