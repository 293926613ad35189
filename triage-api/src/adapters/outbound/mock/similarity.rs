use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::domain::{
    models::{Collection, Entity, IssueKey, SimilarityHit},
    ports::outbound::{SimilarityIndex, SimilarityQuery},
    EvidenceError,
};

/// Mock index with per-collection canned hits.
///
/// Clones share state, so a test can keep a handle and configure the index
/// after it has been handed to the engine.
#[derive(Clone, Default)]
pub struct MockSimilarityIndex {
    vectors: Arc<RwLock<HashMap<i32, Vec<f32>>>>,
    hits: Arc<RwLock<HashMap<Collection, Vec<SimilarityHit>>>>,
    delays: Arc<RwLock<HashMap<Collection, Duration>>>,
    failing: Arc<RwLock<HashSet<Collection>>>,
    search_count: Arc<AtomicUsize>,
}

impl MockSimilarityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_vector(&self, number: i32, vector: Vec<f32>) {
        self.vectors.write().unwrap().insert(number, vector);
    }

    pub fn set_hits(&self, collection: Collection, hits: Vec<SimilarityHit>) {
        self.hits.write().unwrap().insert(collection, hits);
    }

    pub fn set_delay(&self, collection: Collection, delay: Duration) {
        self.delays.write().unwrap().insert(collection, delay);
    }

    pub fn set_failing(&self, collection: Collection) {
        self.failing.write().unwrap().insert(collection);
    }

    pub fn search_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.search_count)
    }
}

#[async_trait]
impl SimilarityIndex for MockSimilarityIndex {
    async fn query_vector(&self, key: &IssueKey) -> Result<Option<Vec<f32>>, EvidenceError> {
        Ok(self.vectors.read().unwrap().get(&key.number).cloned())
    }

    async fn search_similar(
        &self,
        query: &SimilarityQuery,
    ) -> Result<Vec<SimilarityHit>, EvidenceError> {
        self.search_count.fetch_add(1, Ordering::SeqCst);

        let delay = self.delays.read().unwrap().get(&query.collection).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.read().unwrap().contains(&query.collection) {
            return Err(EvidenceError::Index(format!(
                "{} collection unavailable",
                query.collection
            )));
        }

        let mut hits: Vec<SimilarityHit> = self
            .hits
            .read()
            .unwrap()
            .get(&query.collection)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|hit| hit.similarity >= query.threshold)
            .filter(|hit| match (&hit.entity, query.exclude_issue) {
                (Entity::Issue(issue), Some(excluded)) => issue.number != excluded,
                _ => true,
            })
            .collect();
        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(query.limit);
        Ok(hits)
    }
}
