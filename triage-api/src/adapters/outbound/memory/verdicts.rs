use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::domain::{
    models::{IssueKey, ProjectId, StoredVerdict},
    ports::outbound::VerdictRepository,
    TriageError,
};

/// Keeps every saved verdict; the last one per issue is current.
#[derive(Clone, Default)]
pub struct InMemoryVerdictRepository {
    history: Arc<RwLock<HashMap<IssueKey, Vec<StoredVerdict>>>>,
}

impl InMemoryVerdictRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_current(&self, key: &IssueKey) -> bool {
        self.history
            .read()
            .unwrap()
            .get(key)
            .is_some_and(|h| !h.is_empty())
    }

    pub fn history_len(&self, key: &IssueKey) -> usize {
        self.history.read().unwrap().get(key).map_or(0, Vec::len)
    }
}

#[async_trait]
impl VerdictRepository for InMemoryVerdictRepository {
    async fn save(&self, verdict: &StoredVerdict) -> Result<(), TriageError> {
        self.history
            .write()
            .unwrap()
            .entry(verdict.key.clone())
            .or_default()
            .push(verdict.clone());
        Ok(())
    }

    async fn current(&self, key: &IssueKey) -> Result<Option<StoredVerdict>, TriageError> {
        Ok(self
            .history
            .read()
            .unwrap()
            .get(key)
            .and_then(|h| h.last().cloned()))
    }

    async fn current_for_project(
        &self,
        project: &ProjectId,
    ) -> Result<Vec<StoredVerdict>, TriageError> {
        let mut current: Vec<StoredVerdict> = self
            .history
            .read()
            .unwrap()
            .iter()
            .filter(|(key, _)| &key.project == project)
            .filter_map(|(_, h)| h.last().cloned())
            .collect();
        current.sort_by_key(|v| v.key.number);
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::domain::models::{fixtures, Category, VerdictSource};

    fn stored(number: i32, category: Category) -> StoredVerdict {
        StoredVerdict {
            key: IssueKey::new("acme-widget", number),
            verdict: fixtures::verdict(category),
            source: VerdictSource::Fresh,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn resave_supersedes_but_keeps_history() {
        let repo = InMemoryVerdictRepository::new();
        let key = IssueKey::new("acme-widget", 4);

        repo.save(&stored(4, Category::Bug)).await.unwrap();
        repo.save(&stored(4, Category::Critical)).await.unwrap();

        let current = repo.current(&key).await.unwrap().unwrap();
        assert_eq!(current.verdict.category, Category::Critical);
        assert_eq!(repo.history_len(&key), 2);
    }

    #[tokio::test]
    async fn project_listing_holds_only_current_rows() {
        let repo = InMemoryVerdictRepository::new();
        repo.save(&stored(9, Category::Bug)).await.unwrap();
        repo.save(&stored(2, Category::Question)).await.unwrap();
        repo.save(&stored(2, Category::FeatureRequest)).await.unwrap();

        let current = repo
            .current_for_project(&ProjectId::new("acme-widget"))
            .await
            .unwrap();

        let numbers: Vec<i32> = current.iter().map(|v| v.key.number).collect();
        assert_eq!(numbers, vec![2, 9]);
        assert_eq!(current[0].verdict.category, Category::FeatureRequest);
    }
}
