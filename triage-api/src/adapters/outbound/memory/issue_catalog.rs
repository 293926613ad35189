use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::domain::{
    models::{Issue, IssueKey, KnownIssue, ProjectId},
    ports::outbound::IssueCatalog,
    triage::fingerprint::normalize,
    TriageError,
};

use super::InMemoryVerdictRepository;

#[derive(Clone, Default)]
pub struct InMemoryIssueCatalog {
    issues: Arc<RwLock<BTreeMap<IssueKey, Issue>>>,
    verdicts: Option<InMemoryVerdictRepository>,
}

impl InMemoryIssueCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `verdicts` to decide which issues are still untriaged.
    pub fn with_verdicts(mut self, verdicts: InMemoryVerdictRepository) -> Self {
        self.verdicts = Some(verdicts);
        self
    }

    pub fn with_issues(self, issues: Vec<Issue>) -> Self {
        for issue in issues {
            self.insert(issue);
        }
        self
    }

    pub fn insert(&self, issue: Issue) {
        self.issues.write().unwrap().insert(issue.key.clone(), issue);
    }
}

#[async_trait]
impl IssueCatalog for InMemoryIssueCatalog {
    async fn get(&self, key: &IssueKey) -> Result<Option<Issue>, TriageError> {
        Ok(self.issues.read().unwrap().get(key).cloned())
    }

    async fn find_exact_text(&self, issue: &Issue) -> Result<Vec<KnownIssue>, TriageError> {
        let title = normalize(&issue.title);
        let body = normalize(&issue.body);
        Ok(self
            .issues
            .read()
            .unwrap()
            .values()
            .filter(|other| {
                other.key.project == issue.key.project
                    && other.key.number != issue.key.number
                    && normalize(&other.title) == title
                    && normalize(&other.body) == body
            })
            .map(|other| KnownIssue {
                number: other.key.number,
                title: other.title.clone(),
                state: other.state,
            })
            .collect())
    }

    async fn open_issues(&self, project: &ProjectId) -> Result<Vec<Issue>, TriageError> {
        Ok(self
            .issues
            .read()
            .unwrap()
            .values()
            .filter(|issue| &issue.key.project == project && issue.is_open())
            .cloned()
            .collect())
    }

    async fn untriaged_open(&self, project: &ProjectId) -> Result<Vec<Issue>, TriageError> {
        let open = self.open_issues(project).await?;
        Ok(match &self.verdicts {
            Some(verdicts) => open
                .into_iter()
                .filter(|issue| !verdicts.has_current(&issue.key))
                .collect(),
            None => open,
        })
    }
}
