use async_trait::async_trait;

use crate::domain::{
    models::{Issue, IssueKey, KnownIssue, ProjectId},
    TriageError,
};

/// Outbound port for imported issues.
#[async_trait]
pub trait IssueCatalog: Send + Sync + 'static {
    async fn get(&self, key: &IssueKey) -> Result<Option<Issue>, TriageError>;

    /// Other issues in the same project whose normalized title and body equal this one's.
    async fn find_exact_text(&self, issue: &Issue) -> Result<Vec<KnownIssue>, TriageError>;

    /// Open issues, ordered by number.
    async fn open_issues(&self, project: &ProjectId) -> Result<Vec<Issue>, TriageError>;

    /// Open issues without a current verdict, ordered by number.
    async fn untriaged_open(&self, project: &ProjectId) -> Result<Vec<Issue>, TriageError>;
}
