use std::str::FromStr;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::domain::{
    models::{Issue, IssueKey, IssueState, KnownIssue, ProjectId},
    ports::outbound::IssueCatalog,
    triage::fingerprint::normalize,
    TriageError,
};

/// Reads the issues imported from the source tracker.
#[derive(Clone)]
pub struct PgIssueCatalog {
    pool: PgPool,
}

impl PgIssueCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ISSUE_COLUMNS: &str =
    "i.project, i.number, i.title, i.body, i.state, i.author, i.labels, i.created_at, i.updated_at";

#[async_trait]
impl IssueCatalog for PgIssueCatalog {
    async fn get(&self, key: &IssueKey) -> Result<Option<Issue>, TriageError> {
        let row = sqlx::query_as::<_, IssueRow>(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues i WHERE i.project = $1 AND i.number = $2"
        ))
        .bind(key.project.as_str())
        .bind(key.number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| TriageError::Storage(err.to_string()))?;

        row.map(Issue::try_from).transpose()
    }

    async fn find_exact_text(&self, issue: &Issue) -> Result<Vec<KnownIssue>, TriageError> {
        let rows = sqlx::query_as::<_, KnownIssueRow>(
            r#"
            SELECT number, title, state
            FROM issues
            WHERE project = $1
              AND number <> $2
              AND btrim(regexp_replace(lower(title), '\s+', ' ', 'g')) = $3
              AND btrim(regexp_replace(lower(body), '\s+', ' ', 'g')) = $4
            ORDER BY number
            "#,
        )
        .bind(issue.key.project.as_str())
        .bind(issue.key.number)
        .bind(normalize(&issue.title))
        .bind(normalize(&issue.body))
        .fetch_all(&self.pool)
        .await
        .map_err(|err| TriageError::Storage(err.to_string()))?;

        rows.into_iter()
            .map(|row| {
                Ok(KnownIssue {
                    number: row.number,
                    title: row.title,
                    state: parse_state(&row.state)?,
                })
            })
            .collect()
    }

    async fn open_issues(&self, project: &ProjectId) -> Result<Vec<Issue>, TriageError> {
        let rows = sqlx::query_as::<_, IssueRow>(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues i \
             WHERE i.project = $1 AND i.state = 'open' ORDER BY i.number"
        ))
        .bind(project.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|err| TriageError::Storage(err.to_string()))?;

        rows.into_iter().map(Issue::try_from).collect()
    }

    async fn untriaged_open(&self, project: &ProjectId) -> Result<Vec<Issue>, TriageError> {
        let rows = sqlx::query_as::<_, IssueRow>(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues i \
             LEFT JOIN issue_verdicts v \
               ON v.project = i.project AND v.issue_number = i.number AND v.superseded_at IS NULL \
             WHERE i.project = $1 AND i.state = 'open' AND v.id IS NULL \
             ORDER BY i.number"
        ))
        .bind(project.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|err| TriageError::Storage(err.to_string()))?;

        rows.into_iter().map(Issue::try_from).collect()
    }
}

fn parse_state(state: &str) -> Result<IssueState, TriageError> {
    IssueState::from_str(state)
        .map_err(|_| TriageError::Storage(format!("unknown issue state: {state}")))
}

#[derive(sqlx::FromRow)]
struct IssueRow {
    project: String,
    number: i32,
    title: String,
    body: String,
    state: String,
    author: Option<String>,
    labels: Vec<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<IssueRow> for Issue {
    type Error = TriageError;

    fn try_from(row: IssueRow) -> Result<Self, Self::Error> {
        Ok(Issue {
            key: IssueKey::new(row.project, row.number),
            state: parse_state(&row.state)?,
            title: row.title,
            body: row.body,
            author: row.author,
            labels: row.labels,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct KnownIssueRow {
    number: i32,
    title: String,
    state: String,
}
