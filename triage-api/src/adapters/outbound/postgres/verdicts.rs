use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use time::OffsetDateTime;

use crate::domain::{
    models::{IssueKey, ProjectId, StoredVerdict, TriageVerdict, VerdictSource},
    ports::outbound::VerdictRepository,
    TriageError,
};

/// Append-only verdict history; the current row has `superseded_at IS NULL`.
#[derive(Clone)]
pub struct PgVerdictRepository {
    pool: PgPool,
}

impl PgVerdictRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VerdictRepository for PgVerdictRepository {
    async fn save(&self, verdict: &StoredVerdict) -> Result<(), TriageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| TriageError::Storage(err.to_string()))?;

        sqlx::query(
            r#"
            UPDATE issue_verdicts
            SET superseded_at = $3
            WHERE project = $1 AND issue_number = $2 AND superseded_at IS NULL
            "#,
        )
        .bind(verdict.key.project.as_str())
        .bind(verdict.key.number)
        .bind(verdict.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|err| TriageError::Storage(err.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO issue_verdicts (project, issue_number, verdict, source, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(verdict.key.project.as_str())
        .bind(verdict.key.number)
        .bind(Json(&verdict.verdict))
        .bind(verdict.source.to_string())
        .bind(verdict.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|err| TriageError::Storage(err.to_string()))?;

        tx.commit()
            .await
            .map_err(|err| TriageError::Storage(err.to_string()))
    }

    async fn current(&self, key: &IssueKey) -> Result<Option<StoredVerdict>, TriageError> {
        let row = sqlx::query_as::<_, VerdictRow>(
            r#"
            SELECT project, issue_number, verdict, source, created_at
            FROM issue_verdicts
            WHERE project = $1 AND issue_number = $2 AND superseded_at IS NULL
            "#,
        )
        .bind(key.project.as_str())
        .bind(key.number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| TriageError::Storage(err.to_string()))?;

        row.map(StoredVerdict::try_from).transpose()
    }

    async fn current_for_project(
        &self,
        project: &ProjectId,
    ) -> Result<Vec<StoredVerdict>, TriageError> {
        let rows = sqlx::query_as::<_, VerdictRow>(
            r#"
            SELECT project, issue_number, verdict, source, created_at
            FROM issue_verdicts
            WHERE project = $1 AND superseded_at IS NULL
            ORDER BY issue_number
            "#,
        )
        .bind(project.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|err| TriageError::Storage(err.to_string()))?;

        rows.into_iter().map(StoredVerdict::try_from).collect()
    }
}

#[derive(sqlx::FromRow)]
struct VerdictRow {
    project: String,
    issue_number: i32,
    verdict: Json<TriageVerdict>,
    source: String,
    created_at: OffsetDateTime,
}

impl TryFrom<VerdictRow> for StoredVerdict {
    type Error = TriageError;

    fn try_from(row: VerdictRow) -> Result<Self, Self::Error> {
        let source = VerdictSource::from_str(&row.source)
            .map_err(|_| TriageError::Storage(format!("unknown verdict source: {}", row.source)))?;
        Ok(StoredVerdict {
            key: IssueKey::new(row.project, row.issue_number),
            verdict: row.verdict.0,
            source,
            created_at: row.created_at,
        })
    }
}
