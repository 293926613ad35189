use std::str::FromStr;

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::PgPool;

use crate::domain::{
    models::{
        CodeChunk, Collection, Entity, IssueKey, IssueRef, IssueState, PullRequestRef,
        SimilarityHit,
    },
    ports::outbound::{SimilarityIndex, SimilarityQuery},
    EvidenceError,
};

/// pgvector-backed similarity search over the importer's embedding tables.
///
/// Similarity is cosine similarity, `1 - (embedding <=> query)`.
#[derive(Clone)]
pub struct PgSimilarityIndex {
    pool: PgPool,
}

impl PgSimilarityIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn similar_issues(
        &self,
        query: &SimilarityQuery,
    ) -> Result<Vec<SimilarityHit>, EvidenceError> {
        let rows = sqlx::query_as::<_, IssueHitRow>(
            r#"
            SELECT
                i.number,
                i.title,
                i.state,
                (1 - (e.embedding <=> $1))::float8 AS similarity
            FROM issue_embeddings e
            JOIN issues i ON i.project = e.project AND i.number = e.issue_number
            WHERE e.project = $2
              AND ($3::int IS NULL OR e.issue_number <> $3)
              AND 1 - (e.embedding <=> $1) >= $4
            ORDER BY e.embedding <=> $1, i.number
            LIMIT $5
            "#,
        )
        .bind(Vector::from(query.vector.clone()))
        .bind(query.project.as_str())
        .bind(query.exclude_issue)
        .bind(query.threshold)
        .bind(query.limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| EvidenceError::Index(err.to_string()))?;

        rows.into_iter()
            .map(|row| {
                let state = IssueState::from_str(&row.state)
                    .map_err(|_| EvidenceError::Index(format!("unknown issue state {}", row.state)))?;
                Ok(SimilarityHit {
                    entity: Entity::Issue(IssueRef {
                        number: row.number,
                        title: row.title,
                        state,
                    }),
                    similarity: row.similarity,
                })
            })
            .collect()
    }

    async fn similar_pull_requests(
        &self,
        query: &SimilarityQuery,
    ) -> Result<Vec<SimilarityHit>, EvidenceError> {
        let rows = sqlx::query_as::<_, PullRequestHitRow>(
            r#"
            SELECT
                pr_number,
                title,
                state,
                (1 - (embedding <=> $1))::float8 AS similarity
            FROM pr_embeddings
            WHERE project = $2
              AND 1 - (embedding <=> $1) >= $3
            ORDER BY embedding <=> $1, pr_number
            LIMIT $4
            "#,
        )
        .bind(Vector::from(query.vector.clone()))
        .bind(query.project.as_str())
        .bind(query.threshold)
        .bind(query.limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| EvidenceError::Index(err.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| SimilarityHit {
                entity: Entity::PullRequest(PullRequestRef {
                    number: row.pr_number,
                    title: row.title,
                    state: row.state,
                }),
                similarity: row.similarity,
            })
            .collect())
    }

    /// Code and docs share one table; documentation paths are picked out by the caller.
    async fn similar_chunks(
        &self,
        query: &SimilarityQuery,
    ) -> Result<Vec<SimilarityHit>, EvidenceError> {
        let rows = sqlx::query_as::<_, ChunkHitRow>(
            r#"
            SELECT
                filename,
                start_line,
                end_line,
                language,
                content,
                (1 - (embedding <=> $1))::float8 AS similarity
            FROM code_embeddings
            WHERE project = $2
              AND 1 - (embedding <=> $1) >= $3
            ORDER BY embedding <=> $1, id
            LIMIT $4
            "#,
        )
        .bind(Vector::from(query.vector.clone()))
        .bind(query.project.as_str())
        .bind(query.threshold)
        .bind(query.limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| EvidenceError::Index(err.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| SimilarityHit {
                entity: Entity::Chunk(CodeChunk {
                    filename: row.filename,
                    start_line: row.start_line,
                    end_line: row.end_line,
                    language: row.language,
                    content: row.content,
                }),
                similarity: row.similarity,
            })
            .collect())
    }
}

#[async_trait]
impl SimilarityIndex for PgSimilarityIndex {
    async fn query_vector(&self, key: &IssueKey) -> Result<Option<Vec<f32>>, EvidenceError> {
        let row: Option<(Vector,)> = sqlx::query_as(
            "SELECT embedding FROM issue_embeddings WHERE project = $1 AND issue_number = $2",
        )
        .bind(key.project.as_str())
        .bind(key.number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| EvidenceError::Index(err.to_string()))?;

        Ok(row.map(|(embedding,)| embedding.to_vec()))
    }

    async fn search_similar(
        &self,
        query: &SimilarityQuery,
    ) -> Result<Vec<SimilarityHit>, EvidenceError> {
        if query.vector.is_empty() || query.limit == 0 {
            return Ok(Vec::new());
        }
        match query.collection {
            Collection::Issues => self.similar_issues(query).await,
            Collection::PullRequests => self.similar_pull_requests(query).await,
            Collection::Code | Collection::Docs => self.similar_chunks(query).await,
        }
    }
}

#[derive(sqlx::FromRow)]
struct IssueHitRow {
    number: i32,
    title: String,
    state: String,
    similarity: f64,
}

#[derive(sqlx::FromRow)]
struct PullRequestHitRow {
    pr_number: i32,
    title: String,
    state: String,
    similarity: f64,
}

#[derive(sqlx::FromRow)]
struct ChunkHitRow {
    filename: String,
    start_line: i32,
    end_line: i32,
    language: Option<String>,
    content: String,
    similarity: f64,
}
