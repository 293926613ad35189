use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use time::{Duration, OffsetDateTime};

use crate::domain::{models::KnowledgeHit, ports::outbound::SearchCache, CacheError};

#[derive(Clone)]
pub struct PgSearchCache {
    pool: PgPool,
}

impl PgSearchCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SearchCache for PgSearchCache {
    async fn get(
        &self,
        key: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Vec<KnowledgeHit>>, CacheError> {
        let row: Option<(Json<Vec<KnowledgeHit>>,)> = sqlx::query_as(
            "SELECT results FROM search_cache WHERE cache_key = $1 AND expires_at > $2",
        )
        .bind(key)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| CacheError::Storage(err.to_string()))?;

        Ok(row.map(|(results,)| results.0))
    }

    async fn put(
        &self,
        key: &str,
        hits: &[KnowledgeHit],
        ttl: Duration,
        now: OffsetDateTime,
    ) -> Result<(), CacheError> {
        sqlx::query(
            r#"
            INSERT INTO search_cache (cache_key, results, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (cache_key) DO UPDATE SET
                results = EXCLUDED.results,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(key)
        .bind(Json(hits))
        .bind(now)
        .bind(now + ttl)
        .execute(&self.pool)
        .await
        .map_err(|err| CacheError::Storage(err.to_string()))?;

        Ok(())
    }

    async fn sweep(&self, now: OffsetDateTime) -> Result<usize, CacheError> {
        let result = sqlx::query("DELETE FROM search_cache WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|err| CacheError::Storage(err.to_string()))?;

        Ok(result.rows_affected() as usize)
    }
}
