use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use time::{Duration, OffsetDateTime};

use crate::domain::{
    models::TriageVerdict,
    ports::outbound::{CachedVerdict, ResponseCache},
    CacheError,
};

#[derive(Clone)]
pub struct PgResponseCache {
    pool: PgPool,
}

impl PgResponseCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResponseCache for PgResponseCache {
    async fn lookup(
        &self,
        fingerprint: &str,
        now: OffsetDateTime,
    ) -> Result<Option<CachedVerdict>, CacheError> {
        // Expiry is checked in the same statement that counts the hit.
        let row = sqlx::query_as::<_, CacheRow>(
            r#"
            UPDATE triage_response_cache
            SET hit_count = hit_count + 1
            WHERE fingerprint = $1 AND expires_at > $2
            RETURNING verdict, created_at, expires_at, hit_count
            "#,
        )
        .bind(fingerprint)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| CacheError::Storage(err.to_string()))?;

        Ok(row.map(|row| CachedVerdict {
            verdict: row.verdict.0,
            created_at: row.created_at,
            expires_at: row.expires_at,
            hit_count: row.hit_count,
        }))
    }

    async fn store(
        &self,
        fingerprint: &str,
        verdict: &TriageVerdict,
        ttl: Duration,
        now: OffsetDateTime,
    ) -> Result<(), CacheError> {
        sqlx::query(
            r#"
            INSERT INTO triage_response_cache (fingerprint, verdict, created_at, expires_at, hit_count)
            VALUES ($1, $2, $3, $4, 0)
            ON CONFLICT (fingerprint) DO UPDATE SET
                verdict = EXCLUDED.verdict,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at,
                hit_count = 0
            "#,
        )
        .bind(fingerprint)
        .bind(Json(verdict))
        .bind(now)
        .bind(now + ttl)
        .execute(&self.pool)
        .await
        .map_err(|err| CacheError::Storage(err.to_string()))?;

        Ok(())
    }

    async fn sweep(&self, now: OffsetDateTime) -> Result<usize, CacheError> {
        let result = sqlx::query("DELETE FROM triage_response_cache WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|err| CacheError::Storage(err.to_string()))?;

        Ok(result.rows_affected() as usize)
    }
}

#[derive(sqlx::FromRow)]
struct CacheRow {
    verdict: Json<TriageVerdict>,
    created_at: OffsetDateTime,
    expires_at: OffsetDateTime,
    hit_count: i64,
}
