use async_trait::async_trait;
use sqlx::PgPool;
use time::Date;

use crate::domain::{
    models::{CostRecord, UsageEntry},
    ports::outbound::CostLedger,
    LedgerError,
};

use super::{to_i64, to_u64};

/// One row per UTC day, only ever incremented.
#[derive(Clone)]
pub struct PgCostLedger {
    pool: PgPool,
}

impl PgCostLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CostLedger for PgCostLedger {
    async fn record(&self, entry: &UsageEntry) -> Result<(), LedgerError> {
        let mut delta = CostRecord::empty(entry.date);
        delta.apply(entry);

        sqlx::query(
            r#"
            INSERT INTO cost_records
                (day, llm_calls, input_tokens, output_tokens, cost_usd, cache_hits, cache_misses)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (day) DO UPDATE SET
                llm_calls = cost_records.llm_calls + EXCLUDED.llm_calls,
                input_tokens = cost_records.input_tokens + EXCLUDED.input_tokens,
                output_tokens = cost_records.output_tokens + EXCLUDED.output_tokens,
                cost_usd = cost_records.cost_usd + EXCLUDED.cost_usd,
                cache_hits = cost_records.cache_hits + EXCLUDED.cache_hits,
                cache_misses = cost_records.cache_misses + EXCLUDED.cache_misses
            "#,
        )
        .bind(delta.date)
        .bind(to_i64(delta.llm_calls))
        .bind(to_i64(delta.input_tokens))
        .bind(to_i64(delta.output_tokens))
        .bind(delta.cost_usd)
        .bind(to_i64(delta.cache_hits))
        .bind(to_i64(delta.cache_misses))
        .execute(&self.pool)
        .await
        .map_err(|err| LedgerError::Storage(err.to_string()))?;

        Ok(())
    }

    async fn day(&self, date: Date) -> Result<CostRecord, LedgerError> {
        let row = sqlx::query_as::<_, CostRow>(
            r#"
            SELECT day, llm_calls, input_tokens, output_tokens, cost_usd, cache_hits, cache_misses
            FROM cost_records
            WHERE day = $1
            "#,
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| LedgerError::Storage(err.to_string()))?;

        Ok(row.map_or_else(|| CostRecord::empty(date), CostRecord::from))
    }

    async fn range(&self, from: Date, to: Date) -> Result<Vec<CostRecord>, LedgerError> {
        let rows = sqlx::query_as::<_, CostRow>(
            r#"
            SELECT day, llm_calls, input_tokens, output_tokens, cost_usd, cache_hits, cache_misses
            FROM cost_records
            WHERE day BETWEEN $1 AND $2
            ORDER BY day
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| LedgerError::Storage(err.to_string()))?;

        Ok(rows.into_iter().map(CostRecord::from).collect())
    }
}

#[derive(sqlx::FromRow)]
struct CostRow {
    day: Date,
    llm_calls: i64,
    input_tokens: i64,
    output_tokens: i64,
    cost_usd: f64,
    cache_hits: i64,
    cache_misses: i64,
}

impl From<CostRow> for CostRecord {
    fn from(row: CostRow) -> Self {
        CostRecord {
            date: row.day,
            llm_calls: to_u64(row.llm_calls),
            input_tokens: to_u64(row.input_tokens),
            output_tokens: to_u64(row.output_tokens),
            cost_usd: row.cost_usd,
            cache_hits: to_u64(row.cache_hits),
            cache_misses: to_u64(row.cache_misses),
        }
    }
}
