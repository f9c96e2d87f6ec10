//! Records of each monthly AI-backfill batch, one row per run (dry-run or
//! not). Read back by nothing in this crate yet; the row exists so batch
//! history survives past the job's in-memory summary.

use sqlx::postgres::PgPool;

use alexandria_model::BackfillLog;

use crate::error::{CoreError, Result};

pub struct BackfillLogStore {
    pool: PgPool,
}

impl BackfillLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record_batch(&self, log: &BackfillLog) -> Result<()> {
        sqlx::query(
            "INSERT INTO backfill_log (year, month, books_generated, books_resolved, \
             books_unresolved, books_enriched, providers_used, prompt_variant, duration_ms, \
             dry_run, created_at) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)",
        )
        .bind(log.year)
        .bind(log.month as i32)
        .bind(log.books_generated as i32)
        .bind(log.books_resolved as i32)
        .bind(log.books_unresolved as i32)
        .bind(log.books_enriched as i32)
        .bind(&log.providers_used)
        .bind(&log.prompt_variant)
        .bind(log.duration_ms as i64)
        .bind(log.dry_run)
        .bind(log.created_at)
        .execute(&self.pool)
        .await
        .map_err(CoreError::Database)?;
        Ok(())
    }
}
