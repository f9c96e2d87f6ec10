//! Postgres-backed `QueueService`: a single `jobs` table carrying kind,
//! JSON payload, priority, and lease state. Dequeue uses `FOR UPDATE SKIP
//! LOCKED` so concurrent batch consumers never double-lease a row.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use alexandria_contracts::error::Result as AlexandriaResult;
use alexandria_contracts::queue::{JobKind, JobLease, JobOutcome, JobPayload, JobPriority, LeaseId, QueueService, MAX_RETRIES};

use crate::error::CoreError;

pub struct PostgresQueueService {
    pool: PgPool,
}

impl PostgresQueueService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn kind_to_str(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Enrichment => "enrichment",
        JobKind::Cover => "cover",
        JobKind::Author => "author",
    }
}

fn str_to_kind(s: &str) -> Option<JobKind> {
    match s {
        "enrichment" => Some(JobKind::Enrichment),
        "cover" => Some(JobKind::Cover),
        "author" => Some(JobKind::Author),
        _ => None,
    }
}

fn priority_to_i16(priority: JobPriority) -> i16 {
    match priority {
        JobPriority::Low => 0,
        JobPriority::Normal => 1,
        JobPriority::High => 2,
    }
}

#[async_trait]
impl QueueService for PostgresQueueService {
    async fn enqueue(&self, kind: JobKind, payload: JobPayload, priority: JobPriority) -> AlexandriaResult<()> {
        let payload_json = serde_json::to_value(&payload).map_err(CoreError::Serialization)?;
        sqlx::query("INSERT INTO jobs (kind, payload, priority, status) VALUES ($1, $2, $3, 'ready')")
            .bind(kind_to_str(kind))
            .bind(payload_json)
            .bind(priority_to_i16(priority))
            .execute(&self.pool)
            .await
            .map_err(CoreError::Database)?;
        Ok(())
    }

    async fn dequeue_batch(&self, kind: JobKind) -> AlexandriaResult<Vec<JobLease>> {
        let limit = kind.max_batch_size() as i64;
        let mut tx = self.pool.begin().await.map_err(CoreError::Database)?;

        let rows = sqlx::query(
            "SELECT id, payload, attempt FROM jobs \
             WHERE kind = $1 AND status = 'ready' \
             ORDER BY priority DESC, id ASC \
             LIMIT $2 \
             FOR UPDATE SKIP LOCKED",
        )
        .bind(kind_to_str(kind))
        .bind(limit)
        .fetch_all(&mut *tx)
        .await
        .map_err(CoreError::Database)?;

        let mut leases = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("id").map_err(CoreError::Database)?;
            sqlx::query("UPDATE jobs SET status = 'leased', leased_at = now(), updated_at = now() WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(CoreError::Database)?;

            let payload_json: serde_json::Value = row.try_get("payload").map_err(CoreError::Database)?;
            let payload: JobPayload = serde_json::from_value(payload_json).map_err(CoreError::Serialization)?;
            let attempt: i32 = row.try_get("attempt").map_err(CoreError::Database)?;

            leases.push(JobLease {
                lease_id: LeaseId(id as u64),
                kind,
                payload,
                attempt: attempt as u32,
            });
        }

        tx.commit().await.map_err(CoreError::Database)?;
        Ok(leases)
    }

    async fn resolve(&self, lease_id: LeaseId, outcome: JobOutcome) -> AlexandriaResult<()> {
        let id = lease_id.0 as i64;
        match outcome {
            JobOutcome::Ack => {
                sqlx::query("DELETE FROM jobs WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(CoreError::Database)?;
            }
            JobOutcome::PermanentFailure { error } => {
                sqlx::query("UPDATE jobs SET status = 'dead_letter', last_error = $2, updated_at = now() WHERE id = $1")
                    .bind(id)
                    .bind(error)
                    .execute(&self.pool)
                    .await
                    .map_err(CoreError::Database)?;
            }
            JobOutcome::Retry { error } => {
                let row = sqlx::query("SELECT attempt FROM jobs WHERE id = $1")
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(CoreError::Database)?;
                let attempt: i32 = row.try_get("attempt").map_err(CoreError::Database)?;
                let next_attempt = attempt + 1;

                if next_attempt as u32 > MAX_RETRIES {
                    sqlx::query(
                        "UPDATE jobs SET status = 'dead_letter', attempt = $2, last_error = $3, updated_at = now() WHERE id = $1",
                    )
                    .bind(id)
                    .bind(next_attempt)
                    .bind(error)
                    .execute(&self.pool)
                    .await
                    .map_err(CoreError::Database)?;
                } else {
                    sqlx::query(
                        "UPDATE jobs SET status = 'ready', attempt = $2, last_error = $3, updated_at = now() WHERE id = $1",
                    )
                    .bind(id)
                    .bind(next_attempt)
                    .bind(error)
                    .execute(&self.pool)
                    .await
                    .map_err(CoreError::Database)?;
                }
            }
        }
        Ok(())
    }

    async fn queue_depth(&self, kind: JobKind) -> AlexandriaResult<usize> {
        let row = sqlx::query("SELECT count(*) AS n FROM jobs WHERE kind = $1 AND status = 'ready'")
            .bind(kind_to_str(kind))
            .fetch_one(&self.pool)
            .await
            .map_err(CoreError::Database)?;
        let n: i64 = row.try_get("n").map_err(CoreError::Database)?;
        Ok(n as usize)
    }

    async fn dead_letter_depth(&self, kind: JobKind) -> AlexandriaResult<usize> {
        let row = sqlx::query("SELECT count(*) AS n FROM jobs WHERE kind = $1 AND status = 'dead_letter'")
            .bind(kind_to_str(kind))
            .fetch_one(&self.pool)
            .await
            .map_err(CoreError::Database)?;
        let n: i64 = row.try_get("n").map_err(CoreError::Database)?;
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strings_round_trip() {
        for kind in [JobKind::Enrichment, JobKind::Cover, JobKind::Author] {
            assert_eq!(str_to_kind(kind_to_str(kind)), Some(kind));
        }
    }
}
