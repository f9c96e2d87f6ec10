//! Postgres-backed `WorkResolutionRepository`, using `pg_trgm`'s
//! `similarity()` for the fuzzy title/author paths.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use alexandria_model::{AuthorKey, Isbn, WorkKey};

use crate::dedup::{WorkResolutionRepository, AUTHOR_TRIGRAM_THRESHOLD, TITLE_TRIGRAM_THRESHOLD};
use crate::error::{CoreError, Result};

pub struct PostgresWorkResolutionRepository {
    pool: PgPool,
}

impl PostgresWorkResolutionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkResolutionRepository for PostgresWorkResolutionRepository {
    async fn work_key_for_isbn(&self, isbn: &Isbn) -> Result<Option<WorkKey>> {
        let row = sqlx::query("SELECT work_key FROM editions WHERE isbn = $1")
            .bind(isbn.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(CoreError::Database)?;

        row.map(|r| {
            let key: String = r.try_get("work_key").map_err(CoreError::Database)?;
            WorkKey::parse(&key).map_err(CoreError::Model)
        })
        .transpose()
    }

    async fn fuzzy_title_match(&self, title: &str, authors: &[String]) -> Result<Option<WorkKey>> {
        if authors.is_empty() {
            return Ok(None);
        }

        let row = sqlx::query(
            "SELECT w.work_key FROM works w \
             JOIN work_author_links l ON l.work_key = w.work_key \
             JOIN authors a ON a.author_key = l.author_key \
             WHERE a.normalized_name = ANY($1) \
             ORDER BY similarity(w.title, $2) DESC LIMIT 1",
        )
        .bind(authors)
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(CoreError::Database)?;

        let Some(row) = row else { return Ok(None) };

        let sim_row = sqlx::query("SELECT similarity(title, $1) AS sim FROM works WHERE work_key = $2")
            .bind(title)
            .bind(row.try_get::<String, _>("work_key").map_err(CoreError::Database)?)
            .fetch_one(&self.pool)
            .await
            .map_err(CoreError::Database)?;
        let sim: f32 = sim_row.try_get("sim").map_err(CoreError::Database)?;

        if (sim as f64) < TITLE_TRIGRAM_THRESHOLD {
            return Ok(None);
        }

        let key: String = row.try_get("work_key").map_err(CoreError::Database)?;
        Ok(Some(WorkKey::parse(&key).map_err(CoreError::Model)?))
    }

    async fn exact_title_match(&self, title: &str) -> Result<Option<WorkKey>> {
        let row = sqlx::query("SELECT work_key FROM works WHERE lower(title) = lower($1) LIMIT 1")
            .bind(title)
            .fetch_optional(&self.pool)
            .await
            .map_err(CoreError::Database)?;

        row.map(|r| {
            let key: String = r.try_get("work_key").map_err(CoreError::Database)?;
            WorkKey::parse(&key).map_err(CoreError::Model)
        })
        .transpose()
    }

    async fn author_key_for_normalized_name(&self, normalized_name: &str) -> Result<Option<AuthorKey>> {
        let row = sqlx::query("SELECT author_key FROM authors WHERE normalized_name = $1")
            .bind(normalized_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(CoreError::Database)?;

        row.map(|r| {
            let key: String = r.try_get("author_key").map_err(CoreError::Database)?;
            AuthorKey::parse(&key).map_err(CoreError::Model)
        })
        .transpose()
    }

    async fn fuzzy_author_match(&self, normalized_name: &str) -> Result<Option<AuthorKey>> {
        let row = sqlx::query(
            "SELECT author_key, similarity(normalized_name, $1) AS sim FROM authors \
             ORDER BY sim DESC LIMIT 1",
        )
        .bind(normalized_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(CoreError::Database)?;

        let Some(row) = row else { return Ok(None) };
        let sim: f32 = row.try_get("sim").map_err(CoreError::Database)?;
        if (sim as f64) < AUTHOR_TRIGRAM_THRESHOLD {
            return Ok(None);
        }

        let key: String = row.try_get("author_key").map_err(CoreError::Database)?;
        Ok(Some(AuthorKey::parse(&key).map_err(CoreError::Model)?))
    }

    async fn related_isbns_for_authors(&self, authors: &[String]) -> Result<Vec<String>> {
        if authors.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT e.isbn FROM editions e \
             JOIN work_author_links l ON l.work_key = e.work_key \
             JOIN authors a ON a.author_key = l.author_key \
             WHERE a.normalized_name = ANY($1)",
        )
        .bind(authors)
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::Database)?;

        rows.into_iter()
            .map(|r| r.try_get::<String, _>("isbn").map_err(CoreError::Database))
            .collect()
    }
}
