//! Connection pool setup and migration runner for the Postgres catalog
//! store.

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::error::{CoreError, Result};

const MAX_CONNECTIONS: u32 = 10;

pub async fn connect(database_url: &str) -> Result<PgPool> {
    info!("connecting to Postgres catalog store");
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await
        .map_err(CoreError::Database)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| CoreError::Internal(format!("migration failed: {e}")))
}
