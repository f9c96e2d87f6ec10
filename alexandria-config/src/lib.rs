//! Process configuration, loaded once at startup from environment variables
//! (plus an optional `.env` file). Missing *secrets* make the corresponding
//! provider report itself unavailable rather than crashing the process;
//! missing *required* settings (bind address, database URL) fail fast.

use std::env;

use alexandria_contracts::quota::QuotaConfig;

/// Top-level process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,

    pub database_url: String,
    pub redis_url: String,

    pub cors_allowed_origins: Vec<String>,
    pub dev_mode: bool,

    pub providers: ProviderConfig,
    pub quota: QuotaConfig,
    pub queue: QueueConfig,
    pub harvest: HarvestConfig,
}

/// API keys for external providers. Each is optional; its absence is read by
/// the corresponding provider's `is_available` check, not by this crate.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    pub isbndb_api_key: Option<String>,
    pub google_books_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub object_store_bucket: Option<String>,
    pub object_store_public_base_url: Option<String>,
    pub object_store_endpoint_url: Option<String>,
    pub object_store_access_key_id: Option<String>,
    pub object_store_secret_access_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub enrichment_batch_size: usize,
    pub cover_batch_size: usize,
    pub author_batch_size: usize,
    pub batch_concurrency: usize,
    pub max_retries: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            enrichment_batch_size: 10,
            cover_batch_size: 5,
            author_batch_size: 10,
            batch_concurrency: 8,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub max_authors_per_invocation: usize,
    pub sub_batch_size: usize,
    pub enhancement_daily_cap: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_authors_per_invocation: 40,
            sub_batch_size: 10,
            enhancement_daily_cap: 500,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let dev_mode = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        let providers = ProviderConfig {
            isbndb_api_key: env::var("ISBNDB_API_KEY").ok(),
            google_books_api_key: env::var("GOOGLE_BOOKS_API_KEY").ok(),
            gemini_api_key: env::var("GEMINI_API_KEY").ok(),
            object_store_bucket: env::var("OBJECT_STORE_BUCKET").ok(),
            object_store_public_base_url: env::var("OBJECT_STORE_PUBLIC_BASE_URL").ok(),
            object_store_endpoint_url: env::var("OBJECT_STORE_ENDPOINT_URL").ok(),
            object_store_access_key_id: env::var("OBJECT_STORE_ACCESS_KEY_ID").ok(),
            object_store_secret_access_key: env::var("OBJECT_STORE_SECRET_ACCESS_KEY").ok(),
        };

        let quota = QuotaConfig {
            daily_limit: parse_env_or("ISBNDB_DAILY_LIMIT", 15_000),
            buffer: parse_env_or("ISBNDB_DAILY_BUFFER", 2_000),
            bulk_operation_ceiling: parse_env_or("ISBNDB_BULK_CEILING", 100),
            cron_multiplier: parse_env_or("ISBNDB_CRON_MULTIPLIER", 2),
            batch_multiplier: parse_env_or("ISBNDB_BATCH_MULTIPLIER", 1),
        };

        Ok(Self {
            server_host,
            server_port,
            database_url,
            redis_url,
            cors_allowed_origins,
            dev_mode,
            providers,
            quota,
            queue: QueueConfig::default(),
            harvest: HarvestConfig::default(),
        })
    }
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_or_falls_back_to_default_when_unset() {
        let value: i64 = parse_env_or("ALEXANDRIA_DOES_NOT_EXIST_KEY", 42);
        assert_eq!(value, 42);
    }
}
