use alexandria_contracts::error::AlexandriaError;
use thiserror::Error;

/// Internal error type for `alexandria-core`. Carries the underlying cause
/// (`sqlx`, `reqwest`, `redis`, `serde_json`) for logging; narrows to the
/// closed `AlexandriaError` set before crossing into `alexandria-server`.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("model error: {0}")]
    Model(#[from] alexandria_model::ModelError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("isbndb error: {0}")]
    Isbndb(String),

    #[error("google books error: {0}")]
    GoogleBooks(String),

    #[error("openlibrary error: {0}")]
    Openlibrary(String),

    #[error("object store error: {0}")]
    ObjectStore(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl From<CoreError> for AlexandriaError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::Validation(_) => AlexandriaError::Validation(message),
            CoreError::NotFound(_) => AlexandriaError::NotFound(message),
            CoreError::RateLimitExceeded(_) => AlexandriaError::RateLimitExceeded(message),
            CoreError::Isbndb(_) => AlexandriaError::Isbndb(message),
            CoreError::GoogleBooks(_) => AlexandriaError::GoogleBooks(message),
            CoreError::Openlibrary(_) => AlexandriaError::Openlibrary(message),
            CoreError::Provider(_) => AlexandriaError::Provider(message),
            CoreError::Database(sqlx::Error::PoolTimedOut) | CoreError::Timeout(_) => {
                AlexandriaError::DatabaseTimeout(message)
            }
            CoreError::Database(_) | CoreError::Cache(_) => AlexandriaError::Database(message),
            CoreError::Http(_)
            | CoreError::Serialization(_)
            | CoreError::Model(_)
            | CoreError::Internal(_)
            | CoreError::ObjectStore(_) => AlexandriaError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_timeout_maps_to_database_timeout_kind() {
        let err = CoreError::Timeout("pool exhausted".into());
        let mapped: AlexandriaError = err.into();
        assert_eq!(mapped.code(), "DATABASE_TIMEOUT");
    }

    #[test]
    fn not_found_maps_through() {
        let err = CoreError::NotFound("isbn 9780439064873".into());
        let mapped: AlexandriaError = err.into();
        assert_eq!(mapped.code(), "NOT_FOUND");
    }
}
