use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid ISBN: {0}")]
    InvalidIsbn(String),

    #[error("invalid work key: {0}")]
    InvalidWorkKey(String),

    #[error("invalid author key: {0}")]
    InvalidAuthorKey(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
