//! Store error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote store error: {0}")]
    Remote(String),

    #[cfg(feature = "redis")]
    #[error("redis error: {0}")]
    Redis(String),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("configuration error: {0}")]
    Config(String),
}
