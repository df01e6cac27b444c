//! Artist repository error types.

use stagebook_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtistError {
    #[error("{message}")]
    Validation {
        message: String,
        missing_fields: Vec<String>,
    },

    #[error("artist not found: {0}")]
    NotFound(String),

    #[error("an artist with email {0} already exists")]
    DuplicateEmail(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ArtistError {
    pub fn missing_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Validation {
            message: "Missing required fields".to_string(),
            missing_fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            missing_fields: Vec::new(),
        }
    }
}

impl From<serde_json::Error> for ArtistError {
    fn from(e: serde_json::Error) -> Self {
        Self::Store(StoreError::Json(e))
    }
}
