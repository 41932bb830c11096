//! Error types for API key lifecycle operations

use keysmith_storage::StorageError;
use thiserror::Error;

/// API key lifecycle error types
#[derive(Debug, Error)]
pub enum ApiKeyError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid allowed path pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("An api key with name [{name}] already exists")]
    DuplicateName { name: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Random source error: {0}")]
    RandomSource(#[source] getrandom::Error),

    #[error("Digest error: {0}")]
    Digest(String),

    #[error("{context}: {source}")]
    Persistence {
        context: String,
        #[source]
        source: StorageError,
    },
}

/// Client-facing class of an error, for callers that map errors onto a
/// response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadInput,
    NotFound,
    Internal,
}

impl ApiKeyError {
    pub(crate) fn persistence(context: impl Into<String>, source: StorageError) -> Self {
        ApiKeyError::Persistence {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiKeyError::InvalidPattern { .. } | ApiKeyError::DuplicateName { .. } => {
                ErrorKind::BadInput
            }
            ApiKeyError::NotFound(_) => ErrorKind::NotFound,
            ApiKeyError::Configuration(_)
            | ApiKeyError::RandomSource(_)
            | ApiKeyError::Digest(_)
            | ApiKeyError::Persistence { .. } => ErrorKind::Internal,
        }
    }
}

/// Result type alias for API key operations
pub type Result<T> = std::result::Result<T, ApiKeyError>;
