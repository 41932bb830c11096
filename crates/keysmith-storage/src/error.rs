//! Storage error types.

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("duplicate key: {key}")]
    Duplicate { key: String },

    #[error("record not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] redb::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// True when a uniqueness constraint rejected the write.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StorageError::Duplicate { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound)
    }
}

macro_rules! impl_from_redb {
    ($($err:ty),* $(,)?) => {
        $(
            impl From<$err> for StorageError {
                fn from(err: $err) -> Self {
                    StorageError::Database(redb::Error::from(err))
                }
            }
        )*
    };
}

impl_from_redb!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

pub type Result<T> = std::result::Result<T, StorageError>;
