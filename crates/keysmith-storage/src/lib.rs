//! Keysmith Storage - persistence layer for API key records
//!
//! This crate provides the persistence collaborator for keysmith, using redb
//! as the embedded database. It knows nothing about secrets or digests: it
//! stores whatever record it is given and enforces name uniqueness.
//!
//! # Tables
//!
//! - `api_keys` - API key records (JSON, keyed by numeric id)
//! - `api_key_names` - Unique name index
//! - `api_key_sequence` - Id sequence

pub mod api_keys;

mod error;

use redb::Database;
use std::path::Path;
use std::sync::Arc;

pub use api_keys::{ApiKey, ApiKeyDal, ApiKeyStorage, ApiKeyTransaction, Clause};
pub use error::{Result, StorageError};

/// Central storage manager that initializes all storage subsystems
pub struct Storage {
    pub api_keys: ApiKeyStorage,
}

impl Storage {
    /// Create a new storage instance at the given path.
    ///
    /// This will create the database file if it doesn't exist and initialize
    /// all required tables.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let db = Arc::new(Database::create(path.as_ref())?);
        let api_keys = ApiKeyStorage::new(db)?;

        Ok(Self { api_keys })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_storage_reopens_existing_database() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("keysmith.db");

        {
            let storage = Storage::new(&db_path).unwrap();
            let now = chrono::Utc::now();
            let mut record = ApiKey {
                id: 0,
                name: "persisted".to_string(),
                api_key: "digest".to_string(),
                expired_at: None,
                allowed_path: ".*".to_string(),
                key_type: "api".to_string(),
                extra: String::new(),
                creator: String::new(),
                creator_email: String::new(),
                updater: String::new(),
                updater_email: String::new(),
                created_at: now,
                updated_at: now,
            };
            storage.api_keys.create(&mut record).unwrap();
        }

        let storage = Storage::new(&db_path).unwrap();
        let record = storage
            .api_keys
            .first(&[Clause::Name("persisted".to_string())])
            .unwrap();
        assert_eq!(record.id, 1);
        assert_eq!(storage.api_keys.list().unwrap().len(), 1);
    }
}
