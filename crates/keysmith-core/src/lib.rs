//! Keysmith Core - API key issuance, rotation and revocation
//!
//! Keys are random letter strings handed to the caller once. Only an
//! HMAC-SHA256 digest keyed by the server-wide `ENCRYPTION_SECRET` is stored.
//!
//! # Modules
//!
//! - [`secret`] - plaintext key generation
//! - [`digest`] - keyed token digests
//! - [`helper`] - the key lifecycle on top of `keysmith-storage`
//! - [`config`] - encryption secret and key length

pub mod config;
pub mod digest;
pub mod error;
pub mod helper;
pub mod models;
pub mod paths;
pub mod secret;

pub use config::{ApiKeyConfig, EncryptionSecret};
pub use digest::TokenDigester;
pub use error::{ApiKeyError, ErrorKind, Result};
pub use helper::ApiKeyHelper;
pub use keysmith_storage::{ApiKeyDal, ApiKeyTransaction, Clause, Storage, StorageError};
pub use models::*;

use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Core application state: storage plus the key lifecycle over it.
pub struct KeysmithCore {
    pub storage: Arc<Storage>,
    pub api_keys: ApiKeyHelper,
}

impl KeysmithCore {
    pub fn new(db_path: impl AsRef<Path>, config: ApiKeyConfig) -> anyhow::Result<Self> {
        let storage = Arc::new(Storage::new(db_path.as_ref())?);
        let api_keys = ApiKeyHelper::new(storage.api_keys.clone(), config)?;

        info!(db_path = %db_path.as_ref().display(), "Initializing keysmith");

        Ok(Self { storage, api_keys })
    }
}
