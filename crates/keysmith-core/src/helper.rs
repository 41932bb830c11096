//! API key lifecycle: issue, rotate, revoke, look up.
//!
//! Plaintext keys leave this module exactly once, inside the
//! [`IssuedApiKey`] returned by [`ApiKeyHelper::create`] or
//! [`ApiKeyHelper::rotate`]. Storage only ever sees the digest.

use chrono::Utc;
use keysmith_storage::{ApiKeyDal, ApiKeyStorage, ApiKeyTransaction, Clause};
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::config::ApiKeyConfig;
use crate::digest::TokenDigester;
use crate::error::{ApiKeyError, Result};
use crate::models::{ApiKey, CreateApiKeyRequest, IssuedApiKey, User, plugin_key_type};
use crate::secret::generate_secret;

#[derive(Debug, Clone)]
pub struct ApiKeyHelper {
    storage: ApiKeyStorage,
    digester: TokenDigester,
    key_length: usize,
}

impl ApiKeyHelper {
    pub fn new(storage: ApiKeyStorage, config: ApiKeyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            storage,
            digester: TokenDigester::new(config.encryption_secret),
            key_length: config.key_length,
        })
    }

    /// Storage used by operations that are not handed a transaction.
    pub fn storage(&self) -> &ApiKeyStorage {
        &self.storage
    }

    /// Issue a new key inside `tx`. The caller commits.
    pub fn create(
        &self,
        tx: &dyn ApiKeyDal,
        user: Option<&User>,
        request: CreateApiKeyRequest,
    ) -> Result<IssuedApiKey> {
        if let Err(err) = Regex::new(&request.allowed_path) {
            error!(pattern = %request.allowed_path, error = %err, "Compile allowed path");
            return Err(ApiKeyError::InvalidPattern {
                pattern: request.allowed_path,
                source: err,
            });
        }

        let (api_key, hashed_api_key) = self.generate_api_key()?;

        let now = Utc::now();
        let mut record = ApiKey {
            id: 0,
            name: request.name,
            api_key: hashed_api_key,
            expired_at: request.expired_at,
            allowed_path: request.allowed_path,
            key_type: request.key_type,
            extra: request.extra,
            creator: String::new(),
            creator_email: String::new(),
            updater: String::new(),
            updater_email: String::new(),
            created_at: now,
            updated_at: now,
        };
        if let Some(user) = user {
            record.creator = user.name.clone();
            record.creator_email = user.email.clone();
            record.updater = user.name.clone();
            record.updater_email = user.email.clone();
        }

        if let Err(err) = tx.create(&mut record) {
            error!(name = %record.name, error = %err, "Create api key record");
            if err.is_duplicate() {
                return Err(ApiKeyError::DuplicateName { name: record.name });
            }
            return Err(ApiKeyError::persistence(
                format!("error creating api key [{}]", record.name),
                err,
            ));
        }

        info!(id = record.id, name = %record.name, key_type = %record.key_type, "Issued api key");
        Ok(IssuedApiKey::new(record, api_key))
    }

    /// Issue a non-expiring key typed `plugin:<plugin_name>`.
    pub fn create_for_plugin(
        &self,
        tx: &dyn ApiKeyDal,
        user: Option<&User>,
        name: &str,
        plugin_name: &str,
        allowed_path: &str,
        extra: &str,
    ) -> Result<IssuedApiKey> {
        self.create(
            tx,
            user,
            CreateApiKeyRequest {
                name: name.to_string(),
                expired_at: None,
                allowed_path: allowed_path.to_string(),
                key_type: plugin_key_type(plugin_name),
                extra: extra.to_string(),
            },
        )
    }

    /// Replace the key of an existing record and return the new plaintext.
    /// The read and the write share one transaction.
    pub fn rotate(&self, user: Option<&User>, id: u64) -> Result<IssuedApiKey> {
        let tx = self.begin()?;
        let issued = self.rotate_in(&tx, user, id)?;
        self.commit(tx)?;

        info!(id, name = %issued.record().name, "Rotated api key");
        Ok(issued)
    }

    pub fn delete(&self, id: u64) -> Result<()> {
        let tx = self.begin()?;
        let record = self.delete_in(&tx, id)?;
        self.commit(tx)?;

        info!(id, name = %record.name, "Deleted api key");
        Ok(())
    }

    /// Revoke the first key matching the plugin type and/or `extra` value,
    /// returning the revoked record.
    ///
    /// Empty arguments are left out of the filter. Finding nothing is not an
    /// error. At most one key is removed per call.
    pub fn delete_for_plugin(
        &self,
        tx: &dyn ApiKeyDal,
        plugin_name: &str,
        extra: &str,
    ) -> Result<Option<ApiKey>> {
        let mut clauses = Vec::new();
        if !plugin_name.is_empty() {
            clauses.push(Clause::Type(plugin_key_type(plugin_name)));
        }
        if !extra.is_empty() {
            clauses.push(Clause::Extra(extra.to_string()));
        }
        if clauses.is_empty() {
            warn!("Plugin api key revocation without filters matches any key");
        }

        let record = match tx.first(&clauses) {
            Ok(record) => record,
            Err(err) if err.is_not_found() => {
                debug!(plugin = plugin_name, extra, "No plugin api key to revoke");
                return Ok(None);
            }
            Err(err) => {
                error!(plugin = plugin_name, extra, error = %err, "Query api key record");
                return Err(ApiKeyError::persistence(
                    format!("error querying api key for plugin [{}]", plugin_name),
                    err,
                ));
            }
        };

        tx.delete(record.id).map_err(|err| {
            error!(id = record.id, error = %err, "Delete api key record");
            ApiKeyError::persistence(
                format!("error deleting api key id[{}]", record.id),
                err,
            )
        })?;

        info!(id = record.id, name = %record.name, plugin = plugin_name, "Revoked plugin api key");
        Ok(Some(record))
    }

    /// Stored record by id, narrowed by any extra clauses. Reads through
    /// `tx` when given, otherwise through the helper's storage.
    pub fn lookup(
        &self,
        tx: Option<&dyn ApiKeyDal>,
        id: u64,
        extra_clauses: &[Clause],
    ) -> Result<ApiKey> {
        let mut clauses = Vec::with_capacity(extra_clauses.len() + 1);
        clauses.push(Clause::Id(id));
        clauses.extend_from_slice(extra_clauses);

        self.dal(tx).first(&clauses).map_err(|err| {
            if err.is_not_found() {
                not_found(id)
            } else {
                ApiKeyError::persistence(format!("error getting api key id[{}]", id), err)
            }
        })
    }

    /// First stored record matching every clause.
    pub fn lookup_one(&self, tx: Option<&dyn ApiKeyDal>, clauses: &[Clause]) -> Result<ApiKey> {
        self.dal(tx).first(clauses).map_err(|err| {
            if err.is_not_found() {
                ApiKeyError::NotFound(format!("could not find api key matching {:?}", clauses))
            } else {
                ApiKeyError::persistence("error getting api key", err)
            }
        })
    }

    /// Every stored record, in id order.
    pub fn list(&self) -> Result<Vec<ApiKey>> {
        self.storage
            .list()
            .map_err(|err| ApiKeyError::persistence("error listing api keys", err))
    }

    /// Digest a presented token with the server secret.
    pub fn digest_token(&self, token: &str) -> Result<String> {
        self.digester.digest(token)
    }

    fn rotate_in(&self, tx: &dyn ApiKeyDal, user: Option<&User>, id: u64) -> Result<IssuedApiKey> {
        let mut record = self.lookup(Some(tx), id, &[]).inspect_err(|err| {
            error!(id, error = %err, "Get api key by id");
        })?;

        let (api_key, hashed_api_key) = self.generate_api_key()?;
        record.api_key = hashed_api_key;
        record.updated_at = Utc::now();
        if let Some(user) = user {
            record.updater = user.name.clone();
            record.updater_email = user.email.clone();
        }

        if let Err(err) = tx.update(&record) {
            error!(id, error = %err, "Update api key");
            if err.is_not_found() {
                return Err(not_found(id));
            }
            return Err(ApiKeyError::persistence(
                format!("error updating api key id[{}]", id),
                err,
            ));
        }

        Ok(IssuedApiKey::new(record, api_key))
    }

    fn delete_in(&self, tx: &dyn ApiKeyDal, id: u64) -> Result<ApiKey> {
        let record = self.lookup(Some(tx), id, &[]).inspect_err(|err| {
            error!(id, error = %err, "Get api key by id");
        })?;

        let deleted = tx.delete(id).map_err(|err| {
            error!(id, error = %err, "Delete api key");
            ApiKeyError::persistence(format!("error deleting api key id[{}]", id), err)
        })?;
        if !deleted {
            return Err(not_found(id));
        }

        Ok(record)
    }

    fn begin(&self) -> Result<ApiKeyTransaction> {
        self.storage.begin().map_err(|err| {
            error!(error = %err, "Begin api key transaction");
            ApiKeyError::persistence("error starting api key transaction", err)
        })
    }

    fn commit(&self, tx: ApiKeyTransaction) -> Result<()> {
        tx.commit().map_err(|err| {
            error!(error = %err, "Commit api key transaction");
            ApiKeyError::persistence("error committing api key transaction", err)
        })
    }

    fn dal<'a>(&'a self, tx: Option<&'a dyn ApiKeyDal>) -> &'a dyn ApiKeyDal {
        tx.unwrap_or(&self.storage)
    }

    fn generate_api_key(&self) -> Result<(String, String)> {
        let api_key = generate_secret(self.key_length).inspect_err(|err| {
            error!(error = %err, "Generate api key");
        })?;
        let hashed_api_key = self.digester.digest(&api_key)?;
        Ok((api_key, hashed_api_key))
    }
}

fn not_found(id: u64) -> ApiKeyError {
    ApiKeyError::NotFound(format!("could not find api key id[{}]", id))
}
