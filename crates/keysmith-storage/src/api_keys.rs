//! API key storage - persisted credential records with a unique name index.
//!
//! Records are stored as JSON keyed by a numeric id assigned from a sequence
//! table. Names are unique: the `api_key_names` index is checked inside the
//! same write transaction as the insert, so two concurrent creates with the
//! same name cannot both succeed.

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{Result, StorageError};

/// Records table: id -> JSON ApiKey
const API_KEYS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("api_keys");
/// Unique index: name -> id
const API_KEY_NAMES_TABLE: TableDefinition<&str, u64> = TableDefinition::new("api_key_names");
/// Id sequence: "next_id" -> next id to hand out
const API_KEY_SEQUENCE_TABLE: TableDefinition<&str, u64> =
    TableDefinition::new("api_key_sequence");

const NEXT_ID_KEY: &str = "next_id";

/// A stored API key record. `api_key` holds the digest, never a plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    /// Assigned by storage on create; zero until then.
    pub id: u64,
    pub name: String,
    pub api_key: String,
    pub expired_at: Option<DateTime<Utc>>,
    pub allowed_path: String,
    #[serde(rename = "type")]
    pub key_type: String,
    #[serde(default)]
    pub extra: String,
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub creator_email: String,
    #[serde(default)]
    pub updater: String,
    #[serde(default)]
    pub updater_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Equality filter on a stored record. Several clauses combine with AND.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    Id(u64),
    Name(String),
    Type(String),
    Extra(String),
}

impl Clause {
    pub fn matches(&self, record: &ApiKey) -> bool {
        match self {
            Clause::Id(id) => record.id == *id,
            Clause::Name(name) => record.name == *name,
            Clause::Type(key_type) => record.key_type == *key_type,
            Clause::Extra(extra) => record.extra == *extra,
        }
    }
}

fn matches_all(clauses: &[Clause], record: &ApiKey) -> bool {
    clauses.iter().all(|clause| clause.matches(record))
}

/// Data access operations for API key records.
///
/// Implemented by [`ApiKeyTransaction`] for work inside a caller-managed
/// transaction, and by [`ApiKeyStorage`] where every call commits on its own.
pub trait ApiKeyDal {
    /// Insert a new record, assigning its id. Fails with
    /// [`StorageError::Duplicate`] when the name is taken.
    fn create(&self, record: &mut ApiKey) -> Result<()>;

    /// Overwrite an existing record. Fails with [`StorageError::NotFound`]
    /// when the id is unknown.
    fn update(&self, record: &ApiKey) -> Result<()>;

    /// Remove a record by id, returns true if it existed.
    fn delete(&self, id: u64) -> Result<bool>;

    /// First record (lowest id) matching every clause.
    fn first(&self, clauses: &[Clause]) -> Result<ApiKey>;

    /// All records in id order.
    fn list(&self) -> Result<Vec<ApiKey>>;
}

fn decode(data: &[u8]) -> Result<ApiKey> {
    Ok(serde_json::from_slice(data)?)
}

fn find_first<T>(table: &T, clauses: &[Clause]) -> Result<Option<ApiKey>>
where
    T: ReadableTable<u64, &'static [u8]>,
{
    // Id lookups go straight to the row instead of scanning.
    if let Some(id) = clauses.iter().find_map(|clause| match clause {
        Clause::Id(id) => Some(*id),
        _ => None,
    }) {
        let record = match table.get(id)? {
            Some(data) => decode(data.value())?,
            None => return Ok(None),
        };
        return Ok(matches_all(clauses, &record).then_some(record));
    }

    for entry in table.iter()? {
        let (_, value) = entry?;
        let record = decode(value.value())?;
        if matches_all(clauses, &record) {
            return Ok(Some(record));
        }
    }
    Ok(None)
}

fn collect_all<T>(table: &T) -> Result<Vec<ApiKey>>
where
    T: ReadableTable<u64, &'static [u8]>,
{
    let mut records = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        records.push(decode(value.value())?);
    }
    Ok(records)
}

/// An open write transaction over the API key tables.
///
/// Nothing is visible to other readers until [`commit`](Self::commit).
/// Dropping the transaction without committing discards its writes.
///
/// Only one write transaction can be open per database. While this one is
/// alive, every auto-commit call on [`ApiKeyStorage`] blocks until it is
/// committed or dropped, so never make such a call from the thread holding it.
pub struct ApiKeyTransaction {
    txn: WriteTransaction,
}

impl ApiKeyTransaction {
    pub fn commit(self) -> Result<()> {
        self.txn.commit()?;
        Ok(())
    }

    pub fn abort(self) -> Result<()> {
        self.txn.abort()?;
        Ok(())
    }

    fn next_id(&self) -> Result<u64> {
        let mut sequence = self.txn.open_table(API_KEY_SEQUENCE_TABLE)?;
        let id = sequence.get(NEXT_ID_KEY)?.map(|v| v.value()).unwrap_or(1);
        sequence.insert(NEXT_ID_KEY, id + 1)?;
        Ok(id)
    }
}

impl ApiKeyDal for ApiKeyTransaction {
    fn create(&self, record: &mut ApiKey) -> Result<()> {
        {
            let names = self.txn.open_table(API_KEY_NAMES_TABLE)?;
            if names.get(record.name.as_str())?.is_some() {
                return Err(StorageError::Duplicate {
                    key: record.name.clone(),
                });
            }
        }

        record.id = self.next_id()?;
        let data = serde_json::to_vec(record)?;

        let mut table = self.txn.open_table(API_KEYS_TABLE)?;
        table.insert(record.id, data.as_slice())?;
        let mut names = self.txn.open_table(API_KEY_NAMES_TABLE)?;
        names.insert(record.name.as_str(), record.id)?;

        tracing::debug!(id = record.id, name = %record.name, "Inserted api key record");
        Ok(())
    }

    fn update(&self, record: &ApiKey) -> Result<()> {
        let mut table = self.txn.open_table(API_KEYS_TABLE)?;
        let previous = match table.get(record.id)? {
            Some(data) => decode(data.value())?,
            None => return Err(StorageError::NotFound),
        };

        if previous.name != record.name {
            let mut names = self.txn.open_table(API_KEY_NAMES_TABLE)?;
            if names.get(record.name.as_str())?.is_some() {
                return Err(StorageError::Duplicate {
                    key: record.name.clone(),
                });
            }
            names.remove(previous.name.as_str())?;
            names.insert(record.name.as_str(), record.id)?;
        }

        let data = serde_json::to_vec(record)?;
        table.insert(record.id, data.as_slice())?;
        Ok(())
    }

    fn delete(&self, id: u64) -> Result<bool> {
        let removed = {
            let mut table = self.txn.open_table(API_KEYS_TABLE)?;
            table.remove(id)?.map(|data| data.value().to_vec())
        };

        match removed {
            Some(data) => {
                let record = decode(&data)?;
                let mut names = self.txn.open_table(API_KEY_NAMES_TABLE)?;
                names.remove(record.name.as_str())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn first(&self, clauses: &[Clause]) -> Result<ApiKey> {
        let table = self.txn.open_table(API_KEYS_TABLE)?;
        find_first(&table, clauses)?.ok_or(StorageError::NotFound)
    }

    fn list(&self) -> Result<Vec<ApiKey>> {
        let table = self.txn.open_table(API_KEYS_TABLE)?;
        collect_all(&table)
    }
}

/// API key storage backed by redb.
#[derive(Debug, Clone)]
pub struct ApiKeyStorage {
    db: Arc<Database>,
}

impl ApiKeyStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(API_KEYS_TABLE)?;
        write_txn.open_table(API_KEY_NAMES_TABLE)?;
        write_txn.open_table(API_KEY_SEQUENCE_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Open a write transaction. The caller decides whether to commit.
    pub fn begin(&self) -> Result<ApiKeyTransaction> {
        Ok(ApiKeyTransaction {
            txn: self.db.begin_write()?,
        })
    }

    /// Run `f` inside a write transaction, committing only if it succeeds.
    pub fn transaction<T, E>(
        &self,
        f: impl FnOnce(&ApiKeyTransaction) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<StorageError>,
    {
        let tx = self.begin()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

impl ApiKeyDal for ApiKeyStorage {
    fn create(&self, record: &mut ApiKey) -> Result<()> {
        self.transaction(|tx| tx.create(record))
    }

    fn update(&self, record: &ApiKey) -> Result<()> {
        self.transaction(|tx| tx.update(record))
    }

    fn delete(&self, id: u64) -> Result<bool> {
        self.transaction(|tx| tx.delete(id))
    }

    fn first(&self, clauses: &[Clause]) -> Result<ApiKey> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(API_KEYS_TABLE)?;
        find_first(&table, clauses)?.ok_or(StorageError::NotFound)
    }

    fn list(&self) -> Result<Vec<ApiKey>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(API_KEYS_TABLE)?;
        collect_all(&table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup() -> (ApiKeyStorage, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(Database::create(db_path).unwrap());
        let storage = ApiKeyStorage::new(db).unwrap();
        (storage, temp_dir)
    }

    fn record(name: &str, key_type: &str, extra: &str) -> ApiKey {
        let now = Utc::now();
        ApiKey {
            id: 0,
            name: name.to_string(),
            api_key: format!("digest-of-{name}"),
            expired_at: None,
            allowed_path: ".*".to_string(),
            key_type: key_type.to_string(),
            extra: extra.to_string(),
            creator: String::new(),
            creator_email: String::new(),
            updater: String::new(),
            updater_email: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_create_assigns_sequential_ids() {
        let (storage, _temp_dir) = setup();

        let mut first = record("first", "api", "");
        let mut second = record("second", "api", "");
        storage.create(&mut first).unwrap();
        storage.create(&mut second).unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(storage.list().unwrap().len(), 2);
    }

    #[test]
    fn test_ids_are_not_reused_after_delete() {
        let (storage, _temp_dir) = setup();

        let mut first = record("first", "api", "");
        storage.create(&mut first).unwrap();
        assert!(storage.delete(first.id).unwrap());

        let mut second = record("second", "api", "");
        storage.create(&mut second).unwrap();
        assert_eq!(second.id, 2);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let (storage, _temp_dir) = setup();

        storage.create(&mut record("dup", "api", "")).unwrap();
        let err = storage.create(&mut record("dup", "api", "")).unwrap_err();

        assert!(err.is_duplicate());
        assert!(err.to_string().contains("dup"));
        assert_eq!(storage.list().unwrap().len(), 1);
    }

    #[test]
    fn test_name_reusable_after_delete() {
        let (storage, _temp_dir) = setup();

        let mut key = record("reuse", "api", "");
        storage.create(&mut key).unwrap();
        storage.delete(key.id).unwrap();

        storage.create(&mut record("reuse", "api", "")).unwrap();
    }

    #[test]
    fn test_first_with_clauses() {
        let (storage, _temp_dir) = setup();

        storage.create(&mut record("a", "api", "")).unwrap();
        storage
            .create(&mut record("b", "plugin:webhook", "hook-1"))
            .unwrap();
        storage
            .create(&mut record("c", "plugin:webhook", "hook-2"))
            .unwrap();

        let found = storage
            .first(&[
                Clause::Type("plugin:webhook".to_string()),
                Clause::Extra("hook-2".to_string()),
            ])
            .unwrap();
        assert_eq!(found.name, "c");

        let lowest = storage
            .first(&[Clause::Type("plugin:webhook".to_string())])
            .unwrap();
        assert_eq!(lowest.name, "b");

        let err = storage
            .first(&[Clause::Extra("missing".to_string())])
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_first_by_id_respects_other_clauses() {
        let (storage, _temp_dir) = setup();

        let mut key = record("a", "api", "x");
        storage.create(&mut key).unwrap();

        assert_eq!(storage.first(&[Clause::Id(key.id)]).unwrap().name, "a");
        let err = storage
            .first(&[Clause::Id(key.id), Clause::Extra("y".to_string())])
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(storage.first(&[Clause::Id(99)]).unwrap_err().is_not_found());
    }

    #[test]
    fn test_update_rewrites_record() {
        let (storage, _temp_dir) = setup();

        let mut key = record("a", "api", "");
        storage.create(&mut key).unwrap();

        key.api_key = "new-digest".to_string();
        storage.update(&key).unwrap();

        let stored = storage.first(&[Clause::Id(key.id)]).unwrap();
        assert_eq!(stored.api_key, "new-digest");
    }

    #[test]
    fn test_update_missing_record() {
        let (storage, _temp_dir) = setup();

        let mut key = record("ghost", "api", "");
        key.id = 42;
        assert!(storage.update(&key).unwrap_err().is_not_found());
    }

    #[test]
    fn test_update_rename_moves_index() {
        let (storage, _temp_dir) = setup();

        let mut key = record("old", "api", "");
        storage.create(&mut key).unwrap();
        storage.create(&mut record("taken", "api", "")).unwrap();

        key.name = "taken".to_string();
        assert!(storage.update(&key).unwrap_err().is_duplicate());

        key.name = "new".to_string();
        storage.update(&key).unwrap();
        storage.create(&mut record("old", "api", "")).unwrap();
        assert!(
            storage
                .create(&mut record("new", "api", ""))
                .unwrap_err()
                .is_duplicate()
        );
    }

    #[test]
    fn test_delete_missing_returns_false() {
        let (storage, _temp_dir) = setup();
        assert!(!storage.delete(7).unwrap());
    }

    #[test]
    fn test_uncommitted_transaction_is_discarded() {
        let (storage, _temp_dir) = setup();

        {
            let tx = storage.begin().unwrap();
            tx.create(&mut record("pending", "api", "")).unwrap();
            assert_eq!(tx.list().unwrap().len(), 1);
        }

        assert_eq!(storage.list().unwrap().len(), 0);
        storage.create(&mut record("pending", "api", "")).unwrap();
    }

    #[test]
    fn test_transaction_commit_is_visible() {
        let (storage, _temp_dir) = setup();

        let tx = storage.begin().unwrap();
        tx.create(&mut record("one", "api", "")).unwrap();
        tx.create(&mut record("two", "api", "")).unwrap();
        tx.commit().unwrap();

        let names: Vec<_> = storage.list().unwrap().into_iter().map(|k| k.name).collect();
        assert_eq!(names, vec!["one", "two"]);
    }

    #[test]
    fn test_transaction_helper_rolls_back_on_error() {
        let (storage, _temp_dir) = setup();

        let result: Result<()> = storage.transaction(|tx| {
            tx.create(&mut record("kept", "api", ""))?;
            tx.create(&mut record("kept", "api", ""))
        });

        assert!(result.unwrap_err().is_duplicate());
        assert_eq!(storage.list().unwrap().len(), 0);
    }
}
