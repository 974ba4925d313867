//! # Key Stores
//!
//! The key manager persists records through the [`KeyStore`] trait, a narrow
//! key-value contract: get/put/delete by id, list, and one indexed query
//! (by alias). Two implementations ship with the crate:
//!
//! - [`MemoryKeyStore`] -- `DashMap`-backed, process lifetime only.
//! - [`SledKeyStore`] -- sled-backed, survives restarts.
//!
//! ## Sled Tree Layout
//!
//! | Tree          | Key            | Value                |
//! |---------------|----------------|----------------------|
//! | `keys`        | id (UTF-8)     | `bincode(KeyRecord)` |
//! | `key_aliases` | alias (UTF-8)  | id (UTF-8)           |
//!
//! Both stores serialize writes per key (DashMap shard lock / sled
//! per-key atomicity) and never take a global write lock, so concurrent
//! readers are never blocked by an unrelated write.
//!
//! An alias is claimed before its record is written. If the write fails the
//! claim is rolled back, so a failed `put` never leaves an alias pointing
//! at a key that does not exist.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sled::{Db, Tree};
use std::path::Path;

use super::record::KeyRecord;

/// Errors that can occur inside a key store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("key not found: {0}")]
    NotFound(String),

    #[error("alias already in use: {0}")]
    DuplicateAlias(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence contract for key records.
pub trait KeyStore: Send + Sync {
    fn get(&self, id: &str) -> StoreResult<Option<KeyRecord>>;

    /// Insert or replace a record. Fails if its alias belongs to another key.
    /// A replaced record's old alias is released when the alias changes.
    fn put(&self, record: KeyRecord) -> StoreResult<()>;

    /// Remove a record. Returns `false` if it did not exist.
    fn delete(&self, id: &str) -> StoreResult<bool>;

    fn list(&self) -> StoreResult<Vec<KeyRecord>>;

    fn find_by_alias(&self, alias: &str) -> StoreResult<Option<KeyRecord>>;
}

// ---------------------------------------------------------------------------
// MemoryKeyStore
// ---------------------------------------------------------------------------

/// In-memory key store.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    records: DashMap<String, KeyRecord>,
    aliases: DashMap<String, String>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn get(&self, id: &str) -> StoreResult<Option<KeyRecord>> {
        Ok(self.records.get(id).map(|r| r.value().clone()))
    }

    fn put(&self, record: KeyRecord) -> StoreResult<()> {
        if let Some(alias) = &record.alias {
            // The entry guard makes check-and-claim atomic for this alias.
            match self.aliases.entry(alias.clone()) {
                Entry::Occupied(existing) if existing.get() != &record.id => {
                    return Err(StoreError::DuplicateAlias(alias.clone()));
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(record.id.clone());
                }
            }
        }
        let id = record.id.clone();
        let alias = record.alias.clone();
        let previous = self.records.insert(id.clone(), record);
        if let Some(stale) = previous.and_then(|p| p.alias.clone()).filter(|old| alias.as_ref() != Some(old)) {
            self.aliases.remove_if(&stale, |_, owner| owner == &id);
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        let Some((_, record)) = self.records.remove(id) else {
            return Ok(false);
        };
        if let Some(alias) = &record.alias {
            self.aliases.remove_if(alias, |_, owner| owner == id);
        }
        Ok(true)
    }

    fn list(&self) -> StoreResult<Vec<KeyRecord>> {
        Ok(self.records.iter().map(|r| r.value().clone()).collect())
    }

    fn find_by_alias(&self, alias: &str) -> StoreResult<Option<KeyRecord>> {
        let Some(id) = self.aliases.get(alias).map(|r| r.value().clone()) else {
            return Ok(None);
        };
        self.get(&id)
    }
}

// ---------------------------------------------------------------------------
// SledKeyStore
// ---------------------------------------------------------------------------

/// Persistent key store on sled.
///
/// Records are bincode-encoded. Keep the database directory on an encrypted
/// volume: sled writes the records to disk as-is.
#[derive(Debug, Clone)]
pub struct SledKeyStore {
    /// Kept so the database is flushed when the last handle drops.
    _db: Db,
    keys: Tree,
    aliases: Tree,
}

impl SledKeyStore {
    /// Open or create a key store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::from_db(sled::open(path)?)
    }

    /// A store that lives in a temporary directory and is deleted on drop.
    pub fn open_temporary() -> StoreResult<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let keys = db.open_tree("keys")?;
        let aliases = db.open_tree("key_aliases")?;
        Ok(Self {
            _db: db,
            keys,
            aliases,
        })
    }

    fn decode(bytes: &[u8]) -> StoreResult<KeyRecord> {
        bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn encode(record: &KeyRecord) -> StoreResult<Vec<u8>> {
        bincode::serialize(record).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Point `alias` back at nothing, if it still points at `id`.
    fn release_alias(&self, alias: &str, id: &str) -> StoreResult<()> {
        let _ = self
            .aliases
            .compare_and_swap(alias.as_bytes(), Some(id.as_bytes()), None as Option<&[u8]>)?;
        Ok(())
    }

    /// Claim `record.alias` for `record.id`. Returns whether this call made
    /// the claim.
    fn claim_alias(&self, record: &KeyRecord) -> StoreResult<bool> {
        let Some(alias) = &record.alias else {
            return Ok(false);
        };
        let claim = self.aliases.compare_and_swap(
            alias.as_bytes(),
            None as Option<&[u8]>,
            Some(record.id.as_bytes()),
        )?;
        match claim {
            Ok(()) => Ok(true),
            Err(conflict)
                if conflict
                    .current
                    .as_ref()
                    .is_some_and(|owner| owner.as_ref() == record.id.as_bytes()) =>
            {
                Ok(false)
            }
            Err(_) => Err(StoreError::DuplicateAlias(alias.clone())),
        }
    }

    /// Claim the alias, then write the record encoded by `encode`. A failed
    /// write rolls back a claim this call made.
    fn put_with(
        &self,
        record: KeyRecord,
        encode: impl FnOnce(&KeyRecord) -> StoreResult<Vec<u8>>,
    ) -> StoreResult<()> {
        let claimed = self.claim_alias(&record)?;
        let written = encode(&record)
            .and_then(|bytes| self.keys.insert(record.id.as_bytes(), bytes).map_err(StoreError::from));
        let previous = match written {
            Ok(previous) => previous,
            Err(err) => {
                if let (true, Some(alias)) = (claimed, &record.alias) {
                    self.release_alias(alias, &record.id)?;
                }
                return Err(err);
            }
        };

        // An undecodable previous record keeps its alias.
        let stale = previous
            .and_then(|bytes| Self::decode(&bytes).ok())
            .and_then(|p| p.alias.clone())
            .filter(|old| record.alias.as_ref() != Some(old));
        if let Some(stale) = stale {
            self.release_alias(&stale, &record.id)?;
        }
        Ok(())
    }
}

impl KeyStore for SledKeyStore {
    fn get(&self, id: &str) -> StoreResult<Option<KeyRecord>> {
        self.keys
            .get(id.as_bytes())?
            .map(|bytes| Self::decode(&bytes))
            .transpose()
    }

    fn put(&self, record: KeyRecord) -> StoreResult<()> {
        self.put_with(record, Self::encode)
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        let Some(bytes) = self.keys.remove(id.as_bytes())? else {
            return Ok(false);
        };
        let record = Self::decode(&bytes)?;
        if let Some(alias) = &record.alias {
            self.release_alias(alias, id)?;
        }
        Ok(true)
    }

    fn list(&self) -> StoreResult<Vec<KeyRecord>> {
        self.keys
            .iter()
            .values()
            .map(|value| Self::decode(&value?))
            .collect()
    }

    fn find_by_alias(&self, alias: &str) -> StoreResult<Option<KeyRecord>> {
        let Some(id) = self.aliases.get(alias.as_bytes())? else {
            return Ok(None);
        };
        let id = String::from_utf8(id.to_vec())
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::signatures::KeyType;

    fn record(id: &str, alias: Option<&str>) -> KeyRecord {
        KeyRecord::new(
            id.to_string(),
            KeyType::Ed25519,
            vec![9; 32],
            vec![1; 32],
            alias.map(str::to_string),
            None,
        )
    }

    fn exercise_store(store: &dyn KeyStore) {
        store.put(record("a", Some("alice"))).unwrap();
        store.put(record("b", None)).unwrap();

        assert_eq!(store.get("a").unwrap().unwrap().id, "a");
        assert_eq!(store.find_by_alias("alice").unwrap().unwrap().id, "a");
        assert!(store.find_by_alias("bob").unwrap().is_none());
        assert_eq!(store.list().unwrap().len(), 2);

        // Re-putting the same record under its own alias is fine.
        store.put(record("a", Some("alice"))).unwrap();
        assert!(matches!(
            store.put(record("c", Some("alice"))),
            Err(StoreError::DuplicateAlias(_))
        ));

        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
        assert!(store.find_by_alias("alice").unwrap().is_none());

        // Alias is free again once its owner is gone.
        store.put(record("c", Some("alice"))).unwrap();
        assert_eq!(store.find_by_alias("alice").unwrap().unwrap().id, "c");

        // Renaming a key frees its old alias for others.
        store.put(record("c", Some("carol"))).unwrap();
        assert!(store.find_by_alias("alice").unwrap().is_none());
        assert_eq!(store.find_by_alias("carol").unwrap().unwrap().id, "c");
        store.put(record("d", Some("alice"))).unwrap();
        assert_eq!(store.find_by_alias("alice").unwrap().unwrap().id, "d");

        // So does dropping the alias altogether.
        store.put(record("c", None)).unwrap();
        assert!(store.find_by_alias("carol").unwrap().is_none());
        store.put(record("b", Some("carol"))).unwrap();
    }

    #[test]
    fn memory_store_contract() {
        exercise_store(&MemoryKeyStore::new());
    }

    #[test]
    fn sled_store_contract() {
        exercise_store(&SledKeyStore::open_temporary().unwrap());
    }

    #[test]
    fn failed_sled_write_releases_the_alias() {
        let store = SledKeyStore::open_temporary().unwrap();
        let failing = |_: &KeyRecord| -> StoreResult<Vec<u8>> { Err(StoreError::Serialization("disk full".into())) };

        let err = store.put_with(record("a", Some("alice")), failing).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
        assert!(store.aliases.get("alice").unwrap().is_none());
        assert!(store.get("a").unwrap().is_none());

        // The alias is free for the next key, and a failed rewrite of that
        // key leaves its existing claim alone.
        store.put(record("b", Some("alice"))).unwrap();
        assert!(store.put_with(record("b", Some("alice")), failing).is_err());
        assert_eq!(store.find_by_alias("alice").unwrap().unwrap().id, "b");
    }

    #[test]
    fn sled_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SledKeyStore::open(dir.path()).unwrap();
            store.put(record("persisted", Some("p"))).unwrap();
        }
        let store = SledKeyStore::open(dir.path()).unwrap();
        let loaded = store.find_by_alias("p").unwrap().unwrap();
        assert_eq!(loaded.id, "persisted");
        assert_eq!(loaded.secret(), &[9u8; 32]);
    }
}
