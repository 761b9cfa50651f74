//! Entity store abstraction
//!
//! Keyed load/upsert over a key-value backing store. Every derived record
//! (vaults, positions, buckets, audit log) goes through this contract; there
//! is no delete operation because every aggregate is grow-only or mutated in
//! place.
//!
//! Backends:
//! - `MemoryStore` - BTreeMap, used for tests and dry-run replays
//! - `SqliteStore` - one `records(kind, key, body)` table with UPSERT

pub mod memory;
pub mod sqlite;

use crate::error::{StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A persisted record type addressed by a deterministic key
pub trait Record: Serialize + DeserializeOwned {
    /// Logical table name (stored in the `kind` column)
    const TABLE: &'static str;

    fn key(&self) -> String;
}

/// Raw backing-store contract, assumed atomic per record
pub trait EntityStore: Send {
    fn load_raw(&self, table: &'static str, key: &str) -> StoreResult<Option<String>>;

    fn upsert_raw(&mut self, table: &'static str, key: &str, body: String) -> StoreResult<()>;

    /// All bodies of one table, in key order
    fn scan_raw(&self, table: &'static str) -> StoreResult<Vec<String>>;
}

/// Result of a get-or-create: the record plus whether it was freshly built
///
/// A freshly built record is NOT persisted yet; the caller writes it back.
#[derive(Debug, Clone)]
pub struct Fetched<R> {
    pub record: R,
    pub created: bool,
}

/// Typed helpers over any `EntityStore`
pub trait StoreExt: EntityStore {
    fn load<R: Record>(&self, key: &str) -> StoreResult<Option<R>> {
        match self.load_raw(R::TABLE, key)? {
            Some(body) => decode::<R>(key, &body).map(Some),
            None => Ok(None),
        }
    }

    fn upsert<R: Record>(&mut self, record: &R) -> StoreResult<()> {
        let key = record.key();
        let body = serde_json::to_string(record).map_err(|source| StoreError::Serialization {
            table: R::TABLE,
            key: key.clone(),
            source,
        })?;
        self.upsert_raw(R::TABLE, &key, body)
    }

    /// Load `key`, or build the explicit zero-valued default with `init`
    fn get_or_create<R: Record>(&self, key: &str, init: impl FnOnce() -> R) -> StoreResult<Fetched<R>> {
        Ok(match self.load::<R>(key)? {
            Some(record) => Fetched { record, created: false },
            None => Fetched { record: init(), created: true },
        })
    }

    /// Write an append-only audit record
    ///
    /// Returns `true` when the key already existed. The write still happens
    /// (last-write-wins); callers report the duplicate.
    fn insert_audit<R: Record>(&mut self, record: &R) -> StoreResult<bool> {
        let existed = self.load_raw(R::TABLE, &record.key())?.is_some();
        if existed {
            log::warn!(
                "⚠️  Duplicate audit key {}/{} (re-processed causal group?), overwriting",
                R::TABLE,
                record.key()
            );
        }
        self.upsert(record)?;
        Ok(existed)
    }

    /// Every record of a type. Full scans are for verification tooling only.
    fn all<R: Record>(&self) -> StoreResult<Vec<R>> {
        self.scan_raw(R::TABLE)?
            .iter()
            .map(|body| decode::<R>("<scan>", body))
            .collect()
    }
}

impl<S: EntityStore + ?Sized> StoreExt for S {}

fn decode<R: Record>(key: &str, body: &str) -> StoreResult<R> {
    serde_json::from_str(body).map_err(|source| StoreError::Serialization {
        table: R::TABLE,
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        id: String,
        hits: u64,
    }

    impl Record for Counter {
        const TABLE: &'static str = "counter";

        fn key(&self) -> String {
            self.id.clone()
        }
    }

    fn zero(id: &str) -> Counter {
        Counter { id: id.to_string(), hits: 0 }
    }

    #[test]
    fn test_get_or_create_is_idempotent_without_writes() {
        let store = MemoryStore::new();

        let first = store.get_or_create("a", || zero("a")).unwrap();
        let second = store.get_or_create("a", || zero("a")).unwrap();

        assert!(first.created);
        assert!(second.created);
        assert_eq!(first.record, second.record);
        assert_eq!(first.record.hits, 0);
    }

    #[test]
    fn test_get_or_create_returns_persisted_record() {
        let mut store = MemoryStore::new();
        store.upsert(&Counter { id: "a".into(), hits: 3 }).unwrap();

        let fetched = store.get_or_create("a", || zero("a")).unwrap();
        assert!(!fetched.created);
        assert_eq!(fetched.record.hits, 3);
    }

    #[test]
    fn test_insert_audit_reports_duplicates() {
        let mut store = MemoryStore::new();

        assert!(!store.insert_audit(&Counter { id: "k".into(), hits: 1 }).unwrap());
        assert!(store.insert_audit(&Counter { id: "k".into(), hits: 2 }).unwrap());

        // last write wins
        let loaded: Counter = store.load("k").unwrap().unwrap();
        assert_eq!(loaded.hits, 2);
    }

    #[test]
    fn test_all_scans_one_table() {
        let mut store = MemoryStore::new();
        store.upsert(&zero("b")).unwrap();
        store.upsert(&zero("a")).unwrap();

        let all: Vec<Counter> = store.all().unwrap();
        assert_eq!(all.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
