//! In-memory entity store

use super::EntityStore;
use crate::error::StoreResult;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: BTreeMap<&'static str, BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityStore for MemoryStore {
    fn load_raw(&self, table: &'static str, key: &str) -> StoreResult<Option<String>> {
        Ok(self.tables.get(table).and_then(|rows| rows.get(key)).cloned())
    }

    fn upsert_raw(&mut self, table: &'static str, key: &str, body: String) -> StoreResult<()> {
        self.tables
            .entry(table)
            .or_default()
            .insert(key.to_string(), body);
        Ok(())
    }

    fn scan_raw(&self, table: &'static str) -> StoreResult<Vec<String>> {
        Ok(self
            .tables
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }
}
