//! SQLite-backed entity store
//!
//! Single table, JSON bodies:
//!
//! ```sql
//! CREATE TABLE records (
//!     kind TEXT NOT NULL,
//!     key  TEXT NOT NULL,
//!     body TEXT NOT NULL,
//!     updated_at INTEGER NOT NULL,
//!     PRIMARY KEY (kind, key)
//! )
//! ```
//!
//! Writes are `INSERT ... ON CONFLICT(kind, key) DO UPDATE`, which gives the
//! per-record atomic upsert the engine relies on.

use super::EntityStore;
use crate::error::StoreResult;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

pub struct SqliteStore {
    conn: Connection,
}

/// WAL + relaxed sync: the event log is the source of truth, the store can
/// always be rebuilt by replaying from genesis.
fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    Ok(())
}

impl SqliteStore {
    pub fn open(db_path: impl AsRef<Path>) -> StoreResult<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path.as_ref())?;
        apply_pragmas(&conn)?;
        Self::init(conn)
    }

    /// Private in-memory database, mainly for tests
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS records (
                kind TEXT NOT NULL,
                key TEXT NOT NULL,
                body TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (kind, key)
            )",
            [],
        )?;

        log::info!("✅ SQLite entity store initialized");
        Ok(Self { conn })
    }
}

impl EntityStore for SqliteStore {
    fn load_raw(&self, table: &'static str, key: &str) -> StoreResult<Option<String>> {
        let body = self
            .conn
            .query_row(
                "SELECT body FROM records WHERE kind = ?1 AND key = ?2",
                params![table, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(body)
    }

    fn upsert_raw(&mut self, table: &'static str, key: &str, body: String) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO records (kind, key, body, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(kind, key) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at",
            params![table, key, body, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn scan_raw(&self, table: &'static str) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT body FROM records WHERE kind = ?1 ORDER BY key")?;
        let rows = stmt
            .query_map(params![table], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
