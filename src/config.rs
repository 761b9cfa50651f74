//! Indexer configuration from environment variables

use crate::engine::correlation::DEFAULT_CORRELATION_WINDOW;
use std::env;

/// Backing store selected for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl StoreBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Some(StoreBackend::Sqlite),
            "memory" => Some(StoreBackend::Memory),
            _ => None,
        }
    }
}

/// Configuration for the indexer runtime
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Path to SQLite database file
    pub db_path: String,

    pub store: StoreBackend,

    /// JSONL event log replayed from genesis
    pub events_path: String,

    /// JSON snapshot of authoritative values (None: every read is unavailable)
    pub reads_path: Option<String>,

    /// Probe bound K for call correlation
    pub correlation_window: u32,

    /// Channel buffer size between the event reader and the engine
    pub channel_buffer: usize,

    /// Diagnostics log interval in milliseconds
    pub stats_interval_ms: u64,
}

/// The part of the configuration the engine itself consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub correlation_window: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            correlation_window: DEFAULT_CORRELATION_WINDOW,
        }
    }
}

impl IndexerConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `VAULTFLOW_DB_PATH` (default: vaultflow.db)
    /// - `VAULTFLOW_STORE` (default: sqlite; also `memory`)
    /// - `VAULTFLOW_EVENTS_PATH` (default: events.jsonl)
    /// - `VAULTFLOW_READS_PATH` (default: unset)
    /// - `CORRELATION_WINDOW` (default: 10, minimum 1)
    /// - `EVENT_CHANNEL_BUFFER` (default: 10000)
    /// - `STATS_LOG_INTERVAL_MS` (default: 10000)
    pub fn from_env() -> Self {
        let store = match env::var("VAULTFLOW_STORE") {
            Ok(value) => StoreBackend::parse(&value).unwrap_or_else(|| {
                log::warn!("⚠️  Unknown VAULTFLOW_STORE '{}', using sqlite", value);
                StoreBackend::Sqlite
            }),
            Err(_) => StoreBackend::Sqlite,
        };

        Self {
            db_path: env::var("VAULTFLOW_DB_PATH").unwrap_or_else(|_| "vaultflow.db".to_string()),

            store,

            events_path: env::var("VAULTFLOW_EVENTS_PATH")
                .unwrap_or_else(|_| "events.jsonl".to_string()),

            reads_path: env::var("VAULTFLOW_READS_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty()),

            correlation_window: env::var("CORRELATION_WINDOW")
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(DEFAULT_CORRELATION_WINDOW)
                .max(1),

            channel_buffer: env::var("EVENT_CHANNEL_BUFFER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10_000),

            stats_interval_ms: env::var("STATS_LOG_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10_000),
        }
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            correlation_window: self.correlation_window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 7] = [
        "VAULTFLOW_DB_PATH",
        "VAULTFLOW_STORE",
        "VAULTFLOW_EVENTS_PATH",
        "VAULTFLOW_READS_PATH",
        "CORRELATION_WINDOW",
        "EVENT_CHANNEL_BUFFER",
        "STATS_LOG_INTERVAL_MS",
    ];

    // Env vars are process-global; run both scenarios in one test so they
    // cannot interleave.
    #[test]
    fn test_config_from_env() {
        // Test: Default configuration when no env vars set
        for var in VARS {
            env::remove_var(var);
        }

        let config = IndexerConfig::from_env();

        assert_eq!(config.db_path, "vaultflow.db");
        assert_eq!(config.store, StoreBackend::Sqlite);
        assert_eq!(config.events_path, "events.jsonl");
        assert_eq!(config.reads_path, None);
        assert_eq!(config.correlation_window, 10);
        assert_eq!(config.channel_buffer, 10_000);
        assert_eq!(config.stats_interval_ms, 10_000);
        assert_eq!(config.engine(), EngineConfig::default());

        // Test: Custom configuration from env vars
        env::set_var("VAULTFLOW_DB_PATH", "/tmp/vaultflow-test.db");
        env::set_var("VAULTFLOW_STORE", "Memory");
        env::set_var("VAULTFLOW_READS_PATH", "reads.json");
        env::set_var("CORRELATION_WINDOW", "4");
        env::set_var("EVENT_CHANNEL_BUFFER", "64");

        let config = IndexerConfig::from_env();

        assert_eq!(config.db_path, "/tmp/vaultflow-test.db");
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.reads_path.as_deref(), Some("reads.json"));
        assert_eq!(config.engine().correlation_window, 4);
        assert_eq!(config.channel_buffer, 64);

        // Test: Window is clamped to at least one probe, bad backend falls back
        env::set_var("CORRELATION_WINDOW", "0");
        env::set_var("VAULTFLOW_STORE", "postgres");

        let config = IndexerConfig::from_env();
        assert_eq!(config.correlation_window, 1);
        assert_eq!(config.store, StoreBackend::Sqlite);

        // Cleanup
        for var in VARS {
            env::remove_var(var);
        }
    }
}
