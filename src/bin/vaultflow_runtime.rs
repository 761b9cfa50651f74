//! Vaultflow Runtime - replays an event log into the derived-state store
//!
//! Usage:
//!   cargo run --release --bin vaultflow_runtime
//!
//! Environment variables:
//!   VAULTFLOW_DB_PATH - SQLite database path (default: vaultflow.db)
//!   VAULTFLOW_STORE - sqlite | memory (default: sqlite)
//!   VAULTFLOW_EVENTS_PATH - JSONL event log (default: events.jsonl)
//!   VAULTFLOW_READS_PATH - JSON snapshot of authoritative values (optional)
//!   CORRELATION_WINDOW - call correlation probe bound (default: 10)
//!   EVENT_CHANNEL_BUFFER - channel size (default: 10000)
//!   STATS_LOG_INTERVAL_MS - diagnostics log interval (default: 10000)

use dotenv::dotenv;
use log::{error, info, warn};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use vaultflow::config::{IndexerConfig, StoreBackend};
use vaultflow::engine::IndexerEngine;
use vaultflow::events::IndexedEvent;
use vaultflow::ingestion::{start_ingestion, stream_event_log};
use vaultflow::reader::{AuthoritativeReader, SnapshotReader, UnavailableReader};
use vaultflow::store::{EntityStore, MemoryStore, SqliteStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize environment and logging
    dotenv().ok();
    env_logger::init();

    info!("🚀 Vaultflow Runtime");

    let config = IndexerConfig::from_env();
    info!("   ├─ Store: {:?} ({})", config.store, config.db_path);
    info!("   ├─ Events: {}", config.events_path);
    info!(
        "   ├─ Reads: {}",
        config.reads_path.as_deref().unwrap_or("<unavailable>")
    );
    info!("   ├─ Correlation window: {}", config.correlation_window);
    info!("   └─ Channel buffer: {} events", config.channel_buffer);

    let store: Box<dyn EntityStore> = match config.store {
        StoreBackend::Sqlite => Box::new(SqliteStore::open(&config.db_path)?),
        StoreBackend::Memory => Box::new(MemoryStore::new()),
    };
    info!("✅ Store initialized");

    let reader: Arc<dyn AuthoritativeReader> = match &config.reads_path {
        Some(path) => Arc::new(SnapshotReader::from_file(path)?),
        None => {
            info!("⚠️  No reads snapshot configured, valuations use local holdings");
            Arc::new(UnavailableReader)
        }
    };

    let engine = Arc::new(Mutex::new(IndexerEngine::new(
        store,
        reader,
        config.engine(),
    )));
    info!("✅ IndexerEngine created");

    let (tx, rx) = mpsc::channel::<IndexedEvent>(config.channel_buffer.max(1));

    let events_path = config.events_path.clone();
    let reader_task = tokio::spawn(async move {
        match stream_event_log(&events_path, tx).await {
            Ok(read) if read.skipped > 0 => {
                warn!("⚠️  {} event log lines could not be decoded", read.skipped);
            }
            Ok(_) => {}
            Err(e) => error!("❌ Event log reader failed: {}", e),
        }
    });

    let summary = start_ingestion(rx, engine.clone(), config.stats_interval_ms).await;
    if let Err(e) = reader_task.await {
        error!("❌ Event log reader task panicked: {}", e);
    }

    let guard = engine.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let ledger = guard.ledger()?;
    info!("📊 Replay complete: {} events ({} failed)", summary.events, summary.failed);
    info!("   ├─ Vaults: {}", ledger.vault_count);
    info!("   ├─ Participants: {}", ledger.participant_count);
    info!("   ├─ TVL: {}", ledger.total_value_locked);
    info!("   ├─ Deposited: {}", ledger.total_deposited);
    info!("   └─ Withdrawn: {}", ledger.total_withdrawn);

    Ok(())
}
