//! Event log replay through the async ingestion loop

#[cfg(test)]
mod ingestion_tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::{tempdir, NamedTempFile};
    use tokio::sync::mpsc;
    use vaultflow::amount::Amount;
    use vaultflow::config::EngineConfig;
    use vaultflow::engine::IndexerEngine;
    use vaultflow::events::{EventKind, IndexedEvent};
    use vaultflow::ids::{position_key, Address, EventMeta, TxHash};
    use vaultflow::ingestion::{start_ingestion, stream_event_log};
    use vaultflow::reader::UnavailableReader;
    use vaultflow::schema::{Deposit, Position, Vault};
    use vaultflow::store::{SqliteStore, StoreExt};

    const T0: i64 = 1_700_006_400;

    fn event(tx: u8, block_time: i64, source: Address, kind: EventKind) -> IndexedEvent {
        IndexedEvent {
            meta: EventMeta {
                tx_hash: TxHash([tx; 32]),
                log_index: 0,
                block_number: tx as u64,
                block_time,
            },
            source,
            kind,
        }
    }

    fn scripted_log(vault: Address, owner: Address) -> Vec<IndexedEvent> {
        vec![
            event(
                1,
                T0,
                Address([0xfa; 20]),
                EventKind::VaultCreated {
                    vault,
                    manager: Address([0xee; 20]),
                    underlying_asset: Address([0xaa; 20]),
                    name: "Replay Fund".to_string(),
                    symbol: "RPLY".to_string(),
                    max_capacity: Amount::from(10_000u64),
                },
            ),
            event(
                2,
                T0 + 60,
                vault,
                EventKind::Deposit {
                    sender: owner,
                    owner,
                    assets: Amount::from(500u64),
                    shares: Amount::from(500u64),
                },
            ),
            event(
                3,
                T0 + 120,
                vault,
                EventKind::Withdraw {
                    sender: owner,
                    receiver: owner,
                    owner,
                    assets: Amount::from(200u64),
                    shares: Amount::from(200u64),
                },
            ),
        ]
    }

    fn write_log(events: &[IndexedEvent]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# replay fixture").unwrap();
        for e in events {
            writeln!(file, "{}", serde_json::to_string(e).unwrap()).unwrap();
            writeln!(file).unwrap();
        }
        file
    }

    async fn replay(path: &std::path::Path, engine: Arc<Mutex<IndexerEngine>>) -> (usize, u64) {
        let (tx, rx) = mpsc::channel(4);
        let path = path.to_path_buf();
        let reader = tokio::spawn(async move { stream_event_log(&path, tx).await });
        let summary = start_ingestion(rx, engine, 50).await;
        let read = reader.await.unwrap().unwrap();
        assert_eq!(summary.failed, 0);
        (read.sent, summary.events)
    }

    #[tokio::test]
    async fn test_replay_into_sqlite_persists_state() {
        // Test: JSONL log -> channel -> engine -> SQLite, then reopen the file
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("vaultflow.db");
        let vault = Address([0x10; 20]);
        let owner = Address([0xa1; 20]);
        let log = write_log(&scripted_log(vault, owner));

        let engine = Arc::new(Mutex::new(IndexerEngine::new(
            Box::new(SqliteStore::open(&db_path).unwrap()),
            Arc::new(UnavailableReader),
            EngineConfig::default(),
        )));

        let (sent, processed) = replay(log.path(), engine.clone()).await;
        assert_eq!(sent, 3);
        assert_eq!(processed, 3);

        let ledger = engine.lock().unwrap().ledger().unwrap();
        assert_eq!(ledger.total_value_locked, Amount::from(300u64));
        drop(engine);

        let store = SqliteStore::open(&db_path).unwrap();
        let stored: Vault = store.load(&vault.to_string()).unwrap().unwrap();
        assert_eq!(stored.total_assets, Amount::from(300u64));
        assert_eq!(stored.total_supply, Amount::from(300u64));
        assert_eq!(stored.share_price, Amount::scale());

        let position: Position = store.load(&position_key(&vault, &owner)).unwrap().unwrap();
        assert_eq!(position.shares, Amount::from(300u64));
        assert!(position.is_active);

        let deposits: Vec<Deposit> = store.all().unwrap();
        assert_eq!(deposits.len(), 1);
    }

    #[tokio::test]
    async fn test_replaying_same_log_twice_keeps_audit_log_stable() {
        // Test: Audit keys are positional, so a second pass adds no records
        let vault = Address([0x20; 20]);
        let owner = Address([0xb0; 20]);
        let log = write_log(&scripted_log(vault, owner));
        let engine = Arc::new(Mutex::new(IndexerEngine::in_memory(Arc::new(UnavailableReader))));

        replay(log.path(), engine.clone()).await;
        let first: Vec<Deposit> = engine.lock().unwrap().store().all().unwrap();

        replay(log.path(), engine.clone()).await;
        let guard = engine.lock().unwrap();
        let second: Vec<Deposit> = guard.store().all().unwrap();
        assert_eq!(first.len(), second.len());
        assert!(guard.diagnostics().duplicate_audit_keys > 0);
    }

    #[tokio::test]
    async fn test_undecodable_lines_are_skipped() {
        // Test: A bad line and an unknown event kind do not stop the replay
        let vault = Address([0x30; 20]);
        let owner = Address([0xc0; 20]);
        let events = scripted_log(vault, owner);
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", serde_json::to_string(&events[0]).unwrap()).unwrap();
        writeln!(file, "{{\"meta\": broken").unwrap();
        let mut unknown = serde_json::to_value(&events[1]).unwrap();
        unknown["kind"]["type"] = serde_json::Value::from("RebaseExecuted");
        writeln!(file, "{}", unknown).unwrap();
        writeln!(file, "{}", serde_json::to_string(&events[1]).unwrap()).unwrap();

        let engine = Arc::new(Mutex::new(IndexerEngine::in_memory(Arc::new(UnavailableReader))));
        let (tx, rx) = mpsc::channel(8);
        let path = file.path().to_path_buf();
        let reader = tokio::spawn(async move { stream_event_log(&path, tx).await });
        let summary = start_ingestion(rx, engine.clone(), 50).await;
        let read = reader.await.unwrap().unwrap();

        assert_eq!(read.sent, 2);
        assert_eq!(read.skipped, 2);
        assert_eq!(summary.events, 2);

        let guard = engine.lock().unwrap();
        let stored: Vault = guard.store().load(&vault.to_string()).unwrap().unwrap();
        assert_eq!(stored.total_assets, Amount::from(500u64));
        let deposits: Vec<Deposit> = guard.store().all().unwrap();
        assert_eq!(deposits.len(), 1);
    }
}
