//! Event ingestion - JSONL log reader and async channel processor
//!
//! ```text
//! events.jsonl ──stream_event_log──▶ mpsc ──start_ingestion──▶ IndexerEngine
//! ```
//!
//! The engine processes one event at a time, to completion, in the order
//! the channel delivers them.

use crate::engine::IndexerEngine;
use crate::error::{IndexerError, IndexerResult};
use crate::events::IndexedEvent;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};

/// Decode one log line; blank lines and `#` comments yield `None`
pub fn parse_event_line(line: &str, line_number: usize) -> IndexerResult<Option<IndexedEvent>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|source| IndexerError::Decode {
            line: line_number,
            source,
        })
}

/// Totals reported by the log reader
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogReadSummary {
    pub sent: usize,
    /// Lines that failed to decode
    pub skipped: usize,
}

/// Read a JSONL event log and send every event into `tx`
///
/// A line that fails to decode (malformed JSON, unknown event kind) is
/// logged and skipped; later events are still delivered. Only I/O failures
/// end the read early.
pub async fn stream_event_log(
    path: impl AsRef<Path>,
    tx: mpsc::Sender<IndexedEvent>,
) -> IndexerResult<LogReadSummary> {
    let file = tokio::fs::File::open(path.as_ref()).await?;
    let mut lines = BufReader::new(file).lines();
    let mut line_number = 0usize;
    let mut summary = LogReadSummary::default();

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        let event = match parse_event_line(&line, line_number) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                summary.skipped += 1;
                log::error!("❌ Skipping undecodable event: {}", e);
                continue;
            }
        };
        if tx.send(event).await.is_err() {
            log::warn!(
                "⚠️  Event channel closed after {} events, stopping reader",
                summary.sent
            );
            break;
        }
        summary.sent += 1;
    }

    log::info!(
        "✅ Event log {} read: {} events, {} skipped ({} lines)",
        path.as_ref().display(),
        summary.sent,
        summary.skipped,
        line_number
    );
    Ok(summary)
}

/// Totals reported when the ingestion loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionSummary {
    pub events: u64,
    pub failed: u64,
}

fn lock_engine(engine: &Mutex<IndexerEngine>) -> MutexGuard<'_, IndexerEngine> {
    // A panic inside a handler leaves the store consistent per record;
    // keep going with whatever state it left.
    engine.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Start event ingestion from the channel
///
/// Main loop:
/// 1. Receives events via mpsc channel
/// 2. Processes each event through the engine (lock held per event)
/// 3. Periodically logs throughput and diagnostics
///
/// A handler `Err` (store failure) is logged and the loop moves on to the
/// next event. Runs until the channel is closed.
pub async fn start_ingestion(
    mut rx: mpsc::Receiver<IndexedEvent>,
    engine: Arc<Mutex<IndexerEngine>>,
    stats_interval_ms: u64,
) -> IngestionSummary {
    log::info!("🚀 Starting event ingestion");
    log::info!("   ├─ Stats interval: {}ms", stats_interval_ms);
    log::info!("   └─ Waiting for events...");

    let mut stats_timer = interval(Duration::from_millis(stats_interval_ms.max(1)));
    let mut summary = IngestionSummary::default();
    let mut window_count = 0u64;
    let mut window_start = std::time::Instant::now();

    loop {
        tokio::select! {
            received = rx.recv() => {
                let Some(event) = received else {
                    log::warn!("⚠️  Event channel closed, stopping ingestion");
                    break;
                };

                let result = lock_engine(&engine).process(&event);
                summary.events += 1;
                window_count += 1;

                if let Err(e) = result {
                    summary.failed += 1;
                    log::error!(
                        "❌ Failed to process {} ({}): {}",
                        event.kind.name(),
                        event.meta.record_key(),
                        e
                    );
                }
            }

            _ = stats_timer.tick() => {
                let elapsed = window_start.elapsed().as_secs_f64();
                if window_count > 0 && elapsed > 0.0 {
                    log::info!(
                        "📊 Ingestion rate: {:.1} events/sec (total: {}) | channel backlog: {}",
                        window_count as f64 / elapsed,
                        summary.events,
                        rx.len()
                    );
                }
                window_count = 0;
                window_start = std::time::Instant::now();

                let diagnostics = lock_engine(&engine).diagnostics().snapshot();
                diagnostics.log_summary();
            }
        }
    }

    lock_engine(&engine).diagnostics().log_summary();
    log::info!(
        "✅ Ingestion stopped: {} events, {} failed",
        summary.events,
        summary.failed
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_blank_and_comment_lines() {
        assert!(parse_event_line("", 1).unwrap().is_none());
        assert!(parse_event_line("   ", 2).unwrap().is_none());
        assert!(parse_event_line("# genesis", 3).unwrap().is_none());
    }

    #[test]
    fn test_parse_reports_line_number() {
        match parse_event_line("{not json", 42) {
            Err(IndexerError::Decode { line, .. }) => assert_eq!(line, 42),
            other => panic!("expected decode error, got {:?}", other.map(|_| ())),
        }
    }
}
