//! Engine diagnostics counters
//!
//! Best-effort correlation, degraded valuations and events referencing
//! unknown vaults are counted here in addition to being logged.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub events_processed: u64,
    /// Handler referenced a vault that was never created
    pub missing_aggregates: u64,
    /// Individual authoritative reads that failed
    pub failed_reads: u64,
    /// Valuations where AUM fell back to local holdings
    pub usd_fallbacks: u64,
    /// Local holdings or supply that went below zero and were clamped
    pub negative_clamps: u64,
    pub value_changes: u64,
    pub correlations_matched: u64,
    /// Classification dropped: no candidate call inside the probe window
    pub correlations_unmatched: u64,
    /// More than one candidate call inside the probe window
    pub correlations_ambiguous: u64,
    /// Matched call already carried a classification
    pub calls_reclassified: u64,
    /// Magnitude not applied because the call already had a value
    pub refinements_skipped: u64,
    pub duplicate_audit_keys: u64,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Diagnostics {
        self.clone()
    }

    pub fn log_summary(&self) {
        log::info!(
            "📊 Diagnostics: {} events | missing vaults: {} | failed reads: {} | usd fallbacks: {} | clamps: {} | value changes: {}",
            self.events_processed,
            self.missing_aggregates,
            self.failed_reads,
            self.usd_fallbacks,
            self.negative_clamps,
            self.value_changes,
        );
        log::info!(
            "   └─ correlation: {} matched, {} unmatched, {} ambiguous, {} reclassified, {} refinements skipped | duplicate audit keys: {}",
            self.correlations_matched,
            self.correlations_unmatched,
            self.correlations_ambiguous,
            self.calls_reclassified,
            self.refinements_skipped,
            self.duplicate_audit_keys,
        );
    }
}
