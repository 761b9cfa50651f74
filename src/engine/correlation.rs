//! Call correlation
//!
//! Classification events are emitted by a different contract than the call
//! they describe and carry no reference to it. The only shared context is
//! the transaction, so the classification is attached by probing the call
//! keys `(tx, 0..K)` and taking the first hit.
//!
//! This is best-effort. A call at position >= K is never found, and with
//! several calls in one transaction the first one wins. Both cases are
//! counted in `Diagnostics`.

use crate::amount::Amount;
use crate::diagnostics::Diagnostics;
use crate::error::StoreResult;
use crate::ids::{call_key, TxHash};
use crate::schema::{ContractCall, TransactionType};
use crate::store::{EntityStore, StoreExt};

pub const DEFAULT_CORRELATION_WINDOW: u32 = 10;

/// What a classification event says about the call it refers to
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub transaction_type: TransactionType,
    /// Magnitude refinement (exchanged amount, liquidity added, ...)
    pub magnitude: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrelationOutcome {
    Matched { call_key: String, candidates: usize },
    Unmatched,
}

#[derive(Debug, Clone, Copy)]
pub struct CorrelationIndex {
    window: u32,
}

impl CorrelationIndex {
    pub fn new(window: u32) -> Self {
        Self {
            window: window.max(1),
        }
    }

    pub fn window(&self) -> u32 {
        self.window
    }

    /// First existing call in `(tx, 0..window)`, plus how many were found
    pub fn probe(
        &self,
        store: &dyn EntityStore,
        tx_hash: &TxHash,
    ) -> StoreResult<(Option<ContractCall>, usize)> {
        let mut first = None;
        let mut candidates = 0;
        for position in 0..self.window {
            if let Some(call) = store.load::<ContractCall>(&call_key(tx_hash, position))? {
                candidates += 1;
                if first.is_none() {
                    first = Some(call);
                }
            }
        }
        Ok((first, candidates))
    }

    /// Attach `classification` to the first call of the transaction
    ///
    /// A magnitude only fills a zero value; a call that already carries a
    /// value keeps it.
    pub fn classify(
        &self,
        store: &mut dyn EntityStore,
        diagnostics: &mut Diagnostics,
        tx_hash: &TxHash,
        classification: &Classification,
    ) -> StoreResult<CorrelationOutcome> {
        let (first, candidates) = self.probe(store, tx_hash)?;

        let Some(mut call) = first else {
            diagnostics.correlations_unmatched += 1;
            log::warn!(
                "⚠️  No contract call within {} positions of tx {}, dropping {:?} classification",
                self.window,
                tx_hash,
                classification.transaction_type
            );
            return Ok(CorrelationOutcome::Unmatched);
        };

        if candidates > 1 {
            diagnostics.correlations_ambiguous += 1;
            log::warn!(
                "⚠️  {} candidate calls in tx {}, classifying first ({})",
                candidates,
                tx_hash,
                call.id
            );
        }

        if call.transaction_type.is_classified() {
            diagnostics.calls_reclassified += 1;
            log::warn!(
                "⚠️  Call {} already classified as {:?}, overwriting with {:?}",
                call.id,
                call.transaction_type,
                classification.transaction_type
            );
        }
        call.transaction_type = classification.transaction_type;

        if let Some(magnitude) = &classification.magnitude {
            if call.value.is_zero() {
                call.value = magnitude.clone();
            } else if &call.value != magnitude {
                diagnostics.refinements_skipped += 1;
                log::debug!(
                    "Call {} keeps value {} (refinement {} skipped)",
                    call.id,
                    call.value,
                    magnitude
                );
            }
        }

        store.upsert(&call)?;
        diagnostics.correlations_matched += 1;

        Ok(CorrelationOutcome::Matched {
            call_key: call.id,
            candidates,
        })
    }
}

impl Default for CorrelationIndex {
    fn default() -> Self {
        Self::new(DEFAULT_CORRELATION_WINDOW)
    }
}
