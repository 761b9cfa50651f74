//! vaultflow - derived-state indexer for managed investment vaults
//!
//! Consumes decoded contract events (vault factory, vaults, asset and
//! platform guards, governance) and maintains queryable aggregates: vault
//! valuations, participant positions, daily buckets, protocol totals and an
//! append-only audit log.

pub mod amount;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod events;
pub mod ids;
pub mod ingestion;
pub mod lifecycle;
pub mod reader;
pub mod schema;
pub mod store;

mod handlers;

pub use engine::IndexerEngine;
pub use error::{IndexerError, IndexerResult, StoreError};
