//! Error types
//!
//! Only infrastructure failures surface as `Err`. Domain anomalies (missing
//! aggregates, failed authoritative reads, unresolved correlations, duplicate
//! audit keys) are logged and counted in `Diagnostics` instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error in {table}/{key}: {source}")]
    Serialization {
        table: &'static str,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("malformed event at line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of an authoritative read; never escalated past the valuation step
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("call reverted")]
    Reverted,

    #[error("source unavailable")]
    Unavailable,
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type IndexerResult<T> = Result<T, IndexerError>;
