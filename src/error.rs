//! Error types for lsmstore
//!
//! Provides a unified error type for all operations. A missing key is not an
//! error: lookups return `Ok(None)`.

use std::fmt;

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for lsmstore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Wraps a failure with the subsystem stage that produced it
    #[error("{stage} error: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<StoreError>,
    },

    // -------------------------------------------------------------------------
    // Integrity Errors
    // -------------------------------------------------------------------------
    #[error("invalid checksum: stored {expected:#010x}, computed {actual:#010x}")]
    Checksum { expected: u32, actual: u32 },

    #[error("malformed frame: {0}")]
    Framing(String),

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    #[error("invalid entry version: {0}")]
    InvalidVersion(u8),

    #[error("{field} too long: {len} bytes exceeds {max}", max = u16::MAX)]
    FieldTooLong { field: &'static str, len: usize },

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("unknown pending table: {0}")]
    UnknownTable(u64),

    // -------------------------------------------------------------------------
    // Validation Errors
    // -------------------------------------------------------------------------
    #[error("empty key")]
    EmptyKey,

    #[error("{0} is closed")]
    Closed(&'static str),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Tag this error with the stage it surfaced from
    pub fn at(self, stage: Stage) -> Self {
        StoreError::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// Whether this error (or the error it wraps) signals a checksum mismatch
    pub fn is_checksum(&self) -> bool {
        match self {
            StoreError::Checksum { .. } => true,
            StoreError::Stage { source, .. } => source.is_checksum(),
            _ => false,
        }
    }
}

/// The stage an error surfaced from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Data,
    Index,
    SparseIndex,
    Wal,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Data => "data",
            Stage::Index => "index",
            Stage::SparseIndex => "sparse index",
            Stage::Wal => "wal",
        };
        f.write_str(name)
    }
}
