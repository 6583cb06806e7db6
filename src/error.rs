//! Error types for LogKV
//!
//! Provides a unified error type for all operations.
//!
//! Missing keys are never errors: lookups return `Ok(None)`. Errors fall into
//! two families, I/O failures from the filesystem and internal inconsistencies
//! between the index and the data file. Use [`KvError::is_internal`] to tell
//! them apart.

use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for LogKV operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Data File Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt record at offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },

    #[error("Truncated record at offset {offset}")]
    TruncatedRecord { offset: u64 },

    #[error("Entry {field} is {len} bytes, larger than a record can hold")]
    EntryTooLarge { field: &'static str, len: usize },

    // -------------------------------------------------------------------------
    // Index Errors
    // -------------------------------------------------------------------------
    #[error("Index points at offset {offset} but {reason}")]
    IndexInconsistency { offset: u64, reason: String },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KvError {
    /// Build a corruption error for the record at `offset`
    pub(crate) fn corruption(offset: u64, reason: impl Into<String>) -> Self {
        KvError::Corruption {
            offset,
            reason: reason.into(),
        }
    }

    /// Build an index inconsistency error for the record at `offset`
    pub(crate) fn index_inconsistency(offset: u64, reason: impl Into<String>) -> Self {
        KvError::IndexInconsistency {
            offset,
            reason: reason.into(),
        }
    }

    /// True when the index and the data file disagree, or the data file holds
    /// bytes that do not decode. A re-open (full recovery) is the usual answer.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            KvError::Corruption { .. }
                | KvError::TruncatedRecord { .. }
                | KvError::IndexInconsistency { .. }
        )
    }
}
