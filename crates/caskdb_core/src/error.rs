//! Error types for caskdb core.

use caskdb_codec::Key;
use caskdb_storage::SegmentId;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in caskdb core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Segment or hint directory error.
    #[error("storage error: {0}")]
    Storage(#[from] caskdb_storage::StorageError),

    /// Entry codec error.
    #[error("codec error: {0}")]
    Codec(#[from] caskdb_codec::CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The entry found at an indexed location carries a different key.
    #[error(
        "index corruption: expected key {expected} at segment {segment_id} offset {offset}, found key {found}"
    )]
    KeyMismatch {
        /// The key that was looked up.
        expected: Key,
        /// The key decoded at the indexed location.
        found: Key,
        /// Segment the index pointed at.
        segment_id: SegmentId,
        /// Offset the index pointed at.
        offset: u32,
    },

    /// A key present in durable storage has no index entry.
    #[error("index corruption: key {key} found in durable segments but missing from the index")]
    MissingFromIndex {
        /// The orphaned key.
        key: Key,
    },

    /// Any other inconsistency between the index and the files on disk.
    #[error("index corruption: {message}")]
    IndexCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// An entry that cannot fit in a single write buffer.
    #[error("entry of {size} bytes exceeds the write buffer capacity of {capacity} bytes")]
    EntryTooLarge {
        /// Encoded size of the rejected entry.
        size: usize,
        /// Configured buffer capacity.
        capacity: usize,
    },

    /// Compaction would need more segment ids than it freed.
    #[error("compaction needs {needed} output segments but only {available} ids are free")]
    CompactionOverflow {
        /// Output segments required.
        needed: usize,
        /// Segment ids available at or below the compaction start id.
        available: u64,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates an index corruption error.
    pub fn index_corruption(message: impl Into<String>) -> Self {
        Self::IndexCorruption {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true if this error reports an index/disk inconsistency.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::KeyMismatch { .. } | Self::MissingFromIndex { .. } | Self::IndexCorruption { .. }
        )
    }
}
