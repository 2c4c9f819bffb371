//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::directory::SegmentId;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A directory entry whose name is not a segment id.
    #[error("malformed segment name {name:?} in {}", dir.display())]
    MalformedName {
        /// Directory holding the entry.
        dir: PathBuf,
        /// The offending file name.
        name: String,
    },

    /// The requested segment does not exist.
    #[error("segment {id} not found")]
    NotFound {
        /// The missing segment id.
        id: SegmentId,
    },

    /// The configured path exists but is not a directory.
    #[error("not a directory: {}", path.display())]
    NotADirectory {
        /// The offending path.
        path: PathBuf,
    },
}
