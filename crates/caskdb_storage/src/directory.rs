//! Segment directory trait definition.

use crate::error::{StorageError, StorageResult};
use std::path::Path;

/// Numeric name of a segment or hint file.
pub type SegmentId = u64;

/// A flat directory of numerically named, immutable files.
///
/// caskdb keeps two of these: one for data segments and one for hint files.
/// A hint file shares its id with the data segment it describes.
///
/// # Invariants
///
/// - `list` returns ids in ascending numeric order
/// - `write` replaces any previous content stored under the id
/// - `read` returns exactly the bytes of the last successful `write`
/// - Implementations must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryDirectory`] - For testing
/// - [`super::FileDirectory`] - For persistent storage
pub trait SegmentDirectory: Send + Sync + std::fmt::Debug {
    /// Lists all ids in ascending numeric order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MalformedName`] if any entry is not a
    /// non-negative decimal integer, or an I/O error.
    fn list(&self) -> StorageResult<Vec<SegmentId>>;

    /// Reads the full content stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the id does not exist.
    fn read(&self, id: SegmentId) -> StorageResult<Vec<u8>>;

    /// Stores `data` under `id`, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be completed.
    fn write(&self, id: SegmentId, data: &[u8]) -> StorageResult<()>;

    /// Removes the file stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the id does not exist.
    fn delete(&self, id: SegmentId) -> StorageResult<()>;

    /// Checks whether `id` exists.
    fn exists(&self, id: SegmentId) -> StorageResult<bool>;

    /// Returns the size in bytes of the file stored under `id`.
    fn size_of(&self, id: SegmentId) -> StorageResult<u64>;

    /// Returns the number of files in the directory.
    fn count(&self) -> StorageResult<usize> {
        Ok(self.list()?.len())
    }

    /// Reads every file, ordered by ascending id.
    fn read_all(&self) -> StorageResult<Vec<(SegmentId, Vec<u8>)>> {
        self.list()?
            .into_iter()
            .map(|id| Ok((id, self.read(id)?)))
            .collect()
    }
}

/// Parses a directory entry name as a segment id.
///
/// Only the canonical decimal form is accepted: no sign, no whitespace, no
/// extension and no leading zeros. Files are addressed by that form, so any
/// other spelling could not be read or deleted by id.
///
/// # Errors
///
/// Returns [`StorageError::MalformedName`] for anything else.
pub fn parse_segment_name(dir: &Path, name: &str) -> StorageResult<SegmentId> {
    let malformed = || StorageError::MalformedName {
        dir: dir.to_path_buf(),
        name: name.to_string(),
    };

    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let id = name.parse::<SegmentId>().map_err(|_| malformed())?;
    if name != id.to_string() {
        return Err(malformed());
    }
    Ok(id)
}
