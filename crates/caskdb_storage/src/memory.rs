//! In-memory segment directory for testing.

use crate::directory::{SegmentDirectory, SegmentId};
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory segment directory.
///
/// Suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral engines that don't need persistence
///
/// # Example
///
/// ```rust
/// use caskdb_storage::{InMemoryDirectory, SegmentDirectory};
///
/// let dir = InMemoryDirectory::new();
/// dir.write(0, b"test data").unwrap();
/// assert_eq!(dir.read(0).unwrap(), b"test data");
/// ```
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    files: RwLock<BTreeMap<SegmentId, Vec<u8>>>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory with pre-existing files.
    ///
    /// Useful for testing recovery scenarios.
    #[must_use]
    pub fn with_files<I>(files: I) -> Self
    where
        I: IntoIterator<Item = (SegmentId, Vec<u8>)>,
    {
        Self {
            files: RwLock::new(files.into_iter().collect()),
        }
    }

    /// Returns a copy of all files.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<SegmentId, Vec<u8>> {
        self.files.read().clone()
    }
}

impl SegmentDirectory for InMemoryDirectory {
    fn list(&self) -> StorageResult<Vec<SegmentId>> {
        Ok(self.files.read().keys().copied().collect())
    }

    fn read(&self, id: SegmentId) -> StorageResult<Vec<u8>> {
        self.files
            .read()
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound { id })
    }

    fn write(&self, id: SegmentId, data: &[u8]) -> StorageResult<()> {
        self.files.write().insert(id, data.to_vec());
        Ok(())
    }

    fn delete(&self, id: SegmentId) -> StorageResult<()> {
        self.files
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound { id })
    }

    fn exists(&self, id: SegmentId) -> StorageResult<bool> {
        Ok(self.files.read().contains_key(&id))
    }

    fn size_of(&self, id: SegmentId) -> StorageResult<u64> {
        self.files
            .read()
            .get(&id)
            .map(|data| data.len() as u64)
            .ok_or(StorageError::NotFound { id })
    }

    fn count(&self) -> StorageResult<usize> {
        Ok(self.files.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_write_and_read() {
        let dir = InMemoryDirectory::new();
        dir.write(1, b"hello").unwrap();
        assert_eq!(dir.read(1).unwrap(), b"hello");
        assert_eq!(dir.size_of(1).unwrap(), 5);
    }

    #[test]
    fn memory_list_sorted() {
        let dir = InMemoryDirectory::new();
        for id in [20, 3, 11] {
            dir.write(id, b"").unwrap();
        }
        assert_eq!(dir.list().unwrap(), vec![3, 11, 20]);
        assert_eq!(dir.count().unwrap(), 3);
    }

    #[test]
    fn memory_delete() {
        let dir = InMemoryDirectory::with_files([(4, b"x".to_vec())]);
        dir.delete(4).unwrap();
        assert!(!dir.exists(4).unwrap());
        assert!(matches!(dir.delete(4), Err(StorageError::NotFound { id: 4 })));
    }

    #[test]
    fn memory_missing_read() {
        let dir = InMemoryDirectory::new();
        assert!(matches!(dir.read(0), Err(StorageError::NotFound { id: 0 })));
    }

    #[test]
    fn memory_snapshot() {
        let dir = InMemoryDirectory::new();
        dir.write(0, b"a").unwrap();
        let snapshot = dir.snapshot();
        dir.write(0, b"b").unwrap();
        assert_eq!(snapshot.get(&0).unwrap(), b"a");
    }
}
