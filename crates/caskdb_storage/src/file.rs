//! File-based segment directory for persistent storage.

use crate::directory::{parse_segment_name, SegmentDirectory, SegmentId};
use crate::error::{StorageError, StorageResult};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A segment directory backed by an OS directory.
///
/// Each id maps to a file named by its decimal representation with no
/// extension, e.g. `<dir>/17`.
///
/// # Durability
///
/// With `sync` enabled (the default), `write` calls `File::sync_all()` on
/// the new file and fsyncs the directory afterwards; `delete` fsyncs the
/// directory. With `sync` disabled data is only pushed to the OS.
///
/// # Example
///
/// ```no_run
/// use caskdb_storage::{FileDirectory, SegmentDirectory};
/// use std::path::Path;
///
/// let dir = FileDirectory::open(Path::new("logs"), true).unwrap();
/// dir.write(0, b"segment bytes").unwrap();
/// assert_eq!(dir.list().unwrap(), vec![0]);
/// ```
#[derive(Debug)]
pub struct FileDirectory {
    path: PathBuf,
    sync: bool,
}

impl FileDirectory {
    /// Opens a segment directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory is missing and `create_if_missing` is false
    /// - The path exists but is not a directory
    /// - The directory cannot be created
    pub fn open(path: &Path, create_if_missing: bool) -> StorageResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(StorageError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("segment directory does not exist: {}", path.display()),
                )));
            }
        }

        if !path.is_dir() {
            return Err(StorageError::NotADirectory {
                path: path.to_path_buf(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            sync: true,
        })
    }

    /// Enables or disables fsync on write and delete.
    #[must_use]
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of the file stored under `id`.
    #[must_use]
    pub fn file_path(&self, id: SegmentId) -> PathBuf {
        self.path.join(id.to_string())
    }

    fn map_not_found(err: io::Error, id: SegmentId) -> StorageError {
        if err.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound { id }
        } else {
            StorageError::Io(err)
        }
    }

    /// Syncs the directory so that created and removed entries are durable.
    ///
    /// Windows NTFS journals metadata, so the explicit fsync is skipped there.
    #[cfg(unix)]
    fn sync_directory(&self) -> StorageResult<()> {
        if self.sync {
            File::open(&self.path)?.sync_all()?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StorageResult<()> {
        Ok(())
    }
}

impl SegmentDirectory for FileDirectory {
    fn list(&self) -> StorageResult<Vec<SegmentId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            ids.push(parse_segment_name(&self.path, &name)?);
        }
        ids.sort_unstable();
        Ok(ids)
    }

    fn read(&self, id: SegmentId) -> StorageResult<Vec<u8>> {
        fs::read(self.file_path(id)).map_err(|e| Self::map_not_found(e, id))
    }

    fn write(&self, id: SegmentId, data: &[u8]) -> StorageResult<()> {
        let mut file = File::create(self.file_path(id))?;
        file.write_all(data)?;
        if self.sync {
            file.sync_all()?;
        } else {
            file.flush()?;
        }
        drop(file);

        debug!(dir = %self.path.display(), id, bytes = data.len(), "segment file written");
        self.sync_directory()
    }

    fn delete(&self, id: SegmentId) -> StorageResult<()> {
        fs::remove_file(self.file_path(id)).map_err(|e| Self::map_not_found(e, id))?;
        debug!(dir = %self.path.display(), id, "segment file removed");
        self.sync_directory()
    }

    fn exists(&self, id: SegmentId) -> StorageResult<bool> {
        Ok(self.file_path(id).is_file())
    }

    fn size_of(&self, id: SegmentId) -> StorageResult<u64> {
        let metadata = fs::metadata(self.file_path(id)).map_err(|e| Self::map_not_found(e, id))?;
        Ok(metadata.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_directory() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("logs");

        let dir = FileDirectory::open(&path, true).unwrap();
        assert!(path.is_dir());
        assert!(dir.list().unwrap().is_empty());
    }

    #[test]
    fn open_missing_without_create_fails() {
        let temp = tempdir().unwrap();
        let result = FileDirectory::open(&temp.path().join("missing"), false);
        assert!(matches!(result, Err(StorageError::Io(_))));
    }

    #[test]
    fn open_file_path_fails() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("plain");
        fs::write(&path, b"x").unwrap();

        let result = FileDirectory::open(&path, true);
        assert!(matches!(result, Err(StorageError::NotADirectory { .. })));
    }

    #[test]
    fn write_read_and_overwrite() {
        let temp = tempdir().unwrap();
        let dir = FileDirectory::open(temp.path(), true).unwrap();

        dir.write(3, b"first").unwrap();
        assert_eq!(dir.read(3).unwrap(), b"first");
        assert_eq!(dir.size_of(3).unwrap(), 5);

        dir.write(3, b"second!").unwrap();
        assert_eq!(dir.read(3).unwrap(), b"second!");
        assert!(temp.path().join("3").is_file());
    }

    #[test]
    fn list_is_numeric_not_lexical() {
        let temp = tempdir().unwrap();
        let dir = FileDirectory::open(temp.path(), true).unwrap();

        for id in [10, 9, 2, 100, 1] {
            dir.write(id, b"x").unwrap();
        }

        assert_eq!(dir.list().unwrap(), vec![1, 2, 9, 10, 100]);
        assert_eq!(dir.count().unwrap(), 5);
    }

    #[test]
    fn list_rejects_foreign_file() {
        let temp = tempdir().unwrap();
        let dir = FileDirectory::open(temp.path(), true).unwrap();
        dir.write(1, b"x").unwrap();
        fs::write(temp.path().join("notes.txt"), b"hello").unwrap();

        assert!(matches!(
            dir.list(),
            Err(StorageError::MalformedName { name, .. }) if name == "notes.txt"
        ));
    }

    #[test]
    fn list_rejects_zero_padded_alias() {
        let temp = tempdir().unwrap();
        let dir = FileDirectory::open(temp.path(), true).unwrap();
        dir.write(0, b"x").unwrap();
        fs::write(temp.path().join("00"), b"alias").unwrap();

        assert!(matches!(
            dir.list(),
            Err(StorageError::MalformedName { name, .. }) if name == "00"
        ));
    }

    #[test]
    fn delete_and_missing() {
        let temp = tempdir().unwrap();
        let dir = FileDirectory::open(temp.path(), true).unwrap().with_sync(false);

        dir.write(1, b"x").unwrap();
        assert!(dir.exists(1).unwrap());

        dir.delete(1).unwrap();
        assert!(!dir.exists(1).unwrap());
        assert!(matches!(dir.read(1), Err(StorageError::NotFound { id: 1 })));
        assert!(matches!(dir.delete(1), Err(StorageError::NotFound { id: 1 })));
    }

    #[test]
    fn read_all_in_order() {
        let temp = tempdir().unwrap();
        let dir = FileDirectory::open(temp.path(), true).unwrap();
        dir.write(11, b"b").unwrap();
        dir.write(2, b"a").unwrap();

        let all = dir.read_all().unwrap();
        assert_eq!(all, vec![(2, b"a".to_vec()), (11, b"b".to_vec())]);
    }
}
