//! # caskdb Storage
//!
//! Directory abstraction for caskdb segment and hint files.
//!
//! A segment directory is a flat set of immutable blobs named by
//! non-negative decimal integers. Directories are **opaque byte stores**:
//! they do not interpret the entries they hold.
//!
//! ## Design Principles
//!
//! - Files are written whole and replaced whole; there is no append
//! - Listings are always in ascending numeric order, never lexical
//! - A non-numeric entry is a configuration error, never skipped
//! - Implementations are `Send + Sync` for concurrent access
//!
//! ## Available Directories
//!
//! - [`InMemoryDirectory`] - For testing and ephemeral engines
//! - [`FileDirectory`] - For persistent storage using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use caskdb_storage::{InMemoryDirectory, SegmentDirectory};
//!
//! let dir = InMemoryDirectory::new();
//! dir.write(10, b"ten").unwrap();
//! dir.write(9, b"nine").unwrap();
//! assert_eq!(dir.list().unwrap(), vec![9, 10]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod directory;
mod error;
mod file;
mod memory;

pub use directory::{parse_segment_name, SegmentDirectory, SegmentId};
pub use error::{StorageError, StorageResult};
pub use file::FileDirectory;
pub use memory::InMemoryDirectory;
