//! # caskdb Codec
//!
//! Binary encoding for the two on-disk record kinds of caskdb.
//!
//! ## Log Entry (data segments)
//!
//! ```text
//! | value_len (4) | key (8) | value (value_len) |
//! ```
//!
//! ## Hint Entry (hint files)
//!
//! ```text
//! | key (8) | offset (4) |
//! ```
//!
//! Entries are packed back-to-back with no padding and no checksum.
//! All integers are big-endian.
//!
//! ## Usage
//!
//! ```
//! use caskdb_codec::{LogEntry, LogEntryIter};
//!
//! let mut segment = Vec::new();
//! LogEntry::new(7, b"sunny".to_vec()).encode_into(&mut segment).unwrap();
//! LogEntry::new(8, b"rain".to_vec()).encode_into(&mut segment).unwrap();
//!
//! let entry = LogEntry::decode_at(&segment, 17).unwrap();
//! assert_eq!(entry.key, 8);
//!
//! let keys: Vec<i64> = LogEntryIter::new(&segment)
//!     .map(|r| r.unwrap().1.key)
//!     .collect();
//! assert_eq!(keys, vec![7, 8]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod entry;
mod error;
mod hint;

pub use entry::{encode_entry, LogEntry, LogEntryIter};
pub use error::{CodecError, CodecResult};
pub use hint::{decode_hints, encode_hints, HintEntry};

/// A key as stored on disk: a fixed-width signed 64-bit integer.
pub type Key = i64;

/// Width of an encoded key.
pub const KEY_SIZE: usize = 8;

/// Width of the value length prefix.
pub const LEN_SIZE: usize = 4;

/// Width of a hint offset.
pub const OFFSET_SIZE: usize = 4;

/// Fixed overhead of one log entry (length prefix + key).
pub const ENTRY_HEADER_SIZE: usize = LEN_SIZE + KEY_SIZE;

/// Size of one encoded hint entry.
pub const HINT_ENTRY_SIZE: usize = KEY_SIZE + OFFSET_SIZE;

/// Returns the encoded size of a log entry holding `value_len` value bytes.
#[must_use]
pub const fn entry_size(value_len: usize) -> usize {
    ENTRY_HEADER_SIZE + value_len
}
