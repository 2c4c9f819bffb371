//! # caskdb Core
//!
//! Log-structured key-value engine for caskdb.
//!
//! This crate provides:
//! - A bounded write buffer that flushes to immutable segment files
//! - Per-segment hint files for fast index rebuild on startup
//! - An in-memory key index with last-write-wins semantics
//! - Two-phase compaction that keeps reads available while scanning
//! - The [`Engine`] facade tying them together behind one lock
//!
//! ## Example
//!
//! ```rust
//! use caskdb_core::{Config, Engine};
//!
//! let engine = Engine::open_in_memory(Config::default()).unwrap();
//! engine.put(7, b"a").unwrap();
//! engine.flush().unwrap();
//! engine.put(7, b"b").unwrap();
//! engine.flush().unwrap();
//!
//! engine.compact().unwrap();
//! assert_eq!(engine.get(7).unwrap(), Some(b"b".to_vec()));
//! assert_eq!(engine.segment_count().unwrap(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod buffer;
mod compaction;
mod config;
mod engine;
mod error;
mod export;
mod index;
mod recovery;
mod stats;

pub use buffer::{Appended, WriteBuffer};
pub use compaction::{CompactionPlan, CompactionResult, CompactionScan, Compactor};
pub use config::{Config, RecoveryPolicy, DEFAULT_BUFFER_CAPACITY};
pub use engine::{Engine, VerifyReport};
pub use error::{CoreError, CoreResult};
pub use export::{render_table, EXPORT_HEADER};
pub use index::{IndexEntry, KeyIndex};
pub use recovery::{rebuild_index, Recovered, RecoveryReport};
pub use stats::{EngineStats, StatsSnapshot};

pub use caskdb_codec::Key;
pub use caskdb_storage::SegmentId;

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
