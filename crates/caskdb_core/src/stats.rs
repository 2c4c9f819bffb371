//! Engine statistics.
//!
//! Counters are updated by the engine on every operation and can be read
//! at any time, including while other operations are in progress.
//!
//! ```rust
//! use caskdb_core::{Config, Engine};
//!
//! let engine = Engine::open_in_memory(Config::default()).unwrap();
//! engine.put(1, b"one").unwrap();
//! engine.get(1).unwrap();
//! engine.get(2).unwrap();
//!
//! let stats = engine.stats();
//! assert_eq!(stats.writes, 1);
//! assert_eq!(stats.reads, 2);
//! assert_eq!(stats.read_misses, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Engine statistics.
///
/// All counters are atomic and monotonically increasing.
#[derive(Debug, Default)]
pub struct EngineStats {
    reads: AtomicU64,
    read_misses: AtomicU64,
    writes: AtomicU64,
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
    flushes: AtomicU64,
    compactions: AtomicU64,
    errors: AtomicU64,
}

impl EngineStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a read that found a value of `bytes` bytes.
    pub(crate) fn record_read(&self, bytes: u64) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Records a read of an absent key.
    pub(crate) fn record_miss(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.read_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a write of `bytes` value bytes.
    pub(crate) fn record_write(&self, bytes: u64) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_compaction(&self) {
        self.compactions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the total number of reads, hits and misses.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Returns the number of reads of absent keys.
    pub fn read_misses(&self) -> u64 {
        self.read_misses.load(Ordering::Relaxed)
    }

    /// Returns the total number of writes.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Returns the total value bytes returned by reads.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    /// Returns the total value bytes accepted by writes.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Returns the number of buffer flushes.
    pub fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Returns the number of completed compactions.
    pub fn compactions(&self) -> u64 {
        self.compactions.load(Ordering::Relaxed)
    }

    /// Returns the number of failed operations.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            reads: self.reads(),
            read_misses: self.read_misses(),
            writes: self.writes(),
            bytes_read: self.bytes_read(),
            bytes_written: self.bytes_written(),
            flushes: self.flushes(),
            compactions: self.compactions(),
            errors: self.errors(),
        }
    }
}

/// A point-in-time copy of [`EngineStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Total reads, hits and misses.
    pub reads: u64,
    /// Reads of absent keys.
    pub read_misses: u64,
    /// Total writes.
    pub writes: u64,
    /// Value bytes returned by reads.
    pub bytes_read: u64,
    /// Value bytes accepted by writes.
    pub bytes_written: u64,
    /// Buffer flushes.
    pub flushes: u64,
    /// Completed compactions.
    pub compactions: u64,
    /// Failed operations.
    pub errors: u64,
}
