//! Engine facade.

use crate::buffer::WriteBuffer;
use crate::compaction::{CompactionResult, Compactor};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::export::{render_table, write_table};
use crate::index::{IndexEntry, KeyIndex};
use crate::recovery::{rebuild_index, RecoveryReport};
use crate::stats::{EngineStats, StatsSnapshot};
use caskdb_codec::{Key, LogEntry, ENTRY_HEADER_SIZE};
use caskdb_storage::{FileDirectory, InMemoryDirectory, SegmentDirectory, SegmentId};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// State guarded by the engine lock.
struct EngineState {
    index: KeyIndex,
    buffer: WriteBuffer,
}

/// Segment bytes loaded during one operation, keyed by id.
type SegmentCache = HashMap<SegmentId, Vec<u8>>;

/// Outcome of [`Engine::verify`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Index entries checked.
    pub keys_checked: usize,
    /// Durable segments referenced by the index.
    pub segments_referenced: usize,
    /// One message per index entry that failed to resolve.
    pub problems: Vec<String>,
}

impl VerifyReport {
    /// Returns true if every index entry resolved to its own key.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// The storage engine handle.
///
/// `Engine` owns the key index, the write buffer and the active segment id
/// behind a single readers-writer lock:
/// - `put`, `flush` and the second phase of `compact` take it exclusively
/// - `get`, `dump`, `export` and the first phase of `compact` share it
///
/// Share one engine between tasks with `Arc<Engine>`.
///
/// # Opening an Engine
///
/// ```rust,no_run
/// use caskdb_core::{Config, Engine};
/// use std::path::Path;
///
/// let engine = Engine::open(Path::new("logs"), Path::new("hints"), Config::default())?;
/// engine.put(42, b"21.5C")?;
/// assert_eq!(engine.get(42)?, Some(b"21.5C".to_vec()));
/// engine.close()?;
/// # Ok::<(), caskdb_core::CoreError>(())
/// ```
///
/// # In-Memory Engines
///
/// ```rust
/// use caskdb_core::{Config, Engine};
///
/// let engine = Engine::open_in_memory(Config::default()).unwrap();
/// engine.put(1, b"x").unwrap();
/// assert_eq!(engine.get(1).unwrap(), Some(b"x".to_vec()));
/// ```
pub struct Engine {
    config: Config,
    segments: Arc<dyn SegmentDirectory>,
    hints: Arc<dyn SegmentDirectory>,
    state: RwLock<EngineState>,
    /// Held across both compaction phases.
    compaction: Mutex<()>,
    compactor: Compactor,
    stats: EngineStats,
    recovery: RecoveryReport,
    is_open: RwLock<bool>,
}

impl Engine {
    /// Opens an engine over a log directory and a hint directory.
    ///
    /// # Errors
    ///
    /// Returns an error if either directory cannot be opened or contains a
    /// non-numeric file name, or if recovery cannot read a file.
    pub fn open(log_dir: &Path, hint_dir: &Path, config: Config) -> CoreResult<Self> {
        let segments = FileDirectory::open(log_dir, config.create_if_missing)?
            .with_sync(config.sync_on_flush);
        let hints = FileDirectory::open(hint_dir, config.create_if_missing)?
            .with_sync(config.sync_on_flush);
        Self::with_directories(Arc::new(segments), Arc::new(hints), config)
    }

    /// Opens an engine that keeps its segments in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn open_in_memory(config: Config) -> CoreResult<Self> {
        Self::with_directories(
            Arc::new(InMemoryDirectory::new()),
            Arc::new(InMemoryDirectory::new()),
            config,
        )
    }

    /// Opens an engine over explicit segment and hint directories.
    ///
    /// The key index is rebuilt from the directories according to
    /// [`Config::recovery`].
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer capacity cannot hold an entry header
    /// or if recovery fails.
    pub fn with_directories(
        segments: Arc<dyn SegmentDirectory>,
        hints: Arc<dyn SegmentDirectory>,
        config: Config,
    ) -> CoreResult<Self> {
        if config.buffer_capacity <= ENTRY_HEADER_SIZE {
            return Err(CoreError::invalid_operation(format!(
                "buffer capacity {} cannot hold an entry",
                config.buffer_capacity
            )));
        }

        let recovered = rebuild_index(segments.as_ref(), hints.as_ref(), config.recovery)?;
        let buffer = WriteBuffer::new(
            config.buffer_capacity,
            recovered.next_segment_id,
            Arc::clone(&segments),
            Arc::clone(&hints),
        );

        info!(
            keys = recovered.index.len(),
            active_segment_id = recovered.next_segment_id,
            "engine opened"
        );

        Ok(Self {
            compactor: Compactor::new(config.buffer_capacity),
            config,
            segments,
            hints,
            state: RwLock::new(EngineState {
                index: recovered.index,
                buffer,
            }),
            compaction: Mutex::new(()),
            stats: EngineStats::new(),
            recovery: recovered.report,
            is_open: RwLock::new(true),
        })
    }

    /// Writes `value` under `key`, replacing any previous value.
    ///
    /// The value is visible to `get` as soon as this returns. It becomes
    /// durable when the buffer holding it is flushed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EntryTooLarge`] if the entry cannot fit in one
    /// buffer, or a storage error if the flush this write forced failed.
    pub fn put(&self, key: Key, value: &[u8]) -> CoreResult<()> {
        self.ensure_open()?;
        let result = {
            let mut state = self.state.write();
            state.buffer.append(key, value).map(|appended| {
                state.index.insert(key, appended.location);
                appended.flushed
            })
        };

        match self.track(result)? {
            Some(id) => {
                self.stats.record_flush();
                debug!(key, flushed = id, "put forced a flush");
            }
            None => debug!(key, "put"),
        }
        self.stats.record_write(value.len() as u64);
        Ok(())
    }

    /// Reads the latest value of `key`.
    ///
    /// Returns `Ok(None)` if the key has never been written.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::KeyMismatch`] if the indexed location holds a
    /// different key, or a storage error if the segment cannot be read.
    pub fn get(&self, key: Key) -> CoreResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        let result = {
            let state = self.state.read();
            match state.index.get(key) {
                None => Ok(None),
                Some(entry) => self
                    .load(&state, key, entry, &mut SegmentCache::new())
                    .map(Some),
            }
        };

        match self.track(result)? {
            Some(value) => {
                self.stats.record_read(value.len() as u64);
                Ok(Some(value))
            }
            None => {
                debug!(key, "key not found");
                self.stats.record_miss();
                Ok(None)
            }
        }
    }

    /// Merges every durable segment into minimal segments.
    ///
    /// Reads keep flowing while the durable segments are scanned; the
    /// rewrite itself blocks all other operations. Overlapping calls run
    /// one after the other.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingFromIndex`] if a durable key is not
    /// indexed, [`CoreError::CompactionOverflow`] if the outputs do not fit
    /// in the freed ids, or a storage error.
    pub fn compact(&self) -> CoreResult<CompactionResult> {
        self.ensure_open()?;
        let _compacting = self.compaction.lock();
        let result = self.compact_locked();
        let result = self.track(result)?;
        if result.input_segments > 0 {
            self.stats.record_compaction();
        }
        Ok(result)
    }

    fn compact_locked(&self) -> CoreResult<CompactionResult> {
        let plan = {
            let state = self.state.read();
            let active = state.buffer.active_segment_id();
            let Some(scan) = self
                .compactor
                .scan(self.segments.as_ref(), self.hints.as_ref(), active)?
            else {
                debug!(active_segment_id = active, "nothing to compact");
                return Ok(CompactionResult::default());
            };
            info!(start_id = scan.start_id(), keys = scan.live_keys(), "compaction started");
            self.compactor.plan(scan)?
        };

        let mut state = self.state.write();
        self.compactor
            .apply(plan, self.segments.as_ref(), self.hints.as_ref(), &mut state.index)
            .inspect_err(|err| {
                if err.is_corruption() {
                    error!(error = %err, "compaction aborted on index corruption");
                }
            })
    }

    /// Predicts what [`Engine::compact`] would do without touching any file.
    ///
    /// Returns `None` if there is nothing durable to compact.
    ///
    /// # Errors
    ///
    /// Same as the scanning and planning part of `compact`.
    pub fn plan_compaction(&self) -> CoreResult<Option<CompactionResult>> {
        self.ensure_open()?;
        let _compacting = self.compaction.lock();
        let state = self.state.read();
        let active = state.buffer.active_segment_id();
        match self
            .compactor
            .scan(self.segments.as_ref(), self.hints.as_ref(), active)?
        {
            None => Ok(None),
            Some(scan) => Ok(Some(self.compactor.plan(scan)?.preview(&state.index))),
        }
    }

    /// Makes the write buffer durable.
    ///
    /// Returns the id written, or `None` if the buffer was empty.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the segment or hint file cannot be written.
    pub fn flush(&self) -> CoreResult<Option<SegmentId>> {
        self.ensure_open()?;
        let result = self.state.write().buffer.flush();
        let flushed = self.track(result)?;
        if flushed.is_some() {
            self.stats.record_flush();
        }
        Ok(flushed)
    }

    /// Returns every live pair in ascending key order.
    ///
    /// # Errors
    ///
    /// Fails like [`Engine::get`] on the first key that cannot be read.
    pub fn dump(&self) -> CoreResult<Vec<(Key, Vec<u8>)>> {
        self.ensure_open()?;
        let result = {
            let state = self.state.read();
            let mut cache = SegmentCache::new();
            state
                .index
                .sorted_keys()
                .into_iter()
                .map(|key| {
                    let entry = state.index.get(key).ok_or_else(|| {
                        CoreError::index_corruption(format!("key {key} vanished during dump"))
                    })?;
                    Ok((key, self.load(&state, key, entry, &mut cache)?))
                })
                .collect::<CoreResult<Vec<_>>>()
        };
        self.track(result)
    }

    /// Exports every live pair as a `Key,Value` table to `dir/name`.
    ///
    /// Creates `dir` if needed and returns the bytes written.
    ///
    /// # Errors
    ///
    /// Fails like [`Engine::dump`], or with an I/O error if the file cannot
    /// be written.
    pub fn export(&self, dir: &Path, name: &str) -> CoreResult<Vec<u8>> {
        let pairs = self.dump()?;
        let table = render_table(&pairs);
        let written = write_table(dir, name, &table);
        self.track(written)?;
        Ok(table)
    }

    /// Checks that every index entry resolves to an entry with its own key.
    ///
    /// Unlike `get`, problems are collected rather than returned as errors.
    ///
    /// # Errors
    ///
    /// Returns an error only if the engine is closed.
    pub fn verify(&self) -> CoreResult<VerifyReport> {
        self.ensure_open()?;
        let state = self.state.read();
        let mut cache = SegmentCache::new();
        let mut report = VerifyReport {
            keys_checked: state.index.len(),
            segments_referenced: state
                .index
                .referenced_segments()
                .into_iter()
                .filter(|&id| id != state.buffer.active_segment_id())
                .count(),
            problems: Vec::new(),
        };

        for key in state.index.sorted_keys() {
            if let Some(entry) = state.index.get(key) {
                if let Err(err) = self.load(&state, key, entry, &mut cache) {
                    report.problems.push(format!("key {key}: {err}"));
                }
            }
        }
        Ok(report)
    }

    /// Flushes the write buffer and closes the engine.
    ///
    /// Closing twice is a no-op. Every other operation fails afterwards.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the final flush fails; the engine then
    /// stays open.
    pub fn close(&self) -> CoreResult<()> {
        let mut is_open = self.is_open.write();
        if !*is_open {
            return Ok(());
        }

        if self.state.write().buffer.flush()?.is_some() {
            self.stats.record_flush();
        }

        *is_open = false;
        info!("engine closed");
        Ok(())
    }

    /// Checks if the engine is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.is_open.read()
    }

    /// Returns the id the write buffer will be flushed under.
    #[must_use]
    pub fn active_segment_id(&self) -> SegmentId {
        self.state.read().buffer.active_segment_id()
    }

    /// Returns the number of live keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.state.read().index.len()
    }

    /// Returns the number of files in the segment directory.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the directory cannot be listed.
    pub fn segment_count(&self) -> CoreResult<usize> {
        Ok(self.segments.count()?)
    }

    /// Returns a snapshot of the engine counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Returns what recovery found when the engine was opened.
    #[must_use]
    pub fn recovery_report(&self) -> &RecoveryReport {
        &self.recovery
    }

    /// Returns the engine configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Decodes the entry at `entry` and checks it belongs to `key`.
    fn load(
        &self,
        state: &EngineState,
        key: Key,
        entry: IndexEntry,
        cache: &mut SegmentCache,
    ) -> CoreResult<Vec<u8>> {
        let decoded = if entry.segment_id == state.buffer.active_segment_id() {
            state.buffer.read(entry.offset)?
        } else {
            let data = match cache.entry(entry.segment_id) {
                std::collections::hash_map::Entry::Occupied(slot) => slot.into_mut(),
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert(self.segments.read(entry.segment_id)?)
                }
            };
            LogEntry::decode_at(data, entry.offset as usize)?
        };

        if decoded.key != key {
            error!(
                key,
                found = decoded.key,
                segment_id = entry.segment_id,
                offset = entry.offset,
                "index corruption: key mismatch"
            );
            return Err(CoreError::KeyMismatch {
                expected: key,
                found: decoded.key,
                segment_id: entry.segment_id,
                offset: entry.offset,
            });
        }
        Ok(decoded.value)
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if *self.is_open.read() {
            Ok(())
        } else {
            Err(CoreError::invalid_operation("engine is closed"))
        }
    }

    fn track<T>(&self, result: CoreResult<T>) -> CoreResult<T> {
        if result.is_err() {
            self.stats.record_error();
        }
        result
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("is_open", &self.is_open())
            .field("key_count", &self.key_count())
            .field("active_segment_id", &self.active_segment_id())
            .finish_non_exhaustive()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caskdb_codec::encode_entry;

    fn small_engine(capacity: usize) -> Engine {
        Engine::open_in_memory(Config::new().buffer_capacity(capacity)).unwrap()
    }

    #[test]
    fn get_absent_key_is_none() {
        let engine = small_engine(64);
        assert_eq!(engine.get(3).unwrap(), None);
        assert_eq!(engine.stats().read_misses, 1);
    }

    #[test]
    fn read_from_buffer_and_segment() {
        let engine = small_engine(40);
        engine.put(1, &[1; 8]).unwrap();
        engine.put(2, &[2; 8]).unwrap();
        engine.put(3, &[3; 8]).unwrap();

        assert_eq!(engine.active_segment_id(), 1);
        assert_eq!(engine.get(1).unwrap(), Some(vec![1; 8]));
        assert_eq!(engine.get(3).unwrap(), Some(vec![3; 8]));
        assert_eq!(engine.stats().flushes, 1);
    }

    #[test]
    fn key_mismatch_is_reported() {
        let segments = Arc::new(InMemoryDirectory::new());
        let hints = Arc::new(InMemoryDirectory::new());

        let mut data = Vec::new();
        encode_entry(9, b"other", &mut data).unwrap();
        segments.write(0, &data).unwrap();
        // Hint claims key 4 lives where key 9 does.
        hints
            .write(0, &caskdb_codec::encode_hints(&[caskdb_codec::HintEntry::new(4, 0)]))
            .unwrap();

        let engine = Engine::with_directories(segments, hints, Config::default()).unwrap();
        let err = engine.get(4).unwrap_err();
        assert!(matches!(
            err,
            CoreError::KeyMismatch {
                expected: 4,
                found: 9,
                ..
            }
        ));
        assert!(err.is_corruption());
        assert_eq!(engine.stats().errors, 1);

        let report = engine.verify().unwrap();
        assert!(!report.is_ok());
        assert_eq!(report.problems.len(), 1);
    }

    #[test]
    fn entry_too_large_rejected() {
        let engine = small_engine(32);
        let err = engine.put(1, &[0; 64]).unwrap_err();
        assert!(matches!(err, CoreError::EntryTooLarge { .. }));
        assert_eq!(engine.get(1).unwrap(), None);
    }

    #[test]
    fn tiny_capacity_rejected() {
        let result = Engine::open_in_memory(Config::new().buffer_capacity(12));
        assert!(matches!(result, Err(CoreError::InvalidOperation { .. })));
    }

    #[test]
    fn closed_engine_rejects_operations() {
        let engine = small_engine(64);
        engine.put(1, b"a").unwrap();
        engine.close().unwrap();

        assert!(!engine.is_open());
        assert!(matches!(engine.get(1), Err(CoreError::InvalidOperation { .. })));
        assert!(matches!(engine.put(1, b"b"), Err(CoreError::InvalidOperation { .. })));
        engine.close().unwrap();
    }

    #[test]
    fn close_flushes_buffer() {
        let segments = Arc::new(InMemoryDirectory::new());
        let hints = Arc::new(InMemoryDirectory::new());
        let engine =
            Engine::with_directories(segments.clone(), hints.clone(), Config::default()).unwrap();
        engine.put(1, b"a").unwrap();
        engine.close().unwrap();

        assert!(segments.exists(0).unwrap());
        assert!(hints.exists(0).unwrap());
    }

    #[test]
    fn dump_is_sorted() {
        let engine = small_engine(64);
        for key in [5, -1, 3] {
            engine.put(key, key.to_string().as_bytes()).unwrap();
        }
        let pairs = engine.dump().unwrap();
        let keys: Vec<Key> = pairs.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![-1, 3, 5]);
    }

    #[test]
    fn plan_compaction_touches_nothing() {
        let engine = small_engine(64);
        assert_eq!(engine.plan_compaction().unwrap(), None);

        engine.put(1, b"a").unwrap();
        engine.flush().unwrap();
        engine.put(1, b"b").unwrap();
        engine.flush().unwrap();

        let preview = engine.plan_compaction().unwrap().unwrap();
        assert_eq!(preview.input_segments, 2);
        assert_eq!(preview.output_segments, 1);
        assert_eq!(preview.redirected_keys, 1);
        assert_eq!(engine.segment_count().unwrap(), 2);
    }
}
