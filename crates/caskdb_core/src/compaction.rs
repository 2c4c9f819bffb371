//! Segment compaction.
//!
//! Compaction merges every durable segment into the fewest segments that
//! hold each key's latest value, then retires the inputs. It runs in two
//! phases driven by the engine:
//!
//! 1. [`Compactor::scan`] and [`Compactor::plan`] run under the engine's
//!    shared lock. They read the durable segments, merge them with
//!    last-write-wins and pack the survivors into output segments, keeping
//!    the order in which they were written.
//! 2. [`Compactor::apply`] runs under the exclusive lock. It validates the
//!    plan against the key index, deletes the inputs, writes the outputs
//!    and redirects the index.
//!
//! ## Invariants
//!
//! - Compaction **MUST NOT** change the value any key reads as
//! - Output ids count down from the highest durable id, so they never
//!   collide with the active segment
//! - An index entry is only redirected if it still points below the
//!   active id captured in phase 1; newer writes are never clobbered
//! - Nothing is deleted until the plan has been validated
//! - Survivors keep their relative order, so with an unchanged capacity the
//!   outputs never outnumber the inputs

use crate::error::{CoreError, CoreResult};
use crate::index::{IndexEntry, KeyIndex};
use caskdb_codec::{encode_entry, encode_hints, entry_size, HintEntry, Key, LogEntryIter};
use caskdb_storage::{SegmentDirectory, SegmentId};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Result of a compaction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactionResult {
    /// Durable segments merged.
    pub input_segments: usize,
    /// Segments written.
    pub output_segments: usize,
    /// Log entries decoded from the inputs, superseded ones included.
    pub input_entries: usize,
    /// Distinct keys written to the outputs.
    pub live_keys: usize,
    /// Index entries pointed at the outputs.
    pub redirected_keys: usize,
    /// Index entries left alone because a newer write moved them.
    pub skipped_keys: usize,
    /// Total size of the input segments.
    pub bytes_before: u64,
    /// Total size of the output segments.
    pub bytes_after: u64,
}

/// Latest value of a key and its position in the scanned log.
#[derive(Debug)]
struct Survivor {
    seq: usize,
    value: Vec<u8>,
}

/// Merged view of the durable segments, produced in phase 1.
#[derive(Debug)]
pub struct CompactionScan {
    active_id: SegmentId,
    merged: BTreeMap<Key, Survivor>,
    segment_ids: Vec<SegmentId>,
    hint_ids: Vec<SegmentId>,
    input_entries: usize,
    bytes_before: u64,
}

impl CompactionScan {
    /// Returns the highest durable id at scan time.
    pub fn start_id(&self) -> SegmentId {
        self.active_id - 1
    }

    /// Returns the active segment id at scan time.
    pub fn active_id(&self) -> SegmentId {
        self.active_id
    }

    /// Returns the number of distinct keys found.
    pub fn live_keys(&self) -> usize {
        self.merged.len()
    }
}

/// One output segment with its hint entries.
#[derive(Debug)]
struct PlannedSegment {
    id: SegmentId,
    data: Vec<u8>,
    hints: Vec<HintEntry>,
}

/// Packed output ready to replace the scanned segments.
#[derive(Debug)]
pub struct CompactionPlan {
    scan: CompactionScan,
    outputs: Vec<PlannedSegment>,
}

impl CompactionPlan {
    /// Returns the ids that will be written, highest first.
    pub fn output_ids(&self) -> Vec<SegmentId> {
        self.outputs.iter().map(|s| s.id).collect()
    }

    /// Predicts the result of applying this plan against `index`.
    pub fn preview(&self, index: &KeyIndex) -> CompactionResult {
        let mut result = self.base_result();
        for &key in self.scan.merged.keys() {
            match index.get(key) {
                Some(entry) if entry.segment_id < self.scan.active_id => result.redirected_keys += 1,
                _ => result.skipped_keys += 1,
            }
        }
        result
    }

    fn base_result(&self) -> CompactionResult {
        CompactionResult {
            input_segments: self.scan.segment_ids.len(),
            output_segments: self.outputs.len(),
            input_entries: self.scan.input_entries,
            live_keys: self.scan.merged.len(),
            redirected_keys: 0,
            skipped_keys: 0,
            bytes_before: self.scan.bytes_before,
            bytes_after: self.outputs.iter().map(|s| s.data.len() as u64).sum(),
        }
    }
}

/// Merges durable segments into minimal ones.
///
/// ## Example
///
/// ```rust
/// use caskdb_core::Compactor;
/// use caskdb_storage::InMemoryDirectory;
///
/// let segments = InMemoryDirectory::new();
/// let hints = InMemoryDirectory::new();
/// let compactor = Compactor::new(8192);
///
/// // Nothing durable yet: active segment 0.
/// assert!(compactor.scan(&segments, &hints, 0).unwrap().is_none());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Compactor {
    capacity: usize,
}

impl Compactor {
    /// Creates a compactor packing outputs up to `capacity` bytes each.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Phase 1: reads and merges every durable segment below `active_id`.
    ///
    /// Segments are processed in ascending id order with overwrite-on-insert,
    /// so the highest segment holding a key supplies its value. Returns
    /// `None` when there is nothing durable to compact.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a file cannot be listed or read, and a
    /// codec error if a segment does not decode cleanly.
    pub fn scan(
        &self,
        segments: &dyn SegmentDirectory,
        hints: &dyn SegmentDirectory,
        active_id: SegmentId,
    ) -> CoreResult<Option<CompactionScan>> {
        if active_id == 0 {
            return Ok(None);
        }

        let segment_ids: Vec<SegmentId> = segments
            .list()?
            .into_iter()
            .filter(|&id| id < active_id)
            .collect();
        let hint_ids: Vec<SegmentId> = hints
            .list()?
            .into_iter()
            .filter(|&id| id < active_id)
            .collect();

        if segment_ids.is_empty() && hint_ids.is_empty() {
            return Ok(None);
        }

        let mut merged = BTreeMap::new();
        let mut input_entries = 0usize;
        let mut bytes_before = 0u64;

        for &id in &segment_ids {
            let data = segments.read(id)?;
            bytes_before += data.len() as u64;
            for item in LogEntryIter::new(&data) {
                let (_, entry) = item?;
                let survivor = Survivor {
                    seq: input_entries,
                    value: entry.value,
                };
                merged.insert(entry.key, survivor);
                input_entries += 1;
            }
        }

        debug!(
            segments = segment_ids.len(),
            entries = input_entries,
            keys = merged.len(),
            "compaction scan complete"
        );

        Ok(Some(CompactionScan {
            active_id,
            merged,
            segment_ids,
            hint_ids,
            input_entries,
            bytes_before,
        }))
    }

    /// Packs the merged entries into output segments.
    ///
    /// Survivors are written in the order they appear in the scanned log.
    /// A segment is closed when the next entry would overflow the capacity,
    /// and ids count down from the scan's start id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CompactionOverflow`] if the outputs need more
    /// ids than exist at or below the start id.
    pub fn plan(&self, scan: CompactionScan) -> CoreResult<CompactionPlan> {
        let mut packed: Vec<(Vec<u8>, Vec<HintEntry>)> = Vec::new();
        let mut data = Vec::with_capacity(self.capacity);
        let mut hints = Vec::new();

        let mut survivors: Vec<(Key, &Survivor)> =
            scan.merged.iter().map(|(&key, s)| (key, s)).collect();
        survivors.sort_unstable_by_key(|(_, s)| s.seq);

        for (key, survivor) in survivors {
            let value = &survivor.value;
            let size = entry_size(value.len());
            if !data.is_empty() && data.len() + size > self.capacity {
                packed.push((std::mem::take(&mut data), std::mem::take(&mut hints)));
            }
            let offset = u32::try_from(data.len()).map_err(|_| {
                CoreError::invalid_operation("compaction output exceeds the 32-bit offset range")
            })?;
            encode_entry(key, value, &mut data)?;
            hints.push(HintEntry::new(key, offset));
        }
        if !data.is_empty() {
            packed.push((data, hints));
        }

        let available = scan.active_id;
        if packed.len() as u64 > available {
            return Err(CoreError::CompactionOverflow {
                needed: packed.len(),
                available,
            });
        }

        let start = scan.start_id();
        let outputs = packed
            .into_iter()
            .zip(0u64..)
            .map(|((data, hints), n)| PlannedSegment {
                id: start - n,
                data,
                hints,
            })
            .collect();

        Ok(CompactionPlan { scan, outputs })
    }

    /// Phase 2: replaces the scanned segments with the planned outputs.
    ///
    /// The caller must hold the engine's exclusive lock for the duration.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingFromIndex`] before touching any file if a
    /// merged key is not indexed. Storage errors after deletion has started
    /// leave the directories partially compacted.
    pub fn apply(
        &self,
        plan: CompactionPlan,
        segments: &dyn SegmentDirectory,
        hints: &dyn SegmentDirectory,
        index: &mut KeyIndex,
    ) -> CoreResult<CompactionResult> {
        if let Some(&key) = plan.scan.merged.keys().find(|&&key| !index.contains(key)) {
            return Err(CoreError::MissingFromIndex { key });
        }

        let mut result = plan.base_result();

        for &id in &plan.scan.hint_ids {
            hints.delete(id)?;
        }
        for &id in &plan.scan.segment_ids {
            segments.delete(id)?;
        }

        // Phase-1 active id: anything at or above it, including segments
        // flushed between the phases, is newer than the compacted copy.
        let below = plan.scan.active_id;
        for output in &plan.outputs {
            segments.write(output.id, &output.data)?;
            hints.write(output.id, &encode_hints(&output.hints))?;

            for hint in &output.hints {
                let location = IndexEntry::new(output.id, hint.offset);
                if index.redirect(hint.key, location, below)? {
                    result.redirected_keys += 1;
                } else {
                    result.skipped_keys += 1;
                }
            }
        }

        info!(
            inputs = result.input_segments,
            outputs = result.output_segments,
            live_keys = result.live_keys,
            redirected = result.redirected_keys,
            skipped = result.skipped_keys,
            bytes_before = result.bytes_before,
            bytes_after = result.bytes_after,
            "compaction applied"
        );

        Ok(result)
    }
}
