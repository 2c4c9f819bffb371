//! Bounded write buffer for the active segment.

use crate::error::{CoreError, CoreResult};
use crate::index::IndexEntry;
use caskdb_codec::{encode_entry, encode_hints, entry_size, HintEntry, Key, LogEntry};
use caskdb_storage::{SegmentDirectory, SegmentId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Result of appending one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appended {
    /// Where the entry now lives.
    pub location: IndexEntry,
    /// The segment made durable to make room for the entry, if any.
    pub flushed: Option<SegmentId>,
}

/// Fixed-capacity accumulator for the active segment.
///
/// Entries are packed exactly as they will appear in the segment file.
/// A parallel hint map records, per key, the offset of the key's last
/// entry in the buffer. When an entry does not fit, the buffer and its
/// hints are written out as segment/hint files named by the active
/// segment id, and the active id advances.
///
/// # Durability
///
/// A failed flush leaves the buffer, the hints and the active id exactly
/// as they were, so a later flush retries the same id. Index entries that
/// already point into the buffer remain valid for reads from memory; they
/// are only durable once a flush succeeds.
pub struct WriteBuffer {
    capacity: usize,
    data: Vec<u8>,
    hints: HashMap<Key, u32>,
    active_id: SegmentId,
    segments: Arc<dyn SegmentDirectory>,
    hint_dir: Arc<dyn SegmentDirectory>,
}

impl WriteBuffer {
    /// Creates an empty buffer whose next flush is named `active_id`.
    pub fn new(
        capacity: usize,
        active_id: SegmentId,
        segments: Arc<dyn SegmentDirectory>,
        hint_dir: Arc<dyn SegmentDirectory>,
    ) -> Self {
        Self {
            capacity,
            data: Vec::with_capacity(capacity),
            hints: HashMap::new(),
            active_id,
            segments,
            hint_dir,
        }
    }

    /// Returns the buffer capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of bytes currently buffered.
    pub fn position(&self) -> usize {
        self.data.len()
    }

    /// Returns true if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the id the buffer will be flushed under.
    pub fn active_segment_id(&self) -> SegmentId {
        self.active_id
    }

    /// Returns the number of distinct keys buffered.
    pub fn pending_keys(&self) -> usize {
        self.hints.len()
    }

    /// Returns the buffered segment bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Appends an entry, flushing first if it would overflow the buffer.
    ///
    /// Returns the location of the new entry. The caller installs it in the
    /// key index while still holding the engine's write lock.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EntryTooLarge`] if the entry could never fit,
    /// or a storage error if the flush fails. Nothing is appended on error.
    pub fn append(&mut self, key: Key, value: &[u8]) -> CoreResult<Appended> {
        let size = entry_size(value.len());
        if size > self.capacity {
            return Err(CoreError::EntryTooLarge {
                size,
                capacity: self.capacity,
            });
        }

        let flushed = if self.data.len() + size > self.capacity {
            self.flush()?
        } else {
            None
        };

        let offset = self.offset_u32()?;
        encode_entry(key, value, &mut self.data)?;
        self.hints.insert(key, offset);

        Ok(Appended {
            location: IndexEntry::new(self.active_id, offset),
            flushed,
        })
    }

    /// Writes the buffered entries and their hints as a durable segment.
    ///
    /// Returns the id written, or `None` if the buffer was empty.
    ///
    /// # Errors
    ///
    /// Returns a storage error if either file cannot be written; the buffer
    /// is left untouched in that case.
    pub fn flush(&mut self) -> CoreResult<Option<SegmentId>> {
        if self.data.is_empty() {
            return Ok(None);
        }

        let id = self.active_id;
        let hints = encode_hints(&self.hint_entries());

        self.segments.write(id, &self.data)?;
        self.hint_dir.write(id, &hints)?;

        info!(
            segment_id = id,
            bytes = self.data.len(),
            keys = self.hints.len(),
            "flushed write buffer"
        );

        self.data.clear();
        self.hints.clear();
        self.active_id += 1;
        Ok(Some(id))
    }

    /// Decodes the buffered entry at `offset`.
    ///
    /// # Errors
    ///
    /// Returns a codec error if `offset` does not start a complete entry.
    pub fn read(&self, offset: u32) -> CoreResult<LogEntry> {
        Ok(LogEntry::decode_at(&self.data, offset as usize)?)
    }

    /// Returns the hint entries in buffer order.
    pub fn hint_entries(&self) -> Vec<HintEntry> {
        let mut hints: Vec<HintEntry> = self
            .hints
            .iter()
            .map(|(&key, &offset)| HintEntry::new(key, offset))
            .collect();
        hints.sort_unstable_by_key(|h| h.offset);
        hints
    }

    fn offset_u32(&self) -> CoreResult<u32> {
        u32::try_from(self.data.len()).map_err(|_| {
            CoreError::invalid_operation(format!(
                "buffer position {} exceeds the 32-bit offset range",
                self.data.len()
            ))
        })
    }
}

impl std::fmt::Debug for WriteBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteBuffer")
            .field("capacity", &self.capacity)
            .field("position", &self.data.len())
            .field("pending_keys", &self.hints.len())
            .field("active_id", &self.active_id)
            .finish_non_exhaustive()
    }
}
