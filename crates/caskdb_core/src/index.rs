//! In-memory key index.

use crate::error::{CoreError, CoreResult};
use caskdb_codec::{HintEntry, Key};
use caskdb_storage::SegmentId;
use std::collections::{BTreeSet, HashMap};

/// Authoritative location of a key's latest value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Segment holding the entry; may be the active (in-memory) segment.
    pub segment_id: SegmentId,
    /// Byte offset of the log entry within the segment.
    pub offset: u32,
}

impl IndexEntry {
    /// Creates a new index entry.
    #[must_use]
    pub const fn new(segment_id: SegmentId, offset: u32) -> Self {
        Self { segment_id, offset }
    }
}

/// Hash index from key to the location of its latest value.
///
/// Exactly one entry exists per live key: an overwrite replaces the entry,
/// it never adds a second one. The index has no locking of its own; the
/// engine guards it with its readers-writer lock.
///
/// # Example
///
/// ```rust
/// use caskdb_core::{IndexEntry, KeyIndex};
///
/// let mut index = KeyIndex::new();
/// index.insert(5, IndexEntry::new(0, 0));
/// index.insert(5, IndexEntry::new(1, 24));
///
/// assert_eq!(index.len(), 1);
/// assert_eq!(index.get(5), Some(IndexEntry::new(1, 24)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct KeyIndex {
    entries: HashMap<Key, IndexEntry>,
}

impl KeyIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the location of `key`, if indexed.
    #[must_use]
    pub fn get(&self, key: Key) -> Option<IndexEntry> {
        self.entries.get(&key).copied()
    }

    /// Points `key` at `entry`, returning the previous location.
    pub fn insert(&mut self, key: Key, entry: IndexEntry) -> Option<IndexEntry> {
        self.entries.insert(key, entry)
    }

    /// Checks whether `key` is indexed.
    #[must_use]
    pub fn contains(&self, key: Key) -> bool {
        self.entries.contains_key(&key)
    }

    /// Returns the number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no keys are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over all `(key, location)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (Key, IndexEntry)> + '_ {
        self.entries.iter().map(|(&k, &e)| (k, e))
    }

    /// Returns all keys in ascending order.
    #[must_use]
    pub fn sorted_keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = self.entries.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Returns the set of segment ids referenced by at least one key.
    #[must_use]
    pub fn referenced_segments(&self) -> BTreeSet<SegmentId> {
        self.entries.values().map(|e| e.segment_id).collect()
    }

    /// Replays one hint file, overwriting earlier locations of the same keys.
    ///
    /// Callers replay hint files in ascending segment order so that the
    /// highest segment wins.
    pub fn replay_hints(&mut self, segment_id: SegmentId, hints: &[HintEntry]) {
        for hint in hints {
            self.entries
                .insert(hint.key, IndexEntry::new(segment_id, hint.offset));
        }
    }

    /// Redirects `key` to a compacted location.
    ///
    /// The entry is only replaced if it still points at a segment strictly
    /// below `below`; a newer location written concurrently is kept.
    /// Returns whether the entry was replaced.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingFromIndex`] if the key is not indexed.
    pub fn redirect(&mut self, key: Key, entry: IndexEntry, below: SegmentId) -> CoreResult<bool> {
        match self.entries.get_mut(&key) {
            None => Err(CoreError::MissingFromIndex { key }),
            Some(current) if current.segment_id < below => {
                *current = entry;
                Ok(true)
            }
            Some(_) => Ok(false),
        }
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
