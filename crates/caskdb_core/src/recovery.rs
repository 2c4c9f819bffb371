//! Key index rebuild at startup.
//!
//! Hint files are replayed in ascending numeric order so that the highest
//! segment holding a key wins. What happens to a segment without a usable
//! hint file depends on the [`RecoveryPolicy`]:
//!
//! - `HintsOnly`: the segment's keys are dropped and a warning is logged.
//!   The active segment id resumes at `max(hint id) + 1`.
//! - `ScanSegments`: the segment is decoded entry by entry instead. The
//!   active segment id resumes past every segment or hint file seen.

use crate::config::RecoveryPolicy;
use crate::error::CoreResult;
use crate::index::KeyIndex;
use caskdb_codec::{decode_hints, HintEntry, LogEntryIter};
use caskdb_storage::{SegmentDirectory, SegmentId};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Outcome of rebuilding the key index.
#[derive(Debug, Default)]
pub struct Recovered {
    /// The rebuilt index.
    pub index: KeyIndex,
    /// Id the write buffer flushes under next.
    pub next_segment_id: SegmentId,
    /// What was replayed, scanned or skipped.
    pub report: RecoveryReport,
}

/// Summary of a rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Hint files replayed.
    pub hint_files: Vec<SegmentId>,
    /// Segments recovered by scanning their entries.
    pub scanned_segments: Vec<SegmentId>,
    /// Segments whose keys were dropped for lack of a usable hint file.
    pub dropped_segments: Vec<SegmentId>,
    /// Hint files that could not be decoded.
    pub partial_hints: Vec<SegmentId>,
    /// Hint files with no matching data segment.
    pub dangling_hints: Vec<SegmentId>,
    /// Data segments above the highest hint id, ignored under `HintsOnly`.
    pub orphan_segments: Vec<SegmentId>,
}

/// Rebuilds the key index from the segment and hint directories.
///
/// # Errors
///
/// Returns a storage error if either directory cannot be listed or a file
/// cannot be read. A non-numeric file name in either directory is fatal.
pub fn rebuild_index(
    segments: &dyn SegmentDirectory,
    hints: &dyn SegmentDirectory,
    policy: RecoveryPolicy,
) -> CoreResult<Recovered> {
    let segment_ids: BTreeSet<SegmentId> = segments.list()?.into_iter().collect();
    let hint_ids: BTreeSet<SegmentId> = hints.list()?.into_iter().collect();

    let mut recovered = Recovered::default();
    let max_hint = hint_ids.iter().next_back().copied();

    for &id in segment_ids.union(&hint_ids) {
        let has_segment = segment_ids.contains(&id);

        let decoded = if hint_ids.contains(&id) {
            match decode_hints(&hints.read(id)?) {
                Ok(entries) => Some(entries),
                Err(err) => {
                    warn!(segment_id = id, error = %err, "hint file is partial");
                    recovered.report.partial_hints.push(id);
                    None
                }
            }
        } else {
            None
        };

        if !has_segment {
            warn!(segment_id = id, "hint file has no data segment, skipping");
            recovered.report.dangling_hints.push(id);
            continue;
        }

        match (decoded, policy) {
            (Some(entries), _) => {
                recovered.index.replay_hints(id, &entries);
                recovered.report.hint_files.push(id);
            }
            (None, RecoveryPolicy::ScanSegments) => {
                let entries = scan_segment(id, &segments.read(id)?);
                recovered.index.replay_hints(id, &entries);
                recovered.report.scanned_segments.push(id);
            }
            (None, RecoveryPolicy::HintsOnly) => {
                if max_hint.is_some_and(|max| id < max) || hint_ids.contains(&id) {
                    warn!(segment_id = id, "no usable hint file, segment keys dropped");
                    recovered.report.dropped_segments.push(id);
                } else {
                    warn!(segment_id = id, "orphan segment above the highest hint file");
                    recovered.report.orphan_segments.push(id);
                }
            }
        }
    }

    recovered.next_segment_id = match policy {
        RecoveryPolicy::HintsOnly => max_hint.map_or(0, |max| max + 1),
        RecoveryPolicy::ScanSegments => segment_ids
            .iter()
            .chain(hint_ids.iter())
            .max()
            .map_or(0, |max| max + 1),
    };

    info!(
        keys = recovered.index.len(),
        hint_files = recovered.report.hint_files.len(),
        scanned = recovered.report.scanned_segments.len(),
        dropped = recovered.report.dropped_segments.len(),
        next_segment_id = recovered.next_segment_id,
        "key index rebuilt"
    );

    Ok(recovered)
}

/// Recovers hint entries by decoding a segment.
///
/// Later entries for the same key override earlier ones. A truncated tail
/// ends the scan; entries before it are kept.
fn scan_segment(id: SegmentId, data: &[u8]) -> Vec<HintEntry> {
    let mut entries = Vec::new();
    for item in LogEntryIter::new(data) {
        match item {
            Ok((offset, entry)) => match u32::try_from(offset) {
                Ok(offset) => entries.push(HintEntry::new(entry.key, offset)),
                Err(_) => break,
            },
            Err(err) => {
                warn!(segment_id = id, error = %err, "segment tail is truncated");
                break;
            }
        }
    }
    entries
}
