//! Inspect command implementation.

use super::Dirs;
use caskdb_core::RecoveryPolicy;
use caskdb_storage::{FileDirectory, SegmentDirectory, SegmentId};
use serde::Serialize;

/// Database inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Segment directory.
    pub log_dir: String,
    /// Hint directory.
    pub hint_dir: String,
    /// Number of data segments.
    pub segment_count: usize,
    /// Total size of the data segments in bytes.
    pub segment_bytes: u64,
    /// Number of hint files.
    pub hint_count: usize,
    /// Total size of the hint files in bytes.
    pub hint_bytes: u64,
    /// Number of keys in the rebuilt index.
    pub key_count: usize,
    /// Id the next flush is written under.
    pub active_segment_id: SegmentId,
    /// Segments whose keys were dropped during recovery.
    pub dropped_segments: Vec<SegmentId>,
    /// Segments above the highest hint id.
    pub orphan_segments: Vec<SegmentId>,
    /// Hint files without a data segment.
    pub dangling_hints: Vec<SegmentId>,
    /// Per-segment details (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<SegmentInfo>>,
}

/// Details of a single segment.
#[derive(Debug, Serialize)]
pub struct SegmentInfo {
    /// Segment id.
    pub id: SegmentId,
    /// Segment size in bytes.
    pub size: u64,
    /// Whether a hint file exists for the segment.
    pub has_hint: bool,
}

/// Runs the inspect command.
pub fn run(dirs: &Dirs, show_segments: bool, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = collect(dirs, show_segments)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Gathers the inspection result without printing it.
pub fn collect(dirs: &Dirs, show_segments: bool) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let engine = dirs.open_engine(RecoveryPolicy::HintsOnly)?;
    let segments = FileDirectory::open(&dirs.log_dir, false)?;
    let hints = FileDirectory::open(&dirs.hint_dir, false)?;

    let segment_ids = segments.list()?;
    let hint_ids = hints.list()?;

    let mut segment_bytes = 0;
    let mut details = Vec::with_capacity(segment_ids.len());
    for &id in &segment_ids {
        let size = segments.size_of(id)?;
        segment_bytes += size;
        details.push(SegmentInfo {
            id,
            size,
            has_hint: hint_ids.binary_search(&id).is_ok(),
        });
    }

    let mut hint_bytes = 0;
    for &id in &hint_ids {
        hint_bytes += hints.size_of(id)?;
    }

    let report = engine.recovery_report();
    Ok(InspectResult {
        log_dir: dirs.log_dir.display().to_string(),
        hint_dir: dirs.hint_dir.display().to_string(),
        segment_count: segment_ids.len(),
        segment_bytes,
        hint_count: hint_ids.len(),
        hint_bytes,
        key_count: engine.key_count(),
        active_segment_id: engine.active_segment_id(),
        dropped_segments: report.dropped_segments.clone(),
        orphan_segments: report.orphan_segments.clone(),
        dangling_hints: report.dangling_hints.clone(),
        segments: show_segments.then_some(details),
    })
}

fn print_text_output(result: &InspectResult) {
    println!("caskdb Inspection");
    println!("=================");
    println!();
    println!("Segments: {}", result.log_dir);
    println!("Hints:    {}", result.hint_dir);
    println!();
    println!("Storage:");
    println!(
        "  Segments:   {} files, {}",
        result.segment_count,
        format_size(result.segment_bytes)
    );
    println!(
        "  Hints:      {} files, {}",
        result.hint_count,
        format_size(result.hint_bytes)
    );
    println!();
    println!("Index:");
    println!("  Live keys:      {}", result.key_count);
    println!("  Active segment: {}", result.active_segment_id);

    if !result.dropped_segments.is_empty() {
        println!("  Dropped segments (no usable hints): {:?}", result.dropped_segments);
    }
    if !result.orphan_segments.is_empty() {
        println!("  Orphan segments: {:?}", result.orphan_segments);
    }
    if !result.dangling_hints.is_empty() {
        println!("  Dangling hints:  {:?}", result.dangling_hints);
    }

    if let Some(segments) = &result.segments {
        println!();
        println!("Segment details:");
        for segment in segments {
            println!(
                "  [{}] {}{}",
                segment.id,
                format_size(segment.size),
                if segment.has_hint { "" } else { " (no hint)" }
            );
        }
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} bytes", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::populated;

    #[test]
    fn collect_counts_files_and_keys() {
        let (_temp, dirs) = populated(&[(1, "a"), (2, "b"), (1, "c")]);

        let result = collect(&dirs, true).unwrap();
        assert_eq!(result.segment_count, 3);
        assert_eq!(result.hint_count, 3);
        assert_eq!(result.key_count, 2);
        assert_eq!(result.active_segment_id, 3);
        // Each segment holds one entry with a one-byte value.
        assert_eq!(result.segment_bytes, 3 * 13);

        let segments = result.segments.unwrap();
        assert!(segments.iter().all(|s| s.has_hint));
    }

    #[test]
    fn json_omits_segment_details_unless_requested() {
        let (_temp, dirs) = populated(&[(5, "x")]);

        let result = collect(&dirs, false).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["key_count"], 1);
        assert!(json.get("segments").is_none());
    }

    #[test]
    fn missing_directories_fail() {
        let temp = tempfile::TempDir::new().unwrap();
        let dirs = Dirs {
            log_dir: temp.path().join("nope"),
            hint_dir: temp.path().join("nada"),
        };
        assert!(collect(&dirs, false).is_err());
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_size(12), "12 bytes");
        assert_eq!(format_size(2048), "2.0 KB");
    }
}
