//! Compact command implementation.

use super::Dirs;
use caskdb_core::{CompactionResult, RecoveryPolicy};

/// Runs the compact command.
pub fn run(dirs: &Dirs, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("Compacting segments at {:?}", dirs.log_dir);
    if dry_run {
        println!("(dry run - no changes will be made)");
    }
    println!();

    match compact(dirs, dry_run)? {
        None => println!("No durable segments - nothing to compact"),
        Some(result) => {
            print_result(&result);
            if !dry_run {
                println!();
                println!("✓ Compaction complete");
            }
        }
    }

    Ok(())
}

/// Compacts the directories, or only plans it when `dry_run` is set.
///
/// Returns `None` if there is nothing durable to compact.
pub fn compact(dirs: &Dirs, dry_run: bool) -> Result<Option<CompactionResult>, Box<dyn std::error::Error>> {
    let engine = dirs.open_engine(RecoveryPolicy::HintsOnly)?;
    let result = if dry_run {
        engine.plan_compaction()?
    } else {
        let result = engine.compact()?;
        (result.input_segments > 0).then_some(result)
    };
    engine.close()?;
    Ok(result)
}

fn print_result(result: &CompactionResult) {
    println!("Compaction Analysis:");
    println!("  Input segments:  {}", result.input_segments);
    println!("  Output segments: {}", result.output_segments);
    println!("  Input entries:   {}", result.input_entries);
    println!("  Live keys:       {}", result.live_keys);
    println!("  Obsolete:        {}", result.input_entries - result.live_keys);
    println!();
    println!("  Size before: {} bytes", result.bytes_before);
    println!("  Size after:  {} bytes", result.bytes_after);
    println!(
        "  Space saved: {} bytes ({:.1}%)",
        result.bytes_before.saturating_sub(result.bytes_after),
        if result.bytes_before > 0 {
            (result.bytes_before.saturating_sub(result.bytes_after) as f64
                / result.bytes_before as f64)
                * 100.0
        } else {
            0.0
        }
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::populated;
    use caskdb_storage::{FileDirectory, SegmentDirectory};

    fn segment_count(dirs: &Dirs) -> usize {
        FileDirectory::open(&dirs.log_dir, false)
            .unwrap()
            .count()
            .unwrap()
    }

    #[test]
    fn dry_run_leaves_files_alone() {
        let (_temp, dirs) = populated(&[(1, "a"), (1, "b"), (1, "c")]);

        let plan = compact(&dirs, true).unwrap().unwrap();
        assert_eq!(plan.input_segments, 3);
        assert_eq!(plan.output_segments, 1);
        assert_eq!(plan.live_keys, 1);
        assert_eq!(segment_count(&dirs), 3);
    }

    #[test]
    fn compaction_merges_segments() {
        let (_temp, dirs) = populated(&[(1, "a"), (2, "b"), (1, "c")]);

        let result = compact(&dirs, false).unwrap().unwrap();
        assert_eq!(result.input_entries, 3);
        assert_eq!(result.live_keys, 2);
        assert_eq!(segment_count(&dirs), 1);

        let engine = dirs.open_engine(RecoveryPolicy::HintsOnly).unwrap();
        assert_eq!(engine.get(1).unwrap(), Some(b"c".to_vec()));
        assert_eq!(engine.get(2).unwrap(), Some(b"b".to_vec()));
    }

    #[test]
    fn empty_directories_have_nothing_to_compact() {
        let (_temp, dirs) = populated(&[]);
        assert!(compact(&dirs, false).unwrap().is_none());
        assert!(compact(&dirs, true).unwrap().is_none());
    }
}
