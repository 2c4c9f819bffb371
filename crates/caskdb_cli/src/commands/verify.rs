//! Verify command implementation.

use super::Dirs;
use caskdb_core::{RecoveryPolicy, VerifyReport};

/// Runs the verify command.
pub fn run(dirs: &Dirs, scan: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying {:?} / {:?}", dirs.log_dir, dirs.hint_dir);
    println!();

    let report = check(dirs, scan)?;

    println!("Index:");
    println!("  Keys checked:        {}", report.keys_checked);
    println!("  Segments referenced: {}", report.segments_referenced);
    println!();

    if report.is_ok() {
        println!("✓ Every key resolves to its own entry");
        Ok(())
    } else {
        println!("✗ {} problem(s) found:", report.problems.len());
        for problem in &report.problems {
            println!("  - {}", problem);
        }
        Err(format!("verification failed with {} problem(s)", report.problems.len()).into())
    }
}

/// Rebuilds the index and resolves every entry.
pub fn check(dirs: &Dirs, scan: bool) -> Result<VerifyReport, Box<dyn std::error::Error>> {
    let policy = if scan {
        RecoveryPolicy::ScanSegments
    } else {
        RecoveryPolicy::HintsOnly
    };
    let engine = dirs.open_engine(policy)?;
    Ok(engine.verify()?)
}
