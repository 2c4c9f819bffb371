//! Get command implementation.

use super::Dirs;
use caskdb_core::RecoveryPolicy;
use std::io::Write;

/// Runs the get command.
///
/// The raw value is written to stdout followed by a newline. An absent key
/// prints nothing.
pub fn run(dirs: &Dirs, key: i64) -> Result<(), Box<dyn std::error::Error>> {
    let engine = dirs.open_engine(RecoveryPolicy::HintsOnly)?;
    match engine.get(key)? {
        Some(value) => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&value)?;
            stdout.write_all(b"\n")?;
        }
        None => tracing::info!(key, "key not found"),
    }
    Ok(())
}
