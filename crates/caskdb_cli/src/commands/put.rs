//! Put command implementation.

use super::Dirs;
use caskdb_core::{Config, Engine};

/// Runs the put command.
///
/// Creates the directories if needed and flushes before returning, so the
/// value is durable under its own segment.
pub fn run(dirs: &Dirs, key: i64, value: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Engine::open(&dirs.log_dir, &dirs.hint_dir, Config::default())?;
    engine.put(key, value)?;
    let segment = engine.flush()?;
    engine.close()?;

    if let Some(id) = segment {
        println!("Stored key {} in segment {}", key, id);
    }
    Ok(())
}
