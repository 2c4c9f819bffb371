//! CLI command implementations.

pub mod compact;
pub mod dump_hints;
pub mod export;
pub mod get;
pub mod inspect;
pub mod put;
pub mod verify;

use caskdb_core::{Config, Engine, RecoveryPolicy};
use std::path::PathBuf;

/// Segment and hint directories the commands operate on.
#[derive(Debug, Clone)]
pub struct Dirs {
    /// Directory of data segments.
    pub log_dir: PathBuf,
    /// Directory of hint files.
    pub hint_dir: PathBuf,
}

impl Dirs {
    /// Opens an engine over existing directories.
    pub fn open_engine(&self, policy: RecoveryPolicy) -> Result<Engine, Box<dyn std::error::Error>> {
        if !self.log_dir.exists() && !self.hint_dir.exists() {
            return Err(format!("No database found at {:?}", self.log_dir).into());
        }
        let config = Config::new().create_if_missing(false).recovery(policy);
        Ok(Engine::open(&self.log_dir, &self.hint_dir, config)?)
    }
}
