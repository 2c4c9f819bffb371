//! Export command implementation.

use super::Dirs;
use caskdb_core::RecoveryPolicy;
use std::path::Path;

/// Runs the export command.
pub fn run(dirs: &Dirs, dir: &Path, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let engine = dirs.open_engine(RecoveryPolicy::HintsOnly)?;
    let table = engine.export(dir, name)?;
    println!(
        "Exported {} keys ({} bytes) to {:?}",
        engine.key_count(),
        table.len(),
        dir.join(name)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::populated;

    #[test]
    fn export_writes_sorted_table() {
        let (temp, dirs) = populated(&[(3, "c"), (-1, "z"), (3, "d")]);
        let out = temp.path().join("out");

        run(&dirs, &out, "pairs.csv").unwrap();

        let table = std::fs::read_to_string(out.join("pairs.csv")).unwrap();
        assert_eq!(table, "Key,Value\n-1,z\n3,d\n");
    }
}
