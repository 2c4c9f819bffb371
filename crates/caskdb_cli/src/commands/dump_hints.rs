//! Dump hints command implementation.

use super::Dirs;
use caskdb_codec::{decode_hints, LogEntry};
use caskdb_storage::{FileDirectory, SegmentDirectory, SegmentId};
use serde::Serialize;

/// Hint entry representation for output.
#[derive(Debug, Serialize)]
pub struct HintInfo {
    /// Key the hint indexes.
    pub key: i64,
    /// Byte offset of the entry in the data segment.
    pub offset: u32,
    /// Value size in bytes, if the data segment resolves the hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_size: Option<usize>,
    /// Why the hint does not resolve, if it does not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
}

/// Runs the dump-hints command.
pub fn run(dirs: &Dirs, id: SegmentId, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let hints = read_hints(dirs, id)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&hints)?);
        }
        _ => {
            print_text_output(id, &hints);
        }
    }

    Ok(())
}

/// Decodes hint file `id` and checks each entry against its segment.
pub fn read_hints(dirs: &Dirs, id: SegmentId) -> Result<Vec<HintInfo>, Box<dyn std::error::Error>> {
    let hint_dir = FileDirectory::open(&dirs.hint_dir, false)?;
    let entries = decode_hints(&hint_dir.read(id)?)?;

    let log_dir = FileDirectory::open(&dirs.log_dir, false)?;
    let segment = if log_dir.exists(id)? {
        Some(log_dir.read(id)?)
    } else {
        None
    };

    let hints = entries
        .into_iter()
        .map(|hint| {
            let mut info = HintInfo {
                key: hint.key,
                offset: hint.offset,
                value_size: None,
                problem: None,
            };
            match &segment {
                None => info.problem = Some(format!("segment {} is missing", id)),
                Some(data) => match LogEntry::decode_at(data, hint.offset as usize) {
                    Ok(entry) if entry.key == hint.key => info.value_size = Some(entry.value.len()),
                    Ok(entry) => info.problem = Some(format!("entry holds key {}", entry.key)),
                    Err(e) => info.problem = Some(e.to_string()),
                },
            }
            info
        })
        .collect();

    Ok(hints)
}

fn print_text_output(id: SegmentId, hints: &[HintInfo]) {
    println!("Hint file {} ({} entries)", id, hints.len());
    println!();
    for hint in hints {
        match (&hint.value_size, &hint.problem) {
            (Some(size), _) => {
                println!("  key {:>20} @ {:>6}  {} bytes", hint.key, hint.offset, size)
            }
            (None, Some(problem)) => {
                println!("  key {:>20} @ {:>6}  ✗ {}", hint.key, hint.offset, problem)
            }
            (None, None) => println!("  key {:>20} @ {:>6}", hint.key, hint.offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::populated;
    use caskdb_core::{Config, Engine};

    #[test]
    fn hints_resolve_against_segment() {
        let (_temp, dirs) = populated(&[]);
        let engine = Engine::open(&dirs.log_dir, &dirs.hint_dir, Config::default()).unwrap();
        engine.put(10, b"ten").unwrap();
        engine.put(-2, b"minus two").unwrap();
        engine.close().unwrap();

        let hints = read_hints(&dirs, 0).unwrap();
        assert_eq!(hints.len(), 2);
        assert_eq!((hints[0].key, hints[0].offset, hints[0].value_size), (10, 0, Some(3)));
        assert_eq!((hints[1].key, hints[1].offset, hints[1].value_size), (-2, 15, Some(9)));
    }

    #[test]
    fn missing_segment_is_reported_per_hint() {
        let (_temp, dirs) = populated(&[(1, "a")]);
        std::fs::remove_file(dirs.log_dir.join("0")).unwrap();

        let hints = read_hints(&dirs, 0).unwrap();
        assert_eq!(hints.len(), 1);
        assert!(hints[0].problem.as_deref().unwrap().contains("missing"));
    }

    #[test]
    fn unknown_hint_file_fails() {
        let (_temp, dirs) = populated(&[(1, "a")]);
        assert!(read_hints(&dirs, 7).is_err());
    }
}
