//! Two-column text export of the live key/value pairs.

use crate::error::CoreResult;
use caskdb_codec::Key;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Header line of an export.
pub const EXPORT_HEADER: &str = "Key,Value";

/// Renders `pairs` as a `Key,Value` table, one pair per line.
///
/// Values are copied as raw bytes; no quoting or escaping is applied.
///
/// ```rust
/// use caskdb_core::render_table;
///
/// let table = render_table(&[(1, b"sunny".to_vec()), (2, b"rain".to_vec())]);
/// assert_eq!(table, b"Key,Value\n1,sunny\n2,rain\n");
/// ```
pub fn render_table(pairs: &[(Key, Vec<u8>)]) -> Vec<u8> {
    let body: usize = pairs.iter().map(|(_, v)| v.len() + 22).sum();
    let mut out = Vec::with_capacity(EXPORT_HEADER.len() + 1 + body);
    out.extend_from_slice(EXPORT_HEADER.as_bytes());
    out.push(b'\n');
    for (key, value) in pairs {
        out.extend_from_slice(key.to_string().as_bytes());
        out.push(b',');
        out.extend_from_slice(value);
        out.push(b'\n');
    }
    out
}

/// Writes a rendered table to `dir/name`, creating `dir` if needed.
///
/// Returns the path written.
pub(crate) fn write_table(dir: &Path, name: &str, table: &[u8]) -> CoreResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(name);
    fs::write(&path, table)?;
    info!(path = %path.display(), bytes = table.len(), "export written");
    Ok(path)
}
