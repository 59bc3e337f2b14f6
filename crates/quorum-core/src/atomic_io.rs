use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{bail, Context, Result};
use serde::Serialize;

// Distinguishes temp files written by concurrent threads of one process.
static WRITE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Writes `content` through a sibling temp file and a rename, so readers see
/// either the previous document or the new one, never a partial write.
pub fn write_text_atomic(path: &Path, content: &str) -> Result<()> {
    let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
        bail!("'{}' is not a writable file path", path.display());
    };
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create directory {}", parent.display()))?;

    let sequence = WRITE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let temp_path = parent.join(format!(".{file_name}.{}.{sequence}", std::process::id()));
    let mut temp = fs::File::create(&temp_path)
        .with_context(|| format!("failed to create temp file {}", temp_path.display()))?;
    temp.write_all(content.as_bytes())
        .with_context(|| format!("failed to write temp file {}", temp_path.display()))?;
    temp.sync_all()
        .with_context(|| format!("failed to sync temp file {}", temp_path.display()))?;
    drop(temp);
    fs::rename(&temp_path, path)
        .with_context(|| format!("failed to move temp file into {}", path.display()))?;
    Ok(())
}

/// Serializes `value` as pretty JSON and writes it atomically.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut content = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    content.push('\n');
    write_text_atomic(path, &content)
}
