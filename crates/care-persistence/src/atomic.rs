//! Crash-safe snapshot files.
//!
//! A snapshot is written to a temporary file in the target directory and
//! then renamed over the old one, so readers only ever see a complete
//! previous snapshot or a complete new one.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{PersistenceError, Result};

/// Serializes `value` as JSON and atomically replaces the file at `path`.
///
/// Parent directories are created when missing. The temp file lives next
/// to the target so the final rename never crosses filesystems.
pub fn write_snapshot<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|source| PersistenceError::DirectoryError {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let bytes = serde_json::to_vec(value)?;
    let write_err = |source| PersistenceError::WriteError {
        path: path.to_path_buf(),
        source,
    };

    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    temp.write_all(&bytes).map_err(write_err)?;
    temp.as_file().sync_all().map_err(write_err)?;
    temp.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}

/// Loads a snapshot, returning `None` if no snapshot has been written yet.
pub fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read(path).map_err(|source| PersistenceError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let value = serde_json::from_slice(&data)?;
    Ok(Some(value))
}
