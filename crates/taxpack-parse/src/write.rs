//! Atomic output writes.
//!
//! Every output is written to a temporary file in the destination directory
//! and then renamed into place, so a failed write never leaves a truncated
//! file behind and never damages an earlier output with the same name.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::BackendError;

/// What to do when the destination already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Atomically replace the existing file.
    Replace,
    /// Fail with [`BackendError::AlreadyExists`] instead of replacing.
    NoClobber,
}

/// Write `bytes` to `path` atomically.
///
/// The data is flushed and synced before the rename, so once this returns
/// `Ok` the output is durable.
///
/// # Errors
///
/// Returns [`BackendError::AlreadyExists`] in [`WriteMode::NoClobber`] mode
/// when `path` exists, or an I/O error if the temporary file cannot be
/// created, written or renamed.
pub fn write_atomically(path: &Path, bytes: &[u8], mode: WriteMode) -> Result<(), BackendError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    match mode {
        WriteMode::Replace => {
            tmp.persist(path).map_err(|e| BackendError::Io(e.error))?;
        }
        WriteMode::NoClobber => {
            tmp.persist_noclobber(path).map_err(|e| {
                if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                    BackendError::AlreadyExists(path.to_path_buf())
                } else {
                    BackendError::Io(e.error)
                }
            })?;
        }
    }
    Ok(())
}
