//! JSON persistence of a [`BatchManifest`].
//!
//! Lets the envelope stage run separately from the combiner that produced
//! the manifest.

use std::path::Path;

use taxpack_core::BatchManifest;
use taxpack_parse::{WriteMode, write_atomically};

use crate::error::PipelineError;

/// Write `manifest` to `path` as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`PipelineError::ManifestWrite`] if the file cannot be written.
pub fn save_manifest(manifest: &BatchManifest, path: &Path) -> Result<(), PipelineError> {
    let json = serde_json::to_vec_pretty(manifest).map_err(|source| PipelineError::ManifestFormat {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomically(path, &json, WriteMode::Replace).map_err(|source| {
        PipelineError::ManifestWrite {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Read a manifest written by [`save_manifest`].
///
/// # Errors
///
/// Returns [`PipelineError::ManifestIo`] if the file cannot be read and
/// [`PipelineError::ManifestFormat`] if it is not a manifest.
pub fn load_manifest(path: &Path) -> Result<BatchManifest, PipelineError> {
    let bytes = std::fs::read(path).map_err(|source| PipelineError::ManifestIo {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| PipelineError::ManifestFormat {
        path: path.to_path_buf(),
        source,
    })
}
