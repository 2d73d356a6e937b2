//! Whole-stage failures.
//!
//! Per-file problems are reported as [`SkipNotice`](taxpack_core::SkipNotice)
//! values inside a [`StageReport`](taxpack_core::StageReport). A
//! [`PipelineError`] means a stage could not run at all.

use std::path::PathBuf;

use thiserror::Error;

/// Error that aborts a stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A working directory could not be created.
    #[error("cannot create directory {}: {source}", .path.display())]
    CreateDir {
        /// The directory.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A working directory could not be listed.
    #[error("cannot list directory {}: {source}", .path.display())]
    ListDir {
        /// The directory.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The options cannot be used (for example an invalid name label).
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// A saved manifest could not be read.
    #[cfg(feature = "serde")]
    #[error("manifest {}: {source}", .path.display())]
    ManifestIo {
        /// The manifest file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A manifest could not be written.
    #[cfg(feature = "serde")]
    #[error("cannot write manifest {}: {source}", .path.display())]
    ManifestWrite {
        /// The manifest file.
        path: PathBuf,
        /// Underlying write error.
        source: taxpack_parse::BackendError,
    },

    /// A saved manifest is not valid JSON.
    #[cfg(feature = "serde")]
    #[error("manifest {} is malformed: {source}", .path.display())]
    ManifestFormat {
        /// The manifest file.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}
