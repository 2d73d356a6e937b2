//! Page-Stripper stage: drop the leading pages of every federal filing.

use std::path::{Path, PathBuf};

use taxpack_core::{PipelineOptions, SkipCode, SkipNotice, StageReport};
use taxpack_parse::{DocumentBackend, LopdfBackend, PageAssembler, WriteMode, write_atomically};
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::workdir::{ensure_dir, file_name_of, list_files, list_subdirs};

/// Removes `strip_pages` leading pages from each `FTFCS*` document found in
/// the subfolders of a source tree and moves the remainder to a flat
/// destination directory under the original file name.
///
/// The source file is deleted only after its output has been written and
/// synced. Files are processed subfolder by subfolder, both in sorted order.
#[derive(Debug, Clone)]
pub struct PageStripper<'a> {
    options: &'a PipelineOptions,
}

impl<'a> PageStripper<'a> {
    /// Create a stripper with the given options.
    pub fn new(options: &'a PipelineOptions) -> Self {
        Self { options }
    }

    /// Strip every qualifying document under `source_root` into `dest`.
    ///
    /// Returns the written outputs and a notice per skipped file.
    ///
    /// # Errors
    ///
    /// Fails only if `dest` cannot be created or a source folder cannot be
    /// listed.
    pub fn run(
        &self,
        source_root: &Path,
        dest: &Path,
    ) -> Result<StageReport<Vec<PathBuf>>, PipelineError> {
        ensure_dir(dest)?;
        let mut written = Vec::new();
        let mut skipped = Vec::new();

        for folder in list_subdirs(source_root)? {
            let files = list_files(&folder, &self.options.federal_prefix, &self.options.document_ext)?;
            for source in files {
                match self.strip_file(&source, dest) {
                    Ok(output) => written.push(output),
                    Err(notice) => {
                        warn!(%notice, "page-stripper skipped file");
                        skipped.push(notice);
                    }
                }
            }
        }

        info!(
            written = written.len(),
            skipped = skipped.len(),
            "page-stripper finished"
        );
        Ok(StageReport::with_skips(written, skipped))
    }

    fn strip_file(&self, source: &Path, dest: &Path) -> Result<PathBuf, SkipNotice> {
        let doc = LopdfBackend::open_file(source).map_err(|e| {
            SkipNotice::for_path(SkipCode::UnreadableDocument, source, e.to_string())
        })?;

        let count = LopdfBackend::page_count(&doc);
        let strip = self.options.strip_pages;
        if count < strip {
            return Err(SkipNotice::for_path(
                SkipCode::InsufficientPages,
                source,
                format!("{count} pages, {strip} must be removed"),
            ));
        }

        let write_failed =
            |e: taxpack_parse::BackendError| SkipNotice::for_path(SkipCode::WriteFailed, source, e.to_string());
        let mut out = PageAssembler::new();
        out.append_from(&doc, strip).map_err(write_failed)?;
        let bytes = out.to_bytes().map_err(write_failed)?;

        let output = dest.join(file_name_of(source));
        write_atomically(&output, &bytes, WriteMode::Replace).map_err(write_failed)?;

        if let Err(e) = std::fs::remove_file(source) {
            warn!(
                source = %source.display(),
                error = %e,
                "output written but source could not be removed"
            );
        }
        info!(source = %source.display(), output = %output.display(), pages = count - strip, "stripped");
        Ok(output)
    }
}
