//! Envelope Assembler stage.
//!
//! Turns every manifest entry into one `.docx` holding, for each person in
//! the batch, the leading paragraphs of their supplementary document.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use taxpack_core::{
    Batch, BatchManifest, Identity, PipelineOptions, SkipCode, SkipNotice, StageReport,
    normalize_name,
};
use taxpack_parse::{CopyPolicy, EnvelopeDocument, WordDocument};
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::workdir::{ensure_dir, list_files};

/// Name prefix of Word lock files, which are never supplementary documents.
const LOCK_FILE_PREFIX: &str = "~$";

/// Supplementary documents by normalized person name.
///
/// Built once per stage run. When several files normalize to the same key,
/// the one found first wins: folders are visited in the given order and
/// files in sorted order within a folder.
#[derive(Debug, Clone, Default)]
pub struct SupplementIndex {
    by_key: HashMap<String, PathBuf>,
}

impl SupplementIndex {
    /// Index the files with extension `ext` in each of `dirs`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ListDir`] if a folder cannot be listed.
    pub fn build(dirs: &[PathBuf], ext: &str) -> Result<Self, PipelineError> {
        let mut by_key: HashMap<String, PathBuf> = HashMap::new();
        for dir in dirs {
            for path in list_files(dir, "", ext)? {
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                if stem.starts_with(LOCK_FILE_PREFIX) {
                    continue;
                }
                let key = normalize_name(stem);
                if let Some(existing) = by_key.get(&key) {
                    debug!(
                        key = %key,
                        kept = %existing.display(),
                        ignored = %path.display(),
                        "duplicate supplementary document"
                    );
                    continue;
                }
                by_key.insert(key, path);
            }
        }
        Ok(Self { by_key })
    }

    /// Number of indexed people.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Returns true if nothing was indexed.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// The supplementary document for `identity`, if any.
    pub fn lookup(&self, identity: &Identity) -> Option<&Path> {
        self.by_key.get(&identity.lookup_key()).map(PathBuf::as_path)
    }
}

/// Builds one envelope document per manifest entry.
#[derive(Debug, Clone)]
pub struct EnvelopeAssembler<'a> {
    options: &'a PipelineOptions,
}

impl<'a> EnvelopeAssembler<'a> {
    /// Create an assembler with the given options.
    pub fn new(options: &'a PipelineOptions) -> Self {
        Self { options }
    }

    fn policy(&self) -> CopyPolicy {
        CopyPolicy::from(self.options)
    }

    /// Index `supplement_dirs` and write an envelope for every batch of
    /// `manifest` into `dest`.
    ///
    /// A person without a supplementary document is left out of their
    /// batch's envelope; the envelope is still written.
    ///
    /// # Errors
    ///
    /// Fails only if `dest` cannot be created or a folder cannot be listed.
    pub fn run(
        &self,
        manifest: &BatchManifest,
        supplement_dirs: &[PathBuf],
        dest: &Path,
    ) -> Result<StageReport<Vec<PathBuf>>, PipelineError> {
        let index = SupplementIndex::build(supplement_dirs, &self.options.supplement_ext)?;
        info!(people = index.len(), folders = supplement_dirs.len(), "supplementary documents indexed");
        self.run_with_index(manifest, &index, dest)
    }

    /// Like [`run`](Self::run), with an index built by the caller.
    ///
    /// # Errors
    ///
    /// Fails only if `dest` cannot be created.
    pub fn run_with_index(
        &self,
        manifest: &BatchManifest,
        index: &SupplementIndex,
        dest: &Path,
    ) -> Result<StageReport<Vec<PathBuf>>, PipelineError> {
        ensure_dir(dest)?;
        let mut written = Vec::new();
        let mut skipped = Vec::new();

        for batch in manifest {
            let (doc, mut notices) = self.assemble(batch, index);
            let output = envelope_path(batch, dest, &self.options.supplement_ext);
            match doc.save(&output) {
                Ok(()) => {
                    info!(output = %output.display(), people = batch.len(), "envelope written");
                    written.push(output);
                }
                Err(e) => {
                    notices.push(SkipNotice::for_path(SkipCode::WriteFailed, &output, e.to_string()));
                }
            }
            for notice in &notices {
                warn!(%notice, "envelope assembler skipped entry");
            }
            skipped.extend(notices);
        }

        info!(
            written = written.len(),
            skipped = skipped.len(),
            "envelope assembler finished"
        );
        Ok(StageReport::with_skips(written, skipped))
    }

    /// Build the envelope for one batch, in identity order.
    pub fn assemble(&self, batch: &Batch, index: &SupplementIndex) -> (EnvelopeDocument, Vec<SkipNotice>) {
        let policy = self.policy();
        let mut doc = EnvelopeDocument::new();
        let mut notices = Vec::new();
        let mut sections = 0;

        for identity in &batch.identities {
            let Some(path) = index.lookup(identity) else {
                notices.push(SkipNotice::new(
                    SkipCode::MissingSupplement,
                    format!("no supplementary document for {identity}"),
                ));
                continue;
            };
            let source = match WordDocument::open_file(path) {
                Ok(source) => source,
                Err(e) => {
                    notices.push(SkipNotice::for_path(SkipCode::UnreadableDocument, path, e.to_string()));
                    continue;
                }
            };
            if sections > 0 {
                doc.add_page_break();
            }
            let copied = doc.copy_content(&source, &policy);
            debug!(%identity, source = %path.display(), paragraphs = copied, "section copied");
            sections += 1;
        }

        (doc, notices)
    }
}

/// `{combined stem}.{ext}` in `dest`.
pub fn envelope_path(batch: &Batch, dest: &Path, ext: &str) -> PathBuf {
    let stem = batch
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "envelope".to_string());
    dest.join(format!("{stem}.{ext}"))
}
