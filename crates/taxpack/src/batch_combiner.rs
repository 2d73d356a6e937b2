//! Batch Combiner stage.
//!
//! Drains a directory of matched documents into combined documents of at
//! most `batch_size` inputs each, and records which identities went into
//! which output.

use std::path::PathBuf;

use taxpack_core::{
    Batch, BatchManifest, PipelineOptions, ProcessedSet, SkipCode, SkipNotice, StageReport,
    plan_batch,
};
use taxpack_parse::{
    BackendError, DocumentBackend, LopdfBackend, PageAssembler, WriteMode, write_atomically,
};
use tracing::{debug, error, info, warn};

use crate::error::PipelineError;
use crate::workdir::{ensure_dir, file_name_of, list_files};

/// Counter values tried after a timestamped name before giving up.
const MAX_NAME_COUNTER: usize = 1000;

/// Outcome of one drain iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainStep {
    /// No unprocessed parseable file was left.
    Exhausted,
    /// Files were consumed but no combined document was written.
    Discarded,
    /// A combined document was written.
    Emitted(Batch),
}

/// Groups matched documents into combined outputs.
///
/// The combiner remembers every file name it has consumed for as long as it
/// lives, so draining again without new files produces nothing. The
/// remembered set is never persisted.
#[derive(Debug, Clone)]
pub struct BatchCombiner {
    options: PipelineOptions,
    source: PathBuf,
    dest: PathBuf,
    processed: ProcessedSet,
}

impl BatchCombiner {
    /// Create a combiner reading from `source` and writing to `dest`.
    pub fn new(options: &PipelineOptions, source: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            options: options.clone(),
            source: source.into(),
            dest: dest.into(),
            processed: ProcessedSet::new(),
        }
    }

    /// File names consumed so far.
    pub fn processed(&self) -> &ProcessedSet {
        &self.processed
    }

    /// Run drain iterations until no work is left.
    ///
    /// Returns the batches written by this call, in write order.
    ///
    /// # Errors
    ///
    /// Fails if the destination cannot be created or the source cannot be
    /// listed.
    pub fn drain(&mut self) -> Result<StageReport<BatchManifest>, PipelineError> {
        ensure_dir(&self.dest)?;
        let mut manifest = BatchManifest::new();
        let mut skipped = Vec::new();

        loop {
            let step = self.drain_once()?;
            skipped.extend(step.skipped);
            match step.value {
                DrainStep::Exhausted => break,
                DrainStep::Discarded => continue,
                DrainStep::Emitted(batch) => manifest.push(batch),
            }
        }

        info!(
            batches = manifest.len(),
            people = manifest.people(),
            skipped = skipped.len(),
            "batch combiner finished"
        );
        Ok(StageReport::with_skips(manifest, skipped))
    }

    /// Plan and write a single batch.
    ///
    /// The destination must already exist ([`drain`](Self::drain) creates
    /// it); a batch that cannot be written there is discarded with a
    /// `WRITE_FAILED` notice.
    ///
    /// # Errors
    ///
    /// Fails if the source cannot be listed.
    pub fn drain_once(&mut self) -> Result<StageReport<DrainStep>, PipelineError> {
        let ext = self.options.document_ext.clone();
        let names: Vec<String> = list_files(&self.source, "", &ext)?
            .iter()
            .map(|p| file_name_of(p))
            .collect();
        let unprocessed = self.processed.unprocessed(names);
        if unprocessed.is_empty() {
            return Ok(StageReport::ok(DrainStep::Exhausted));
        }

        let plan = plan_batch(&unprocessed, &ext, self.options.effective_batch_size());
        let mut skipped = Vec::new();
        for name in plan.unparseable {
            let path = self.source.join(&name);
            warn!(path = %path.display(), "file name does not follow LAST_FIRST_NNNNNN");
            skipped.push(SkipNotice::for_path(
                SkipCode::UnparseableName,
                &path,
                "file name does not follow LAST_FIRST_NNNNNN",
            ));
            self.processed.mark(name);
        }
        if plan.selected.is_empty() {
            return Ok(StageReport::with_skips(DrainStep::Exhausted, skipped));
        }
        debug!(
            selected = plan.selected.len(),
            deferred = plan.deferred,
            "batch planned"
        );

        let mut out = PageAssembler::new();
        let mut identities = Vec::with_capacity(plan.selected.len());
        for file in plan.selected {
            self.processed.mark(file.file_name.clone());
            let path = self.source.join(&file.file_name);
            let doc = match LopdfBackend::open_file(&path) {
                Ok(doc) => doc,
                Err(e) => {
                    let notice = SkipNotice::for_path(SkipCode::UnreadableDocument, &path, e.to_string());
                    warn!(%notice, "batch combiner skipped file");
                    skipped.push(notice);
                    continue;
                }
            };
            if LopdfBackend::page_count(&doc) == 0 {
                let notice = SkipNotice::for_path(SkipCode::EmptyDocument, &path, "document has no pages");
                warn!(%notice, "batch combiner skipped file");
                skipped.push(notice);
                continue;
            }
            if let Err(e) = out.append_from(&doc, 0) {
                let notice = SkipNotice::for_path(SkipCode::UnreadableDocument, &path, e.to_string());
                warn!(%notice, "batch combiner skipped file");
                skipped.push(notice);
                continue;
            }
            identities.push(file.parsed.identity);
        }

        if identities.is_empty() {
            info!("no readable document in batch, nothing written");
            return Ok(StageReport::with_skips(DrainStep::Discarded, skipped));
        }

        let people = identities.len();
        match out.to_bytes().and_then(|bytes| self.write_combined(&bytes)) {
            Ok(path) => {
                info!(output = %path.display(), people, "combined batch written");
                Ok(StageReport::with_skips(
                    DrainStep::Emitted(Batch { path, identities }),
                    skipped,
                ))
            }
            Err(e) => {
                error!(
                    people,
                    error = %e,
                    "combined document not written; its inputs stay consumed and are lost for this session"
                );
                skipped.push(SkipNotice::new(
                    SkipCode::WriteFailed,
                    format!("combined batch of {people} not written: {e}"),
                ));
                Ok(StageReport::with_skips(DrainStep::Discarded, skipped))
            }
        }
    }

    /// Write under `combined_{timestamp}`, appending `_N` while the name is
    /// taken.
    fn write_combined(&self, bytes: &[u8]) -> Result<PathBuf, BackendError> {
        let stem = format!(
            "combined_{}",
            chrono::Local::now().format("%Y%m%d_%H%M%S_%6f")
        );
        let ext = &self.options.document_ext;
        let mut path = self.dest.join(format!("{stem}.{ext}"));
        for counter in 1..=MAX_NAME_COUNTER {
            match write_atomically(&path, bytes, WriteMode::NoClobber) {
                Ok(()) => return Ok(path),
                Err(e) if e.is_already_exists() => {
                    path = self.dest.join(format!("{stem}_{counter}.{ext}"));
                }
                Err(e) => return Err(e),
            }
        }
        Err(BackendError::AlreadyExists(path))
    }
}
