//! Identity Matcher stage.
//!
//! For each state filing: read the person's name from its text, find the
//! first wage-statement page mentioning that name, and write the filing's
//! remainder plus that page under `{last}_{first}_{NNNNNN}.pdf`.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use taxpack_core::{
    CorpusEntry, MatchedFileName, NamePattern, PipelineOptions, SkipCode, SkipNotice, StageReport,
    TIEBREAK_BOUND, find_first_match,
};
use taxpack_parse::{
    BackendError, DocumentBackend, LopdfBackend, LopdfDocument, PageAssembler, WriteMode,
    write_atomically,
};
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::workdir::{ensure_dir, file_name_of, list_files, list_subdirs};

/// Suffix draws before a name collision is reported as a write failure.
const MAX_NAME_ATTEMPTS: usize = 64;

/// Source of tiebreak suffixes for output file names.
pub trait SuffixSource {
    /// Draw the next suffix. Values are reduced modulo [`TIEBREAK_BOUND`].
    fn next_suffix(&mut self) -> u32;
}

/// Suffixes from the thread-local random generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngSuffix;

impl SuffixSource for ThreadRngSuffix {
    fn next_suffix(&mut self) -> u32 {
        rand::thread_rng().gen_range(0..TIEBREAK_BOUND)
    }
}

/// Reproducible suffixes from a seeded generator.
#[derive(Debug, Clone)]
pub struct SeededSuffix(StdRng);

impl SeededSuffix {
    /// Create a generator from a seed.
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl SuffixSource for SeededSuffix {
    fn next_suffix(&mut self) -> u32 {
        self.0.gen_range(0..TIEBREAK_BOUND)
    }
}

/// Suffixes from a fixed list, then counting up from the last one.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSuffix {
    queue: VecDeque<u32>,
    last: Option<u32>,
}

impl ScriptedSuffix {
    /// Yield `values` in order before counting up.
    pub fn new(values: impl IntoIterator<Item = u32>) -> Self {
        Self {
            queue: values.into_iter().collect(),
            last: None,
        }
    }
}

impl SuffixSource for ScriptedSuffix {
    fn next_suffix(&mut self) -> u32 {
        let next = match self.queue.pop_front() {
            Some(v) => v,
            None => self.last.map_or(0, |v| v.wrapping_add(1)),
        };
        self.last = Some(next);
        next % TIEBREAK_BOUND
    }
}

/// The wage-statement corpus, loaded once per stage run.
#[derive(Debug, Default)]
pub struct Corpus {
    entries: Vec<CorpusEntry>,
    documents: Vec<LopdfDocument>,
}

impl Corpus {
    /// Load every document with extension `ext` in `dir`, in file name order.
    ///
    /// Unreadable and zero-page documents are left out with a log line. A
    /// missing directory gives an empty corpus.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ListDir`] if `dir` exists but cannot be listed.
    pub fn load(dir: &Path, ext: &str) -> Result<Self, PipelineError> {
        let mut corpus = Self::default();
        if !dir.is_dir() {
            warn!(path = %dir.display(), "corpus directory not found");
            return Ok(corpus);
        }
        for path in list_files(dir, "", ext)? {
            let doc = match LopdfBackend::open_file(&path) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable corpus document");
                    continue;
                }
            };
            if LopdfBackend::page_count(&doc) == 0 {
                warn!(path = %path.display(), "skipping corpus document without pages");
                continue;
            }
            let texts = LopdfBackend::page_texts(&doc);
            corpus.entries.push(CorpusEntry::new(file_name_of(&path), texts));
            corpus.documents.push(doc);
        }
        Ok(corpus)
    }

    /// Number of loaded documents.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no document was loaded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Searchable entries, in load order.
    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    fn document(&self, index: usize) -> Option<&LopdfDocument> {
        self.documents.get(index)
    }
}

/// Matches state filings against the wage-statement corpus.
pub struct IdentityMatcher<'a, S> {
    options: &'a PipelineOptions,
    pattern: NamePattern,
    suffixes: S,
}

impl<'a, S: SuffixSource> IdentityMatcher<'a, S> {
    /// Create a matcher.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidOptions`] if the name label does not
    /// form a valid pattern.
    pub fn new(options: &'a PipelineOptions, suffixes: S) -> Result<Self, PipelineError> {
        let pattern = NamePattern::new(&options.name_label)
            .map_err(|e| PipelineError::InvalidOptions(format!("name label: {e}")))?;
        Ok(Self {
            options,
            pattern,
            suffixes,
        })
    }

    /// Load the corpus from `corpus_dir` and match every `STFCS*` filing
    /// under `source_root`, writing outputs to `dest`.
    ///
    /// An empty corpus makes the whole stage a no-op.
    ///
    /// # Errors
    ///
    /// Fails only if a directory cannot be created or listed.
    pub fn run(
        &mut self,
        source_root: &Path,
        corpus_dir: &Path,
        dest: &Path,
    ) -> Result<StageReport<Vec<PathBuf>>, PipelineError> {
        let corpus = Corpus::load(corpus_dir, &self.options.document_ext)?;
        self.run_with_corpus(source_root, &corpus, dest)
    }

    /// Like [`run`](Self::run), with a corpus loaded by the caller.
    ///
    /// # Errors
    ///
    /// Fails only if a directory cannot be created or listed.
    pub fn run_with_corpus(
        &mut self,
        source_root: &Path,
        corpus: &Corpus,
        dest: &Path,
    ) -> Result<StageReport<Vec<PathBuf>>, PipelineError> {
        ensure_dir(dest)?;
        if corpus.is_empty() {
            info!("corpus is empty, identity matching skipped");
            return Ok(StageReport::ok(Vec::new()));
        }
        info!(documents = corpus.len(), "corpus loaded");

        let mut written = Vec::new();
        let mut skipped = Vec::new();
        for folder in list_subdirs(source_root)? {
            let files = list_files(&folder, &self.options.state_prefix, &self.options.document_ext)?;
            for source in files {
                match self.match_file(&source, corpus, dest) {
                    Ok(output) => written.push(output),
                    Err(notice) => {
                        warn!(%notice, "identity matcher skipped file");
                        skipped.push(notice);
                    }
                }
            }
        }

        info!(
            written = written.len(),
            skipped = skipped.len(),
            "identity matcher finished"
        );
        Ok(StageReport::with_skips(written, skipped))
    }

    fn match_file(
        &mut self,
        source: &Path,
        corpus: &Corpus,
        dest: &Path,
    ) -> Result<PathBuf, SkipNotice> {
        let doc = LopdfBackend::open_file(source).map_err(|e| {
            SkipNotice::for_path(SkipCode::UnreadableDocument, source, e.to_string())
        })?;

        let texts = LopdfBackend::page_texts(&doc);
        let hit = self
            .pattern
            .extract(&texts, self.options.name_page_index)
            .ok_or_else(|| {
                SkipNotice::for_path(SkipCode::NameNotFound, source, "no name label on any page")
            })?;
        let identity = hit.identity;
        debug!(source = %source.display(), %identity, page = hit.page_index, "name extracted");

        let found = find_first_match(corpus.entries(), &identity).ok_or_else(|| {
            SkipNotice::for_path(
                SkipCode::NoMatch,
                source,
                format!("no corpus page mentions {identity}"),
            )
        })?;
        let matched_doc = corpus.document(found.document_index).ok_or_else(|| {
            SkipNotice::for_path(SkipCode::NoMatch, source, "matched document is not loaded")
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
            |e: BackendError| SkipNotice::for_path(SkipCode::WriteFailed, source, e.to_string());
        let mut out = PageAssembler::new();
        out.append_from(&doc, strip).map_err(write_failed)?;
        out.append_pages(matched_doc, &[found.page_index])
            .map_err(write_failed)?;
        let bytes = out.to_bytes().map_err(write_failed)?;

        let output = self.write_named(&identity, &bytes, dest).map_err(write_failed)?;
        info!(
            source = %source.display(),
            output = %output.display(),
            corpus_document = %corpus.entries()[found.document_index].name,
            corpus_page = found.page_index,
            "matched"
        );
        Ok(output)
    }

    /// Write under a fresh `{last}_{first}_{NNNNNN}` name, drawing a new
    /// suffix whenever the name is taken.
    fn write_named(
        &mut self,
        identity: &taxpack_core::Identity,
        bytes: &[u8],
        dest: &Path,
    ) -> Result<PathBuf, BackendError> {
        let ext = &self.options.document_ext;
        let mut last_path = dest.to_path_buf();
        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = MatchedFileName::new(identity.clone(), self.suffixes.next_suffix());
            let path = dest.join(name.file_name(ext));
            match write_atomically(&path, bytes, WriteMode::NoClobber) {
                Ok(()) => {
                    if !name.satisfies_contract() {
                        warn!(
                            output = %path.display(),
                            "output name does not follow LAST_FIRST_NNNNNN; the batch combiner will skip it"
                        );
                    }
                    return Ok(path);
                }
                Err(e) if e.is_already_exists() => {
                    debug!(path = %path.display(), "name taken, drawing another suffix");
                    last_path = path;
                }
                Err(e) => return Err(e),
            }
        }
        Err(BackendError::AlreadyExists(last_path))
    }
}
