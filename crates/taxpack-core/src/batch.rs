//! Batch planning for the combiner drain loop.
//!
//! Planning is pure: given the file names still unprocessed in a directory,
//! [`plan_batch`] separates names that break the filename contract from the
//! parseable ones, orders the parseable names by tiebreak suffix and selects
//! at most `batch_size` of them.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::identity::Identity;
use crate::naming::MatchedFileName;

/// One combined output document and the identities concatenated into it.
///
/// `identities` is in concatenation order and has exactly one entry per
/// source document included in `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Batch {
    /// Path of the combined document.
    pub path: PathBuf,
    /// Identities in the order their documents were concatenated.
    pub identities: Vec<Identity>,
}

impl Batch {
    /// Number of people in the batch.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Returns true if the batch holds nobody.
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

/// Ordered list of batches produced by one combiner session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchManifest {
    /// Batches in the order they were written.
    pub batches: Vec<Batch>,
}

impl BatchManifest {
    /// Create an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a successfully written batch.
    pub fn push(&mut self, batch: Batch) {
        self.batches.push(batch);
    }

    /// Iterate batches in write order.
    pub fn iter(&self) -> std::slice::Iter<'_, Batch> {
        self.batches.iter()
    }

    /// Number of batches.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Returns true if no batch was written.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Total number of people across all batches.
    pub fn people(&self) -> usize {
        self.batches.iter().map(Batch::len).sum()
    }
}

impl<'a> IntoIterator for &'a BatchManifest {
    type Item = &'a Batch;
    type IntoIter = std::slice::Iter<'a, Batch>;

    fn into_iter(self) -> Self::IntoIter {
        self.batches.iter()
    }
}

/// File names already consumed in this session. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedSet {
    names: BTreeSet<String>,
}

impl ProcessedSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a file name as processed. Returns false if it already was.
    pub fn mark(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    /// Whether the file name has been processed.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of processed names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if nothing has been processed.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Keep only the names not yet processed, preserving input order.
    pub fn unprocessed<I, S>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .map(Into::into)
            .filter(|n| !self.contains(n))
            .collect()
    }
}

/// A file selected for the next batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    /// File name within the source directory.
    pub file_name: String,
    /// Parsed name.
    pub parsed: MatchedFileName,
}

/// Result of planning one drain iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchPlan {
    /// Files for the next batch, ordered by suffix then file name.
    pub selected: Vec<PlannedFile>,
    /// Names that broke the filename contract.
    pub unparseable: Vec<String>,
    /// Parseable files left for later iterations.
    pub deferred: usize,
}

/// Plan the next batch from unprocessed file names.
///
/// Parseable names are sorted by suffix ascending, ties broken by file name,
/// and the first `batch_size` (at least one) are selected.
pub fn plan_batch(unprocessed: &[String], ext: &str, batch_size: usize) -> BatchPlan {
    let mut parsed = Vec::new();
    let mut unparseable = Vec::new();

    for name in unprocessed {
        match MatchedFileName::parse(name, ext) {
            Some(p) => parsed.push(PlannedFile {
                file_name: name.clone(),
                parsed: p,
            }),
            None => unparseable.push(name.clone()),
        }
    }

    parsed.sort_by(|a, b| {
        a.parsed
            .suffix
            .cmp(&b.parsed.suffix)
            .then_with(|| a.file_name.cmp(&b.file_name))
    });

    let take = batch_size.max(1).min(parsed.len());
    let deferred = parsed.len() - take;
    parsed.truncate(take);

    BatchPlan {
        selected: parsed,
        unparseable,
        deferred,
    }
}
