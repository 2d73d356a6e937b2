//! Skip notices and stage reports.
//!
//! Per-file problems never abort a stage. They are recorded as a
//! [`SkipNotice`] carrying a machine-readable [`SkipCode`], and every stage
//! returns its value together with the collected notices in a
//! [`StageReport`].

use std::fmt;
use std::path::{Path, PathBuf};

/// Machine-readable category of a per-file skip.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum SkipCode {
    /// The document could not be read or parsed.
    UnreadableDocument,
    /// No identity could be extracted from any page.
    NameNotFound,
    /// No corpus page mentions the identity.
    NoMatch,
    /// The document has fewer pages than the strip policy requires.
    InsufficientPages,
    /// Writing the output failed; nothing was replaced or deleted.
    WriteFailed,
    /// The file name does not follow the `LAST_FIRST_NNNNNN` contract.
    UnparseableName,
    /// The document has no pages.
    EmptyDocument,
    /// No supplementary document exists for the identity.
    MissingSupplement,
}

impl SkipCode {
    /// Returns the string tag for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipCode::UnreadableDocument => "UNREADABLE_DOCUMENT",
            SkipCode::NameNotFound => "NAME_NOT_FOUND",
            SkipCode::NoMatch => "NO_MATCH",
            SkipCode::InsufficientPages => "INSUFFICIENT_PAGES",
            SkipCode::WriteFailed => "WRITE_FAILED",
            SkipCode::UnparseableName => "UNPARSEABLE_NAME",
            SkipCode::EmptyDocument => "EMPTY_DOCUMENT",
            SkipCode::MissingSupplement => "MISSING_SUPPLEMENT",
        }
    }
}

impl fmt::Display for SkipCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file (or person) that a stage skipped, and why.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkipNotice {
    /// Machine-readable skip category.
    pub code: SkipCode,
    /// Human-readable description.
    pub description: String,
    /// The file the notice refers to, if any.
    pub path: Option<PathBuf>,
}

impl SkipNotice {
    /// Create a notice about a specific file.
    pub fn for_path(code: SkipCode, path: &Path, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            path: Some(path.to_path_buf()),
        }
    }

    /// Create a notice that is not tied to a file.
    pub fn new(code: SkipCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            path: None,
        }
    }
}

impl fmt::Display for SkipNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.description)?;
        if let Some(ref path) = self.path {
            write!(f, " ({})", path.display())?;
        }
        Ok(())
    }
}

/// A stage's value paired with the notices collected while producing it.
#[derive(Debug, Clone)]
pub struct StageReport<T> {
    /// The produced value.
    pub value: T,
    /// Per-file skips.
    pub skipped: Vec<SkipNotice>,
}

impl<T> StageReport<T> {
    /// Create a report with no skips.
    pub fn ok(value: T) -> Self {
        Self {
            value,
            skipped: Vec::new(),
        }
    }

    /// Create a report with skips.
    pub fn with_skips(value: T, skipped: Vec<SkipNotice>) -> Self {
        Self { value, skipped }
    }

    /// Returns true if nothing was skipped.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Number of skips with the given code.
    pub fn count(&self, code: &SkipCode) -> usize {
        self.skipped.iter().filter(|s| &s.code == code).count()
    }

    /// Transform the value while preserving notices.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> StageReport<U> {
        StageReport {
            value: f(self.value),
            skipped: self.skipped,
        }
    }
}
