//! Filename contract between the identity matcher and the batch combiner.
//!
//! Matched documents are named `{last}_{first}_{NNNNNN}.{ext}`. The six-digit
//! suffix only makes names unique and orders files deterministically; it
//! carries no other meaning.

use std::sync::LazyLock;

use regex::Regex;

use crate::identity::Identity;

/// Number of decimal digits in the tiebreak suffix.
pub const TIEBREAK_DIGITS: usize = 6;

/// Exclusive upper bound of the tiebreak suffix (`10^TIEBREAK_DIGITS`).
pub const TIEBREAK_BOUND: u32 = 1_000_000;

/// Stem accepted by the combiner: letters/hyphens, `_`, letters/hyphens, `_`, six digits.
static MATCHED_STEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z-]+)_([A-Za-z-]+)_(\d{6})$").expect("matched-stem pattern is valid")
});

/// Stricter stem the matcher is required to produce (first name: letters only).
static PRODUCED_STEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z-]+_[A-Za-z]+_\d{6}$").expect("produced-stem pattern is valid")
});

/// A parsed `{last}_{first}_{NNNNNN}` filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedFileName {
    /// Identity encoded in the name.
    pub identity: Identity,
    /// The uninterpreted tiebreak suffix.
    pub suffix: u32,
}

impl MatchedFileName {
    /// Create a name for `identity` with the given suffix.
    pub fn new(identity: Identity, suffix: u32) -> Self {
        Self {
            identity,
            suffix: suffix % TIEBREAK_BOUND,
        }
    }

    /// Parse a file name (with extension `ext`, no leading dot).
    ///
    /// Returns `None` if the extension differs (case-insensitive) or the stem
    /// does not follow the contract.
    pub fn parse(file_name: &str, ext: &str) -> Option<Self> {
        let (stem, actual_ext) = file_name.rsplit_once('.')?;
        if !actual_ext.eq_ignore_ascii_case(ext) {
            return None;
        }
        let caps = MATCHED_STEM.captures(stem)?;
        let last = caps.get(1)?.as_str();
        let first = caps.get(2)?.as_str();
        let suffix = caps.get(3)?.as_str().parse().ok()?;
        Some(Self {
            identity: Identity::new(first, last),
            suffix,
        })
    }

    /// Render the file name with extension `ext`.
    pub fn file_name(&self, ext: &str) -> String {
        format!(
            "{}_{}_{:0width$}.{}",
            self.identity.last,
            self.identity.first,
            self.suffix,
            ext,
            width = TIEBREAK_DIGITS
        )
    }

    /// Whether the rendered stem satisfies the strict producer contract.
    pub fn satisfies_contract(&self) -> bool {
        let stem = format!(
            "{}_{}_{:0width$}",
            self.identity.last,
            self.identity.first,
            self.suffix,
            width = TIEBREAK_DIGITS
        );
        PRODUCED_STEM.is_match(&stem)
    }
}
