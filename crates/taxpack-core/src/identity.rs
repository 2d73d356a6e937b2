//! Person identities and name normalization.
//!
//! An [`Identity`] is the (first, last) pair extracted from a per-person
//! source document. It is used two ways: as a case-insensitive substring
//! match key against corpus page text, and as a case-insensitive,
//! whitespace-normalized lookup key against supplementary document names.

use std::fmt;

/// A person's first and last name, case-preserved as extracted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Identity {
    /// First name token.
    pub first: String,
    /// Last name token.
    pub last: String,
}

impl Identity {
    /// Create an identity from first and last name tokens.
    pub fn new(first: impl Into<String>, last: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            last: last.into(),
        }
    }

    /// Lowercased (first, last) pair used for substring matching.
    pub fn match_tokens(&self) -> (String, String) {
        (self.first.to_lowercase(), self.last.to_lowercase())
    }

    /// Normalized `first_last` key used to look up supplementary documents.
    pub fn lookup_key(&self) -> String {
        normalize_name(&format!("{} {}", self.first, self.last))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first, self.last)
    }
}

/// Normalize a person name or filename stem into a canonical lookup key.
///
/// Trims, lowercases, and collapses every run of whitespace and underscores
/// into a single `_`, so `"  Jane   Doe "`, `"jane_doe"` and `"Jane_Doe"` all
/// normalize to `"jane_doe"`.
pub fn normalize_name(name: &str) -> String {
    name.split(|c: char| c.is_whitespace() || c == '_')
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}
