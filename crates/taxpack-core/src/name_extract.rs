//! Identity extraction from unstructured page text.
//!
//! Per-person filings carry a line such as `Prepared for: Jane Doe`. The
//! extractor looks for a label token followed by two name words, first on a
//! designated page and then on every other page in original order.

use regex::Regex;

use crate::identity::Identity;

/// Default label token that precedes the person's name.
pub const DEFAULT_NAME_LABEL: &str = "for:";

/// An identity found in a document together with the page it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameHit {
    /// The extracted identity.
    pub identity: Identity,
    /// 0-based index of the page the identity was read from.
    pub page_index: usize,
}

/// Compiled name-extraction pattern.
///
/// The pattern is `<label>\s+([A-Z][A-Za-z'-]+)\s+([A-Z][A-Za-z'-]+)` and is
/// matched case-insensitively, so the label and the name words may appear in
/// any case.
#[derive(Debug, Clone)]
pub struct NamePattern {
    regex: Regex,
}

impl NamePattern {
    /// Build a pattern for the given label token (e.g. `"for:"`).
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting regex cannot be compiled.
    pub fn new(label: &str) -> Result<Self, regex::Error> {
        let pattern = format!(
            r"(?i){}\s+([A-Z][A-Za-z'-]+)\s+([A-Z][A-Za-z'-]+)",
            regex::escape(label)
        );
        Ok(Self {
            regex: Regex::new(&pattern)?,
        })
    }

    /// Find the first identity in a single page of text.
    pub fn find_in(&self, text: &str) -> Option<Identity> {
        let caps = self.regex.captures(text)?;
        let first = caps.get(1)?.as_str().trim();
        let last = caps.get(2)?.as_str().trim();
        Some(Identity::new(first, last))
    }

    /// Extract an identity from a document's page texts.
    ///
    /// The page at `designated` is tried first. If it has no match (or does
    /// not exist), all other pages are scanned in original order and the
    /// first match wins. Returns `None` if no page matches.
    pub fn extract(&self, pages: &[String], designated: usize) -> Option<NameHit> {
        if let Some(identity) = pages.get(designated).and_then(|text| self.find_in(text)) {
            return Some(NameHit {
                identity,
                page_index: designated,
            });
        }

        pages
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != designated)
            .find_map(|(i, text)| {
                self.find_in(text).map(|identity| NameHit {
                    identity,
                    page_index: i,
                })
            })
    }
}

impl Default for NamePattern {
    fn default() -> Self {
        // The default label is a fixed literal, so compilation cannot fail.
        Self {
            regex: Regex::new(r"(?i)for:\s+([A-Z][A-Za-z'-]+)\s+([A-Z][A-Za-z'-]+)")
                .expect("default name pattern is valid"),
        }
    }
}
