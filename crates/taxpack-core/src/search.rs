//! Deterministic first-match search of an identity over an ordered corpus.
//!
//! The corpus is an ordered collection of documents, each an ordered list of
//! page texts. Search order is corpus order, then page order; the first page
//! whose lowercased text contains both lowercased name tokens wins across the
//! whole corpus.
//!
//! Matching is raw substring containment, not token-bounded: a first name of
//! `Ann` also matches a page mentioning `Joanna`. Callers relying on exact
//! word matches must post-filter.

use crate::identity::Identity;

/// One document of the search corpus with its pages' extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusEntry {
    /// Display name of the document (usually the file name).
    pub name: String,
    /// Lowercased text of each page, in page order.
    page_texts: Vec<String>,
}

impl CorpusEntry {
    /// Create an entry from raw page texts. Text is lowercased once here.
    pub fn new(name: impl Into<String>, page_texts: Vec<String>) -> Self {
        Self {
            name: name.into(),
            page_texts: page_texts.into_iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.page_texts.len()
    }
}

/// Where an identity was found in the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    /// The identity that was searched for.
    pub identity: Identity,
    /// Index into the corpus slice of the matched document.
    pub document_index: usize,
    /// 0-based page index within the matched document.
    pub page_index: usize,
}

/// Whether a lowercased page text contains both lowercased name tokens.
pub fn page_mentions(page_text: &str, first: &str, last: &str) -> bool {
    page_text.contains(first) && page_text.contains(last)
}

/// Find the first page in `corpus` that mentions `identity`.
///
/// Documents are visited in slice order and pages in page order; the search
/// stops at the first hit. Identical inputs always produce identical results.
pub fn find_first_match(corpus: &[CorpusEntry], identity: &Identity) -> Option<MatchRecord> {
    let (first, last) = identity.match_tokens();
    corpus
        .iter()
        .enumerate()
        .find_map(|(doc_idx, entry)| {
            entry
                .page_texts
                .iter()
                .position(|text| page_mentions(text, &first, &last))
                .map(|page_idx| (doc_idx, page_idx))
        })
        .map(|(document_index, page_index)| MatchRecord {
            identity: identity.clone(),
            document_index,
            page_index,
        })
}
