//! Pipeline policy options.
//!
//! The numeric constants that shape the output (pages stripped, batch cap,
//! paragraph cap) are policy, not incidental detail, so they live here with
//! documented defaults.

use crate::name_extract::DEFAULT_NAME_LABEL;

/// Default number of leading pages removed from filings.
pub const DEFAULT_STRIP_PAGES: usize = 2;

/// Default 0-based page that is searched first for the person's name.
pub const DEFAULT_NAME_PAGE_INDEX: usize = 1;

/// Default maximum number of documents per combined batch.
pub const DEFAULT_BATCH_SIZE: usize = 30;

/// Default number of supplementary paragraphs copied per person.
pub const DEFAULT_MAX_PARAGRAPHS: usize = 11;

/// Options controlling every pipeline stage.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineOptions {
    /// Leading pages removed from each filing (default: 2).
    pub strip_pages: usize,
    /// Page tried first for name extraction (default: 1, the second page).
    pub name_page_index: usize,
    /// Label token preceding the name (default: `"for:"`).
    pub name_label: String,
    /// Hard cap on documents per combined batch (default: 30).
    pub batch_size: usize,
    /// Paragraphs copied from each supplementary document (default: 11).
    pub max_paragraphs: usize,
    /// Right-align copied paragraphs whose index is greater than this
    /// (default: `None`, keep the source alignment).
    pub right_align_from: Option<usize>,
    /// File name prefix of federal filings (default: `"FTFCS"`).
    pub federal_prefix: String,
    /// File name prefix of state filings (default: `"STFCS"`).
    pub state_prefix: String,
    /// Extension of PDF inputs and outputs, without the dot (default: `"pdf"`).
    pub document_ext: String,
    /// Extension of supplementary documents (default: `"docx"`).
    pub supplement_ext: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            strip_pages: DEFAULT_STRIP_PAGES,
            name_page_index: DEFAULT_NAME_PAGE_INDEX,
            name_label: DEFAULT_NAME_LABEL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_paragraphs: DEFAULT_MAX_PARAGRAPHS,
            right_align_from: None,
            federal_prefix: "FTFCS".to_string(),
            state_prefix: "STFCS".to_string(),
            document_ext: "pdf".to_string(),
            supplement_ext: "docx".to_string(),
        }
    }
}

impl PipelineOptions {
    /// Options reproducing the original envelope layout, where paragraphs
    /// after the fifth are pushed to the right margin.
    pub fn with_right_aligned_address() -> Self {
        Self {
            right_align_from: Some(4),
            ..Self::default()
        }
    }

    /// Batch cap clamped to at least one document.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}
