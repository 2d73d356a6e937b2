//! Document backend trait.
//!
//! Defines the [`DocumentBackend`] trait that abstracts the PDF operations
//! the pipeline needs: opening, counting pages, addressing pages and reading
//! a page's text.

use std::path::Path;

/// Trait abstracting paged-document reading.
///
/// # Associated Types
///
/// - `Document`: The parsed document representation.
/// - `Page`: A reference to a single page within a document.
/// - `Error`: Backend-specific error type.
///
/// # Usage
///
/// ```ignore
/// let doc = MyBackend::open_file(path)?;
/// let count = MyBackend::page_count(&doc);
/// let page = MyBackend::get_page(&doc, 1)?;
/// let text = MyBackend::page_text(&doc, &page);
/// ```
pub trait DocumentBackend {
    /// The parsed document type.
    type Document;

    /// A reference to a single page within a document.
    type Page;

    /// Backend-specific error type.
    type Error: std::error::Error + From<std::io::Error>;

    /// Parse bytes into a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes do not represent a valid document.
    fn open(bytes: &[u8]) -> Result<Self::Document, Self::Error>;

    /// Read and parse a document from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    fn open_file(path: &Path) -> Result<Self::Document, Self::Error> {
        let bytes = std::fs::read(path)?;
        Self::open(&bytes)
    }

    /// Return the number of pages in the document.
    fn page_count(doc: &Self::Document) -> usize;

    /// Access a page by 0-based index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of range.
    fn get_page(doc: &Self::Document, index: usize) -> Result<Self::Page, Self::Error>;

    /// Extract the text of a page.
    ///
    /// Extraction failures yield an empty string: a page whose text cannot
    /// be decoded is treated like a page without text.
    fn page_text(doc: &Self::Document, page: &Self::Page) -> String;

    /// Extract the text of every page, in page order.
    fn page_texts(doc: &Self::Document) -> Vec<String> {
        (0..Self::page_count(doc))
            .map(|i| {
                Self::get_page(doc, i)
                    .map(|page| Self::page_text(doc, &page))
                    .unwrap_or_default()
            })
            .collect()
    }
}
