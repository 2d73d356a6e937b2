//! Error types for the document backends.
//!
//! Uses [`thiserror`] for ergonomic error derivation. [`BackendError`] covers
//! PDF parsing, DOCX package and XML problems, and I/O.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for document backend operations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Error from PDF parsing (structure, syntax, object resolution).
    #[error("PDF parse error: {0}")]
    Parse(String),

    /// Error reading or writing document data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A page index outside the document was requested.
    #[error("page index {index} out of range (0..{count})")]
    PageOutOfRange {
        /// Requested 0-based index.
        index: usize,
        /// Number of pages in the document.
        count: usize,
    },

    /// The DOCX package is missing a part or is not a ZIP archive.
    #[error("DOCX package error: {0}")]
    Package(String),

    /// Malformed WordprocessingML.
    #[error("XML error: {0}")]
    Xml(String),

    /// The output already exists and replacing it was not allowed.
    #[error("output already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
}

impl BackendError {
    /// Whether this error is a refused overwrite.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, BackendError::AlreadyExists(_))
    }
}

impl From<lopdf::Error> for BackendError {
    fn from(err: lopdf::Error) -> Self {
        BackendError::Parse(err.to_string())
    }
}

impl From<zip::result::ZipError> for BackendError {
    fn from(err: zip::result::ZipError) -> Self {
        BackendError::Package(err.to_string())
    }
}

impl From<quick_xml::Error> for BackendError {
    fn from(err: quick_xml::Error) -> Self {
        BackendError::Xml(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_parse() {
        let err = BackendError::Parse("invalid xref table".to_string());
        assert_eq!(err.to_string(), "PDF parse error: invalid xref table");
    }

    #[test]
    fn backend_error_io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: BackendError = io_err.into();
        assert!(matches!(err, BackendError::Io(_)));
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn backend_error_page_out_of_range() {
        let err = BackendError::PageOutOfRange { index: 5, count: 2 };
        assert_eq!(err.to_string(), "page index 5 out of range (0..2)");
    }

    #[test]
    fn backend_error_already_exists() {
        let err = BackendError::AlreadyExists(PathBuf::from("state/Doe_Jane_000001.pdf"));
        assert!(err.is_already_exists());
        assert!(err.to_string().contains("Doe_Jane_000001.pdf"));
        assert!(!BackendError::Xml("x".into()).is_already_exists());
    }

    #[test]
    fn backend_error_implements_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(BackendError::Package("test".to_string()));
        assert!(err.to_string().contains("test"));
    }
}
