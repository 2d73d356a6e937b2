//! taxpack-parse: document backends for the taxpack pipeline.
//!
//! PDF access goes through the [`DocumentBackend`] trait, implemented for
//! `lopdf` by [`LopdfBackend`], with [`PageAssembler`] for building new
//! documents out of existing pages. DOCX packages are read into a
//! [`WordDocument`] and written with [`EnvelopeDocument`]. All outputs go
//! through [`write_atomically`].

pub mod backend;
pub mod docx;
pub mod docx_writer;
pub mod error;
pub mod lopdf_backend;
pub mod write;

pub use backend::DocumentBackend;
pub use docx::{
    Indentation, PageGeometry, Paragraph, ParagraphFormat, Run, RunFormat, StyleDefinition,
    StyleSheet, WordDocument,
};
pub use docx_writer::{Block, CopyPolicy, EnvelopeDocument};
pub use error::BackendError;
pub use lopdf_backend::{LopdfBackend, LopdfDocument, LopdfPage, PageAssembler};
pub use taxpack_core;
pub use write::{WriteMode, write_atomically};
