//! taxpack: assemble per-person tax packets from PDF filings.
//!
//! The pipeline runs four stages over one [`WorkingDirectorySet`]:
//!
//! 1. [`PageStripper`] drops the leading pages of federal filings.
//! 2. [`IdentityMatcher`] reads a name from each state filing, finds the
//!    wage-statement page that mentions it and writes both together.
//! 3. [`BatchCombiner`] concatenates the matched documents into bounded
//!    batches and returns a [`BatchManifest`].
//! 4. [`EnvelopeAssembler`] builds one `.docx` per batch from the people's
//!    supplementary documents.
//!
//! Per-file problems are skipped and reported in a [`StageReport`]; only a
//! directory that cannot be created or listed stops a stage.
//!
//! # Example
//!
//! ```ignore
//! use taxpack::{Pipeline, PipelineOptions, WorkingDirectorySet};
//!
//! let pipeline = Pipeline::new(WorkingDirectorySet::from_root("/data/2024"), PipelineOptions::default());
//! let summary = pipeline.run()?;
//! println!("Done: {summary}");
//! ```

pub mod batch_combiner;
pub mod envelope_assembler;
pub mod error;
pub mod identity_matcher;
#[cfg(feature = "serde")]
pub mod manifest;
pub mod page_stripper;
pub mod pipeline;
pub mod workdir;

pub use batch_combiner::{BatchCombiner, DrainStep};
pub use envelope_assembler::{EnvelopeAssembler, SupplementIndex, envelope_path};
pub use error::PipelineError;
pub use identity_matcher::{
    Corpus, IdentityMatcher, ScriptedSuffix, SeededSuffix, SuffixSource, ThreadRngSuffix,
};
#[cfg(feature = "serde")]
pub use manifest::{load_manifest, save_manifest};
pub use page_stripper::PageStripper;
pub use pipeline::{Pipeline, PipelineSummary, Stage};
pub use workdir::WorkingDirectorySet;

pub use taxpack_core::{
    Batch, BatchManifest, Identity, MatchedFileName, PipelineOptions, ProcessedSet, SkipCode,
    SkipNotice, StageReport, normalize_name,
};
pub use taxpack_parse::{BackendError, EnvelopeDocument, WordDocument};
