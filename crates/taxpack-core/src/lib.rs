//! taxpack-core: Backend-independent data types and algorithms.
//!
//! This crate provides the identity model, the name-extraction pattern, the
//! corpus search, the filename contract and batch planning used by taxpack.
//! It performs no I/O.

pub mod batch;
pub mod error;
pub mod identity;
pub mod name_extract;
pub mod naming;
pub mod options;
pub mod search;

pub use batch::{Batch, BatchManifest, BatchPlan, PlannedFile, ProcessedSet, plan_batch};
pub use error::{SkipCode, SkipNotice, StageReport};
pub use identity::{Identity, normalize_name};
pub use name_extract::{DEFAULT_NAME_LABEL, NameHit, NamePattern};
pub use naming::{MatchedFileName, TIEBREAK_BOUND, TIEBREAK_DIGITS};
pub use options::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_PARAGRAPHS, DEFAULT_NAME_PAGE_INDEX, DEFAULT_STRIP_PAGES,
    PipelineOptions,
};
pub use search::{CorpusEntry, MatchRecord, find_first_match, page_mentions};
