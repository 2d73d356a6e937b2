//! Running the four stages in order over one working directory set.

use std::fmt;
use std::path::PathBuf;

use taxpack_core::{BatchManifest, PipelineOptions, SkipNotice, StageReport};
use tracing::info;

use crate::batch_combiner::BatchCombiner;
use crate::envelope_assembler::EnvelopeAssembler;
use crate::error::PipelineError;
use crate::identity_matcher::{IdentityMatcher, SuffixSource, ThreadRngSuffix};
use crate::page_stripper::PageStripper;
use crate::workdir::WorkingDirectorySet;

/// A pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stage {
    /// Page-Stripper.
    Strip,
    /// Identity Matcher.
    Match,
    /// Batch Combiner.
    Combine,
    /// Envelope Assembler.
    Envelopes,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 4] = [Stage::Strip, Stage::Match, Stage::Combine, Stage::Envelopes];

    /// Short human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Strip => "stripping federal filings",
            Stage::Match => "matching state filings",
            Stage::Combine => "combining batches",
            Stage::Envelopes => "assembling envelopes",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a complete run produced.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineSummary {
    /// Outputs of the Page-Stripper.
    pub stripped: Vec<PathBuf>,
    /// Outputs of the Identity Matcher.
    pub matched: Vec<PathBuf>,
    /// Batches written by the Batch Combiner.
    pub manifest: BatchManifest,
    /// Envelope documents written.
    pub envelopes: Vec<PathBuf>,
    /// Everything skipped by any stage, in stage order.
    pub skipped: Vec<SkipNotice>,
}

impl PipelineSummary {
    fn absorb<T>(&mut self, report: StageReport<T>) -> T {
        self.skipped.extend(report.skipped);
        report.value
    }
}

impl fmt::Display for PipelineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} stripped, {} matched, {} batches ({} people), {} envelopes, {} skipped",
            self.stripped.len(),
            self.matched.len(),
            self.manifest.len(),
            self.manifest.people(),
            self.envelopes.len(),
            self.skipped.len()
        )
    }
}

/// The four stages bound to one directory layout and one set of options.
///
/// # Example
///
/// ```ignore
/// let pipeline = Pipeline::new(WorkingDirectorySet::from_root("/data/2024"), PipelineOptions::default());
/// let summary = pipeline.run()?;
/// println!("{summary}");
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    dirs: WorkingDirectorySet,
    options: PipelineOptions,
}

impl Pipeline {
    /// Bind `options` to a directory layout.
    pub fn new(dirs: WorkingDirectorySet, options: PipelineOptions) -> Self {
        Self { dirs, options }
    }

    /// The directory layout.
    pub fn dirs(&self) -> &WorkingDirectorySet {
        &self.dirs
    }

    /// The options.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Page-Stripper: `company/` to `federal/`.
    ///
    /// # Errors
    ///
    /// See [`PageStripper::run`].
    pub fn strip(&self) -> Result<StageReport<Vec<PathBuf>>, PipelineError> {
        PageStripper::new(&self.options).run(&self.dirs.company, &self.dirs.federal)
    }

    /// Identity Matcher: `company/` and `W2/` to `state/`, with random suffixes.
    ///
    /// # Errors
    ///
    /// See [`IdentityMatcher::run`].
    pub fn match_identities(&self) -> Result<StageReport<Vec<PathBuf>>, PipelineError> {
        self.match_identities_with(ThreadRngSuffix)
    }

    /// Identity Matcher with a caller-supplied suffix source.
    ///
    /// # Errors
    ///
    /// See [`IdentityMatcher::run`].
    pub fn match_identities_with<S: SuffixSource>(
        &self,
        suffixes: S,
    ) -> Result<StageReport<Vec<PathBuf>>, PipelineError> {
        IdentityMatcher::new(&self.options, suffixes)?.run(
            &self.dirs.company,
            &self.dirs.w2,
            &self.dirs.state,
        )
    }

    /// A combiner draining `state/` into `combined/`.
    pub fn combiner(&self) -> BatchCombiner {
        BatchCombiner::new(&self.options, &self.dirs.state, &self.dirs.combined)
    }

    /// Batch Combiner: drain `state/` once with a fresh combiner.
    ///
    /// # Errors
    ///
    /// See [`BatchCombiner::drain`].
    pub fn combine(&self) -> Result<StageReport<BatchManifest>, PipelineError> {
        self.combiner().drain()
    }

    /// Envelope Assembler: `manifest` and `output_data/` to `envelopes/`.
    ///
    /// # Errors
    ///
    /// See [`EnvelopeAssembler::run`].
    pub fn envelopes(
        &self,
        manifest: &BatchManifest,
    ) -> Result<StageReport<Vec<PathBuf>>, PipelineError> {
        let dirs = self.dirs.supplement_dirs()?;
        EnvelopeAssembler::new(&self.options).run(manifest, &dirs, &self.dirs.envelopes)
    }

    /// Run all four stages.
    ///
    /// # Errors
    ///
    /// Stops at the first stage that cannot run.
    pub fn run(&self) -> Result<PipelineSummary, PipelineError> {
        self.run_with(ThreadRngSuffix, |_| {})
    }

    /// Run all four stages, calling `on_stage` as each one starts.
    ///
    /// # Errors
    ///
    /// Stops at the first stage that cannot run.
    pub fn run_with<S: SuffixSource>(
        &self,
        suffixes: S,
        mut on_stage: impl FnMut(Stage),
    ) -> Result<PipelineSummary, PipelineError> {
        let mut summary = PipelineSummary::default();
        info!(root = %self.dirs.root.display(), "pipeline started");

        on_stage(Stage::Strip);
        summary.stripped = summary.absorb(self.strip()?);

        on_stage(Stage::Match);
        summary.matched = summary.absorb(self.match_identities_with(suffixes)?);

        on_stage(Stage::Combine);
        summary.manifest = summary.absorb(self.combine()?);

        on_stage(Stage::Envelopes);
        let envelopes = self.envelopes(&summary.manifest)?;
        summary.envelopes = summary.absorb(envelopes);

        info!(%summary, "pipeline finished");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_are_ordered() {
        let mut sorted = Stage::ALL;
        sorted.sort();
        assert_eq!(sorted, Stage::ALL);
        assert_eq!(Stage::Combine.to_string(), "combining batches");
    }

    #[test]
    fn summary_display_counts() {
        let summary = PipelineSummary {
            stripped: vec![PathBuf::from("a.pdf")],
            ..PipelineSummary::default()
        };
        assert_eq!(
            summary.to_string(),
            "1 stripped, 0 matched, 0 batches (0 people), 0 envelopes, 0 skipped"
        );
    }

    #[test]
    fn missing_company_dir_aborts() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            WorkingDirectorySet::from_root(root.path()),
            PipelineOptions::default(),
        );
        assert!(matches!(pipeline.run(), Err(PipelineError::ListDir { .. })));
    }
}
