use std::path::{Path, PathBuf};

use taxpack::{
    Pipeline, PipelineOptions, StageReport, WorkingDirectorySet, load_manifest, save_manifest,
};
use tracing::info;

use crate::shared::{check_root, fail, print_skips};

fn pipeline(root: &Path, options: PipelineOptions) -> Result<Pipeline, i32> {
    check_root(root)?;
    Ok(Pipeline::new(WorkingDirectorySet::from_root(root), options))
}

fn report_outputs(verb: &str, report: &StageReport<Vec<PathBuf>>) {
    print_skips(&report.skipped);
    for path in &report.value {
        println!("{}", path.display());
    }
    println!(
        "Done: {} {verb}, {} skipped",
        report.value.len(),
        report.skipped.len()
    );
}

pub fn strip(root: &Path, options: PipelineOptions) -> Result<(), i32> {
    let report = pipeline(root, options)?.strip().map_err(fail)?;
    report_outputs("stripped", &report);
    Ok(())
}

pub fn match_identities(root: &Path, options: PipelineOptions) -> Result<(), i32> {
    let report = pipeline(root, options)?.match_identities().map_err(fail)?;
    report_outputs("matched", &report);
    Ok(())
}

pub fn combine(root: &Path, options: PipelineOptions, manifest: Option<&Path>) -> Result<(), i32> {
    let report = pipeline(root, options)?.combine().map_err(fail)?;
    if let Some(path) = manifest {
        save_manifest(&report.value, path).map_err(fail)?;
        info!(path = %path.display(), batches = report.value.len(), "manifest saved");
    }
    print_skips(&report.skipped);
    for batch in &report.value {
        println!("{} ({} people)", batch.path.display(), batch.len());
    }
    println!(
        "Done: {} batches ({} people), {} skipped",
        report.value.len(),
        report.value.people(),
        report.skipped.len()
    );
    Ok(())
}

pub fn envelopes(root: &Path, options: PipelineOptions, manifest: &Path) -> Result<(), i32> {
    let pipeline = pipeline(root, options)?;
    let manifest = load_manifest(manifest).map_err(fail)?;
    info!(batches = manifest.len(), "manifest loaded");
    let report = pipeline.envelopes(&manifest).map_err(fail)?;
    report_outputs("envelopes", &report);
    Ok(())
}
