use std::path::Path;

use taxpack::{Pipeline, PipelineOptions, Stage, ThreadRngSuffix, WorkingDirectorySet, save_manifest};

use crate::shared::{ProgressReporter, check_root, fail, print_skips};

pub fn run(
    root: &Path,
    options: PipelineOptions,
    manifest: Option<&Path>,
    json: bool,
) -> Result<(), i32> {
    check_root(root)?;
    let pipeline = Pipeline::new(WorkingDirectorySet::from_root(root), options);
    let progress = ProgressReporter::new(Stage::ALL.len());

    let result = pipeline.run_with(ThreadRngSuffix, |stage| progress.report(stage));
    progress.finish();
    let summary = result.map_err(fail)?;

    if let Some(path) = manifest {
        save_manifest(&summary.manifest, path).map_err(fail)?;
        tracing::info!(path = %path.display(), batches = summary.manifest.len(), "manifest saved");
    }

    print_skips(&summary.skipped);
    if json {
        let out = serde_json::to_string_pretty(&summary).map_err(|e| {
            eprintln!("Error: failed to encode summary: {e}");
            1
        })?;
        println!("{out}");
    } else {
        println!("Done: {summary}");
    }
    Ok(())
}
