use std::io::{self, IsTerminal, Write};
use std::path::Path;

use taxpack::{PipelineError, PipelineOptions, SkipNotice, Stage};
use tracing_subscriber::EnvFilter;

use crate::cli::{GlobalArgs, LogLevel};

/// Install the stderr log subscriber at `level`.
///
/// Crates other than ours are held at `warn` so that `--log-level trace`
/// stays readable.
pub fn init_logging(level: LogLevel) {
    let directives = format!("warn,taxpack={0},taxpack_cli={0}", level.as_str());
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}

/// Pipeline options with the command-line overrides applied.
pub fn build_options(args: &GlobalArgs) -> PipelineOptions {
    let mut options = PipelineOptions::default();
    if let Some(n) = args.strip_pages {
        options.strip_pages = n;
    }
    if let Some(n) = args.batch_size {
        options.batch_size = n;
    }
    if let Some(n) = args.max_paragraphs {
        options.max_paragraphs = n;
    }
    if let Some(ref label) = args.name_label {
        options.name_label = label.clone();
    }
    options.right_align_from = args.right_align_from;
    options
}

/// Fail early with a readable message when the working directory is missing.
pub fn check_root(root: &Path) -> Result<(), i32> {
    if !root.is_dir() {
        eprintln!("Error: working directory not found: {}", root.display());
        return Err(1);
    }
    Ok(())
}

/// Print a pipeline error to stderr and turn it into an exit code.
pub fn fail(err: PipelineError) -> i32 {
    eprintln!("Error: {err}");
    1
}

/// Print every skip notice to stderr, one per line.
pub fn print_skips(skipped: &[SkipNotice]) {
    for notice in skipped {
        eprintln!("skipped: {notice}");
    }
}

/// A progress reporter that prints "Stage N/4: ..." to stderr,
/// but only when stderr is connected to a TTY (terminal).
pub struct ProgressReporter {
    total: usize,
    is_tty: bool,
}

impl ProgressReporter {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            is_tty: io::stderr().is_terminal(),
        }
    }

    pub fn report(&self, stage: Stage) {
        if self.is_tty {
            let current = Stage::ALL.iter().position(|s| *s == stage).unwrap_or(0) + 1;
            eprint!("\rStage {}/{}: {}...{}", current, self.total, stage, " ".repeat(8));
            let _ = io::stderr().flush();
        }
    }

    /// Clear the progress line (if TTY).
    pub fn finish(&self) {
        if self.is_tty {
            eprint!("\r{}\r", " ".repeat(60));
            let _ = io::stderr().flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalArgs {
        let mut argv = vec!["taxpack"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["strip", "root"]);
        Cli::parse_from(argv).global
    }

    #[test]
    fn defaults_without_flags() {
        assert_eq!(build_options(&global(&[])), PipelineOptions::default());
    }

    #[test]
    fn flags_override_defaults() {
        let options = build_options(&global(&[
            "--batch-size",
            "10",
            "--strip-pages",
            "1",
            "--right-align-from",
            "4",
        ]));
        assert_eq!(options.batch_size, 10);
        assert_eq!(options.strip_pages, 1);
        assert_eq!(options.right_align_from, Some(4));
        assert_eq!(options.max_paragraphs, 11);
    }

    #[test]
    fn check_root_missing() {
        assert_eq!(check_root(Path::new("/nonexistent/taxpack-root")), Err(1));
    }

    #[test]
    fn check_root_present() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(check_root(dir.path()), Ok(()));
    }

    #[test]
    fn progress_reporter_creation() {
        let reporter = ProgressReporter::new(4);
        assert_eq!(reporter.total, 4);
        reporter.report(Stage::Combine);
        reporter.finish();
    }
}
