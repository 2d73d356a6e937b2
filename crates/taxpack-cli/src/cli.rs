use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Prepare tax filing packages from a working directory.
#[derive(Debug, Parser)]
#[command(name = "taxpack", about, version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Leading pages removed from each filing
    #[arg(long, global = true, value_name = "N")]
    pub strip_pages: Option<usize>,

    /// Maximum number of documents per combined batch
    #[arg(long, global = true, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Paragraphs copied from each supplementary document
    #[arg(long, global = true, value_name = "N")]
    pub max_paragraphs: Option<usize>,

    /// Right-align envelope paragraphs whose 0-based index is greater than N
    #[arg(long, global = true, value_name = "N")]
    pub right_align_from: Option<usize>,

    /// Label preceding the person's name on state filings
    #[arg(long, global = true, value_name = "LABEL")]
    pub name_label: Option<String>,

    /// Log verbosity
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run all four stages in order
    Run {
        /// Working directory root
        #[arg(value_name = "ROOT")]
        root: PathBuf,

        /// Also write the batch manifest to this JSON file
        #[arg(long, value_name = "FILE")]
        manifest: Option<PathBuf>,

        /// Print the run summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Strip leading pages from federal filings into federal/
    Strip {
        /// Working directory root
        #[arg(value_name = "ROOT")]
        root: PathBuf,
    },

    /// Match state filings against the W2 corpus into state/
    Match {
        /// Working directory root
        #[arg(value_name = "ROOT")]
        root: PathBuf,
    },

    /// Combine matched filings into batches under combined/
    Combine {
        /// Working directory root
        #[arg(value_name = "ROOT")]
        root: PathBuf,

        /// Write the batch manifest to this JSON file
        #[arg(long, value_name = "FILE")]
        manifest: Option<PathBuf>,
    },

    /// Build envelope documents for a saved batch manifest
    Envelopes {
        /// Working directory root
        #[arg(value_name = "ROOT")]
        root: PathBuf,

        /// Batch manifest written by `combine --manifest`
        #[arg(long, value_name = "FILE")]
        manifest: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_run_with_root() {
        let cli = Cli::parse_from(["taxpack", "run", "/data/2024"]);
        match cli.command {
            Commands::Run {
                ref root,
                ref manifest,
                json,
            } => {
                assert_eq!(root, &PathBuf::from("/data/2024"));
                assert!(manifest.is_none());
                assert!(!json);
            }
            _ => panic!("expected Run subcommand"),
        }
        assert_eq!(cli.global.log_level, LogLevel::Info);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "taxpack",
            "combine",
            "root",
            "--batch-size",
            "5",
            "--manifest",
            "m.json",
        ]);
        assert_eq!(cli.global.batch_size, Some(5));
        match cli.command {
            Commands::Combine { ref manifest, .. } => {
                assert_eq!(manifest.as_deref(), Some(std::path::Path::new("m.json")));
            }
            _ => panic!("expected Combine subcommand"),
        }
    }

    #[test]
    fn parse_policy_flags() {
        let cli = Cli::parse_from([
            "taxpack",
            "--strip-pages",
            "3",
            "--max-paragraphs",
            "8",
            "--right-align-from",
            "4",
            "--name-label",
            "Name:",
            "--log-level",
            "debug",
            "strip",
            "root",
        ]);
        assert_eq!(cli.global.strip_pages, Some(3));
        assert_eq!(cli.global.max_paragraphs, Some(8));
        assert_eq!(cli.global.right_align_from, Some(4));
        assert_eq!(cli.global.name_label.as_deref(), Some("Name:"));
        assert_eq!(cli.global.log_level, LogLevel::Debug);
        assert!(matches!(cli.command, Commands::Strip { .. }));
    }

    #[test]
    fn envelopes_requires_manifest() {
        assert!(Cli::try_parse_from(["taxpack", "envelopes", "root"]).is_err());
    }

    #[test]
    fn missing_root_is_an_error() {
        assert!(Cli::try_parse_from(["taxpack", "match"]).is_err());
    }

    #[test]
    fn rejects_non_numeric_batch_size() {
        assert!(Cli::try_parse_from(["taxpack", "run", "r", "--batch-size", "many"]).is_err());
    }

    #[test]
    fn log_level_strings() {
        assert_eq!(LogLevel::Warn.as_str(), "warn");
        assert_eq!(LogLevel::Trace.as_str(), "trace");
    }
}
