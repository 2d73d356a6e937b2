mod cli;
mod run_cmd;
mod shared;
mod stage_cmd;

use clap::Parser;
use cli::Cli;

fn main() {
    let cli = Cli::parse();
    shared::init_logging(cli.global.log_level);
    let options = shared::build_options(&cli.global);
    tracing::debug!(?options, "options resolved");

    let result = match cli.command {
        cli::Commands::Run {
            ref root,
            ref manifest,
            json,
        } => run_cmd::run(root, options, manifest.as_deref(), json),
        cli::Commands::Strip { ref root } => stage_cmd::strip(root, options),
        cli::Commands::Match { ref root } => stage_cmd::match_identities(root, options),
        cli::Commands::Combine {
            ref root,
            ref manifest,
        } => stage_cmd::combine(root, options, manifest.as_deref()),
        cli::Commands::Envelopes {
            ref root,
            ref manifest,
        } => stage_cmd::envelopes(root, options, manifest),
    };

    if let Err(code) = result {
        std::process::exit(code);
    }
}
