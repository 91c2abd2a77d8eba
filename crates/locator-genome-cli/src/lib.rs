//! Genome CLI Library
//!
//! Command-line access to a locator-genome knowledge file: statistics,
//! per-element histories, selector rankings, global heuristics, and
//! recording snapshots captured elsewhere.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;

pub use commands::{CaptureArgs, Cli, ColorArg, Commands, FormatArg, RankArgs, ShowArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{OutputFormat, Printer};

/// Build the CLI configuration from parsed arguments
#[must_use]
pub fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
        .with_format(cli.format.into())
        .with_knowledge_path(cli.knowledge.clone())
        .with_config_path(cli.config.clone())
}

/// Dispatch a parsed command line
pub fn run(cli: &Cli) -> CliResult<()> {
    let config = build_config(cli);
    let printer = Printer::new(config.format, config.verbosity.is_quiet());

    match &cli.command {
        Commands::Stats => handlers::execute_stats(&config, &printer),
        Commands::Elements => handlers::execute_elements(&config, &printer),
        Commands::Show(args) => handlers::execute_show(&config, &printer, args),
        Commands::Rank(args) => handlers::execute_rank(&config, &printer, args),
        Commands::Capture(args) => handlers::execute_capture(&config, &printer, args),
        Commands::Heuristics => handlers::execute_heuristics(&config, &printer),
    }
}
