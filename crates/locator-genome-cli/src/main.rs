//! Genome CLI: inspect element evolution knowledge
//!
//! ## Usage
//!
//! ```bash
//! genome stats                              # Store statistics
//! genome elements                           # Tracked elements
//! genome rank <TRACKING_ID> --limit 5       # Best selectors for an element
//! genome capture snap.json --selector "#go" # Record a snapshot
//! ```

use clap::Parser;
use genome_cli::{build_config, run, Cli};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);
    config.color.apply();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.verbosity.filter_directive())),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
