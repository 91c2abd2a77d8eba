//! Stats command handler

use locator_genome::StoreStatistics;

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::handlers::open_store;
use crate::output::{self, Printer};

/// Execute the stats command
pub fn execute_stats(config: &CliConfig, printer: &Printer) -> CliResult<()> {
    let store = open_store(config)?;
    let stats = store.statistics();
    printer.emit(&stats, render_stats)
}

/// Render store statistics as text
#[must_use]
pub fn render_stats(stats: &StoreStatistics) -> String {
    let mut out = output::header("Knowledge statistics");
    out.push_str(&output::field("Tracked elements", stats.tracked_elements));
    out.push_str(&output::field("Mutations", stats.total_mutations));
    out.push_str(&output::field(
        "Mean stability",
        output::score(stats.mean_stability),
    ));
    out.push_str(&output::field("Selector signals", stats.signal_count));
    out.push_str(&output::field("Snapshots", stats.snapshot_count));
    out
}
