//! Command handlers
//!
//! Each handler module contains:
//! - The execution logic for a CLI command
//! - A pure text renderer for its report
//! - Tests

pub mod capture;
pub mod elements;
pub mod heuristics;
pub mod rank;
pub mod show;
pub mod stats;

pub use capture::{capture_report, execute_capture, read_snapshot, render_capture, CaptureReport};
pub use elements::{execute_elements, render_elements, summarize_elements, ElementSummary};
pub use heuristics::{execute_heuristics, render_heuristics};
pub use rank::{execute_rank, render_ranking, RankReport};
pub use show::{execute_show, render_show, ShowReport};
pub use stats::{execute_stats, render_stats};

use locator_genome::HistoryStore;
use tracing::debug;

use crate::config::CliConfig;
use crate::error::CliResult;

/// Open the knowledge file named by the configuration
pub fn open_store(config: &CliConfig) -> CliResult<HistoryStore> {
    let tracker = config.tracker_config()?;
    debug!(path = %tracker.knowledge_path.display(), "opening knowledge file");
    Ok(HistoryStore::open(
        tracker.knowledge_path,
        tracker.snapshot_capacity,
    ))
}

/// Optional string for display
pub(crate) fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}
