//! Capture command handler

use locator_genome::{EvolutionTracker, RawElementSnapshot, RecordedMutation, SelectorCandidate};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::commands::CaptureArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::handlers::or_dash;
use crate::output::{self, Printer};

/// Outcome of feeding one snapshot through the tracker
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureReport {
    /// Tracking id the snapshot was recorded under
    pub tracking_id: String,
    /// Primary selector
    pub selector: String,
    /// Whether this was the element's first capture
    pub is_new: bool,
    /// Extracted candidates, best first
    pub candidates: Vec<SelectorCandidate>,
    /// Mutations detected against the previous snapshot
    pub mutations: Vec<RecordedMutation>,
    /// Knowledge file written
    pub knowledge_path: PathBuf,
}

/// Read a raw element snapshot from a JSON file
pub fn read_snapshot(path: &Path) -> CliResult<RawElementSnapshot> {
    let json = fs::read_to_string(path).map_err(|e| {
        CliError::invalid_argument(format!("cannot read snapshot {}: {e}", path.display()))
    })?;
    Ok(serde_json::from_str(&json)?)
}

/// Execute the capture command
pub fn execute_capture(
    config: &CliConfig,
    printer: &Printer,
    args: &CaptureArgs,
) -> CliResult<()> {
    let report = capture_report(config, args)?;
    printer.emit(&report, render_capture)
}

/// Record the snapshot named by `args` and save the knowledge file
pub fn capture_report(config: &CliConfig, args: &CaptureArgs) -> CliResult<CaptureReport> {
    let tracker_config = config.tracker_config()?;
    let knowledge_path = tracker_config.knowledge_path.clone();
    let raw = read_snapshot(&args.snapshot)?;

    let tracker = EvolutionTracker::new(tracker_config)?;
    let tracking_id = args
        .tracking_id
        .clone()
        .unwrap_or_else(|| raw.tracking_id());
    let is_new = tracker.history(&tracking_id).is_none();

    let (code, mutations) =
        tracker.capture_tracked_with_mutations(tracking_id, &args.selector, raw);
    tracker.dispose()?;
    info!(
        tracking_id = %code.tracking_id,
        mutations = mutations.len(),
        path = %knowledge_path.display(),
        "snapshot captured"
    );

    Ok(CaptureReport {
        tracking_id: code.tracking_id,
        selector: code.selector,
        is_new,
        candidates: code.selectors,
        mutations,
        knowledge_path,
    })
}

/// Render a capture report as text
#[must_use]
pub fn render_capture(report: &CaptureReport) -> String {
    let status = if report.is_new {
        console::style("new element").green()
    } else {
        console::style("recaptured").cyan()
    };
    let mut out = output::header(&format!("Captured {} ({status})", report.tracking_id));
    out.push_str(&output::field("Selector", &report.selector));
    out.push_str(&output::field("Saved to", report.knowledge_path.display()));

    out.push_str(&format!("\n  Candidates ({}):\n", report.candidates.len()));
    for c in &report.candidates {
        out.push_str(&format!(
            "    {:<13} {:<40} survival {}\n",
            c.selector_type.as_str(),
            c.value,
            output::score(c.survival_probability),
        ));
    }

    if !report.mutations.is_empty() {
        out.push_str(&format!("\n  Mutations ({}):\n", report.mutations.len()));
        for m in &report.mutations {
            out.push_str(&format!(
                "    {:<20} {} -> {}\n",
                console::style(m.mutation_type).yellow(),
                or_dash(m.before.as_deref()),
                or_dash(m.after.as_deref()),
            ));
        }
    }
    out
}
