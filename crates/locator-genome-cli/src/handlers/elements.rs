//! Elements command handler

use locator_genome::{ElementEvolutionHistory, HistoryStore};
use serde::Serialize;

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::handlers::{open_store, or_dash};
use crate::output::{self, Printer};

/// One line of the element listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSummary {
    /// Tracking id
    pub tracking_id: String,
    /// Tag of the latest snapshot
    pub tag_name: Option<String>,
    /// Primary selector of the latest snapshot
    pub latest_selector: Option<String>,
    /// First capture time
    pub first_seen: u64,
    /// Latest capture time
    pub last_seen: u64,
    /// Stored snapshots
    pub snapshot_count: usize,
    /// Recorded mutations
    pub mutation_count: usize,
}

impl From<&ElementEvolutionHistory> for ElementSummary {
    fn from(history: &ElementEvolutionHistory) -> Self {
        let latest = history.latest();
        Self {
            tracking_id: history.tracking_id.clone(),
            tag_name: latest.map(|c| c.tag_name.clone()),
            latest_selector: latest.map(|c| c.selector.clone()),
            first_seen: history.first_seen,
            last_seen: history.last_seen,
            snapshot_count: history.snapshots.len(),
            mutation_count: history.mutations.len(),
        }
    }
}

/// Execute the elements command
pub fn execute_elements(config: &CliConfig, printer: &Printer) -> CliResult<()> {
    let store = open_store(config)?;
    let summaries = summarize_elements(&store);
    printer.emit(summaries.as_slice(), render_elements)
}

/// Summaries of every tracked element, most recently seen first
#[must_use]
pub fn summarize_elements(store: &HistoryStore) -> Vec<ElementSummary> {
    let mut summaries: Vec<ElementSummary> = store
        .tracking_ids()
        .filter_map(|id| store.history(id))
        .map(ElementSummary::from)
        .collect();
    summaries.sort_by(|a, b| {
        b.last_seen
            .cmp(&a.last_seen)
            .then_with(|| a.tracking_id.cmp(&b.tracking_id))
    });
    summaries
}

/// Render the element listing as text
#[must_use]
pub fn render_elements(summaries: &[ElementSummary]) -> String {
    let mut out = output::header(&format!("Tracked elements ({})", summaries.len()));
    if summaries.is_empty() {
        out.push_str("  (none)\n");
        return out;
    }
    for s in summaries {
        out.push_str(&format!(
            "  {}  {:<8} {:<28} seen {} .. {}  {} snapshot(s), {} mutation(s)\n",
            console::style(&s.tracking_id).bold(),
            or_dash(s.tag_name.as_deref()),
            or_dash(s.latest_selector.as_deref()),
            output::timestamp(s.first_seen),
            output::timestamp(s.last_seen),
            s.snapshot_count,
            s.mutation_count,
        ));
    }
    out
}
