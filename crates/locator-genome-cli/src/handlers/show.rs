//! Show command handler

use locator_genome::{ElementEvolutionHistory, GenomeError, RecordedMutation};
use serde::Serialize;

use crate::commands::ShowArgs;
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::handlers::{open_store, or_dash};
use crate::output::{self, Printer};

/// History summary and mutation log of one element
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowReport {
    /// Tracking id
    pub tracking_id: String,
    /// Tag of the latest snapshot
    pub tag_name: Option<String>,
    /// Primary selector of the latest snapshot
    pub latest_selector: Option<String>,
    /// Best-ranked candidate of the latest snapshot
    pub best_selector: Option<String>,
    /// Whether the latest snapshot had a visible bounding box, if one was recorded
    pub visible: Option<bool>,
    /// First capture time
    pub first_seen: u64,
    /// Latest capture time
    pub last_seen: u64,
    /// Stored snapshots
    pub snapshot_count: usize,
    /// Selectors with a stability signal
    pub selector_count: usize,
    /// Mutation log, oldest first
    pub mutations: Vec<RecordedMutation>,
}

impl From<&ElementEvolutionHistory> for ShowReport {
    fn from(history: &ElementEvolutionHistory) -> Self {
        let latest = history.latest();
        Self {
            tracking_id: history.tracking_id.clone(),
            tag_name: latest.map(|c| c.tag_name.clone()),
            latest_selector: latest.map(|c| c.selector.clone()),
            best_selector: latest
                .and_then(|c| c.best_selector())
                .map(|c| c.value.clone()),
            visible: latest.and_then(|c| c.bounding_box).map(|b| b.is_visible()),
            first_seen: history.first_seen,
            last_seen: history.last_seen,
            snapshot_count: history.snapshots.len(),
            selector_count: history.selector_stability.len(),
            mutations: history.mutations.clone(),
        }
    }
}

/// Execute the show command
pub fn execute_show(config: &CliConfig, printer: &Printer, args: &ShowArgs) -> CliResult<()> {
    let store = open_store(config)?;
    let history = store
        .history(&args.tracking_id)
        .ok_or_else(|| GenomeError::unknown_element(&args.tracking_id))?;
    let report = ShowReport::from(history);
    printer.emit(&report, render_show)
}

/// Render an element report as text
#[must_use]
pub fn render_show(report: &ShowReport) -> String {
    let mut out = output::header(&format!("Element {}", report.tracking_id));
    out.push_str(&output::field("Tag", or_dash(report.tag_name.as_deref())));
    out.push_str(&output::field(
        "Selector",
        or_dash(report.latest_selector.as_deref()),
    ));
    out.push_str(&output::field(
        "Best candidate",
        or_dash(report.best_selector.as_deref()),
    ));
    let visible = match report.visible {
        Some(true) => "yes",
        Some(false) => "no",
        None => "-",
    };
    out.push_str(&output::field("Visible", visible));
    out.push_str(&output::field("First seen", output::timestamp(report.first_seen)));
    out.push_str(&output::field("Last seen", output::timestamp(report.last_seen)));
    out.push_str(&output::field("Snapshots", report.snapshot_count));
    out.push_str(&output::field("Tracked selectors", report.selector_count));

    out.push('\n');
    out.push_str(&output::header(&format!(
        "Mutations ({})",
        report.mutations.len()
    )));
    if report.mutations.is_empty() {
        out.push_str("  (none)\n");
    }
    for m in &report.mutations {
        out.push_str(&format!(
            "  {}  {:<20} {} -> {}\n",
            output::timestamp(m.timestamp),
            console::style(m.mutation_type).yellow(),
            or_dash(m.before.as_deref()),
            or_dash(m.after.as_deref()),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use locator_genome::{
        BoundingBox, ElementGeneticCode, MutationType, RawElementSnapshot, SelectorCandidate,
        SelectorType,
    };

    fn report(mutations: Vec<RecordedMutation>) -> ShowReport {
        ShowReport {
            tracking_id: "abc123".to_string(),
            tag_name: Some("button".to_string()),
            latest_selector: Some("#buy".to_string()),
            best_selector: Some("[data-testid=\"buy\"]".to_string()),
            visible: None,
            first_seen: 0,
            last_seen: 86_400_000,
            snapshot_count: 2,
            selector_count: 5,
            mutations,
        }
    }

    #[test]
    fn test_render_without_mutations() {
        let text = render_show(&report(vec![]));
        assert!(text.contains("Element abc123"));
        assert!(text.contains("#buy"));
        assert!(text.contains("[data-testid=\"buy\"]"));
        assert!(text.contains("1970-01-02T00:00:00Z"));
        assert!(text.contains("Mutations (0)"));
        assert!(text.contains("(none)"));
    }

    #[test]
    fn test_render_mutation_log() {
        let mutations = vec![
            RecordedMutation::new(
                MutationType::IdRemoved,
                86_400_000,
                Some("buy".to_string()),
                None,
            ),
            RecordedMutation::new(
                MutationType::ClassAdded,
                86_400_000,
                None,
                Some("css-1abc".to_string()),
            ),
        ];
        let text = render_show(&report(mutations));
        assert!(text.contains("Mutations (2)"));
        assert!(text.contains("ID_REMOVED"));
        assert!(text.contains("buy -> -"));
        assert!(text.contains("- -> css-1abc"));
    }

    #[test]
    fn test_report_from_history_uses_latest_snapshot() {
        let mut history = ElementEvolutionHistory::new("abc123", 0);
        let raw = RawElementSnapshot::new("button", "html > body > button").with_id("buy");
        let old = ElementGeneticCode::from_raw("abc123".into(), "#old", raw.clone(), vec![], 0);
        let candidates = vec![
            SelectorCandidate::new(SelectorType::Id, "#buy"),
            SelectorCandidate::new(SelectorType::CssPath, "html > body > button"),
        ];
        let hidden = raw.with_bounding_box(BoundingBox::new(0.0, 0.0, 0.0, 20.0));
        let new = ElementGeneticCode::from_raw("abc123".into(), "#buy", hidden, candidates, 5);
        history.push_snapshot(old, 10);
        history.push_snapshot(new, 10);

        let report = ShowReport::from(&history);
        assert_eq!(report.latest_selector.as_deref(), Some("#buy"));
        assert_eq!(report.best_selector.as_deref(), Some("#buy"));
        assert_eq!(report.visible, Some(false));
        assert_eq!(report.snapshot_count, 2);
        let text = render_show(&report);
        assert!(text
            .lines()
            .any(|l| l.contains("Visible") && l.trim_end().ends_with("no")));
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let json = serde_json::to_value(report(vec![])).unwrap();
        assert_eq!(json["trackingId"], "abc123");
        assert_eq!(json["snapshotCount"], 2);
        assert!(json["mutations"].as_array().unwrap().is_empty());
    }
}
