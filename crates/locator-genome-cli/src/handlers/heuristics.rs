//! Heuristics command handler

use locator_genome::GlobalHeuristics;

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::handlers::open_store;
use crate::output::{self, Printer};

/// Execute the heuristics command
pub fn execute_heuristics(config: &CliConfig, printer: &Printer) -> CliResult<()> {
    let store = open_store(config)?;
    let heuristics = &store.knowledge().global_heuristics;
    printer.emit(heuristics, render_heuristics)
}

/// Render global heuristics tables as text
#[must_use]
pub fn render_heuristics(heuristics: &GlobalHeuristics) -> String {
    let mut out = output::header("Selector base scores");
    for (selector_type, base) in &heuristics.selector_base_scores {
        let recovery = heuristics
            .recovery_effectiveness
            .get(selector_type)
            .map_or_else(|| "-".to_string(), |r| output::score(*r).to_string());
        out.push_str(&format!(
            "  {:<13} base {}  recovery {recovery}\n",
            selector_type.as_str(),
            output::score(*base),
        ));
    }

    out.push('\n');
    out.push_str(&output::header(&format!(
        "Mutation probabilities ({} diffs)",
        heuristics.diff_count
    )));
    if heuristics.mutation_counts.is_empty() {
        out.push_str("  (no mutations recorded)\n");
    }
    for (mutation_type, count) in &heuristics.mutation_counts {
        out.push_str(&format!(
            "  {:<20} {:>6}  p={:.3}\n",
            mutation_type.as_str(),
            count,
            heuristics.mutation_probability(*mutation_type),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use locator_genome::{MutationType, RecordedMutation, SelectorType};

    #[test]
    fn test_render_defaults() {
        let text = render_heuristics(&GlobalHeuristics::default());
        assert!(text.contains("DATA_TESTID"));
        assert!(text.contains("recovery -"));
        assert!(text.contains("(0 diffs)"));
        assert!(text.contains("(no mutations recorded)"));
    }

    #[test]
    fn test_render_recorded_activity() {
        let mut heuristics = GlobalHeuristics::default();
        heuristics.record_diff(&[RecordedMutation::new(
            MutationType::TextChanged,
            1,
            Some("Buy".to_string()),
            Some("Buy now".to_string()),
        )]);
        heuristics.record_diff(&[]);
        heuristics.record_recovery(SelectorType::Id, true);

        let text = render_heuristics(&heuristics);
        assert!(text.contains("(2 diffs)"));
        assert!(text.contains("TEXT_CHANGED"));
        assert!(text.contains("p=0.500"));
    }
}
