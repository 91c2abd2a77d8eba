//! Rank command handler

use locator_genome::RankedSelector;
use serde::Serialize;

use crate::commands::RankArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::handlers::open_store;
use crate::output::{self, Printer};

/// Selector ranking of one element
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankReport {
    /// Tracking id
    pub tracking_id: String,
    /// Selectors with a signal before the limit was applied
    pub total: usize,
    /// Best first
    pub selectors: Vec<RankedSelector>,
}

impl RankReport {
    /// Ranking cut to at most `limit` entries
    #[must_use]
    pub fn new(
        tracking_id: impl Into<String>,
        mut selectors: Vec<RankedSelector>,
        limit: Option<usize>,
    ) -> Self {
        let total = selectors.len();
        if let Some(limit) = limit {
            selectors.truncate(limit);
        }
        Self {
            tracking_id: tracking_id.into(),
            total,
            selectors,
        }
    }
}

/// Execute the rank command
pub fn execute_rank(config: &CliConfig, printer: &Printer, args: &RankArgs) -> CliResult<()> {
    if args.limit == Some(0) {
        return Err(CliError::invalid_argument("--limit must be at least 1"));
    }
    let store = open_store(config)?;
    let ranked = store.ranked_selectors(&args.tracking_id)?;
    let report = RankReport::new(&args.tracking_id, ranked, args.limit);
    printer.emit(&report, render_ranking)
}

/// Render a ranking as a text table
#[must_use]
pub fn render_ranking(report: &RankReport) -> String {
    let mut out = output::header(&format!(
        "Selectors for {} ({} of {})",
        report.tracking_id,
        report.selectors.len(),
        report.total
    ));
    out.push_str(&format!(
        "  {:>2}  {:<40} {:<13} {:>8} {:>8}  {:<10} {}\n",
        "#", "SELECTOR", "TYPE", "SURVIVAL", "SCORE", "TREND", "CHANGES"
    ));
    for (i, r) in report.selectors.iter().enumerate() {
        out.push_str(&format!(
            "  {:>2}  {:<40} {:<13} {:>8} {:>8}  {:<10} {}\n",
            i + 1,
            r.selector,
            r.selector_type.as_str(),
            output::score(r.survival_probability),
            output::score(r.score),
            output::trend(r.trend),
            r.change_count,
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use locator_genome::{SelectorType, Trend};

    fn ranked(selector: &str, selector_type: SelectorType, survival: f64) -> RankedSelector {
        RankedSelector {
            selector: selector.to_string(),
            selector_type,
            score: survival,
            survival_probability: survival,
            confidence: 0.5,
            trend: Trend::Stable,
            change_count: 0,
        }
    }

    fn sample() -> Vec<RankedSelector> {
        vec![
            ranked("[data-testid=\"buy\"]", SelectorType::DataTestid, 0.95),
            ranked("#buy", SelectorType::Id, 0.85),
            ranked(".cta", SelectorType::Class, 0.5),
        ]
    }

    #[test]
    fn test_limit_truncates_but_keeps_total() {
        let report = RankReport::new("abc", sample(), Some(2));
        assert_eq!(report.total, 3);
        assert_eq!(report.selectors.len(), 2);
        assert_eq!(report.selectors[1].selector, "#buy");
    }

    #[test]
    fn test_no_limit_keeps_everything() {
        let report = RankReport::new("abc", sample(), None);
        assert_eq!(report.selectors.len(), 3);
    }

    #[test]
    fn test_render_table() {
        let text = render_ranking(&RankReport::new("abc", sample(), Some(2)));
        assert!(text.contains("Selectors for abc (2 of 3)"));
        assert!(text.contains("SURVIVAL"));
        assert!(text.contains("[data-testid=\"buy\"]"));
        assert!(text.contains("DATA_TESTID"));
        assert!(text.contains("0.950"));
        assert!(!text.contains(".cta"));
    }
}
