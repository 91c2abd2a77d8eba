//! Selector candidates and the extractor that derives them from a raw snapshot.
//!
//! # Design Philosophy
//!
//! - **Many candidates**: every capture records every locator strategy the
//!   element supports, not just the one the test used
//! - **Durability first**: candidates are ranked by survival probability, seeded
//!   from a fixed per-type table and refined by recorded history
//! - **Tunable class filter**: framework-generated class names are rejected by
//!   an overridable [`ClassNameFilter`]

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::genetic_code::RawElementSnapshot;
use crate::history::ElementEvolutionHistory;
use crate::result::{GenomeError, GenomeResult};
use crate::stability::calculate_survival_probability;

/// Maximum text length for a text-content selector (exclusive)
pub const MAX_TEXT_SELECTOR_CHARS: usize = 50;

/// Default generated-class patterns (CSS-in-JS hashes, underscores, digits)
pub const DEFAULT_GENERATED_CLASS_PATTERNS: &[&str] = &[
    r"^css-",
    r"^sc-",
    r"^styled-",
    r"^jsx-",
    r"^_",
    r"^[0-9]",
];

/// Locator strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectorType {
    /// `[data-testid="…"]`
    DataTestid,
    /// `[data-cy="…"]`
    DataCy,
    /// `[aria-label="…"]`
    AriaLabel,
    /// `[role="…"]`
    AriaRole,
    /// `[name="…"]`
    Name,
    /// `#id`
    Id,
    /// `text="…"`
    TextContent,
    /// `.class`
    Class,
    /// `tag:nth-child(n)`
    NthChild,
    /// Structural CSS path
    CssPath,
    /// XPath expression
    Xpath,
}

impl SelectorType {
    /// All selector types, most durable first
    pub const ALL: [Self; 11] = [
        Self::DataTestid,
        Self::DataCy,
        Self::AriaLabel,
        Self::AriaRole,
        Self::Name,
        Self::Id,
        Self::TextContent,
        Self::Class,
        Self::NthChild,
        Self::CssPath,
        Self::Xpath,
    ];

    /// Base durability score (higher = more durable)
    #[must_use]
    pub const fn base_score(self) -> f64 {
        match self {
            Self::DataTestid => 0.95,
            Self::DataCy => 0.93,
            Self::AriaLabel => 0.88,
            Self::AriaRole => 0.85,
            Self::Name => 0.75,
            Self::Id => 0.70,
            Self::TextContent => 0.50,
            Self::Class => 0.40,
            Self::NthChild => 0.30,
            Self::CssPath => 0.25,
            Self::Xpath => 0.20,
        }
    }

    /// Constant specificity for the type
    #[must_use]
    pub const fn specificity(self) -> u32 {
        match self {
            Self::Id => 100,
            Self::DataTestid
            | Self::DataCy
            | Self::AriaLabel
            | Self::AriaRole
            | Self::Name
            | Self::TextContent
            | Self::Class => 10,
            Self::NthChild | Self::CssPath | Self::Xpath => 1,
        }
    }

    /// Wire name, e.g. `DATA_TESTID`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DataTestid => "DATA_TESTID",
            Self::DataCy => "DATA_CY",
            Self::AriaLabel => "ARIA_LABEL",
            Self::AriaRole => "ARIA_ROLE",
            Self::Name => "NAME",
            Self::Id => "ID",
            Self::TextContent => "TEXT_CONTENT",
            Self::Class => "CLASS",
            Self::NthChild => "NTH_CHILD",
            Self::CssPath => "CSS_PATH",
            Self::Xpath => "XPATH",
        }
    }
}

impl fmt::Display for SelectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One candidate locator for an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorCandidate {
    /// Strategy
    #[serde(rename = "type")]
    pub selector_type: SelectorType,
    /// Selector string
    pub value: String,
    /// Type-determined specificity
    pub specificity: u32,
    /// Learned stability (0-1)
    pub stability: f64,
    /// Number of recorded changes affecting this selector
    pub change_count: u32,
    /// Forward-looking survival estimate (0-1)
    pub survival_probability: f64,
    /// Last time a mutation penalised this selector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_change_timestamp: Option<u64>,
}

impl SelectorCandidate {
    /// Fresh candidate seeded from the type's base score
    #[must_use]
    pub fn new(selector_type: SelectorType, value: impl Into<String>) -> Self {
        let base = selector_type.base_score();
        Self {
            selector_type,
            value: value.into(),
            specificity: selector_type.specificity(),
            stability: base,
            change_count: 0,
            survival_probability: base,
            last_change_timestamp: None,
        }
    }
}

/// Predicate deciding whether a class name was generated by a framework
pub trait ClassNameFilter: Send + Sync + fmt::Debug {
    /// `true` if the class should not be used as a selector
    fn is_generated(&self, class_name: &str) -> bool;
}

/// Regex-backed [`ClassNameFilter`]
#[derive(Debug, Clone)]
pub struct GeneratedClassFilter {
    patterns: Vec<Regex>,
}

impl GeneratedClassFilter {
    /// Filter with the default patterns
    #[must_use]
    pub fn new() -> Self {
        let patterns = DEFAULT_GENERATED_CLASS_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        Self { patterns }
    }

    /// Filter with exactly the given patterns
    ///
    /// # Errors
    ///
    /// Returns [`GenomeError::Config`] if a pattern is not a valid regex
    pub fn from_patterns<I, S>(patterns: I) -> GenomeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| compile_pattern(p.as_ref()))
            .collect::<GenomeResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Add one more pattern to the filter
    ///
    /// # Errors
    ///
    /// Returns [`GenomeError::Config`] if the pattern is not a valid regex
    pub fn with_pattern(mut self, pattern: &str) -> GenomeResult<Self> {
        self.patterns.push(compile_pattern(pattern)?);
        Ok(self)
    }

    /// Number of active patterns
    #[must_use]
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

fn compile_pattern(pattern: &str) -> GenomeResult<Regex> {
    Regex::new(pattern)
        .map_err(|e| GenomeError::config(format!("invalid class pattern {pattern:?}: {e}")))
}

impl Default for GeneratedClassFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassNameFilter for GeneratedClassFilter {
    fn is_generated(&self, class_name: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(class_name))
    }
}

/// Derives ranked selector candidates from raw snapshots
#[derive(Debug)]
pub struct SelectorExtractor {
    class_filter: Box<dyn ClassNameFilter>,
}

impl Default for SelectorExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectorExtractor {
    /// Extractor with the default generated-class filter
    #[must_use]
    pub fn new() -> Self {
        Self {
            class_filter: Box::new(GeneratedClassFilter::new()),
        }
    }

    /// Extractor with a custom class filter
    #[must_use]
    pub fn with_class_filter(filter: impl ClassNameFilter + 'static) -> Self {
        Self {
            class_filter: Box::new(filter),
        }
    }

    /// First class name not rejected by the filter
    #[must_use]
    pub fn stable_class<'a>(&self, classes: &'a [String]) -> Option<&'a str> {
        classes
            .iter()
            .map(String::as_str)
            .find(|c| !c.is_empty() && !self.class_filter.is_generated(c))
    }

    /// Build candidates for a snapshot, refined by `history` when the element
    /// has been seen before, sorted by descending survival probability.
    #[must_use]
    pub fn extract(
        &self,
        raw: &RawElementSnapshot,
        history: Option<&ElementEvolutionHistory>,
    ) -> Vec<SelectorCandidate> {
        let mut candidates = self.generate(raw);

        if let Some(history) = history {
            for candidate in &mut candidates {
                if let Some(signal) = history.selector_stability.get(&candidate.value) {
                    candidate.stability = signal.score;
                    candidate.change_count = signal.factors.change_frequency;
                    candidate.survival_probability =
                        calculate_survival_probability(candidate, signal);
                    candidate.last_change_timestamp = signal.last_changed;
                }
            }
        }

        candidates.sort_by(|a, b| b.survival_probability.total_cmp(&a.survival_probability));
        candidates
    }

    fn generate(&self, raw: &RawElementSnapshot) -> Vec<SelectorCandidate> {
        let attrs = &raw.attributes;
        let pos = &raw.position;
        let mut out = Vec::with_capacity(10);

        if let Some(id) = attrs.id() {
            out.push(SelectorCandidate::new(SelectorType::Id, format!("#{id}")));
        }
        if let Some(v) = attrs.data_testid() {
            out.push(attribute_candidate(SelectorType::DataTestid, "data-testid", v));
        }
        if let Some(v) = attrs.data_cy() {
            out.push(attribute_candidate(SelectorType::DataCy, "data-cy", v));
        }
        if let Some(v) = attrs.aria_label() {
            out.push(attribute_candidate(SelectorType::AriaLabel, "aria-label", v));
        }
        if let Some(v) = attrs.role() {
            out.push(attribute_candidate(SelectorType::AriaRole, "role", v));
        }
        if let Some(v) = attrs.name() {
            out.push(attribute_candidate(SelectorType::Name, "name", v));
        }
        if let Some(class) = self.stable_class(&attrs.class_list) {
            out.push(SelectorCandidate::new(SelectorType::Class, format!(".{class}")));
        }

        let css_path = if pos.path.is_empty() {
            pos.tag_name.clone()
        } else {
            pos.path.clone()
        };
        out.push(SelectorCandidate::new(SelectorType::CssPath, css_path));

        if let Some(text) = raw.normalized_text() {
            if text.chars().count() < MAX_TEXT_SELECTOR_CHARS {
                out.push(SelectorCandidate::new(
                    SelectorType::TextContent,
                    format!("text=\"{}\"", escape_value(&text)),
                ));
            }
        }

        out.push(SelectorCandidate::new(
            SelectorType::NthChild,
            format!("{}:nth-child({})", pos.tag_name, pos.sibling_index + 1),
        ));

        out
    }
}

fn attribute_candidate(selector_type: SelectorType, attr: &str, value: &str) -> SelectorCandidate {
    SelectorCandidate::new(selector_type, format!("[{attr}=\"{}\"]", escape_value(value)))
}

/// Escape `\` and `"` for use inside a double-quoted selector value
#[must_use]
pub fn escape_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stability::StabilitySignal;

    fn full_button() -> RawElementSnapshot {
        RawElementSnapshot::new("button", "html > body > form > button")
            .with_id("submit")
            .with_data("testid", "submit-btn")
            .with_data("cy", "submit")
            .with_aria("label", "Submit order")
            .with_role("button")
            .with_name("go")
            .with_classes(["css-1x2y3z", "btn-primary"])
            .with_text("Submit")
            .at(2, 3)
    }

    fn types(candidates: &[SelectorCandidate]) -> Vec<SelectorType> {
        candidates.iter().map(|c| c.selector_type).collect()
    }

    // =========================================================================
    // Type table
    // =========================================================================

    #[test]
    fn test_base_scores_descend_in_all_order() {
        let scores: Vec<f64> = SelectorType::ALL.iter().map(|t| t.base_score()).collect();
        assert!(scores.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_specificity_table() {
        assert_eq!(SelectorType::Id.specificity(), 100);
        assert_eq!(SelectorType::DataTestid.specificity(), 10);
        assert_eq!(SelectorType::Class.specificity(), 10);
        assert_eq!(SelectorType::CssPath.specificity(), 1);
        assert_eq!(SelectorType::NthChild.specificity(), 1);
    }

    #[test]
    fn test_selector_type_serde_name() {
        let json = serde_json::to_string(&SelectorType::DataTestid).unwrap();
        assert_eq!(json, "\"DATA_TESTID\"");
        assert_eq!(SelectorType::NthChild.to_string(), "NTH_CHILD");
    }

    // =========================================================================
    // Generated class filter
    // =========================================================================

    #[test]
    fn test_generated_class_filter_defaults() {
        let filter = GeneratedClassFilter::new();
        for generated in ["css-abc123", "sc-bdVaJa", "styled-button", "_hash", "__x", "3col", "jsx-123"] {
            assert!(filter.is_generated(generated), "{generated}");
        }
        for stable in ["btn", "primary", "nav-item", "card_title"] {
            assert!(!filter.is_generated(stable), "{stable}");
        }
    }

    #[test]
    fn test_generated_class_filter_custom_pattern() {
        let filter = GeneratedClassFilter::new().with_pattern("^tw-").unwrap();
        assert!(filter.is_generated("tw-flex"));
        assert_eq!(filter.pattern_count(), DEFAULT_GENERATED_CLASS_PATTERNS.len() + 1);
    }

    #[test]
    fn test_generated_class_filter_invalid_pattern() {
        let err = GeneratedClassFilter::from_patterns(["("]).unwrap_err();
        assert!(matches!(err, GenomeError::Config { .. }));
    }

    #[derive(Debug)]
    struct RejectAll;

    impl ClassNameFilter for RejectAll {
        fn is_generated(&self, _: &str) -> bool {
            true
        }
    }

    #[test]
    fn test_custom_filter_suppresses_class_candidate() {
        let extractor = SelectorExtractor::with_class_filter(RejectAll);
        let candidates = extractor.extract(&full_button(), None);
        assert!(!types(&candidates).contains(&SelectorType::Class));
    }

    // =========================================================================
    // Extraction
    // =========================================================================

    #[test]
    fn test_extract_full_element() {
        let candidates = SelectorExtractor::new().extract(&full_button(), None);
        let values: Vec<&str> = candidates.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(
            values,
            vec![
                "[data-testid=\"submit-btn\"]",
                "[data-cy=\"submit\"]",
                "[aria-label=\"Submit order\"]",
                "[role=\"button\"]",
                "[name=\"go\"]",
                "#submit",
                "text=\"Submit\"",
                ".btn-primary",
                "button:nth-child(3)",
                "html > body > form > button",
            ]
        );
    }

    #[test]
    fn test_extract_minimal_element_always_has_structural() {
        let raw = RawElementSnapshot::new("span", "html > body > span").at(0, 2);
        let candidates = SelectorExtractor::new().extract(&raw, None);
        assert_eq!(
            types(&candidates),
            vec![SelectorType::NthChild, SelectorType::CssPath]
        );
        assert_eq!(candidates[0].value, "span:nth-child(1)");
    }

    #[test]
    fn test_extract_skips_long_text() {
        let raw = RawElementSnapshot::new("p", "body > p").with_text("a".repeat(60));
        let candidates = SelectorExtractor::new().extract(&raw, None);
        assert!(!types(&candidates).contains(&SelectorType::TextContent));
    }

    #[test]
    fn test_extract_escapes_quotes() {
        let raw = RawElementSnapshot::new("a", "body > a").with_aria("label", "say \"hi\"");
        let candidates = SelectorExtractor::new().extract(&raw, None);
        assert!(candidates
            .iter()
            .any(|c| c.value == "[aria-label=\"say \\\"hi\\\"\"]"));
    }

    #[test]
    fn test_extract_only_generated_classes() {
        let raw = RawElementSnapshot::new("div", "body > div").with_classes(["css-1", "sc-2"]);
        let candidates = SelectorExtractor::new().extract(&raw, None);
        assert!(!types(&candidates).contains(&SelectorType::Class));
    }

    #[test]
    fn test_fresh_candidates_seeded_from_base_score() {
        for c in SelectorExtractor::new().extract(&full_button(), None) {
            assert_eq!(c.stability, c.selector_type.base_score());
            assert_eq!(c.survival_probability, c.selector_type.base_score());
            assert_eq!(c.specificity, c.selector_type.specificity());
            assert_eq!(c.change_count, 0);
        }
    }

    #[test]
    fn test_history_overrides_and_reranks() {
        let raw = full_button();
        let mut history = ElementEvolutionHistory::new("t", 0);
        let mut signal = StabilitySignal::new(SelectorType::DataTestid, 0);
        for _ in 0..8 {
            signal.apply_mutation_penalty(1_000);
        }
        history
            .selector_stability
            .insert("[data-testid=\"submit-btn\"]".to_string(), signal.clone());

        let candidates = SelectorExtractor::new().extract(&raw, Some(&history));
        let testid = candidates
            .iter()
            .find(|c| c.selector_type == SelectorType::DataTestid)
            .unwrap();
        assert_eq!(testid.stability, signal.score);
        assert_eq!(testid.change_count, 8);
        assert_eq!(testid.last_change_timestamp, Some(1_000));
        assert!(testid.survival_probability < SelectorType::DataTestid.base_score());
        assert_ne!(candidates[0].selector_type, SelectorType::DataTestid);
        assert!(candidates
            .windows(2)
            .all(|w| w[0].survival_probability >= w[1].survival_probability));
    }
}
