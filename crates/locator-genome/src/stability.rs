//! Stability scoring for selector signals.
//!
//! Two scores are kept per selector, each with its own formula:
//!
//! - [`recalc_stability_score`]: how reliable the selector has been
//!   (floor 0.1, change penalty 0.15 per change)
//! - [`calculate_survival_probability`]: how likely it is to keep working
//!   (no floor, change penalty 0.1 per change, rewards long quiet periods)
//!
//! All functions here are total and never fail.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clock::days_between;
use crate::selector::{SelectorCandidate, SelectorType};

/// Lowest stability score a signal can reach
pub const MIN_STABILITY_SCORE: f64 = 0.1;

/// Confidence assigned to a freshly created signal
pub const INITIAL_CONFIDENCE: f64 = 0.5;

/// Confidence gained each time a selector is seen again
pub const CONFIDENCE_STEP: f64 = 0.01;

/// Coarse classification of a selector's recent change behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    /// Long quiet period with few changes
    Improving,
    /// Nothing notable
    #[default]
    Stable,
    /// Several recent changes
    Degrading,
    /// Many very recent changes
    Volatile,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Improving => "IMPROVING",
            Self::Stable => "STABLE",
            Self::Degrading => "DEGRADING",
            Self::Volatile => "VOLATILE",
        };
        f.write_str(name)
    }
}

/// Inputs to the scoring formulas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilityFactors {
    /// Number of mutations that affected this selector's type
    pub change_frequency: u32,
    /// Days since the last affecting mutation
    pub days_since_last_change: f64,
    /// Base score of the selector type
    pub type_base_score: f64,
    /// Times the selector was seen or reported working
    pub success_count: u32,
    /// Times the selector was reported broken
    pub failure_count: u32,
    /// Per-domain correction (reserved, 0 by default)
    #[serde(default)]
    pub domain_adjustment: f64,
    /// Influence of similar selectors on other elements (reserved, 0 by default)
    #[serde(default)]
    pub peer_influence: f64,
}

impl StabilityFactors {
    /// Factors for a selector seen once, never changed
    #[must_use]
    pub fn seeded(selector_type: SelectorType) -> Self {
        Self {
            change_frequency: 0,
            days_since_last_change: 0.0,
            type_base_score: selector_type.base_score(),
            success_count: 1,
            failure_count: 0,
            domain_adjustment: 0.0,
            peer_influence: 0.0,
        }
    }

    /// `success / max(1, success + failure)`
    #[must_use]
    pub fn success_ratio(&self) -> f64 {
        let total = self.success_count.saturating_add(self.failure_count).max(1);
        f64::from(self.success_count) / f64::from(total)
    }
}

/// Learned stability of one selector string within one element's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilitySignal {
    /// Strategy of the selector
    pub selector_type: SelectorType,
    /// Current stability score (0.1-1)
    pub score: f64,
    /// Confidence in the score (0-1)
    pub confidence: f64,
    /// Scoring inputs
    pub factors: StabilityFactors,
    /// Trend classification
    pub trend: Trend,
    /// Last time any field changed (ms since epoch)
    pub last_updated: u64,
    /// Last time a mutation penalised this selector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_changed: Option<u64>,
    /// Last capture or mutation that advanced the recency clock.
    /// Outcome reports leave it alone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_observed: Option<u64>,
}

impl StabilitySignal {
    /// New signal for a selector seen for the first time at `now`
    #[must_use]
    pub fn new(selector_type: SelectorType, now: u64) -> Self {
        let mut signal = Self {
            selector_type,
            score: selector_type.base_score(),
            confidence: INITIAL_CONFIDENCE,
            factors: StabilityFactors::seeded(selector_type),
            trend: Trend::Stable,
            last_updated: now,
            last_changed: None,
            last_observed: Some(now),
        };
        signal.refresh();
        signal
    }

    /// Recompute score and trend from the current factors
    pub fn refresh(&mut self) {
        self.score = recalc_stability_score(self);
        self.trend = classify_trend(self);
    }

    /// The selector was seen again in a capture
    pub fn observe(&mut self, now: u64) {
        let anchor = self.last_observed.unwrap_or(self.last_updated);
        self.factors.success_count = self.factors.success_count.saturating_add(1);
        self.factors.days_since_last_change += days_between(anchor, now);
        self.last_observed = Some(anchor.max(now));
        self.confidence = (self.confidence + CONFIDENCE_STEP).min(1.0);
        self.last_updated = self.last_updated.max(now);
        self.refresh();
    }

    /// The selector located its element
    pub fn record_success(&mut self, now: u64) {
        self.factors.success_count = self.factors.success_count.saturating_add(1);
        self.last_updated = self.last_updated.max(now);
        self.refresh();
    }

    /// The selector failed to locate its element
    pub fn record_failure(&mut self, now: u64) {
        self.factors.failure_count = self.factors.failure_count.saturating_add(1);
        self.last_updated = self.last_updated.max(now);
        self.refresh();
    }

    /// A detected mutation invalidated this selector's type
    pub fn apply_mutation_penalty(&mut self, now: u64) {
        self.factors.change_frequency = self.factors.change_frequency.saturating_add(1);
        self.factors.days_since_last_change = 0.0;
        self.last_changed = Some(now);
        self.last_observed = Some(now);
        self.last_updated = self.last_updated.max(now);
        self.refresh();
    }

    /// Survival probability of this signal's own selector
    #[must_use]
    pub fn survival_probability(&self) -> f64 {
        survival_from_factors(self.factors.type_base_score, &self.factors)
    }
}

/// Stability score: `clamp(0.1, 1, base*0.4 + changePenalty*0.3 + recency*0.15 + successRatio*0.15)`
#[must_use]
pub fn recalc_stability_score(signal: &StabilitySignal) -> f64 {
    let f = &signal.factors;
    let change_penalty = (1.0 - f64::from(f.change_frequency) * 0.15).max(0.0);
    let recency_penalty = if f.days_since_last_change < 7.0 {
        0.8
    } else {
        1.0
    };
    let raw = f.type_base_score * 0.4
        + change_penalty * 0.3
        + recency_penalty * 0.15
        + f.success_ratio() * 0.15;
    raw.clamp(MIN_STABILITY_SCORE, 1.0)
}

/// Survival probability: `clamp(0, 1, base*0.40 + changePenalty*0.25 + recencyBonus*0.20 + successRatio*0.15)`.
///
/// The base score is the signal's when the candidate shares its type,
/// otherwise the candidate type's table value.
#[must_use]
pub fn calculate_survival_probability(
    candidate: &SelectorCandidate,
    signal: &StabilitySignal,
) -> f64 {
    let base = if candidate.selector_type == signal.selector_type {
        signal.factors.type_base_score
    } else {
        candidate.selector_type.base_score()
    };
    survival_from_factors(base, &signal.factors)
}

fn survival_from_factors(base: f64, f: &StabilityFactors) -> f64 {
    let change_penalty = (1.0 - f64::from(f.change_frequency) * 0.1).max(0.0);
    let recency_bonus = (f.days_since_last_change / 30.0).min(1.0);
    let raw = base * 0.40 + change_penalty * 0.25 + recency_bonus * 0.20 + f.success_ratio() * 0.15;
    raw.clamp(0.0, 1.0)
}

/// Trend from change frequency and recency
#[must_use]
pub fn classify_trend(signal: &StabilitySignal) -> Trend {
    let freq = signal.factors.change_frequency;
    let days = signal.factors.days_since_last_change;
    if freq > 5 && days < 7.0 {
        Trend::Volatile
    } else if freq > 3 && days < 14.0 {
        Trend::Degrading
    } else if days > 30.0 && freq < 2 {
        Trend::Improving
    } else {
        Trend::Stable
    }
}
