//! Per-element evolution history.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::genetic_code::ElementGeneticCode;
use crate::mutation::RecordedMutation;
use crate::selector::{SelectorCandidate, SelectorType};
use crate::stability::{StabilitySignal, Trend};

/// Default number of snapshots kept per element
pub const DEFAULT_SNAPSHOT_CAPACITY: usize = 100;

/// Everything learned about one tracked element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementEvolutionHistory {
    /// Tracking id
    pub tracking_id: String,
    /// First capture time
    pub first_seen: u64,
    /// Latest capture time
    pub last_seen: u64,
    /// Snapshots, oldest first
    #[serde(default)]
    pub snapshots: VecDeque<ElementGeneticCode>,
    /// Signal per selector string
    #[serde(default)]
    pub selector_stability: BTreeMap<String, StabilitySignal>,
    /// Mutation log, oldest first
    #[serde(default)]
    pub mutations: Vec<RecordedMutation>,
}

impl ElementEvolutionHistory {
    /// Empty history first seen at `now`
    #[must_use]
    pub fn new(tracking_id: impl Into<String>, now: u64) -> Self {
        Self {
            tracking_id: tracking_id.into(),
            first_seen: now,
            last_seen: now,
            snapshots: VecDeque::new(),
            selector_stability: BTreeMap::new(),
            mutations: Vec::new(),
        }
    }

    /// Most recent snapshot
    #[must_use]
    pub fn latest(&self) -> Option<&ElementGeneticCode> {
        self.snapshots.back()
    }

    /// Append a snapshot, evicting the oldest beyond `capacity`.
    ///
    /// Returns the number of evicted snapshots.
    pub fn push_snapshot(&mut self, code: ElementGeneticCode, capacity: usize) -> usize {
        self.snapshots.push_back(code);
        let mut evicted = 0;
        while self.snapshots.len() > capacity.max(1) {
            self.snapshots.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Penalise every signal whose type the mutation invalidates.
    ///
    /// Returns the number of signals touched.
    pub fn apply_mutation(&mut self, mutation: &RecordedMutation, now: u64) -> usize {
        let mut touched = 0;
        for signal in self.selector_stability.values_mut() {
            if mutation.affects(signal.selector_type) {
                signal.apply_mutation_penalty(now);
                touched += 1;
            }
        }
        touched
    }

    /// Create or refresh the signal of every candidate
    pub fn observe_candidates(&mut self, candidates: &[SelectorCandidate], now: u64) {
        for candidate in candidates {
            self.selector_stability
                .entry(candidate.value.clone())
                .and_modify(|signal| signal.observe(now))
                .or_insert_with(|| StabilitySignal::new(candidate.selector_type, now));
        }
    }

    /// Signals ranked by survival probability, best first
    #[must_use]
    pub fn ranked_selectors(&self) -> Vec<RankedSelector> {
        let mut ranked: Vec<RankedSelector> = self
            .selector_stability
            .iter()
            .map(|(selector, signal)| RankedSelector::from_signal(selector, signal))
            .collect();
        ranked.sort_by(|a, b| b.survival_probability.total_cmp(&a.survival_probability));
        ranked
    }

    /// Mutations that invalidated selectors of `selector_type`
    pub fn mutations_affecting(
        &self,
        selector_type: SelectorType,
    ) -> impl Iterator<Item = &RecordedMutation> {
        self.mutations
            .iter()
            .filter(move |m| m.affects(selector_type))
    }
}

/// One entry of the executor-facing selector ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedSelector {
    /// Selector string
    pub selector: String,
    /// Strategy
    pub selector_type: SelectorType,
    /// Stability score
    pub score: f64,
    /// Survival probability
    pub survival_probability: f64,
    /// Confidence in the score
    pub confidence: f64,
    /// Trend
    pub trend: Trend,
    /// Affecting mutations seen
    pub change_count: u32,
}

impl RankedSelector {
    fn from_signal(selector: &str, signal: &StabilitySignal) -> Self {
        Self {
            selector: selector.to_string(),
            selector_type: signal.selector_type,
            score: signal.score,
            survival_probability: signal.survival_probability(),
            confidence: signal.confidence,
            trend: signal.trend,
            change_count: signal.factors.change_frequency,
        }
    }
}
