//! Cross-element knowledge: the persisted root plus domain, global and
//! temporal aggregates.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::history::ElementEvolutionHistory;
use crate::mutation::{MutationType, RecordedMutation};
use crate::selector::SelectorType;

/// Knowledge file format version
pub const KNOWLEDGE_VERSION: u32 = 1;

/// Smoothing factor for recovery effectiveness
pub const RECOVERY_EMA_ALPHA: f64 = 0.1;

/// Root of the knowledge file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionKnowledge {
    /// Format version
    pub version: u32,
    /// Last modification time
    #[serde(default)]
    pub last_updated: u64,
    /// History per tracking id
    #[serde(default)]
    pub elements: BTreeMap<String, ElementEvolutionHistory>,
    /// Aggregates per page host
    #[serde(default)]
    pub domain_patterns: BTreeMap<String, DomainPattern>,
    /// Aggregates over every element
    #[serde(default)]
    pub global_heuristics: GlobalHeuristics,
    /// Mutations per UTC hour, sorted by hour
    #[serde(default)]
    pub temporal_patterns: Vec<TemporalPattern>,
}

impl Default for PredictionKnowledge {
    fn default() -> Self {
        Self {
            version: KNOWLEDGE_VERSION,
            last_updated: 0,
            elements: BTreeMap::new(),
            domain_patterns: BTreeMap::new(),
            global_heuristics: GlobalHeuristics::default(),
            temporal_patterns: Vec::new(),
        }
    }
}

impl PredictionKnowledge {
    /// Count a mutation in the hour bucket of `now`
    pub fn record_temporal(&mut self, now: u64) {
        let hour = hour_of_day(now);
        match self
            .temporal_patterns
            .binary_search_by_key(&hour, |p| p.hour_of_day)
        {
            Ok(i) => self.temporal_patterns[i].mutation_count += 1,
            Err(i) => self.temporal_patterns.insert(
                i,
                TemporalPattern {
                    hour_of_day: hour,
                    mutation_count: 1,
                },
            ),
        }
    }

    /// Domain pattern for `domain`, created on first use
    pub fn domain_pattern_mut(&mut self, domain: &str) -> &mut DomainPattern {
        self.domain_patterns.entry(domain.to_string()).or_default()
    }
}

/// UTC hour (0-23) of a millisecond timestamp
#[must_use]
pub fn hour_of_day(timestamp_ms: u64) -> u8 {
    i64::try_from(timestamp_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map_or(0, |dt| dt.hour() as u8)
}

/// What was observed on one page host
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainPattern {
    /// Captures taken on the host
    pub captures: u64,
    /// Tracking ids seen on the host
    pub elements: BTreeSet<String>,
    /// Mutations seen on the host, by type
    pub mutation_counts: BTreeMap<MutationType, u64>,
}

impl DomainPattern {
    /// Record one capture of `tracking_id` and the mutations it produced
    pub fn record_capture(&mut self, tracking_id: &str, mutations: &[RecordedMutation]) {
        self.captures += 1;
        if !self.elements.contains(tracking_id) {
            self.elements.insert(tracking_id.to_string());
        }
        for m in mutations {
            *self.mutation_counts.entry(m.mutation_type).or_insert(0) += 1;
        }
    }

    /// Most frequent mutation on this host
    #[must_use]
    pub fn dominant_mutation(&self) -> Option<MutationType> {
        self.mutation_counts
            .iter()
            .max_by_key(|(_, count)| **count)
            .map(|(t, _)| *t)
    }
}

/// Aggregates over every tracked element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalHeuristics {
    /// Base score per selector type
    pub selector_base_scores: BTreeMap<SelectorType, f64>,
    /// Share of diffs that produced each mutation type
    pub mutation_probabilities: BTreeMap<MutationType, f64>,
    /// Smoothed success rate of each selector type when used to locate elements
    pub recovery_effectiveness: BTreeMap<SelectorType, f64>,
    /// Snapshot comparisons performed
    pub diff_count: u64,
    /// Mutations seen, by type
    pub mutation_counts: BTreeMap<MutationType, u64>,
}

impl Default for GlobalHeuristics {
    fn default() -> Self {
        Self {
            selector_base_scores: SelectorType::ALL
                .iter()
                .map(|t| (*t, t.base_score()))
                .collect(),
            mutation_probabilities: BTreeMap::new(),
            recovery_effectiveness: BTreeMap::new(),
            diff_count: 0,
            mutation_counts: BTreeMap::new(),
        }
    }
}

impl GlobalHeuristics {
    /// Count one snapshot comparison and the mutations it produced
    pub fn record_diff(&mut self, mutations: &[RecordedMutation]) {
        self.diff_count += 1;
        for m in mutations {
            *self.mutation_counts.entry(m.mutation_type).or_insert(0) += 1;
        }
        let diffs = self.diff_count as f64;
        self.mutation_probabilities = self
            .mutation_counts
            .iter()
            .map(|(t, count)| (*t, (*count as f64 / diffs).min(1.0)))
            .collect();
    }

    /// Fold one locate outcome into the recovery effectiveness of a type.
    ///
    /// The first outcome moves away from the type's base score.
    pub fn record_recovery(&mut self, selector_type: SelectorType, success: bool) {
        let outcome = if success { 1.0 } else { 0.0 };
        let entry = self
            .recovery_effectiveness
            .entry(selector_type)
            .or_insert_with(|| selector_type.base_score());
        *entry = (*entry * (1.0 - RECOVERY_EMA_ALPHA) + outcome * RECOVERY_EMA_ALPHA).clamp(0.0, 1.0);
    }

    /// Share of diffs that produced `mutation_type`
    #[must_use]
    pub fn mutation_probability(&self, mutation_type: MutationType) -> f64 {
        self.mutation_probabilities
            .get(&mutation_type)
            .copied()
            .unwrap_or(0.0)
    }
}

/// Mutations observed in one UTC hour of the day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalPattern {
    /// Hour of day, 0-23
    pub hour_of_day: u8,
    /// Mutations recorded in that hour
    pub mutation_count: u64,
}
