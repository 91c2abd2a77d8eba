//! Evolution history store.
//!
//! Owns the [`PredictionKnowledge`] for one knowledge file, applies captures
//! to it and persists it. Mutating operations set a dirty flag; a successful
//! [`HistoryStore::save`] clears it.
//!
//! Loading never fails: a missing file starts an empty store and a corrupt
//! one is logged and replaced by an empty store on the next save.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::genetic_code::ElementGeneticCode;
use crate::history::{ElementEvolutionHistory, RankedSelector, DEFAULT_SNAPSHOT_CAPACITY};
use crate::knowledge::PredictionKnowledge;
use crate::mutation::{MutationDetector, RecordedMutation};
use crate::result::{GenomeError, GenomeResult};

/// Aggregate numbers over the whole store
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatistics {
    /// Tracked elements
    pub tracked_elements: usize,
    /// Recorded mutations over all elements
    pub total_mutations: usize,
    /// Mean stability score over all signals, 0 when there are none
    pub mean_stability: f64,
    /// Selector signals over all elements
    pub signal_count: usize,
    /// Stored snapshots over all elements
    pub snapshot_count: usize,
}

/// Knowledge base bound to a file
#[derive(Debug)]
pub struct HistoryStore {
    knowledge: PredictionKnowledge,
    path: PathBuf,
    capacity: usize,
    dirty: bool,
    detector: MutationDetector,
}

impl HistoryStore {
    /// Empty store that will save to `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            knowledge: PredictionKnowledge::default(),
            path: path.into(),
            capacity: capacity.max(1),
            dirty: false,
            detector: MutationDetector::new(),
        }
    }

    /// Store loaded from `path`, or empty if the file is missing or unreadable
    #[must_use]
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Self {
        let mut store = Self::new(path, capacity);
        match load_knowledge(&store.path) {
            Ok(Some(knowledge)) => {
                debug!(
                    path = %store.path.display(),
                    elements = knowledge.elements.len(),
                    "knowledge loaded"
                );
                store.knowledge = knowledge;
            }
            Ok(None) => {
                warn!(path = %store.path.display(), "no knowledge file, starting empty");
            }
            Err(e) => {
                warn!(
                    path = %store.path.display(),
                    error = %e,
                    "failed to load knowledge, starting empty"
                );
            }
        }
        store
    }

    /// Knowledge file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshots kept per element
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether there are unsaved changes
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Read-only view of the knowledge
    #[must_use]
    pub const fn knowledge(&self) -> &PredictionKnowledge {
        &self.knowledge
    }

    /// History of one element
    #[must_use]
    pub fn history(&self, tracking_id: &str) -> Option<&ElementEvolutionHistory> {
        self.knowledge.elements.get(tracking_id)
    }

    /// Tracking ids in sorted order
    pub fn tracking_ids(&self) -> impl Iterator<Item = &str> {
        self.knowledge.elements.keys().map(String::as_str)
    }

    /// Number of tracked elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.knowledge.elements.len()
    }

    /// Whether no element is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.knowledge.elements.is_empty()
    }

    /// Apply a new snapshot to the element's history.
    ///
    /// Returns the mutations detected against the previous snapshot; empty
    /// for a first capture or an unchanged element.
    pub fn record_evolution(
        &mut self,
        code: &ElementGeneticCode,
        now: u64,
    ) -> Vec<RecordedMutation> {
        let capacity = self.capacity;
        let detector = self.detector;
        let knowledge = &mut self.knowledge;

        let is_new = !knowledge.elements.contains_key(&code.tracking_id);
        if is_new {
            info!(tracking_id = %code.tracking_id, selector = %code.selector, "tracking new element");
        }
        let history = knowledge
            .elements
            .entry(code.tracking_id.clone())
            .or_insert_with(|| ElementEvolutionHistory::new(code.tracking_id.clone(), now));

        let mutations = history
            .latest()
            .map(|previous| detector.detect(previous, code))
            .unwrap_or_default();
        for mutation in &mutations {
            let touched = history.apply_mutation(mutation, now);
            debug!(
                tracking_id = %code.tracking_id,
                mutation = %mutation.mutation_type,
                signals = touched,
                "mutation recorded"
            );
        }
        history.mutations.extend(mutations.iter().cloned());

        let evicted = history.push_snapshot(code.clone(), capacity);
        if evicted > 0 {
            debug!(tracking_id = %code.tracking_id, evicted, "snapshots evicted");
        }
        history.observe_candidates(&code.selectors, now);
        history.last_seen = history.last_seen.max(now);

        if !is_new {
            knowledge.global_heuristics.record_diff(&mutations);
            for _ in &mutations {
                knowledge.record_temporal(now);
            }
        }
        if let Some(domain) = code.domain.as_deref().filter(|d| !d.is_empty()) {
            knowledge
                .domain_pattern_mut(domain)
                .record_capture(&code.tracking_id, &mutations);
        }

        knowledge.last_updated = knowledge.last_updated.max(now);
        self.dirty = true;
        mutations
    }

    /// A selector located its element. False if element or selector is unknown.
    pub fn record_success(&mut self, tracking_id: &str, selector: &str, now: u64) -> bool {
        self.record_outcome(tracking_id, selector, now, true)
    }

    /// A selector failed to locate its element. False if element or selector is unknown.
    pub fn record_failure(&mut self, tracking_id: &str, selector: &str, now: u64) -> bool {
        self.record_outcome(tracking_id, selector, now, false)
    }

    fn record_outcome(&mut self, tracking_id: &str, selector: &str, now: u64, success: bool) -> bool {
        let Some(signal) = self
            .knowledge
            .elements
            .get_mut(tracking_id)
            .and_then(|h| h.selector_stability.get_mut(selector))
        else {
            debug!(tracking_id, selector, "outcome for unknown selector ignored");
            return false;
        };

        if success {
            signal.record_success(now);
        } else {
            signal.record_failure(now);
        }
        let selector_type = signal.selector_type;
        self.knowledge
            .global_heuristics
            .record_recovery(selector_type, success);
        self.knowledge.last_updated = self.knowledge.last_updated.max(now);
        self.dirty = true;
        true
    }

    /// Aggregate numbers over all elements
    #[must_use]
    pub fn statistics(&self) -> StoreStatistics {
        let mut stats = StoreStatistics {
            tracked_elements: self.knowledge.elements.len(),
            ..StoreStatistics::default()
        };
        let mut score_sum = 0.0;
        for history in self.knowledge.elements.values() {
            stats.total_mutations += history.mutations.len();
            stats.snapshot_count += history.snapshots.len();
            stats.signal_count += history.selector_stability.len();
            score_sum += history
                .selector_stability
                .values()
                .map(|s| s.score)
                .sum::<f64>();
        }
        if stats.signal_count > 0 {
            stats.mean_stability = score_sum / stats.signal_count as f64;
        }
        stats
    }

    /// Selectors of one element ranked by survival probability
    ///
    /// # Errors
    ///
    /// Returns [`GenomeError::UnknownElement`] if nothing is tracked under `tracking_id`
    pub fn ranked_selectors(&self, tracking_id: &str) -> GenomeResult<Vec<RankedSelector>> {
        self.history(tracking_id)
            .map(ElementEvolutionHistory::ranked_selectors)
            .ok_or_else(|| GenomeError::unknown_element(tracking_id))
    }

    /// Write the knowledge file.
    ///
    /// Writes to a sibling temp file and renames it over the target. The dirty
    /// flag is cleared only on success.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory, temp file or rename fails
    pub fn save(&mut self) -> GenomeResult<()> {
        let json = serde_json::to_string_pretty(&self.knowledge)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = temp_path(&self.path);
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        self.dirty = false;
        info!(
            path = %self.path.display(),
            elements = self.knowledge.elements.len(),
            "knowledge saved"
        );
        Ok(())
    }

    /// Save if dirty, logging instead of returning errors.
    ///
    /// Returns whether a save happened.
    pub fn flush_if_dirty(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        match self.save() {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "knowledge flush failed");
                false
            }
        }
    }
}

/// Read a knowledge file. `Ok(None)` if it does not exist.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid knowledge JSON
pub fn load_knowledge(path: &Path) -> GenomeResult<Option<PredictionKnowledge>> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let knowledge: PredictionKnowledge = serde_json::from_str(&json)?;
    Ok(Some(knowledge))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_KNOWLEDGE_PATH, DEFAULT_SNAPSHOT_CAPACITY)
    }
}
