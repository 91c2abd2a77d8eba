//! Evolution tracker facade.
//!
//! Ties extraction, detection, scoring and persistence together behind one
//! owned handle. Create one per knowledge file and pass it around; there is
//! no global instance.
//!
//! ```no_run
//! use locator_genome::prelude::*;
//!
//! # async fn demo(source: &MockElementSource) -> GenomeResult<()> {
//! let tracker = EvolutionTracker::new(TrackerConfig::default())?;
//! let code = tracker.capture(source, "#checkout").await?;
//! for candidate in &code.selectors {
//!     println!("{} {:.2}", candidate.value, candidate.survival_probability);
//! }
//! tracker.dispose()?;
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::autosave::{lock_store, spawn_autosave, AutosaveHandle, SharedStore};
use crate::clock::{SharedClock, SystemClock};
use crate::config::TrackerConfig;
use crate::events::TrackerEvent;
use crate::genetic_code::{ElementGeneticCode, RawElementSnapshot};
use crate::history::{ElementEvolutionHistory, RankedSelector};
use crate::knowledge::GlobalHeuristics;
use crate::mutation::RecordedMutation;
use crate::result::{GenomeError, GenomeResult};
use crate::selector::SelectorExtractor;
use crate::source::ElementSource;
use crate::store::{HistoryStore, StoreStatistics};

/// Records element snapshots and learns which selectors survive
#[derive(Debug)]
pub struct EvolutionTracker {
    store: SharedStore,
    extractor: SelectorExtractor,
    clock: SharedClock,
    config: TrackerConfig,
    events: broadcast::Sender<TrackerEvent>,
}

impl EvolutionTracker {
    /// Tracker on the system clock, loading `config.knowledge_path`
    ///
    /// # Errors
    ///
    /// Returns [`GenomeError::Config`] if the configuration is invalid
    pub fn new(config: TrackerConfig) -> GenomeResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Tracker on an injected clock
    ///
    /// # Errors
    ///
    /// Returns [`GenomeError::Config`] if the configuration is invalid
    pub fn with_clock(config: TrackerConfig, clock: SharedClock) -> GenomeResult<Self> {
        config.validate()?;
        let store = HistoryStore::open(&config.knowledge_path, config.snapshot_capacity);
        Self::from_parts(config, store, clock)
    }

    /// Tracker over an already opened store
    ///
    /// # Errors
    ///
    /// Returns [`GenomeError::Config`] if the configuration is invalid
    pub fn from_parts(
        config: TrackerConfig,
        store: HistoryStore,
        clock: SharedClock,
    ) -> GenomeResult<Self> {
        config.validate()?;
        let extractor = SelectorExtractor::with_class_filter(config.class_filter()?);
        let (events, _) = broadcast::channel(config.event_capacity);
        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            extractor,
            clock,
            config,
            events,
        })
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Shared handle to the underlying store
    #[must_use]
    pub fn store(&self) -> SharedStore {
        Arc::clone(&self.store)
    }

    /// Look up `selector` through `source` and record what it resolves to
    ///
    /// # Errors
    ///
    /// - [`GenomeError::ElementNotFound`] if nothing matches
    /// - [`GenomeError::Timeout`] if the source exceeds the capture timeout
    /// - any error the source reports
    pub async fn capture(
        &self,
        source: &dyn ElementSource,
        selector: &str,
    ) -> GenomeResult<ElementGeneticCode> {
        let timeout = self.config.capture_timeout();
        let raw = match tokio::time::timeout(timeout, source.snapshot(selector)).await {
            Ok(Ok(Some(raw))) => raw,
            Ok(Ok(None)) => return Err(GenomeError::element_not_found(selector)),
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                warn!(selector, timeout_ms = self.config.capture_timeout_ms, "capture timed out");
                return Err(GenomeError::Timeout {
                    ms: self.config.capture_timeout_ms,
                });
            }
        };
        Ok(self.capture_snapshot(selector, raw))
    }

    /// Record a snapshot obtained elsewhere, deriving its tracking id
    pub fn capture_snapshot(&self, selector: &str, raw: RawElementSnapshot) -> ElementGeneticCode {
        let tracking_id = raw.tracking_id();
        self.capture_tracked(tracking_id, selector, raw)
    }

    /// Record a snapshot under a caller-chosen tracking id.
    ///
    /// Use this when an element's identity fields change but it is known to
    /// be the same element.
    pub fn capture_tracked(
        &self,
        tracking_id: impl Into<String>,
        selector: &str,
        raw: RawElementSnapshot,
    ) -> ElementGeneticCode {
        self.capture_tracked_with_mutations(tracking_id, selector, raw).0
    }

    /// [`capture_tracked`](Self::capture_tracked), also returning the mutations
    /// detected against the previous snapshot
    pub fn capture_tracked_with_mutations(
        &self,
        tracking_id: impl Into<String>,
        selector: &str,
        raw: RawElementSnapshot,
    ) -> (ElementGeneticCode, Vec<RecordedMutation>) {
        let tracking_id = tracking_id.into();
        let now = self.clock.now_ms();

        let (code, mutations) = {
            let mut store = lock_store(&self.store);
            let selectors = self.extractor.extract(&raw, store.history(&tracking_id));
            let code = ElementGeneticCode::from_raw(tracking_id, selector, raw, selectors, now);
            let mutations = store.record_evolution(&code, now);
            (code, mutations)
        };

        debug!(
            tracking_id = %code.tracking_id,
            selector,
            candidates = code.selectors.len(),
            mutations = mutations.len(),
            "genetic code captured"
        );
        self.emit(TrackerEvent::GeneticCodeCaptured {
            tracking_id: code.tracking_id.clone(),
            selector: selector.to_string(),
            candidate_count: code.selectors.len(),
        });
        if !mutations.is_empty() {
            self.emit(TrackerEvent::MutationDetected {
                tracking_id: code.tracking_id.clone(),
                mutations: mutations.clone(),
            });
            for mutation in &mutations {
                self.emit(TrackerEvent::MutationRecorded {
                    tracking_id: code.tracking_id.clone(),
                    mutation: mutation.clone(),
                });
            }
        }
        (code, mutations)
    }

    /// Report that `selector` located the element
    pub fn record_success(&self, tracking_id: &str, selector: &str) -> bool {
        let now = self.clock.now_ms();
        lock_store(&self.store).record_success(tracking_id, selector, now)
    }

    /// Report that `selector` failed to locate the element
    pub fn record_failure(&self, tracking_id: &str, selector: &str) -> bool {
        let now = self.clock.now_ms();
        lock_store(&self.store).record_failure(tracking_id, selector, now)
    }

    /// Copy of one element's history
    #[must_use]
    pub fn history(&self, tracking_id: &str) -> Option<ElementEvolutionHistory> {
        lock_store(&self.store).history(tracking_id).cloned()
    }

    /// Copies of every element's history
    #[must_use]
    pub fn all_elements(&self) -> Vec<ElementEvolutionHistory> {
        lock_store(&self.store)
            .knowledge()
            .elements
            .values()
            .cloned()
            .collect()
    }

    /// Aggregate numbers over the store
    #[must_use]
    pub fn statistics(&self) -> StoreStatistics {
        lock_store(&self.store).statistics()
    }

    /// Copy of the global heuristics
    #[must_use]
    pub fn global_heuristics(&self) -> GlobalHeuristics {
        lock_store(&self.store).knowledge().global_heuristics.clone()
    }

    /// Selectors of one element ranked by survival probability
    ///
    /// # Errors
    ///
    /// Returns [`GenomeError::UnknownElement`] if the element is not tracked
    pub fn ranked_selectors(&self, tracking_id: &str) -> GenomeResult<Vec<RankedSelector>> {
        lock_store(&self.store).ranked_selectors(tracking_id)
    }

    /// Receive every event emitted from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.events.subscribe()
    }

    /// Write the knowledge file unconditionally
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails; the store stays dirty
    pub fn save(&self) -> GenomeResult<()> {
        lock_store(&self.store).save()
    }

    /// Write the knowledge file if there are unsaved changes
    pub fn flush(&self) -> bool {
        lock_store(&self.store).flush_if_dirty()
    }

    /// Flush periodically on the configured interval, timed by the tracker's clock.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn_autosave(&self) -> AutosaveHandle {
        spawn_autosave(self.store(), self.clock.clone(), self.config.flush_interval())
    }

    /// Save pending changes and release the tracker
    ///
    /// # Errors
    ///
    /// Returns an error if the final save fails
    pub fn dispose(self) -> GenomeResult<()> {
        let mut store = lock_store(&self.store);
        if store.is_dirty() {
            store.save()?;
        }
        debug!(path = %store.path().display(), "tracker disposed");
        Ok(())
    }

    fn emit(&self, event: TrackerEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FakeClock, DAY_MS};
    use crate::mutation::MutationType;
    use crate::selector::SelectorType;
    use crate::source::MockElementSource;
    use std::time::Duration;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> TrackerConfig {
        TrackerConfig::default().with_knowledge_path(dir.path().join("knowledge.json"))
    }

    fn tracker(dir: &TempDir, clock: Arc<FakeClock>) -> EvolutionTracker {
        EvolutionTracker::with_clock(config(dir), clock).unwrap()
    }

    fn checkout() -> RawElementSnapshot {
        RawElementSnapshot::new("button", "html > body > form > button")
            .with_id("checkout")
            .with_classes(["btn", "css-9x8y7z"])
            .with_data("testid", "checkout-btn")
            .with_text("Checkout")
            .at(2, 3)
    }

    // =========================================================================
    // Capture
    // =========================================================================

    #[tokio::test]
    async fn test_capture_records_new_element() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir, FakeClock::shared(1_000));
        let source = MockElementSource::new();
        source.set_element("#checkout", checkout());

        let code = tracker.capture(&source, "#checkout").await.unwrap();
        assert_eq!(code.tracking_id, checkout().tracking_id());
        assert_eq!(code.timestamp, 1_000);
        assert_eq!(code.selectors[0].selector_type, SelectorType::DataTestid);
        assert!(code.selectors.iter().all(|c| c.value != ".css-9x8y7z"));

        let history = tracker.history(&code.tracking_id).unwrap();
        assert_eq!(history.snapshots.len(), 1);
        assert_eq!(tracker.statistics().tracked_elements, 1);
    }

    #[tokio::test]
    async fn test_capture_not_found() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir, FakeClock::shared(0));
        let source = MockElementSource::new();
        let err = tracker.capture(&source, "#gone").await.unwrap_err();
        assert!(matches!(err, GenomeError::ElementNotFound { ref selector } if selector == "#gone"));
        assert!(tracker.all_elements().is_empty());
    }

    #[tokio::test]
    async fn test_capture_source_error_propagates() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir, FakeClock::shared(0));
        let source = MockElementSource::new();
        source.set_failure(Some("target closed".into()));
        assert!(matches!(
            tracker.capture(&source, "#checkout").await,
            Err(GenomeError::Source { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_times_out() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir).with_capture_timeout_ms(100);
        let tracker = EvolutionTracker::with_clock(config, FakeClock::shared(0)).unwrap();
        let source = MockElementSource::new().with_delay(Duration::from_secs(1));
        source.set_element("#checkout", checkout());

        let err = tracker.capture(&source, "#checkout").await.unwrap_err();
        assert!(matches!(err, GenomeError::Timeout { ms: 100 }));
        assert!(tracker.all_elements().is_empty());
    }

    #[tokio::test]
    async fn test_recapture_refines_candidates_from_history() {
        let dir = TempDir::new().unwrap();
        let clock = FakeClock::shared(0);
        let tracker = tracker(&dir, clock.clone());
        let source = MockElementSource::new();
        source.set_element("#checkout", checkout());

        tracker.capture(&source, "#checkout").await.unwrap();
        clock.advance_days(45);
        tracker.capture(&source, "#checkout").await.unwrap();
        // candidates reflect history recorded before this capture
        let code = tracker.capture(&source, "#checkout").await.unwrap();

        let id = code
            .selectors
            .iter()
            .find(|c| c.selector_type == SelectorType::Id)
            .unwrap();
        assert!(id.survival_probability > SelectorType::Id.base_score());
        assert_eq!(id.change_count, 0);
    }

    // =========================================================================
    // Mutations and events
    // =========================================================================

    #[test]
    fn test_id_removed_class_added_through_tracker() {
        let dir = TempDir::new().unwrap();
        let clock = FakeClock::shared(0);
        let tracker = tracker(&dir, clock.clone());
        let a = RawElementSnapshot::new("button", "html > body > button")
            .with_id("btn1")
            .with_classes(["primary"]);
        let mut b = a.clone().with_classes(["primary", "active"]);
        b.attributes.id = None;

        let first = tracker.capture_snapshot("#btn1", a);
        let before = tracker.history(&first.tracking_id).unwrap().selector_stability["#btn1"].clone();
        clock.advance(Duration::from_secs(60));
        tracker.capture_tracked(first.tracking_id.clone(), "#btn1", b);

        let history = tracker.history(&first.tracking_id).unwrap();
        let kinds: Vec<_> = history.mutations.iter().map(|m| m.mutation_type).collect();
        assert_eq!(kinds, vec![MutationType::IdRemoved, MutationType::ClassAdded]);
        let after = &history.selector_stability["#btn1"];
        assert_eq!(after.factors.change_frequency, before.factors.change_frequency + 1);
        assert!(after.score < before.score);
    }

    #[test]
    fn test_events_emitted() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir, FakeClock::shared(0));
        let mut rx = tracker.subscribe();

        let code = tracker.capture_snapshot("#checkout", checkout());
        tracker.capture_tracked(
            code.tracking_id.clone(),
            "#checkout",
            checkout().with_text("Pay now"),
        );

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 4);
        assert!(matches!(
            &events[0],
            TrackerEvent::GeneticCodeCaptured { candidate_count, .. } if *candidate_count == code.selectors.len()
        ));
        assert!(matches!(&events[1], TrackerEvent::GeneticCodeCaptured { .. }));
        assert!(matches!(
            &events[2],
            TrackerEvent::MutationDetected { mutations, .. } if mutations.len() == 1
        ));
        assert!(matches!(
            &events[3],
            TrackerEvent::MutationRecorded { mutation, .. } if mutation.mutation_type == MutationType::TextChanged
        ));
        assert!(events.iter().all(|e| e.tracking_id() == code.tracking_id));
    }

    #[test]
    fn test_capture_returns_every_mutation_past_event_buffer() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir).with_event_capacity(1);
        let tracker = EvolutionTracker::with_clock(config, FakeClock::shared(0)).unwrap();
        let _rx = tracker.subscribe();

        let code = tracker.capture_snapshot("#checkout", checkout());
        let classes: Vec<String> = (0..300).map(|i| format!("extra-{i}")).collect();
        let (_, mutations) = tracker.capture_tracked_with_mutations(
            code.tracking_id.clone(),
            "#checkout",
            checkout().with_classes(classes),
        );

        assert_eq!(mutations.len(), 302);
        assert_eq!(
            mutations
                .iter()
                .filter(|m| m.mutation_type == MutationType::ClassAdded)
                .count(),
            300
        );
        let history = tracker.history(&code.tracking_id).unwrap();
        assert_eq!(history.mutations, mutations);
    }

    #[test]
    fn test_capture_without_subscribers() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir, FakeClock::shared(0));
        let code = tracker.capture_snapshot("#checkout", checkout());
        assert!(tracker.history(&code.tracking_id).is_some());
    }

    // =========================================================================
    // Outcomes and ranking
    // =========================================================================

    #[test]
    fn test_failures_demote_selector_in_ranking() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir, FakeClock::shared(0));
        let code = tracker.capture_snapshot("#checkout", checkout());
        let top = tracker.ranked_selectors(&code.tracking_id).unwrap()[0].clone();

        for _ in 0..20 {
            assert!(tracker.record_failure(&code.tracking_id, &top.selector));
        }
        let ranked = tracker.ranked_selectors(&code.tracking_id).unwrap();
        assert_ne!(ranked[0].selector, top.selector);
        assert!(tracker.global_heuristics().recovery_effectiveness[&top.selector_type] < 0.5);
        assert!(!tracker.record_success(&code.tracking_id, "#nope"));
    }

    #[test]
    fn test_ranked_selectors_unknown() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir, FakeClock::shared(0));
        assert!(matches!(
            tracker.ranked_selectors("nope"),
            Err(GenomeError::UnknownElement { .. })
        ));
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    #[test]
    fn test_dispose_saves_and_reopen_restores() {
        let dir = TempDir::new().unwrap();
        let clock = FakeClock::shared(DAY_MS);
        let first = tracker(&dir, clock.clone());
        let code = first.capture_snapshot("#checkout", checkout());
        first.dispose().unwrap();

        let second = tracker(&dir, clock);
        let history = second.history(&code.tracking_id).unwrap();
        assert_eq!(history.first_seen, DAY_MS);
        assert_eq!(second.statistics().snapshot_count, 1);
    }

    #[test]
    fn test_flush_only_when_dirty() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir, FakeClock::shared(0));
        assert!(!tracker.flush());
        tracker.capture_snapshot("#checkout", checkout());
        assert!(tracker.flush());
        assert!(!tracker.flush());
        tracker.save().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_tracker_autosave() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir).with_flush_interval_ms(1_000);
        let path = config.knowledge_path.clone();
        let clock = FakeClock::shared(0);
        let tracker = EvolutionTracker::with_clock(config, clock.clone()).unwrap();
        let handle = tracker.spawn_autosave();

        tracker.capture_snapshot("#checkout", checkout());
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        tokio::task::yield_now().await;
        assert!(!path.exists());

        clock.advance(Duration::from_millis(1_000));
        tokio::time::sleep(Duration::from_millis(500)).await;
        tokio::task::yield_now().await;
        assert!(path.exists());
        handle.shutdown().await;
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir).with_generated_class_pattern("[");
        assert!(matches!(
            EvolutionTracker::with_clock(config, FakeClock::shared(0)),
            Err(GenomeError::Config { .. })
        ));
    }
}
