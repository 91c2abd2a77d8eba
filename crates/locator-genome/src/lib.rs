//! Locator Genome: element evolution tracking for self-healing selectors
//!
//! Every time a test locates a DOM element, the tracker records a structured
//! snapshot of it (its "genetic code"), diffs it against the previous
//! snapshot, and learns which selector strategies keep working for that
//! element. Test runners ask for the ranked selectors when the primary one
//! breaks.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    GENOME Architecture                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Element    │    │ Selector   │    │ Mutation   │            │
//! │   │ Source     │───►│ Extractor  │───►│ Detector   │            │
//! │   │ (CDP/mock) │    │            │    │            │            │
//! │   └────────────┘    └────────────┘    └─────┬──────┘            │
//! │                                             ▼                   │
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ knowledge  │◄───│ History    │◄───│ Stability  │            │
//! │   │ .json      │    │ Store      │    │ Scorer     │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use locator_genome::prelude::*;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let config = TrackerConfig::default().with_knowledge_path(dir.path().join("k.json"));
//! let tracker = EvolutionTracker::with_clock(config, FakeClock::shared(0)).unwrap();
//!
//! let raw = RawElementSnapshot::new("button", "html > body > button")
//!     .with_id("save")
//!     .with_data("testid", "save-btn");
//! let code = tracker.capture_snapshot("#save", raw);
//! assert_eq!(code.selectors[0].value, "[data-testid=\"save-btn\"]");
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

/// Periodic knowledge flushing
pub mod autosave;

/// Injectable time source
#[allow(clippy::missing_const_for_fn)]
pub mod clock;

/// Tracker configuration
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate, clippy::doc_markdown)]
pub mod config;

/// Tracker notifications
pub mod events;

/// Element snapshots
#[allow(clippy::must_use_candidate, clippy::missing_const_for_fn)]
pub mod genetic_code;

/// Per-element evolution history
pub mod history;

/// Cross-element knowledge
#[allow(clippy::must_use_candidate, clippy::doc_markdown)]
pub mod knowledge;

/// Snapshot diffing
pub mod mutation;

mod result;

/// Selector candidate extraction
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod selector;

/// Element sources
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod source;

/// Stability scoring
pub mod stability;

/// Evolution history store
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod store;

/// Evolution tracker facade
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod tracker;

pub use autosave::{lock_store, spawn_autosave, AutosaveHandle, FlushScheduler, SharedStore};
pub use clock::{days_between, Clock, FakeClock, SharedClock, SystemClock, DAY_MS};
pub use config::{TrackerConfig, DEFAULT_KNOWLEDGE_PATH};
pub use events::TrackerEvent;
pub use genetic_code::{
    content_hash, tracking_id, AncestryInfo, AttributeSnapshot, BoundingBox, ElementGeneticCode,
    FormAttributes, RawElementSnapshot, SiblingInfo, SiblingSummary, StructuralPosition,
    StyleSnapshot,
};
pub use history::{ElementEvolutionHistory, RankedSelector, DEFAULT_SNAPSHOT_CAPACITY};
pub use knowledge::{
    DomainPattern, GlobalHeuristics, PredictionKnowledge, TemporalPattern, KNOWLEDGE_VERSION,
};
pub use mutation::{MutationDetector, MutationType, RecordedMutation};
pub use result::{GenomeError, GenomeResult};
pub use selector::{
    ClassNameFilter, GeneratedClassFilter, SelectorCandidate, SelectorExtractor, SelectorType,
};
#[cfg(feature = "browser")]
pub use source::{CdpElementSource, CdpSession};
pub use source::{ElementSource, MockElementSource};
pub use stability::{
    calculate_survival_probability, classify_trend, recalc_stability_score, StabilityFactors,
    StabilitySignal, Trend,
};
pub use store::{load_knowledge, HistoryStore, StoreStatistics};
pub use tracker::EvolutionTracker;

/// Prelude for convenient imports
pub mod prelude {
    pub use super::autosave::{AutosaveHandle, FlushScheduler};
    pub use super::clock::{Clock, FakeClock, SystemClock};
    pub use super::config::TrackerConfig;
    pub use super::events::TrackerEvent;
    pub use super::genetic_code::{ElementGeneticCode, RawElementSnapshot};
    pub use super::history::{ElementEvolutionHistory, RankedSelector};
    pub use super::mutation::{MutationType, RecordedMutation};
    pub use super::result::{GenomeError, GenomeResult};
    pub use super::selector::{SelectorCandidate, SelectorExtractor, SelectorType};
    pub use super::source::{ElementSource, MockElementSource};
    pub use super::stability::{StabilitySignal, Trend};
    pub use super::store::{HistoryStore, StoreStatistics};
    pub use super::tracker::EvolutionTracker;
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use tempfile::TempDir;

    // =========================================================================
    // End-to-end through the public API
    // =========================================================================

    #[tokio::test]
    async fn test_redesign_survives_through_fallback_selector() {
        let dir = TempDir::new().unwrap();
        let config = TrackerConfig::default().with_knowledge_path(dir.path().join("k.json"));
        let clock = FakeClock::shared(0);
        let tracker = EvolutionTracker::with_clock(config, clock.clone()).unwrap();
        let source = MockElementSource::new();

        let original = RawElementSnapshot::new("button", "html > body > main > button")
            .with_id("buy")
            .with_classes(["cta"])
            .with_aria("label", "Buy now")
            .at(0, 3);
        source.set_element("#buy", original.clone());
        let first = tracker.capture(&source, "#buy").await.unwrap();

        // redesign drops the id and restyles the button
        let mut redesigned = original.with_classes(["css-1abc", "cta-v2"]);
        redesigned.attributes.id = None;
        clock.advance_days(3);
        tracker.capture_tracked(first.tracking_id.clone(), "#buy", redesigned);

        let ranked = tracker.ranked_selectors(&first.tracking_id).unwrap();
        assert_eq!(ranked[0].selector, "[aria-label=\"Buy now\"]");
        let id = ranked.iter().find(|r| r.selector == "#buy").unwrap();
        assert_eq!(id.change_count, 1);

        tracker.dispose().unwrap();
        let reopened = HistoryStore::open(dir.path().join("k.json"), 100);
        assert_eq!(reopened.statistics().total_mutations, 4);
    }
}
