//! Tracker notifications.

use serde::{Deserialize, Serialize};

use crate::mutation::RecordedMutation;

/// Event broadcast by the tracker to its subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum TrackerEvent {
    /// A snapshot was captured and recorded
    #[serde(rename_all = "camelCase")]
    GeneticCodeCaptured {
        /// Element tracking id
        tracking_id: String,
        /// Primary selector used for the capture
        selector: String,
        /// Candidates generated for the snapshot
        candidate_count: usize,
    },
    /// The capture differed from the previous snapshot
    #[serde(rename_all = "camelCase")]
    MutationDetected {
        /// Element tracking id
        tracking_id: String,
        /// Every mutation from the diff
        mutations: Vec<RecordedMutation>,
    },
    /// One mutation was appended to the element's log
    #[serde(rename_all = "camelCase")]
    MutationRecorded {
        /// Element tracking id
        tracking_id: String,
        /// The mutation
        mutation: RecordedMutation,
    },
}

impl TrackerEvent {
    /// Tracking id the event refers to
    #[must_use]
    pub fn tracking_id(&self) -> &str {
        match self {
            Self::GeneticCodeCaptured { tracking_id, .. }
            | Self::MutationDetected { tracking_id, .. }
            | Self::MutationRecorded { tracking_id, .. } => tracking_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::MutationType;

    #[test]
    fn test_event_json_shape() {
        let event = TrackerEvent::MutationRecorded {
            tracking_id: "abc".into(),
            mutation: RecordedMutation::new(MutationType::IdRemoved, 1, Some("x".into()), None),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "mutationRecorded");
        assert_eq!(json["trackingId"], "abc");
        assert_eq!(json["mutation"]["type"], "ID_REMOVED");
        assert_eq!(event.tracking_id(), "abc");
    }
}
