//! Mutation detection between successive snapshots of one element.
//!
//! Each rule is evaluated independently, so one diff may yield several
//! mutations. An empty result is the common case.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::genetic_code::ElementGeneticCode;
use crate::selector::SelectorType;

/// Depth difference above which a move counts as re-nesting
pub const NESTING_DEPTH_THRESHOLD: usize = 1;

/// Kind of change observed between two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationType {
    /// `id` replaced by another value
    IdChanged,
    /// `id` removed
    IdRemoved,
    /// Class added
    ClassAdded,
    /// Class removed
    ClassRemoved,
    /// Class renamed
    ClassRenamed,
    /// Identity attribute changed
    AttributeChanged,
    /// Identity attribute removed
    AttributeRemoved,
    /// Structural path changed
    ElementMoved,
    /// Depth changed by more than one level
    ElementNested,
    /// Element duplicated among its siblings
    ElementCloned,
    /// Text content changed
    TextChanged,
    /// ARIA label or role changed
    AriaChanged,
    /// `data-testid` added
    DataTestidAdded,
    /// `data-testid` removed
    DataTestidRemoved,
    /// UI framework swap (class scheme rewritten)
    FrameworkMigration,
}

impl MutationType {
    /// All mutation types
    pub const ALL: [Self; 15] = [
        Self::IdChanged,
        Self::IdRemoved,
        Self::ClassAdded,
        Self::ClassRemoved,
        Self::ClassRenamed,
        Self::AttributeChanged,
        Self::AttributeRemoved,
        Self::ElementMoved,
        Self::ElementNested,
        Self::ElementCloned,
        Self::TextChanged,
        Self::AriaChanged,
        Self::DataTestidAdded,
        Self::DataTestidRemoved,
        Self::FrameworkMigration,
    ];

    /// Selector types invalidated by this mutation
    #[must_use]
    pub const fn affected_selectors(self) -> &'static [SelectorType] {
        use SelectorType as S;
        match self {
            Self::IdChanged | Self::IdRemoved => &[S::Id],
            Self::ClassAdded | Self::ClassRemoved | Self::ClassRenamed => &[S::Class],
            Self::AttributeChanged | Self::AttributeRemoved => &[S::Name, S::DataTestid, S::DataCy],
            Self::ElementMoved | Self::ElementNested => &[S::CssPath, S::Xpath, S::NthChild],
            Self::AriaChanged => &[S::AriaLabel, S::AriaRole],
            Self::DataTestidRemoved => &[S::DataTestid],
            Self::TextChanged => &[S::TextContent],
            Self::ElementCloned => &[S::NthChild, S::CssPath],
            Self::FrameworkMigration => &[S::Class, S::CssPath, S::Xpath],
            Self::DataTestidAdded => &[],
        }
    }

    /// Wire name, e.g. `CLASS_ADDED`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IdChanged => "ID_CHANGED",
            Self::IdRemoved => "ID_REMOVED",
            Self::ClassAdded => "CLASS_ADDED",
            Self::ClassRemoved => "CLASS_REMOVED",
            Self::ClassRenamed => "CLASS_RENAMED",
            Self::AttributeChanged => "ATTRIBUTE_CHANGED",
            Self::AttributeRemoved => "ATTRIBUTE_REMOVED",
            Self::ElementMoved => "ELEMENT_MOVED",
            Self::ElementNested => "ELEMENT_NESTED",
            Self::ElementCloned => "ELEMENT_CLONED",
            Self::TextChanged => "TEXT_CHANGED",
            Self::AriaChanged => "ARIA_CHANGED",
            Self::DataTestidAdded => "DATA_TESTID_ADDED",
            Self::DataTestidRemoved => "DATA_TESTID_REMOVED",
            Self::FrameworkMigration => "FRAMEWORK_MIGRATION",
        }
    }
}

impl fmt::Display for MutationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected change, immutable once recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedMutation {
    /// Detection time (timestamp of the newer snapshot)
    pub timestamp: u64,
    /// Kind of change
    #[serde(rename = "type")]
    pub mutation_type: MutationType,
    /// Value before the change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    /// Value after the change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    /// Selector types invalidated by the change
    pub affected_selectors: Vec<SelectorType>,
}

impl RecordedMutation {
    /// Record a mutation, filling `affected_selectors` from the fixed table
    #[must_use]
    pub fn new(
        mutation_type: MutationType,
        timestamp: u64,
        before: Option<String>,
        after: Option<String>,
    ) -> Self {
        Self {
            timestamp,
            mutation_type,
            before,
            after,
            affected_selectors: mutation_type.affected_selectors().to_vec(),
        }
    }

    /// Whether this mutation invalidates selectors of `selector_type`
    #[must_use]
    pub fn affects(&self, selector_type: SelectorType) -> bool {
        self.affected_selectors.contains(&selector_type)
    }
}

/// Stateless diff engine
#[derive(Debug, Clone, Copy, Default)]
pub struct MutationDetector;

impl MutationDetector {
    /// Create a detector
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Diff two snapshots of the same element
    #[must_use]
    pub fn detect(
        &self,
        before: &ElementGeneticCode,
        after: &ElementGeneticCode,
    ) -> Vec<RecordedMutation> {
        let ts = after.timestamp;
        let old = &before.attributes;
        let new = &after.attributes;
        let mut out = Vec::new();
        let mut push = |t: MutationType, b: Option<&str>, a: Option<&str>| {
            out.push(RecordedMutation::new(
                t,
                ts,
                b.map(str::to_string),
                a.map(str::to_string),
            ));
        };

        if old.id() != new.id() {
            let t = if new.id().is_none() {
                MutationType::IdRemoved
            } else {
                MutationType::IdChanged
            };
            push(t, old.id(), new.id());
        }

        let before_classes: BTreeSet<&str> = old.class_list.iter().map(String::as_str).collect();
        let after_classes: BTreeSet<&str> = new.class_list.iter().map(String::as_str).collect();
        if before_classes != after_classes {
            let mut seen = BTreeSet::new();
            for class in &old.class_list {
                if !after_classes.contains(class.as_str()) && seen.insert(class.as_str()) {
                    push(MutationType::ClassRemoved, Some(class), None);
                }
            }
            for class in &new.class_list {
                if !before_classes.contains(class.as_str()) && seen.insert(class.as_str()) {
                    push(MutationType::ClassAdded, None, Some(class));
                }
            }
        }

        match (old.data_testid(), new.data_testid()) {
            (a, b) if a == b => {}
            (Some(a), None) => push(MutationType::DataTestidRemoved, Some(a), None),
            (None, Some(b)) => push(MutationType::DataTestidAdded, None, Some(b)),
            (a, b) => push(MutationType::AttributeChanged, a, b),
        }

        if old.aria_label() != new.aria_label() {
            push(MutationType::AriaChanged, old.aria_label(), new.aria_label());
        }

        if before.position.path != after.position.path {
            push(
                MutationType::ElementMoved,
                Some(&before.position.path),
                Some(&after.position.path),
            );
        }

        if before.position.depth.abs_diff(after.position.depth) > NESTING_DEPTH_THRESHOLD {
            push(
                MutationType::ElementNested,
                Some(&before.position.depth.to_string()),
                Some(&after.position.depth.to_string()),
            );
        }

        attribute_rule(&mut push, old.name(), new.name());
        attribute_rule(&mut push, old.data_cy(), new.data_cy());

        if old.role() != new.role() {
            push(MutationType::AriaChanged, old.role(), new.role());
        }

        if before.content_hash != after.content_hash {
            push(
                MutationType::TextChanged,
                before.text_content.as_deref(),
                after.text_content.as_deref(),
            );
        }

        out
    }
}

fn attribute_rule(
    push: &mut impl FnMut(MutationType, Option<&str>, Option<&str>),
    before: Option<&str>,
    after: Option<&str>,
) {
    match (before, after) {
        (a, b) if a == b => {}
        (Some(a), None) => push(MutationType::AttributeRemoved, Some(a), None),
        (a, b) => push(MutationType::AttributeChanged, a, b),
    }
}
