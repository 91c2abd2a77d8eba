//! Element genetic code: the structured snapshot of one DOM element.
//!
//! A [`RawElementSnapshot`] is what the browser-automation layer hands us.
//! The tracker turns it into an [`ElementGeneticCode`] by adding the tracking
//! id, timestamp, content hash and ranked selector candidates. Well-known
//! attributes live in typed fields; everything else lands in `extra` maps.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::selector::SelectorCandidate;

/// Maximum stored text content length (characters)
pub const MAX_TEXT_CONTENT_CHARS: usize = 100;

/// Maximum number of ancestor levels kept per snapshot
pub const MAX_ANCESTRY_LEVELS: usize = 3;

/// Hex characters kept from the tracking id digest
const TRACKING_ID_LEN: usize = 16;

/// Hex characters kept from the content digest
const CONTENT_HASH_LEN: usize = 8;

/// Element bounding box in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X position
    pub x: f64,
    /// Y position
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the box has a visible area
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Form-related attributes, present only on form-ish elements
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormAttributes {
    /// `type` attribute of inputs and buttons
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    /// `placeholder` attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// `href` attribute of links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    /// `value` attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Attribute snapshot with well-known fields split from arbitrary ones
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSnapshot {
    /// `id` attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// `name` attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Class list in document order
    #[serde(default)]
    pub class_list: Vec<String>,
    /// `data-*` attributes keyed without the `data-` prefix
    #[serde(default)]
    pub data_attributes: BTreeMap<String, String>,
    /// `aria-*` attributes keyed without the `aria-` prefix
    #[serde(default)]
    pub aria_attributes: BTreeMap<String, String>,
    /// `role` attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Form attributes, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<FormAttributes>,
    /// Any other attribute
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl AttributeSnapshot {
    /// `data-testid` value, if set and non-empty
    #[must_use]
    pub fn data_testid(&self) -> Option<&str> {
        non_empty(self.data_attributes.get("testid"))
    }

    /// `data-cy` value, if set and non-empty
    #[must_use]
    pub fn data_cy(&self) -> Option<&str> {
        non_empty(self.data_attributes.get("cy"))
    }

    /// `aria-label` value, if set and non-empty
    #[must_use]
    pub fn aria_label(&self) -> Option<&str> {
        non_empty(self.aria_attributes.get("label"))
    }

    /// `id`, if set and non-empty
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|s| !s.is_empty())
    }

    /// `name`, if set and non-empty
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|s| !s.is_empty())
    }

    /// `role`, if set and non-empty
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref().filter(|s| !s.is_empty())
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

/// Subset of computed style
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleSnapshot {
    /// `display`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    /// `visibility`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    /// `position`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    /// `z-index`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<String>,
    /// `opacity`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<String>,
    /// Other captured properties
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

/// Where the element sits in the DOM tree
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralPosition {
    /// Lower-case tag name
    pub tag_name: String,
    /// 0-based index among all element siblings
    pub sibling_index: usize,
    /// Distance from the document root
    pub depth: usize,
    /// Structural CSS path, e.g. `html > body > form > button:nth-child(2)`
    pub path: String,
    /// 0-based index among siblings with the same tag
    pub same_tag_index: usize,
}

/// Short description of a neighbouring element
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiblingSummary {
    /// Tag name
    pub tag_name: String,
    /// `id` attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Class list
    #[serde(default)]
    pub class_list: Vec<String>,
    /// Short text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Sibling context
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiblingInfo {
    /// Previous element sibling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<SiblingSummary>,
    /// Next element sibling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<SiblingSummary>,
    /// Number of element siblings (including the element)
    #[serde(default)]
    pub sibling_count: usize,
    /// Number of siblings sharing the tag (including the element)
    #[serde(default)]
    pub same_tag_count: usize,
}

/// One ancestor level, nearest first
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AncestryInfo {
    /// Tag name
    pub tag_name: String,
    /// `id` attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Class list
    #[serde(default)]
    pub class_list: Vec<String>,
    /// `role` attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// `data-testid` attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_testid: Option<String>,
}

/// Raw element facts as reported by the browser-automation layer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawElementSnapshot {
    /// Attributes
    #[serde(default)]
    pub attributes: AttributeSnapshot,
    /// Computed style subset
    #[serde(default)]
    pub style: StyleSnapshot,
    /// Structural facts
    pub position: StructuralPosition,
    /// Sibling summaries
    #[serde(default)]
    pub siblings: SiblingInfo,
    /// Up to three ancestors, nearest first
    #[serde(default)]
    pub ancestry: Vec<AncestryInfo>,
    /// Bounding box, absent for detached or hidden elements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    /// Text content, truncated by the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    /// Host of the page the element was found on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl RawElementSnapshot {
    /// Create a snapshot for a tag at a structural path
    #[must_use]
    pub fn new(tag_name: impl Into<String>, path: impl Into<String>) -> Self {
        let tag_name = tag_name.into().to_ascii_lowercase();
        Self {
            position: StructuralPosition {
                tag_name,
                path: path.into(),
                ..StructuralPosition::default()
            },
            ..Self::default()
        }
    }

    /// Set the `id` attribute
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.attributes.id = Some(id.into());
        self
    }

    /// Set the `name` attribute
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.attributes.name = Some(name.into());
        self
    }

    /// Replace the class list
    #[must_use]
    pub fn with_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes.class_list = classes.into_iter().map(Into::into).collect();
        self
    }

    /// Set a `data-*` attribute (key without prefix)
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .data_attributes
            .insert(key.into(), value.into());
        self
    }

    /// Set an `aria-*` attribute (key without prefix)
    #[must_use]
    pub fn with_aria(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .aria_attributes
            .insert(key.into(), value.into());
        self
    }

    /// Set the `role` attribute
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.attributes.role = Some(role.into());
        self
    }

    /// Set the text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }

    /// Set sibling index and depth
    #[must_use]
    pub const fn at(mut self, sibling_index: usize, depth: usize) -> Self {
        self.position.sibling_index = sibling_index;
        self.position.depth = depth;
        self
    }

    /// Set the bounding box
    #[must_use]
    pub const fn with_bounding_box(mut self, bbox: BoundingBox) -> Self {
        self.bounding_box = Some(bbox);
        self
    }

    /// Set the page domain
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Tracking id derived from this snapshot's identity fields
    #[must_use]
    pub fn tracking_id(&self) -> String {
        tracking_id(
            &self.position.tag_name,
            self.attributes.id(),
            self.attributes.name(),
            self.attributes.data_testid(),
            &self.position.path,
        )
    }

    /// Text content trimmed and capped at [`MAX_TEXT_CONTENT_CHARS`]
    #[must_use]
    pub fn normalized_text(&self) -> Option<String> {
        self.text_content
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| t.chars().take(MAX_TEXT_CONTENT_CHARS).collect())
    }
}

/// Immutable snapshot of one element at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementGeneticCode {
    /// Stable identity derived from the element signature
    pub tracking_id: String,
    /// Capture time (ms since epoch)
    pub timestamp: u64,
    /// Primary selector used to find the element
    pub selector: String,
    /// Lower-case tag name
    pub tag_name: String,
    /// Ranked selector candidates
    pub selectors: Vec<SelectorCandidate>,
    /// Attributes
    pub attributes: AttributeSnapshot,
    /// Computed style subset
    pub style: StyleSnapshot,
    /// Structural position
    pub position: StructuralPosition,
    /// Sibling context
    pub siblings: SiblingInfo,
    /// Up to three ancestors, nearest first
    pub ancestry: Vec<AncestryInfo>,
    /// Short digest of the text content, empty when there is none
    pub content_hash: String,
    /// Bounding box
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    /// Normalized text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    /// Page host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl ElementGeneticCode {
    /// Assemble a genetic code from a raw snapshot and its ranked candidates
    #[must_use]
    pub fn from_raw(
        tracking_id: String,
        selector: impl Into<String>,
        raw: RawElementSnapshot,
        selectors: Vec<SelectorCandidate>,
        timestamp: u64,
    ) -> Self {
        let text_content = raw.normalized_text();
        let content_hash = text_content.as_deref().map(content_hash).unwrap_or_default();
        let mut ancestry = raw.ancestry;
        ancestry.truncate(MAX_ANCESTRY_LEVELS);

        Self {
            tracking_id,
            timestamp,
            selector: selector.into(),
            tag_name: raw.position.tag_name.clone(),
            selectors,
            attributes: raw.attributes,
            style: raw.style,
            position: raw.position,
            siblings: raw.siblings,
            ancestry,
            content_hash,
            bounding_box: raw.bounding_box,
            text_content,
            domain: raw.domain,
        }
    }

    /// Best-ranked candidate, if any
    #[must_use]
    pub fn best_selector(&self) -> Option<&SelectorCandidate> {
        self.selectors.first()
    }
}

/// Deterministic tracking id for an element signature.
///
/// Hashes `tag|id|name|data-testid|path`; absent fields hash as empty strings.
#[must_use]
pub fn tracking_id(
    tag: &str,
    id: Option<&str>,
    name: Option<&str>,
    data_testid: Option<&str>,
    path: &str,
) -> String {
    let signature = format!(
        "{}|{}|{}|{}|{}",
        tag.to_ascii_lowercase(),
        id.unwrap_or_default(),
        name.unwrap_or_default(),
        data_testid.unwrap_or_default(),
        path
    );
    let mut hex = hex_digest(signature.as_bytes());
    hex.truncate(TRACKING_ID_LEN);
    hex
}

/// Short digest of text content
#[must_use]
pub fn content_hash(text: &str) -> String {
    let mut hex = hex_digest(text.as_bytes());
    hex.truncate(CONTENT_HASH_LEN);
    hex
}

fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn button() -> RawElementSnapshot {
        RawElementSnapshot::new("BUTTON", "html > body > form > button")
            .with_id("submit")
            .with_classes(["btn", "primary"])
            .with_data("testid", "submit-btn")
            .with_text("  Submit order  ")
            .at(1, 3)
    }

    // =========================================================================
    // Tracking id
    // =========================================================================

    #[test]
    fn test_tracking_id_length_and_hex() {
        let id = button().tracking_id();
        assert_eq!(id.len(), TRACKING_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tracking_id_ignores_non_identity_fields() {
        let a = button();
        let b = button()
            .with_classes(["other"])
            .with_text("changed")
            .with_bounding_box(BoundingBox::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(a.tracking_id(), b.tracking_id());
    }

    #[test]
    fn test_tracking_id_changes_with_identity_fields() {
        let a = button();
        assert_ne!(a.tracking_id(), button().with_id("other").tracking_id());
        assert_ne!(a.tracking_id(), button().with_name("n").tracking_id());
        assert_ne!(
            a.tracking_id(),
            button().with_data("testid", "x").tracking_id()
        );
    }

    #[test]
    fn test_tracking_id_empty_equals_absent() {
        let a = RawElementSnapshot::new("div", "html > div");
        let b = RawElementSnapshot::new("div", "html > div").with_id("");
        assert_eq!(a.tracking_id(), b.tracking_id());
    }

    proptest! {
        #[test]
        fn prop_tracking_id_is_pure(
            tag in "[a-z]{1,8}",
            id in proptest::option::of("[a-z0-9-]{0,10}"),
            path in "[a-z >]{0,30}",
            ts in any::<u64>(),
        ) {
            let a = tracking_id(&tag, id.as_deref(), None, None, &path);
            let b = tracking_id(&tag, id.as_deref(), None, None, &path);
            prop_assert_eq!(&a, &b);
            let raw = RawElementSnapshot::new(tag.clone(), path.clone());
            let raw = match &id { Some(i) => raw.with_id(i.clone()), None => raw };
            let code = ElementGeneticCode::from_raw(raw.tracking_id(), "x", raw.clone(), vec![], ts);
            prop_assert_eq!(code.tracking_id, raw.tracking_id());
        }
    }

    // =========================================================================
    // Genetic code assembly
    // =========================================================================

    #[test]
    fn test_from_raw_normalizes_text_and_hash() {
        let raw = button();
        let code = ElementGeneticCode::from_raw(raw.tracking_id(), "#submit", raw, vec![], 10);
        assert_eq!(code.tag_name, "button");
        assert_eq!(code.text_content.as_deref(), Some("Submit order"));
        assert_eq!(code.content_hash, content_hash("Submit order"));
        assert_eq!(code.content_hash.len(), CONTENT_HASH_LEN);
    }

    #[test]
    fn test_from_raw_truncates_text_and_ancestry() {
        let mut raw = button().with_text("x".repeat(250));
        raw.ancestry = vec![AncestryInfo::default(); 5];
        let code = ElementGeneticCode::from_raw("t".into(), "#submit", raw, vec![], 0);
        assert_eq!(code.text_content.map(|t| t.len()), Some(MAX_TEXT_CONTENT_CHARS));
        assert_eq!(code.ancestry.len(), MAX_ANCESTRY_LEVELS);
    }

    #[test]
    fn test_no_text_means_empty_hash() {
        let raw = RawElementSnapshot::new("div", "html > div").with_text("   ");
        let code = ElementGeneticCode::from_raw("t".into(), "div", raw, vec![], 0);
        assert!(code.content_hash.is_empty());
        assert!(code.text_content.is_none());
    }

    #[test]
    fn test_best_selector_is_first_candidate() {
        let raw = button();
        let empty = ElementGeneticCode::from_raw("t".into(), "#submit", raw.clone(), vec![], 0);
        assert!(empty.best_selector().is_none());

        let candidates = vec![
            SelectorCandidate::new(crate::selector::SelectorType::DataTestid, "[data-testid=\"submit-btn\"]"),
            SelectorCandidate::new(crate::selector::SelectorType::Id, "#submit"),
        ];
        let code = ElementGeneticCode::from_raw("t".into(), "#submit", raw, candidates, 0);
        assert_eq!(
            code.best_selector().map(|c| c.value.as_str()),
            Some("[data-testid=\"submit-btn\"]")
        );
    }

    #[test]
    fn test_bounding_box_visibility() {
        assert!(BoundingBox::new(0.0, 0.0, 10.0, 5.0).is_visible());
        assert!(!BoundingBox::new(5.0, 5.0, 0.0, 5.0).is_visible());
        assert!(!BoundingBox::new(5.0, 5.0, 10.0, 0.0).is_visible());
    }

    #[test]
    fn test_attribute_accessors() {
        let raw = button().with_aria("label", "Submit").with_data("cy", "");
        assert_eq!(raw.attributes.data_testid(), Some("submit-btn"));
        assert_eq!(raw.attributes.aria_label(), Some("Submit"));
        assert_eq!(raw.attributes.data_cy(), None);
    }

    #[test]
    fn test_raw_snapshot_json_camel_case() {
        let json = r#"{
            "attributes": {"id": "go", "classList": ["a"], "dataAttributes": {"testid": "go-btn"}},
            "position": {"tagName": "a", "siblingIndex": 0, "depth": 2, "path": "body > a", "sameTagIndex": 0},
            "textContent": "Go"
        }"#;
        let raw: RawElementSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(raw.attributes.data_testid(), Some("go-btn"));
        assert_eq!(raw.position.depth, 2);
        assert!(raw.siblings.previous.is_none());
    }
}
