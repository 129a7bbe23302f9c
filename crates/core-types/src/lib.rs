use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Raised when a textual tag does not name a known variant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseTagError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseTagError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coarse element kind assigned at discovery time.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Default)]
pub enum ElementCategory {
    Button,
    Input,
    Link,
    Modal,
    Dropdown,
    Checkbox,
    Select,
    #[default]
    Unknown,
}

impl ElementCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementCategory::Button => "button",
            ElementCategory::Input => "input",
            ElementCategory::Link => "link",
            ElementCategory::Modal => "modal",
            ElementCategory::Dropdown => "dropdown",
            ElementCategory::Checkbox => "checkbox",
            ElementCategory::Select => "select",
            ElementCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ElementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementCategory {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "button" => Ok(ElementCategory::Button),
            "input" => Ok(ElementCategory::Input),
            "link" => Ok(ElementCategory::Link),
            "modal" => Ok(ElementCategory::Modal),
            "dropdown" => Ok(ElementCategory::Dropdown),
            "checkbox" => Ok(ElementCategory::Checkbox),
            "select" => Ok(ElementCategory::Select),
            "unknown" => Ok(ElementCategory::Unknown),
            other => Err(ParseTagError::new("element category", other)),
        }
    }
}

/// Bounding box in CSS pixels.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// De-duplication key: resolved locator plus visible text.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct IdentityKey(pub String);

impl IdentityKey {
    pub fn new(locator: &str, text: &str) -> Self {
        Self(format!("{}::{}", locator, text))
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of one interactive element, recreated on every scan.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ElementDescriptor {
    pub locator: String,
    pub text: String,
    pub category: ElementCategory,
    pub attributes: BTreeMap<String, String>,
    pub visible: bool,
    pub enabled: bool,
    pub geometry: Option<Geometry>,
}

impl ElementDescriptor {
    pub fn new(
        locator: impl Into<String>,
        text: impl Into<String>,
        category: ElementCategory,
    ) -> Self {
        Self {
            locator: locator.into(),
            text: text.into(),
            category,
            attributes: BTreeMap::new(),
            visible: true,
            enabled: true,
            geometry: None,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(&self.locator, &self.text)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn aria_label(&self) -> &str {
        self.attr("aria-label").unwrap_or_default()
    }

    /// Stable test id, accepting both `data-testid` and `data-test-id` spellings.
    pub fn test_id(&self) -> &str {
        self.attr("data-testid")
            .or_else(|| self.attr("data-test-id"))
            .unwrap_or_default()
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum InteractionKind {
    Click,
    Fill,
    Skip,
    ExploreDeeper,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Click => "click",
            InteractionKind::Fill => "fill",
            InteractionKind::Skip => "skip",
            InteractionKind::ExploreDeeper => "explore_deeper",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionKind {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "click" => Ok(InteractionKind::Click),
            "fill" => Ok(InteractionKind::Fill),
            "skip" => Ok(InteractionKind::Skip),
            "explore_deeper" => Ok(InteractionKind::ExploreDeeper),
            other => Err(ParseTagError::new("interaction kind", other)),
        }
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Default)]
pub enum ElementClassification {
    CloseButton,
    ActionButton,
    Input,
    Navigation,
    #[default]
    Unknown,
}

impl ElementClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementClassification::CloseButton => "close_button",
            ElementClassification::ActionButton => "action_button",
            ElementClassification::Input => "input",
            ElementClassification::Navigation => "navigation",
            ElementClassification::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ElementClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementClassification {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "close_button" => Ok(ElementClassification::CloseButton),
            "action_button" => Ok(ElementClassification::ActionButton),
            "input" => Ok(ElementClassification::Input),
            "navigation" => Ok(ElementClassification::Navigation),
            "unknown" => Ok(ElementClassification::Unknown),
            other => Err(ParseTagError::new("element classification", other)),
        }
    }
}

/// Confidence assigned to the fail-safe skip.
pub const FAIL_SAFE_CONFIDENCE: f64 = 0.3;

/// Per-element verdict. Ephemeral.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    pub should_interact: bool,
    pub interaction: InteractionKind,
    pub rationale: String,
    pub confidence: f64,
    pub classification: ElementClassification,
}

impl Decision {
    pub fn skip(
        rationale: impl Into<String>,
        confidence: f64,
        classification: ElementClassification,
    ) -> Self {
        Self {
            should_interact: false,
            interaction: InteractionKind::Skip,
            rationale: rationale.into(),
            confidence: confidence.clamp(0.0, 1.0),
            classification,
        }
    }

    pub fn interact(
        interaction: InteractionKind,
        rationale: impl Into<String>,
        confidence: f64,
        classification: ElementClassification,
    ) -> Self {
        Self {
            should_interact: interaction != InteractionKind::Skip,
            interaction,
            rationale: rationale.into(),
            confidence: confidence.clamp(0.0, 1.0),
            classification,
        }
    }

    /// Conservative verdict used whenever reasoning is unavailable.
    pub fn fail_safe() -> Self {
        Self::skip(
            "Unable to analyze, skipping for safety",
            FAIL_SAFE_CONFIDENCE,
            ElementClassification::Unknown,
        )
    }

    pub fn is_skip(&self) -> bool {
        !self.should_interact || self.interaction == InteractionKind::Skip
    }
}

/// Observed side effects of executing one decision.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Default)]
pub struct InteractionOutcome {
    pub success: bool,
    pub navigated: bool,
    pub overlay_opened: bool,
    pub overlay_closed: bool,
    /// Identifier of the overlay that became visible, when one did.
    pub overlay_id: Option<String>,
    pub error: Option<String>,
}

impl InteractionOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Append-only audit entry.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct InteractionLogEntry {
    pub element: ElementDescriptor,
    pub decision: Decision,
    /// `None` when the decision was a skip and nothing ran.
    pub outcome: Option<InteractionOutcome>,
    pub context: String,
    pub depth: usize,
    pub timestamp: DateTime<Utc>,
}

/// Learned heuristic categories.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum PatternKind {
    CloseButton,
    NavigationTrigger,
    ModalOpener,
    SafeAction,
}

impl PatternKind {
    pub const ALL: [PatternKind; 4] = [
        PatternKind::CloseButton,
        PatternKind::NavigationTrigger,
        PatternKind::ModalOpener,
        PatternKind::SafeAction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::CloseButton => "close_button",
            PatternKind::NavigationTrigger => "navigation_trigger",
            PatternKind::ModalOpener => "modal_opener",
            PatternKind::SafeAction => "safe_action",
        }
    }

    /// Upper bound for learned confidence in this category.
    pub fn ceiling(&self) -> f64 {
        match self {
            PatternKind::CloseButton => 0.95,
            PatternKind::NavigationTrigger => 0.9,
            PatternKind::ModalOpener | PatternKind::SafeAction => 0.9,
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternKind {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PatternKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseTagError::new("pattern kind", s))
    }
}

/// Cause assigned to a failed test by the failure classifier.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Default)]
pub enum FailureCategory {
    Selector,
    Timing,
    Data,
    Logic,
    Environment,
    #[default]
    Unknown,
}

impl FailureCategory {
    pub const ALL: [FailureCategory; 6] = [
        FailureCategory::Selector,
        FailureCategory::Timing,
        FailureCategory::Data,
        FailureCategory::Logic,
        FailureCategory::Environment,
        FailureCategory::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCategory::Selector => "selector",
            FailureCategory::Timing => "timing",
            FailureCategory::Data => "data",
            FailureCategory::Logic => "logic",
            FailureCategory::Environment => "environment",
            FailureCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureCategory {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FailureCategory::ALL
            .iter()
            .copied()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| ParseTagError::new("failure category", s))
    }
}

/// Outcome of one healing attempt. Never an error: failure is `success == false`.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct HealingResult {
    pub success: bool,
    pub category: FailureCategory,
    pub original_locator: Option<String>,
    pub new_locator: Option<String>,
    /// 0-1 score
    pub confidence: f64,
    pub explanation: String,
}

impl HealingResult {
    pub fn healed(
        category: FailureCategory,
        explanation: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            success: true,
            category,
            original_locator: None,
            new_locator: None,
            confidence: confidence.clamp(0.0, 1.0),
            explanation: explanation.into(),
        }
    }

    pub fn unsuccessful(category: FailureCategory, explanation: impl Into<String>) -> Self {
        Self {
            success: false,
            category,
            original_locator: None,
            new_locator: None,
            confidence: 0.0,
            explanation: explanation.into(),
        }
    }

    pub fn with_locators(mut self, original: impl Into<String>, new: Option<String>) -> Self {
        self.original_locator = Some(original.into());
        self.new_locator = new;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_categories_round_trip_through_tags() {
        for category in FailureCategory::ALL {
            assert_eq!(category.as_str().parse::<FailureCategory>().unwrap(), category);
        }
        assert!("flaky".parse::<FailureCategory>().is_err());
    }

    #[test]
    fn unsuccessful_healing_has_zero_confidence() {
        let result = HealingResult::unsuccessful(FailureCategory::Selector, "nothing matched")
            .with_locators("#gone", None);
        assert!(!result.success);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.original_locator.as_deref(), Some("#gone"));
    }

    #[test]
    fn identity_key_joins_locator_and_text() {
        let element = ElementDescriptor::new("#submit", "Submit", ElementCategory::Button);
        assert_eq!(element.identity_key().0, "#submit::Submit");
    }

    #[test]
    fn test_id_accepts_both_spellings() {
        let a = ElementDescriptor::new("x", "", ElementCategory::Button)
            .with_attribute("data-testid", "a");
        let b = ElementDescriptor::new("y", "", ElementCategory::Button)
            .with_attribute("data-test-id", "b");
        assert_eq!(a.test_id(), "a");
        assert_eq!(b.test_id(), "b");
    }

    #[test]
    fn fail_safe_never_interacts() {
        let decision = Decision::fail_safe();
        assert!(!decision.should_interact);
        assert_eq!(decision.interaction, InteractionKind::Skip);
        assert!((decision.confidence - FAIL_SAFE_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[test]
    fn pattern_kind_round_trips_tag() {
        for kind in PatternKind::ALL {
            assert_eq!(kind.as_str().parse::<PatternKind>().unwrap(), kind);
        }
        assert!("bogus".parse::<PatternKind>().is_err());
    }
}
