use soulscout_core_types::{
    Decision, ElementCategory, ElementClassification, ElementDescriptor, InteractionKind,
    PatternKind,
};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::errors::OracleError;
use crate::oracle::SharedOracle;
use crate::patterns::PatternStore;
use crate::prompt::OraclePrompt;
use crate::skip::SkipMatcher;
use crate::verdict::parse_verdict;

/// Close-button pattern must exceed this before it short-circuits the oracle.
pub const CLOSE_PATTERN_THRESHOLD: f64 = 0.8;
/// Navigation pattern must exceed this before it short-circuits the oracle.
pub const NAVIGATION_PATTERN_THRESHOLD: f64 = 0.7;
pub const INPUT_FAST_PATH_CONFIDENCE: f64 = 0.95;
pub const PICKER_FAST_PATH_CONFIDENCE: f64 = 0.9;
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(15);

const CLOSE_GLYPHS: &[&str] = &["×", "✕"];

/// Read-only view of the traversal state a decision depends on.
#[derive(Clone, Copy, Debug)]
pub struct DecisionContext<'a> {
    pub current_overlay: Option<&'a str>,
    pub explored_count: usize,
    pub depth: usize,
    /// Origin of the page under exploration, for telling external links apart.
    pub page_origin: Option<&'a str>,
    pub patterns: &'a PatternStore,
}

/// Where a decision came from. Useful for logs and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecisionSource {
    SkipList,
    LearnedPattern,
    FastPath,
    Oracle,
    FailSafe,
}

pub struct DecisionEngine {
    skip: SkipMatcher,
    oracle: SharedOracle,
    oracle_timeout: Duration,
}

impl DecisionEngine {
    pub fn new(skip: SkipMatcher, oracle: SharedOracle) -> Self {
        Self {
            skip,
            oracle,
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
        }
    }

    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }

    pub fn skip_matcher(&self) -> &SkipMatcher {
        &self.skip
    }

    pub async fn decide(&self, element: &ElementDescriptor, ctx: &DecisionContext<'_>) -> Decision {
        self.decide_traced(element, ctx).await.0
    }

    /// Same as [`DecisionEngine::decide`] but also reports which stage answered.
    pub async fn decide_traced(
        &self,
        element: &ElementDescriptor,
        ctx: &DecisionContext<'_>,
    ) -> (Decision, DecisionSource) {
        if let Some(hit) = self.skip.match_element(element) {
            debug!(locator = %element.locator, entry = %hit.entry, "skip list match");
            let decision = Decision::skip(
                format!("Skipping: {}", hit.reason),
                1.0,
                classification_of(element.category),
            );
            return (decision, DecisionSource::SkipList);
        }

        if let Some(decision) = learned_pattern(element, ctx) {
            return (decision, DecisionSource::LearnedPattern);
        }

        if let Some(decision) = fast_path(element) {
            return (decision, DecisionSource::FastPath);
        }

        match self.consult(element, ctx).await {
            Ok(decision) => (decision, DecisionSource::Oracle),
            Err(err) => {
                warn!(
                    target: "oracle",
                    oracle = self.oracle.name(),
                    locator = %element.locator,
                    error = %err,
                    "oracle unavailable; using fail-safe skip"
                );
                (Decision::fail_safe(), DecisionSource::FailSafe)
            }
        }
    }

    async fn consult(
        &self,
        element: &ElementDescriptor,
        ctx: &DecisionContext<'_>,
    ) -> Result<Decision, OracleError> {
        let prompt = OraclePrompt {
            element: element.clone(),
            current_overlay: ctx.current_overlay.map(str::to_string),
            explored_count: ctx.explored_count,
            depth: ctx.depth,
            known_patterns: ctx.patterns.kinds(),
        };
        let raw = tokio::time::timeout(self.oracle_timeout, self.oracle.consult(&prompt))
            .await
            .map_err(|_| OracleError::Timeout(self.oracle_timeout))??;
        parse_verdict(&raw)
    }
}

/// Classification implied by the element kind alone.
fn classification_of(category: ElementCategory) -> ElementClassification {
    match category {
        ElementCategory::Button | ElementCategory::Dropdown => ElementClassification::ActionButton,
        ElementCategory::Input | ElementCategory::Select | ElementCategory::Checkbox => {
            ElementClassification::Input
        }
        ElementCategory::Link => ElementClassification::Navigation,
        ElementCategory::Modal | ElementCategory::Unknown => ElementClassification::Unknown,
    }
}

fn learned_pattern(element: &ElementDescriptor, ctx: &DecisionContext<'_>) -> Option<Decision> {
    if let Some(close) = ctx.patterns.get(PatternKind::CloseButton) {
        if close.confidence > CLOSE_PATTERN_THRESHOLD {
            let is_close = CLOSE_GLYPHS.iter().any(|glyph| element.text.contains(glyph))
                || element.aria_label().to_lowercase().contains("close")
                || close.matches_example(&element.locator);
            if is_close {
                return Some(Decision::skip(
                    "Learned pattern: this closes overlays",
                    close.confidence,
                    ElementClassification::CloseButton,
                ));
            }
        }
    }

    if let Some(nav) = ctx.patterns.get(PatternKind::NavigationTrigger) {
        if nav.confidence > NAVIGATION_PATTERN_THRESHOLD
            && element.category == ElementCategory::Link
        {
            let external = element
                .attr("href")
                .is_some_and(|href| is_external(href, ctx.page_origin));
            if external || nav.matches_example(&element.locator) {
                return Some(Decision::skip(
                    "Learned pattern: this navigates away",
                    nav.confidence,
                    ElementClassification::Navigation,
                ));
            }
        }
    }
    None
}

fn fast_path(element: &ElementDescriptor) -> Option<Decision> {
    if element.category == ElementCategory::Input {
        return Some(Decision::interact(
            InteractionKind::Fill,
            "Input field, fill with test data",
            INPUT_FAST_PATH_CONFIDENCE,
            ElementClassification::Input,
        ));
    }
    if is_date_picker_trigger(element) || is_dropdown_trigger(element) {
        return Some(Decision::interact(
            InteractionKind::Click,
            "Dropdown or picker trigger, will complete selection",
            PICKER_FAST_PATH_CONFIDENCE,
            ElementClassification::ActionButton,
        ));
    }
    None
}

/// Absolute http(s) target. When the page origin is known it must differ.
fn is_external(href: &str, page_origin: Option<&str>) -> bool {
    if !href.starts_with("http") {
        return false;
    }
    let Some(origin) = page_origin else {
        return true;
    };
    match (Url::parse(href), Url::parse(origin)) {
        (Ok(target), Ok(origin)) => target.origin() != origin.origin(),
        _ => true,
    }
}

fn attribute_blob(element: &ElementDescriptor) -> String {
    serde_json::to_string(&element.attributes)
        .unwrap_or_default()
        .to_lowercase()
}

/// Element that opens a date picker widget.
pub fn is_date_picker_trigger(element: &ElementDescriptor) -> bool {
    let text = element.text.to_lowercase();
    let locator = element.locator.to_lowercase();
    let attrs = attribute_blob(element);
    ["date of birth", "select date", "dob", "birthday"]
        .iter()
        .any(|needle| text.contains(needle))
        || locator.contains("date")
        || locator.contains("dob")
        || attrs.contains("date")
        || attrs.contains("calendar")
}

/// Element that opens a country/region style dropdown.
pub fn is_dropdown_trigger(element: &ElementDescriptor) -> bool {
    let text = element.text.to_lowercase();
    let locator = element.locator.to_lowercase();
    let attrs = attribute_blob(element);
    ["select country", "select region", "select state", "choose"]
        .iter()
        .any(|needle| text.contains(needle))
        || locator.contains("country")
        || locator.contains("dropdown")
        || attrs.contains("listbox")
        || attrs.contains("combobox")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ScriptedOracle;
    use std::sync::Arc;

    fn ctx(patterns: &PatternStore) -> DecisionContext<'_> {
        DecisionContext {
            current_overlay: None,
            explored_count: 0,
            depth: 0,
            page_origin: Some("https://app.test"),
            patterns,
        }
    }

    fn engine(skip: &[&str], oracle: ScriptedOracle) -> DecisionEngine {
        DecisionEngine::new(SkipMatcher::new(skip.iter().copied()), Arc::new(oracle))
    }

    fn warmed(kind: PatternKind, example: &str) -> PatternStore {
        let mut store = PatternStore::new();
        for _ in 0..5 {
            store.reinforce(kind, example);
        }
        store
    }

    #[tokio::test]
    async fn skip_list_wins_over_learned_patterns() {
        let patterns = warmed(PatternKind::CloseButton, "#dismiss");
        let engine = engine(&["dismiss"], ScriptedOracle::new());
        let element = ElementDescriptor::new("#dismiss", "×", ElementCategory::Button);
        let (decision, source) = engine.decide_traced(&element, &ctx(&patterns)).await;
        assert_eq!(source, DecisionSource::SkipList);
        assert_eq!(decision.confidence, 1.0);
    }

    #[tokio::test]
    async fn skip_list_classification_follows_element_kind() {
        let patterns = PatternStore::new();
        let engine = engine(&["newsletter"], ScriptedOracle::new());
        let link = ElementDescriptor::new("a.newsletter", "Newsletter", ElementCategory::Link);
        let input = ElementDescriptor::new("[name=\"newsletter\"]", "", ElementCategory::Input)
            .with_attribute("name", "newsletter");
        let button = ElementDescriptor::new("#join", "Newsletter", ElementCategory::Button);

        let link = engine.decide(&link, &ctx(&patterns)).await;
        assert!(link.is_skip());
        assert_eq!(link.classification, ElementClassification::Navigation);
        let input = engine.decide(&input, &ctx(&patterns)).await;
        assert_eq!(input.classification, ElementClassification::Input);
        let button = engine.decide(&button, &ctx(&patterns)).await;
        assert_eq!(button.classification, ElementClassification::ActionButton);
    }

    #[tokio::test]
    async fn warm_close_pattern_short_circuits_oracle() {
        let patterns = warmed(PatternKind::CloseButton, "#dismiss");
        let oracle = Arc::new(ScriptedOracle::new());
        let engine = DecisionEngine::new(SkipMatcher::default(), oracle.clone());
        let element = ElementDescriptor::new("button.icon", "", ElementCategory::Button)
            .with_attribute("aria-label", "Close dialog");
        let decision = engine.decide(&element, &ctx(&patterns)).await;
        assert_eq!(decision.classification, ElementClassification::CloseButton);
        assert!(decision.is_skip());
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn cold_close_pattern_defers_to_oracle() {
        let mut patterns = PatternStore::new();
        patterns.reinforce(PatternKind::CloseButton, "#dismiss");
        let oracle = Arc::new(ScriptedOracle::new());
        let engine = DecisionEngine::new(SkipMatcher::default(), oracle.clone());
        let element = ElementDescriptor::new("#dismiss", "×", ElementCategory::Button);
        let (_, source) = engine.decide_traced(&element, &ctx(&patterns)).await;
        assert_eq!(source, DecisionSource::FailSafe);
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn navigation_pattern_only_skips_external_links() {
        let patterns = warmed(PatternKind::NavigationTrigger, "a.footer");
        let engine = engine(&[], ScriptedOracle::new());
        let external = ElementDescriptor::new("a:has-text(\"Docs\")", "Docs", ElementCategory::Link)
            .with_attribute("href", "https://docs.elsewhere.test/guide");
        let internal = ElementDescriptor::new("a:has-text(\"Home\")", "Home", ElementCategory::Link)
            .with_attribute("href", "https://app.test/home");
        let (decision, _) = engine.decide_traced(&external, &ctx(&patterns)).await;
        assert_eq!(decision.classification, ElementClassification::Navigation);
        let (_, source) = engine.decide_traced(&internal, &ctx(&patterns)).await;
        assert_eq!(source, DecisionSource::FailSafe);
    }

    #[tokio::test]
    async fn inputs_and_pickers_take_fast_paths() {
        let patterns = PatternStore::new();
        let engine = engine(&[], ScriptedOracle::new());
        let input = ElementDescriptor::new("[name=\"email\"]", "", ElementCategory::Input);
        let decision = engine.decide(&input, &ctx(&patterns)).await;
        assert_eq!(decision.interaction, InteractionKind::Fill);
        assert_eq!(decision.confidence, 0.95);

        let picker = ElementDescriptor::new(
            "button:has-text(\"Select country\")",
            "Select country",
            ElementCategory::Button,
        );
        let decision = engine.decide(&picker, &ctx(&patterns)).await;
        assert_eq!(decision.interaction, InteractionKind::Click);
        assert_eq!(decision.confidence, 0.9);
    }

    #[tokio::test]
    async fn oracle_errors_and_garbage_fail_safe() {
        let patterns = PatternStore::new();
        let oracle = ScriptedOracle::with_responses(["not json at all"]);
        oracle.push_error(OracleError::transport("connection reset"));
        let engine = engine(&[], oracle);
        let element = ElementDescriptor::new("#go", "Go", ElementCategory::Button);
        for _ in 0..3 {
            let decision = engine.decide(&element, &ctx(&patterns)).await;
            assert_eq!(decision, Decision::fail_safe());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_oracle_times_out_to_fail_safe() {
        let patterns = PatternStore::new();
        let oracle = ScriptedOracle::new()
            .with_default(r#"{"shouldInteract":true,"interactionType":"click","reasoning":"x","confidence":0.9,"elementClassification":"action_button"}"#)
            .with_delay(Duration::from_secs(60));
        let engine = engine(&[], oracle).with_oracle_timeout(Duration::from_millis(100));
        let element = ElementDescriptor::new("#go", "Go", ElementCategory::Button);
        let (decision, source) = engine.decide_traced(&element, &ctx(&patterns)).await;
        assert_eq!(source, DecisionSource::FailSafe);
        assert!(!decision.should_interact);
    }
}
