//! Tiered self-heal for broken locators

use crate::errors::HealError;
use crate::strategies::{escape_quotes, text_hint, transformations};
use crate::types::*;
use action_primitives::{implicit_role, BrowserSurface};
use memory_center::LocatorMappings;
use soulscout_core_types::{FailureCategory, HealingResult};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How many text matches the semantic tier inspects.
const SEMANTIC_SCAN_LIMIT: usize = 5;

/// Recovers a broken locator against a live page.
///
/// Tiers run in strict order and the first live candidate wins. Nothing in
/// here returns an error to the caller: an exhausted ladder is an
/// unsuccessful [`HealingResult`] with confidence 0.
pub struct SelectorHealer {
    mappings: Arc<dyn LocatorMappings>,
}

impl SelectorHealer {
    pub fn new(mappings: Arc<dyn LocatorMappings>) -> Self {
        Self { mappings }
    }

    pub async fn heal(&self, surface: &dyn BrowserSurface, broken: &str) -> HealingResult {
        self.heal_traced(surface, broken).await.result
    }

    pub async fn heal_traced(&self, surface: &dyn BrowserSurface, broken: &str) -> HealOutcome {
        info!(locator = broken, "attempting selector heal");
        let mut attempted = Vec::new();

        for tier in HealTier::ladder() {
            attempted.push(tier.name());
            let hit = match tier {
                HealTier::Memorized => self.try_memorized(surface, broken).await,
                HealTier::Transformation => self.try_transformations(surface, broken).await,
                HealTier::Semantic => self.try_semantic(surface, broken).await,
            };
            match hit {
                Ok(Some((locator, confidence))) => {
                    info!(
                        locator = broken,
                        healed = %locator,
                        tier = tier.name(),
                        confidence,
                        "selector healed"
                    );
                    if tier == HealTier::Transformation {
                        self.mappings.remember(broken, &locator).await;
                    }
                    let result = HealingResult::healed(
                        FailureCategory::Selector,
                        format!("Healed '{}' to '{}' via {} tier", broken, locator, tier.name()),
                        confidence,
                    )
                    .with_locators(broken, Some(locator));
                    return HealOutcome {
                        result,
                        tier: Some(tier),
                        attempted,
                    };
                }
                Ok(None) => debug!(locator = broken, tier = tier.name(), "tier found nothing"),
                Err(err) => {
                    warn!(
                        locator = broken,
                        tier = tier.name(),
                        error = %err,
                        severity = err.severity(),
                        "heal aborted"
                    );
                    return HealOutcome {
                        result: HealingResult::unsuccessful(
                            FailureCategory::Selector,
                            format!("Could not heal '{}': {}", broken, err),
                        )
                        .with_locators(broken, None),
                        tier: None,
                        attempted,
                    };
                }
            }
        }

        HealOutcome {
            result: HealingResult::unsuccessful(
                FailureCategory::Selector,
                format!("No working alternative found for '{}'", broken),
            )
            .with_locators(broken, None),
            tier: None,
            attempted,
        }
    }

    async fn try_memorized(
        &self,
        surface: &dyn BrowserSurface,
        broken: &str,
    ) -> Result<Option<(String, f64)>, HealError> {
        let alternatives = self.mappings.alternatives(broken).await;
        first_live(surface, alternatives)
            .await
            .map(|hit| hit.map(|locator| (locator, MEMORIZED_CONFIDENCE)))
    }

    async fn try_transformations(
        &self,
        surface: &dyn BrowserSurface,
        broken: &str,
    ) -> Result<Option<(String, f64)>, HealError> {
        first_live(surface, transformations(broken))
            .await
            .map(|hit| hit.map(|locator| (locator, TRANSFORMATION_CONFIDENCE)))
    }

    async fn try_semantic(
        &self,
        surface: &dyn BrowserSurface,
        broken: &str,
    ) -> Result<Option<(String, f64)>, HealError> {
        let Some(hint) = text_hint(broken) else {
            return Ok(None);
        };
        let hint = escape_quotes(&hint);
        let search = format!("*:has-text(\"{}\")", hint);
        let matches = match surface.query(None, &search).await {
            Ok(matches) => matches,
            Err(err) => {
                let err = HealError::from(err);
                if err.is_recoverable() {
                    return Ok(None);
                }
                return Err(err);
            }
        };

        let mut by_id = None;
        let mut by_role = None;
        for handle in matches.iter().take(SEMANTIC_SCAN_LIMIT) {
            let snapshot = surface.inspect(handle).await?;
            if let Some(test_id) = snapshot.attr("data-testid").filter(|v| !v.is_empty()) {
                return Ok(Some((
                    format!("[data-testid=\"{}\"]", test_id),
                    SEMANTIC_TEST_ID_CONFIDENCE,
                )));
            }
            if by_id.is_none() {
                by_id = snapshot
                    .attr("id")
                    .filter(|v| !v.is_empty())
                    .map(|id| format!("#{}", id));
            }
            if by_role.is_none() {
                by_role = implicit_role(&snapshot)
                    .map(|role| format!("[role=\"{}\"]:has-text(\"{}\")", role, hint));
            }
        }

        Ok(by_id
            .map(|locator| (locator, SEMANTIC_ID_CONFIDENCE))
            .or_else(|| by_role.map(|locator| (locator, SEMANTIC_ROLE_CONFIDENCE))))
    }
}

/// First candidate that matches at least one element.
async fn first_live(
    surface: &dyn BrowserSurface,
    candidates: Vec<String>,
) -> Result<Option<String>, HealError> {
    for candidate in candidates {
        match surface.count(&candidate).await {
            Ok(count) if count > 0 => return Ok(Some(candidate)),
            Ok(_) => debug!(candidate = %candidate, "candidate not live"),
            Err(err) => {
                let err = HealError::from(err);
                if !err.is_recoverable() {
                    return Err(err);
                }
                debug!(candidate = %candidate, error = %err, "candidate rejected");
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_primitives::{FixtureNode, FixturePage};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Mapping store double recording what the healer memorizes.
    #[derive(Default)]
    struct Recorder {
        known: Vec<(String, String)>,
        remembered: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl LocatorMappings for Recorder {
        async fn alternatives(&self, locator: &str) -> Vec<String> {
            self.known
                .iter()
                .filter(|(broken, _)| broken == locator)
                .map(|(_, healed)| healed.clone())
                .collect()
        }

        async fn remember(&self, broken: &str, healed: &str) {
            self.remembered
                .lock()
                .unwrap()
                .push((broken.to_string(), healed.to_string()));
        }
    }

    fn page() -> FixturePage {
        FixturePage::new(
            "https://app.test/checkout",
            vec![
                FixtureNode::new("button")
                    .key("submit")
                    .text("Submit")
                    .attr("data-test-id", "submit-btn"),
                FixtureNode::new("button").key("pay").text("Pay now"),
                FixtureNode::new("span")
                    .key("pay-hint")
                    .text("Pay now or later")
                    .attr("id", "pay-hint"),
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn memorized_alternative_beats_transformation() {
        let mappings = Arc::new(Recorder {
            known: vec![("#submit-btn".into(), "button:has-text(\"Submit\")".into())],
            ..Default::default()
        });
        let healer = SelectorHealer::new(mappings.clone());
        let outcome = healer.heal_traced(&page(), "#submit-btn").await;
        assert_eq!(outcome.tier, Some(HealTier::Memorized));
        assert_eq!(outcome.healed_locator(), Some("button:has-text(\"Submit\")"));
        assert_eq!(outcome.result.confidence, MEMORIZED_CONFIDENCE);
        assert!(mappings.remembered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dead_memorized_alternative_falls_through() {
        let mappings = Arc::new(Recorder {
            known: vec![("#submit-btn".into(), "#gone".into())],
            ..Default::default()
        });
        let healer = SelectorHealer::new(mappings.clone());
        let outcome = healer.heal_traced(&page(), "#submit-btn").await;
        assert_eq!(outcome.tier, Some(HealTier::Transformation));
        assert_eq!(outcome.attempted, vec!["memorized", "transformation"]);
    }

    #[tokio::test]
    async fn semantic_tier_prefers_ids_over_roles() {
        let healer = SelectorHealer::new(Arc::new(Recorder::default()));
        let outcome = healer.heal_traced(&page(), "#pay-now").await;
        assert_eq!(outcome.tier, Some(HealTier::Semantic));
        assert_eq!(outcome.healed_locator(), Some("#pay-hint"));
        assert_eq!(outcome.result.confidence, SEMANTIC_ID_CONFIDENCE);
    }

    #[tokio::test]
    async fn semantic_tier_falls_back_to_role_and_text() {
        let page = FixturePage::new(
            "https://app.test",
            vec![FixtureNode::new("button").text("Place order")],
        )
        .unwrap();
        let healer = SelectorHealer::new(Arc::new(Recorder::default()));
        let outcome = healer.heal_traced(&page, "#place-order").await;
        assert_eq!(
            outcome.healed_locator(),
            Some("[role=\"button\"]:has-text(\"place order\")")
        );
        assert_eq!(outcome.result.confidence, SEMANTIC_ROLE_CONFIDENCE);
    }

    #[tokio::test]
    async fn exhausted_ladder_is_unsuccessful() {
        let mappings = Arc::new(Recorder::default());
        let healer = SelectorHealer::new(mappings.clone());
        let outcome = healer.heal_traced(&page(), "#does-not-exist").await;
        assert!(!outcome.is_success());
        assert_eq!(outcome.result.confidence, 0.0);
        assert_eq!(outcome.attempted.len(), 3);
        assert!(mappings.remembered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn closed_page_aborts_without_error() {
        let page = page();
        page.close();
        let healer = SelectorHealer::new(Arc::new(Recorder::default()));
        let outcome = healer.heal_traced(&page, "#submit-btn").await;
        assert!(!outcome.is_success());
        assert_eq!(outcome.attempted, vec!["memorized", "transformation"]);
    }
}
