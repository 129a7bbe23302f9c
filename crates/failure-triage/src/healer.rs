//! Routes classified failures to the matching healer

use crate::classifier::{classify, should_heal};
use crate::errors::TriageError;
use crate::report;
use crate::suggesters::{DataHealer, TimingHealer};
use crate::types::{HealingReport, HealingStats, TestFailure};
use action_locator::SelectorHealer;
use action_primitives::BrowserSurface;
use memory_center::{ErrorPatternRecord, KnowledgeRecord, SharedKnowledgeStore};
use parking_lot::Mutex;
use soulscout_core_types::{FailureCategory, HealingResult};
use tracing::{info, warn};

/// Confidence below which a healed failure still goes to a human.
pub const DEFAULT_ESCALATION_THRESHOLD: f64 = 0.7;

/// Healing orchestrator.
///
/// Selector failures go through the [`SelectorHealer`] ladder when a live
/// page and the failing locator are both known. Timing and data failures get
/// a text-rule suggestion. Logic and environment failures are escalated
/// without any attempt.
pub struct FailureHealer {
    selector: SelectorHealer,
    timing: TimingHealer,
    data: DataHealer,
    knowledge: Option<SharedKnowledgeStore>,
    escalation_threshold: f64,
    history: Mutex<Vec<HealingReport>>,
}

impl FailureHealer {
    pub fn new(selector: SelectorHealer) -> Self {
        Self {
            selector,
            timing: TimingHealer,
            data: DataHealer,
            knowledge: None,
            escalation_threshold: DEFAULT_ESCALATION_THRESHOLD,
            history: Mutex::new(Vec::new()),
        }
    }

    /// Store successful heals as error patterns.
    pub fn with_knowledge(mut self, store: SharedKnowledgeStore) -> Self {
        self.knowledge = Some(store);
        self
    }

    pub fn with_escalation_threshold(mut self, threshold: f64) -> Self {
        self.escalation_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn classify(&self, failure: &TestFailure) -> FailureCategory {
        classify(failure)
    }

    pub fn should_heal(&self, failure: &TestFailure) -> bool {
        should_heal(failure)
    }

    /// Heal one failure. The report is also appended to the history.
    pub async fn heal(
        &self,
        failure: TestFailure,
        surface: Option<&dyn BrowserSurface>,
    ) -> HealingReport {
        let category = classify(&failure);
        info!(
            test = %failure.test_name,
            category = %category,
            "analyzing failure"
        );

        if !should_heal(&failure) {
            info!(test = %failure.test_name, "failure excluded from auto-healing");
            let report = HealingReport {
                result: HealingResult::unsuccessful(
                    category,
                    "Excluded from auto-healing by policy",
                ),
                failure,
                attempted_strategies: vec!["policy_excluded".to_string()],
                should_escalate: true,
            };
            self.history.lock().push(report.clone());
            return report;
        }

        let mut attempted = Vec::new();
        let result = match category {
            FailureCategory::Selector => match (surface, failure.locator.as_deref()) {
                (Some(surface), Some(locator)) => {
                    attempted.push("selector_healing".to_string());
                    self.selector.heal(surface, locator).await
                }
                _ => HealingResult::unsuccessful(
                    FailureCategory::Selector,
                    "Cannot heal selector without page context",
                ),
            },
            FailureCategory::Timing => {
                attempted.push("timing_healing".to_string());
                self.timing.suggest(&failure.error_message)
            }
            FailureCategory::Data => {
                attempted.push("data_healing".to_string());
                self.data.suggest(&failure.error_message)
            }
            FailureCategory::Logic => {
                attempted.push("logic_analysis".to_string());
                HealingResult::unsuccessful(
                    FailureCategory::Logic,
                    "Logic/assertion errors require human review",
                )
            }
            FailureCategory::Environment => {
                attempted.push("environment_check".to_string());
                HealingResult::unsuccessful(
                    FailureCategory::Environment,
                    "Environment issues require infrastructure fix",
                )
            }
            FailureCategory::Unknown => HealingResult::unsuccessful(
                FailureCategory::Unknown,
                "Unable to classify or heal this failure",
            ),
        };

        if result.success {
            if let Err(err) = self.store_error_pattern(&failure, &result).await {
                warn!(error = %err, test = %failure.test_name, "error pattern not stored");
            }
        }

        let should_escalate = !result.success
            || result.confidence < self.escalation_threshold
            || category == FailureCategory::Logic;
        if result.success {
            info!(confidence = result.confidence, "healing succeeded");
        } else {
            info!(explanation = %result.explanation, should_escalate, "healing failed");
        }

        let report = HealingReport {
            failure,
            result,
            attempted_strategies: attempted,
            should_escalate,
        };
        self.history.lock().push(report.clone());
        report
    }

    async fn store_error_pattern(
        &self,
        failure: &TestFailure,
        result: &HealingResult,
    ) -> Result<(), TriageError> {
        let Some(store) = &self.knowledge else {
            return Ok(());
        };
        let fix = result
            .new_locator
            .clone()
            .unwrap_or_else(|| result.explanation.clone());
        store
            .store(KnowledgeRecord::error_pattern(ErrorPatternRecord {
                error_message: failure.error_message.clone(),
                cause: result.category.to_string(),
                fix,
                occurrences: 1,
            }))
            .await?;
        Ok(())
    }

    pub fn history(&self) -> Vec<HealingReport> {
        self.history.lock().clone()
    }

    pub fn stats(&self) -> HealingStats {
        report::stats(&self.history.lock())
    }

    /// Markdown summary of every attempt so far.
    pub fn render_report(&self) -> String {
        report::render(&self.history.lock())
    }

    pub fn history_json(&self) -> Result<String, TriageError> {
        Ok(serde_json::to_string_pretty(&*self.history.lock())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_primitives::{FixtureNode, FixturePage};
    use memory_center::{InMemoryKnowledgeStore, KnowledgeLocatorMappings};
    use std::sync::Arc;

    fn healer() -> FailureHealer {
        let store = Arc::new(InMemoryKnowledgeStore::new());
        FailureHealer::new(SelectorHealer::new(Arc::new(KnowledgeLocatorMappings::new(
            store,
        ))))
    }

    #[tokio::test]
    async fn selector_failure_without_page_is_escalated() {
        let healer = healer();
        let failure = TestFailure::new("checkout", "locator('#buy') not visible")
            .with_locator("#buy");
        let report = healer.heal(failure, None).await;
        assert!(!report.result.success);
        assert_eq!(
            report.result.explanation,
            "Cannot heal selector without page context"
        );
        assert!(report.attempted_strategies.is_empty());
        assert!(report.should_escalate);
    }

    #[tokio::test]
    async fn selector_failure_is_healed_against_the_page() {
        let healer = healer();
        let page = FixturePage::new(
            "https://shop.test/",
            vec![FixtureNode::new("button")
                .text("Buy")
                .attr("data-testid", "buy")],
        )
        .unwrap();
        let failure = TestFailure::new("checkout", "locator('#buy') resolved to 0 elements")
            .with_locator("#buy");
        let report = healer.heal(failure, Some(&page)).await;
        assert!(report.result.success);
        assert_eq!(report.attempted_strategies, vec!["selector_healing"]);
        assert_eq!(
            report.result.new_locator.as_deref(),
            Some("[data-testid=\"buy\"]")
        );
        assert!(!report.should_escalate);
    }

    #[tokio::test]
    async fn low_confidence_suggestion_still_escalates() {
        let healer = healer();
        let report = healer
            .heal(TestFailure::new("search", "Node is detached from DOM"), None)
            .await;
        assert!(report.result.success);
        assert_eq!(report.result.confidence, 0.7);
        assert!(!report.should_escalate);

        let strict = self::healer().with_escalation_threshold(0.75);
        let report = strict
            .heal(TestFailure::new("search", "Node is detached from DOM"), None)
            .await;
        assert!(report.should_escalate);
    }

    #[tokio::test]
    async fn environment_failures_are_never_attempted() {
        let healer = healer();
        let report = healer
            .heal(TestFailure::new("search", "net::ERR_CONNECTION_REFUSED"), None)
            .await;
        assert_eq!(report.result.category, FailureCategory::Environment);
        assert_eq!(report.attempted_strategies, vec!["environment_check"]);
        assert!(report.should_escalate);
        assert_eq!(healer.history().len(), 1);
    }
}
