//! Text-rule mitigations that never touch the page

use soulscout_core_types::{FailureCategory, HealingResult};

/// One rule: any of `terms` yields `fix` with `confidence`.
struct Rule {
    terms: &'static [&'static str],
    fix: &'static str,
    explanation: &'static str,
    confidence: f64,
}

const TIMING_RULES: &[Rule] = &[
    Rule {
        terms: &["timeout", "timed out"],
        fix: "Increase timeout or add explicit wait",
        explanation: "Timeout detected, increase the wait time",
        confidence: 0.8,
    },
    Rule {
        terms: &["not ready", "detached"],
        fix: "Add waitForSelector before interaction",
        explanation: "Element timing issue, wait before interacting",
        confidence: 0.7,
    },
    Rule {
        terms: &["navigation", "load"],
        fix: "Add waitForLoadState or increase navigation timeout",
        explanation: "Navigation timing issue",
        confidence: 0.6,
    },
];

const DATA_RULES: &[Rule] = &[
    Rule {
        terms: &["already exists", "duplicate"],
        fix: "Clean up test data before test or use unique identifiers",
        explanation: "Duplicate data detected, add a cleanup step",
        confidence: 0.9,
    },
    Rule {
        terms: &["not found", "does not exist"],
        fix: "Create required test data in setup",
        explanation: "Missing prerequisite data, add a setup step",
        confidence: 0.8,
    },
    Rule {
        terms: &["stale", "expired"],
        fix: "Refresh test data before test",
        explanation: "Stale data, refresh before the test",
        confidence: 0.7,
    },
];

fn apply(rules: &[Rule], category: FailureCategory, error: &str, miss: &str) -> HealingResult {
    let error = error.to_lowercase();
    rules
        .iter()
        .find(|rule| rule.terms.iter().any(|term| error.contains(term)))
        .map(|rule| {
            HealingResult::healed(
                category,
                format!("{}. Suggested fix: {}", rule.explanation, rule.fix),
                rule.confidence,
            )
        })
        .unwrap_or_else(|| HealingResult::unsuccessful(category, miss))
}

/// Suggests waits and timeouts for timing failures.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimingHealer;

impl TimingHealer {
    pub fn suggest(&self, error_message: &str) -> HealingResult {
        apply(
            TIMING_RULES,
            FailureCategory::Timing,
            error_message,
            "Not a timing-related issue",
        )
    }
}

/// Suggests setup and cleanup steps for data failures.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataHealer;

impl DataHealer {
    pub fn suggest(&self, error_message: &str) -> HealingResult {
        apply(
            DATA_RULES,
            FailureCategory::Data,
            error_message,
            "Not a data-related issue",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_rules_follow_their_order() {
        let healer = TimingHealer;
        assert_eq!(healer.suggest("Timeout 30000ms exceeded").confidence, 0.8);
        assert_eq!(healer.suggest("element is detached").confidence, 0.7);
        assert_eq!(healer.suggest("page load interrupted").confidence, 0.6);
        let miss = healer.suggest("kaboom");
        assert!(!miss.success);
        assert_eq!(miss.confidence, 0.0);
    }

    #[test]
    fn data_rules_name_their_fix() {
        let healer = DataHealer;
        let duplicate = healer.suggest("Duplicate key value");
        assert!(duplicate.success);
        assert_eq!(duplicate.confidence, 0.9);
        assert!(duplicate.explanation.contains("unique identifiers"));
        assert_eq!(healer.suggest("Record does not exist").confidence, 0.8);
        assert_eq!(healer.suggest("session expired").confidence, 0.7);
        assert_eq!(healer.suggest("kaboom").category, FailureCategory::Data);
    }
}
