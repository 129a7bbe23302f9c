//! Error-text taxonomy

use crate::types::TestFailure;
use soulscout_core_types::FailureCategory;

const TIMING_TERMS: &[&str] = &["timeout", "timed out", "detached", "not ready"];
const DATA_TERMS: &[&str] = &["already exists", "duplicate", "invalid data"];
const LOGIC_TERMS: &[&str] = &["expect", "assertion", "equal", "match"];
const ENVIRONMENT_TERMS: &[&str] = &["network", "connection", "refused", "econnrefused"];
const POLICY_EXCLUDED_TERMS: &[&str] = &["security", "auth"];

fn mentions_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| text.contains(term))
}

/// Classify a failure by ordered keyword matching over its error text.
///
/// Selector terms win over timing terms, except that a message naming a
/// selector only as the thing being waited for is a timing failure.
pub fn classify(failure: &TestFailure) -> FailureCategory {
    let error = failure.error_message.to_lowercase();
    let timing = mentions_any(&error, TIMING_TERMS);
    let not_found = error.contains("not found");
    let page = error.contains("page");

    if error.contains("locator")
        || error.contains("element")
        || (error.contains("selector") && !timing)
        || (not_found && page)
    {
        return FailureCategory::Selector;
    }
    if timing {
        return FailureCategory::Timing;
    }
    if mentions_any(&error, DATA_TERMS) || (not_found && !page) {
        return FailureCategory::Data;
    }
    if mentions_any(&error, LOGIC_TERMS) {
        return FailureCategory::Logic;
    }
    if mentions_any(&error, ENVIRONMENT_TERMS) {
        return FailureCategory::Environment;
    }
    FailureCategory::Unknown
}

/// Whether a failure may be auto-healed at all.
///
/// Logic failures never are, and neither is any security or auth test.
pub fn should_heal(failure: &TestFailure) -> bool {
    if classify(failure) == FailureCategory::Logic {
        return false;
    }
    !mentions_any(&failure.test_name.to_lowercase(), POLICY_EXCLUDED_TERMS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(error: &str) -> FailureCategory {
        classify(&TestFailure::new("checkout", error))
    }

    #[test]
    fn keywords_are_checked_in_priority_order() {
        assert_eq!(
            category("locator('#buy') resolved to 0 elements"),
            FailureCategory::Selector
        );
        assert_eq!(category("Target not found on page"), FailureCategory::Selector);
        assert_eq!(
            category("Timeout 30000ms exceeded waiting for selector"),
            FailureCategory::Timing
        );
        assert_eq!(category("Node is detached from document"), FailureCategory::Timing);
        assert_eq!(category("User already exists"), FailureCategory::Data);
        assert_eq!(category("Order 42 not found"), FailureCategory::Data);
        assert_eq!(
            category("expect(received).toBe(expected)"),
            FailureCategory::Logic
        );
        assert_eq!(category("connect ECONNREFUSED 127.0.0.1"), FailureCategory::Environment);
        assert_eq!(category("segfault"), FailureCategory::Unknown);
    }

    #[test]
    fn element_wait_timeouts_stay_selector_failures() {
        assert_eq!(
            category("Timeout waiting for element to be visible"),
            FailureCategory::Selector
        );
    }

    #[test]
    fn auth_and_logic_failures_are_never_healed() {
        assert!(!should_heal(&TestFailure::new("login auth flow", "Timeout 5000ms")));
        assert!(!should_heal(&TestFailure::new("Security headers", "network down")));
        assert!(!should_heal(&TestFailure::new("cart", "assertion failed")));
        assert!(should_heal(&TestFailure::new("cart", "Timeout 5000ms")));
    }
}
