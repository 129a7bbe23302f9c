//! Classifier input and healing reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use soulscout_core_types::{FailureCategory, HealingResult};

/// One failing test as reported by the runner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestFailure {
    pub test_name: String,
    pub error_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl TestFailure {
    pub fn new(test_name: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            error_message: error_message.into(),
            locator: None,
            page_url: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = Some(locator.into());
        self
    }

    pub fn with_page_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = Some(url.into());
        self
    }
}

/// What happened to one failure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealingReport {
    pub failure: TestFailure,
    pub result: HealingResult,
    pub attempted_strategies: Vec<String>,
    pub should_escalate: bool,
}

/// Attempts and successes for one category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub attempts: usize,
    pub successes: usize,
}

impl CategoryStats {
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.successes as f64 / self.attempts as f64
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HealingStats {
    pub total_attempts: usize,
    pub success_rate: f64,
    /// Every category, in classification order
    pub by_category: Vec<(FailureCategory, CategoryStats)>,
}

impl HealingStats {
    pub fn category(&self, category: FailureCategory) -> CategoryStats {
        self.by_category
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, stats)| *stats)
            .unwrap_or_default()
    }
}
