use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use soulscout_core_types::ParseTagError;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Locator prefix used for learned-pattern selector records.
pub const PATTERN_LOCATOR_PREFIX: &str = "pattern:";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeKind {
    Exploration,
    TestPattern,
    Selector,
    ErrorPattern,
}

impl KnowledgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KnowledgeKind::Exploration => "exploration",
            KnowledgeKind::TestPattern => "test_pattern",
            KnowledgeKind::Selector => "selector",
            KnowledgeKind::ErrorPattern => "error_pattern",
        }
    }
}

impl fmt::Display for KnowledgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnowledgeKind {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exploration" => Ok(KnowledgeKind::Exploration),
            "test_pattern" => Ok(KnowledgeKind::TestPattern),
            "selector" => Ok(KnowledgeKind::Selector),
            "error_pattern" => Ok(KnowledgeKind::ErrorPattern),
            other => Err(ParseTagError {
                kind: "knowledge kind",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExplorationRecord {
    pub url: String,
    pub element_category: String,
    pub locator: String,
    pub text: String,
    pub parent_context: String,
    #[serde(default)]
    pub interactions: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestPatternRecord {
    pub feature_name: String,
    pub test_name: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub assertions: Vec<String>,
    #[serde(default)]
    pub locators: Vec<String>,
    #[serde(default)]
    pub source_file: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectorRecord {
    pub locator: String,
    pub element_category: String,
    pub description: String,
    /// 0-1 score
    pub reliability: f64,
    pub last_verified: DateTime<Utc>,
    #[serde(default)]
    pub alternatives: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorPatternRecord {
    pub error_message: String,
    pub cause: String,
    pub fix: String,
    #[serde(default = "one")]
    pub occurrences: u32,
}

fn one() -> u32 {
    1
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KnowledgePayload {
    Exploration(ExplorationRecord),
    TestPattern(TestPatternRecord),
    Selector(SelectorRecord),
    ErrorPattern(ErrorPatternRecord),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: KnowledgePayload,
}

impl KnowledgeRecord {
    /// Wrap a payload, deriving the id the way the store de-duplicates it.
    pub fn new(payload: KnowledgePayload) -> Self {
        Self {
            id: derive_id(&payload),
            created_at: Utc::now(),
            payload,
        }
    }

    pub fn exploration(record: ExplorationRecord) -> Self {
        Self::new(KnowledgePayload::Exploration(record))
    }

    pub fn test_pattern(record: TestPatternRecord) -> Self {
        Self::new(KnowledgePayload::TestPattern(record))
    }

    pub fn selector(record: SelectorRecord) -> Self {
        Self::new(KnowledgePayload::Selector(record))
    }

    pub fn error_pattern(mut record: ErrorPatternRecord) -> Self {
        record.error_message = clip(&record.error_message, 100);
        Self::new(KnowledgePayload::ErrorPattern(record))
    }

    pub fn kind(&self) -> KnowledgeKind {
        match &self.payload {
            KnowledgePayload::Exploration(_) => KnowledgeKind::Exploration,
            KnowledgePayload::TestPattern(_) => KnowledgeKind::TestPattern,
            KnowledgePayload::Selector(_) => KnowledgeKind::Selector,
            KnowledgePayload::ErrorPattern(_) => KnowledgeKind::ErrorPattern,
        }
    }

    pub fn as_selector(&self) -> Option<&SelectorRecord> {
        match &self.payload {
            KnowledgePayload::Selector(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_error_pattern(&self) -> Option<&ErrorPatternRecord> {
        match &self.payload {
            KnowledgePayload::ErrorPattern(record) => Some(record),
            _ => None,
        }
    }

    /// Text the store ranks queries against.
    pub fn content(&self) -> String {
        match &self.payload {
            KnowledgePayload::Exploration(r) => format!(
                "URL: {}\nElement: {} - \"{}\"\nSelector: {}\nParent: {}\nInteractions: {}",
                r.url,
                r.element_category,
                r.text,
                r.locator,
                r.parent_context,
                r.interactions.join(", ")
            ),
            KnowledgePayload::TestPattern(r) => format!(
                "Feature: {}\nTest: {}\nSteps: {}\nAssertions: {}\nSelectors: {}\nSource: {}",
                r.feature_name,
                r.test_name,
                r.steps.join(" -> "),
                r.assertions.join(", "),
                r.locators.join(", "),
                r.source_file
            ),
            KnowledgePayload::Selector(r) => format!(
                "Selector: {}\nType: {}\nDescription: {}\nAlternatives: {}",
                r.locator,
                r.element_category,
                r.description,
                r.alternatives.join(", ")
            ),
            KnowledgePayload::ErrorPattern(r) => {
                format!("Error: {}\nCause: {}\nFix: {}", r.error_message, r.cause, r.fix)
            }
        }
    }
}

fn derive_id(payload: &KnowledgePayload) -> String {
    match payload {
        KnowledgePayload::Exploration(_) => format!("exploration_{}", Uuid::new_v4().simple()),
        KnowledgePayload::TestPattern(r) => format!(
            "pattern_{}_{}",
            sanitize(&r.feature_name),
            sanitize(&r.test_name)
        )
        .to_lowercase(),
        KnowledgePayload::Selector(r) => format!("selector_{}", sanitize(&r.locator)),
        KnowledgePayload::ErrorPattern(r) => {
            format!("error_{}", clip(&sanitize(&r.error_message), 50))
        }
    }
}

fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn clip(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
