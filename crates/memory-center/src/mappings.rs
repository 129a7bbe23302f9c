use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

use crate::record::{KnowledgeKind, KnowledgeRecord, SelectorRecord};
use crate::store::{SharedKnowledgeStore, DEFAULT_QUERY_LIMIT};

/// Reliability recorded for a mapping learned by healing.
pub const HEALED_MAPPING_RELIABILITY: f64 = 0.8;

/// Memorized broken-locator to working-locator mappings.
///
/// Both operations are best effort: lookups degrade to "nothing known" and
/// writes are logged on failure.
#[async_trait]
pub trait LocatorMappings: Send + Sync {
    async fn alternatives(&self, locator: &str) -> Vec<String>;

    async fn remember(&self, broken: &str, healed: &str);
}

/// Mapping store backed by selector records in a [`crate::KnowledgeStore`].
pub struct KnowledgeLocatorMappings {
    store: SharedKnowledgeStore,
}

impl KnowledgeLocatorMappings {
    pub fn new(store: SharedKnowledgeStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LocatorMappings for KnowledgeLocatorMappings {
    async fn alternatives(&self, locator: &str) -> Vec<String> {
        let query = format!("Selector: {}", locator);
        let records = match self
            .store
            .query(&query, Some(KnowledgeKind::Selector), DEFAULT_QUERY_LIMIT)
            .await
        {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, locator, "locator mapping lookup failed");
                return Vec::new();
            }
        };

        let mut alternatives = Vec::new();
        for record in &records {
            let Some(selector) = record.as_selector() else {
                continue;
            };
            if selector.locator != locator {
                continue;
            }
            for alternative in &selector.alternatives {
                if alternative != locator && !alternatives.contains(alternative) {
                    alternatives.push(alternative.clone());
                }
            }
        }
        alternatives
    }

    async fn remember(&self, broken: &str, healed: &str) {
        let record = KnowledgeRecord::selector(SelectorRecord {
            locator: broken.to_string(),
            element_category: "unknown".to_string(),
            description: format!("Healed to {}", healed),
            reliability: HEALED_MAPPING_RELIABILITY,
            last_verified: Utc::now(),
            alternatives: vec![healed.to_string()],
        });
        if let Err(err) = self.store.store(record).await {
            warn!(error = %err, broken, healed, "failed to memorize locator mapping");
        }
    }
}
