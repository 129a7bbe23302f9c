//! Pattern learning from observed interaction outcomes

use chrono::Utc;
use decision_engine::{Pattern, PatternStore};
use memory_center::{
    KnowledgeKind, KnowledgeRecord, KnowledgeSink, KnowledgeStore, SelectorRecord,
    DEFAULT_QUERY_LIMIT, PATTERN_LOCATOR_PREFIX,
};
use soulscout_core_types::{
    Decision, ElementClassification, ElementDescriptor, InteractionOutcome, PatternKind,
};
use tracing::{debug, info, warn};

/// Reinforces patterns after each executed decision.
///
/// Updates are additive only. Every pattern that changed is handed to the
/// knowledge sink, if one is attached, without waiting for the write.
#[derive(Clone, Default)]
pub struct OutcomeLearner {
    sink: Option<KnowledgeSink>,
}

impl OutcomeLearner {
    pub fn new(sink: Option<KnowledgeSink>) -> Self {
        Self { sink }
    }

    /// Apply the learning rules. Returns the kinds that were reinforced.
    pub fn learn(
        &self,
        patterns: &mut PatternStore,
        element: &ElementDescriptor,
        decision: &Decision,
        outcome: &InteractionOutcome,
    ) -> Vec<PatternKind> {
        if !outcome.success {
            return Vec::new();
        }
        let mut reinforced = Vec::new();

        if decision.classification == ElementClassification::CloseButton
            && (outcome.overlay_closed || outcome.navigated)
        {
            reinforced.push(PatternKind::CloseButton);
        }
        if outcome.navigated && !outcome.overlay_opened {
            reinforced.push(PatternKind::NavigationTrigger);
        }

        for kind in &reinforced {
            let pattern = patterns.reinforce(*kind, &element.locator);
            info!(
                pattern = %kind,
                confidence = pattern.confidence,
                locator = %element.locator,
                "pattern reinforced"
            );
            self.persist(pattern);
        }
        reinforced
    }

    fn persist(&self, pattern: &Pattern) {
        let Some(sink) = &self.sink else {
            return;
        };
        sink.submit(pattern_record(pattern));
    }
}

/// Selector record a pattern is stored as.
pub fn pattern_record(pattern: &Pattern) -> KnowledgeRecord {
    KnowledgeRecord::selector(SelectorRecord {
        locator: format!("{}{}", PATTERN_LOCATOR_PREFIX, pattern.kind),
        element_category: pattern.kind.to_string(),
        description: format!(
            "Learned pattern with {:.2} confidence",
            pattern.confidence
        ),
        reliability: pattern.confidence,
        last_verified: Utc::now(),
        alternatives: pattern.examples.clone(),
    })
}

/// Seed `patterns` from previously persisted pattern records.
///
/// Lookup failures leave the store untouched. Returns how many kinds were seeded.
pub async fn seed_patterns(store: &dyn KnowledgeStore, patterns: &mut PatternStore) -> usize {
    let mut seeded = 0;
    for kind in PatternKind::ALL {
        let locator = format!("{}{}", PATTERN_LOCATOR_PREFIX, kind);
        let query = format!("Selector: {}", locator);
        let records = match store
            .query(&query, Some(KnowledgeKind::Selector), DEFAULT_QUERY_LIMIT)
            .await
        {
            Ok(records) => records,
            Err(err) => {
                warn!(error = %err, pattern = %kind, "pattern seed lookup failed");
                continue;
            }
        };
        let Some(record) = records
            .iter()
            .filter_map(KnowledgeRecord::as_selector)
            .find(|record| record.locator == locator)
        else {
            continue;
        };
        patterns.seed(kind, record.reliability, record.alternatives.clone());
        debug!(pattern = %kind, confidence = patterns.confidence(kind), "pattern seeded");
        seeded += 1;
    }
    seeded
}
