use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::record::{KnowledgeKind, KnowledgePayload, KnowledgeRecord};

pub const DEFAULT_QUERY_LIMIT: usize = 5;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("knowledge store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("knowledge store data invalid: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("knowledge store unavailable: {0}")]
    Unavailable(String),
}

/// The knowledge persistence service, injected wherever it is used.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn store(&self, record: KnowledgeRecord) -> Result<(), MemoryError>;

    /// Records ranked by relevance to `text`, optionally filtered by kind.
    async fn query(
        &self,
        text: &str,
        kind: Option<KnowledgeKind>,
        limit: usize,
    ) -> Result<Vec<KnowledgeRecord>, MemoryError>;
}

pub type SharedKnowledgeStore = Arc<dyn KnowledgeStore>;

/// Local knowledge store ranked by token overlap, optionally mirrored to a JSON file.
#[derive(Default)]
pub struct InMemoryKnowledgeStore {
    inner: DashMap<String, KnowledgeRecord>,
    storage_path: Option<PathBuf>,
    metrics: StoreMetrics,
}

#[derive(Default)]
struct StoreMetrics {
    queries: AtomicU64,
    hits: AtomicU64,
    stores: AtomicU64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeStatsSnapshot {
    pub total_queries: u64,
    pub hit_queries: u64,
    pub hit_rate: f64,
    pub stored_records: u64,
    pub current_records: u64,
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_persistence(path: impl Into<PathBuf>) -> Result<Self, MemoryError> {
        let path = path.into();
        let store = Self {
            inner: DashMap::new(),
            storage_path: Some(path.clone()),
            metrics: StoreMetrics::default(),
        };

        if path.exists() {
            let bytes = fs::read(&path)?;
            if !bytes.is_empty() {
                let records: Vec<KnowledgeRecord> = serde_json::from_slice(&bytes)?;
                for record in records {
                    store.inner.insert(record.id.clone(), record);
                }
            }
        }

        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// All records of `kind` (or every record), newest first.
    pub fn list(&self, kind: Option<KnowledgeKind>, limit: Option<usize>) -> Vec<KnowledgeRecord> {
        let mut records: Vec<KnowledgeRecord> = self
            .inner
            .iter()
            .filter(|entry| kind.map_or(true, |k| entry.value().kind() == k))
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        records
    }

    pub fn stats_snapshot(&self) -> KnowledgeStatsSnapshot {
        let total_queries = self.metrics.queries.load(Ordering::Relaxed);
        let hit_queries = self.metrics.hits.load(Ordering::Relaxed);
        KnowledgeStatsSnapshot {
            total_queries,
            hit_queries,
            hit_rate: if total_queries == 0 {
                0.0
            } else {
                hit_queries as f64 / total_queries as f64
            },
            stored_records: self.metrics.stores.load(Ordering::Relaxed),
            current_records: self.inner.len() as u64,
        }
    }

    pub fn persist_now(&self) -> Result<(), MemoryError> {
        self.persist_to_disk()
    }

    fn upsert(&self, mut record: KnowledgeRecord) {
        record.created_at = Utc::now();
        if let Some(existing) = self.inner.get(&record.id) {
            merge_into(&mut record, existing.value());
        }
        self.inner.insert(record.id.clone(), record);
    }

    fn persist_to_disk(&self) -> Result<(), MemoryError> {
        let Some(path) = self.storage_path.as_ref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut all_records: Vec<KnowledgeRecord> =
            self.inner.iter().map(|entry| entry.value().clone()).collect();
        all_records.sort_by(|a, b| a.id.cmp(&b.id));
        let json = serde_json::to_vec_pretty(&all_records)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Keep accumulated knowledge when a record with the same id is stored again.
fn merge_into(incoming: &mut KnowledgeRecord, existing: &KnowledgeRecord) {
    match (&mut incoming.payload, &existing.payload) {
        (KnowledgePayload::Selector(new), KnowledgePayload::Selector(old)) => {
            let mut seen: HashSet<String> = new.alternatives.iter().cloned().collect();
            for alternative in &old.alternatives {
                if seen.insert(alternative.clone()) {
                    new.alternatives.push(alternative.clone());
                }
            }
        }
        (KnowledgePayload::ErrorPattern(new), KnowledgePayload::ErrorPattern(old)) => {
            new.occurrences = old.occurrences.saturating_add(new.occurrences);
        }
        _ => {}
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn score(query: &str, query_tokens: &[String], record: &KnowledgeRecord) -> usize {
    let content = record.content().to_lowercase();
    let content_tokens: HashSet<String> = tokenize(&content).into_iter().collect();
    let overlap = query_tokens
        .iter()
        .filter(|token| content_tokens.contains(*token))
        .count();
    let phrase_bonus = if !query.is_empty() && content.contains(query) {
        query_tokens.len().max(1)
    } else {
        0
    };
    overlap + phrase_bonus
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    async fn store(&self, record: KnowledgeRecord) -> Result<(), MemoryError> {
        debug!(id = %record.id, kind = %record.kind(), "storing knowledge record");
        self.upsert(record);
        self.metrics.stores.fetch_add(1, Ordering::Relaxed);
        if let Err(err) = self.persist_to_disk() {
            warn!(error = %err, "memory-center persist failed after store");
        }
        Ok(())
    }

    async fn query(
        &self,
        text: &str,
        kind: Option<KnowledgeKind>,
        limit: usize,
    ) -> Result<Vec<KnowledgeRecord>, MemoryError> {
        self.metrics.queries.fetch_add(1, Ordering::Relaxed);
        let query = text.trim().to_lowercase();
        let query_tokens = tokenize(&query);

        let mut ranked: Vec<(usize, KnowledgeRecord)> = self
            .inner
            .iter()
            .filter(|entry| kind.map_or(true, |k| entry.value().kind() == k))
            .map(|entry| {
                let record = entry.value();
                (score(&query, &query_tokens, record), record.clone())
            })
            .filter(|(score, _)| query_tokens.is_empty() || *score > 0)
            .collect();

        ranked.sort_by(|(sa, a), (sb, b)| sb.cmp(sa).then_with(|| b.created_at.cmp(&a.created_at)));
        ranked.truncate(limit);

        if !ranked.is_empty() {
            self.metrics.hits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(ranked.into_iter().map(|(_, record)| record).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ErrorPatternRecord, SelectorRecord};

    fn selector(locator: &str, alternatives: &[&str]) -> KnowledgeRecord {
        KnowledgeRecord::selector(SelectorRecord {
            locator: locator.to_string(),
            element_category: "button".to_string(),
            description: String::new(),
            reliability: 0.8,
            last_verified: Utc::now(),
            alternatives: alternatives.iter().map(|s| s.to_string()).collect(),
        })
    }

    #[tokio::test]
    async fn query_ranks_by_overlap_and_filters_kind() {
        let store = InMemoryKnowledgeStore::new();
        store.store(selector("#submit-btn", &[])).await.unwrap();
        store.store(selector("#cancel", &[])).await.unwrap();
        store
            .store(KnowledgeRecord::error_pattern(ErrorPatternRecord {
                error_message: "submit btn timeout".into(),
                cause: "timing".into(),
                fix: "wait".into(),
                occurrences: 1,
            }))
            .await
            .unwrap();

        let hits = store
            .query("Selector: #submit-btn", Some(KnowledgeKind::Selector), 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].as_selector().unwrap().locator, "#submit-btn");

        let errors = store
            .query("submit", Some(KnowledgeKind::ErrorPattern), 5)
            .await
            .unwrap();
        assert_eq!(errors.len(), 1);
    }

    #[tokio::test]
    async fn restoring_a_selector_merges_alternatives() {
        let store = InMemoryKnowledgeStore::new();
        store.store(selector("#a", &["[data-testid=\"a\"]"])).await.unwrap();
        store.store(selector("#a", &["[name=\"a\"]"])).await.unwrap();
        assert_eq!(store.len(), 1);
        let record = store.list(Some(KnowledgeKind::Selector), None).remove(0);
        assert_eq!(record.as_selector().unwrap().alternatives.len(), 2);
    }

    #[tokio::test]
    async fn persistence_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge.json");
        {
            let store = InMemoryKnowledgeStore::with_persistence(&path).unwrap();
            store.store(selector("#persisted", &[])).await.unwrap();
        }
        let reloaded = InMemoryKnowledgeStore::with_persistence(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.stats_snapshot().current_records, 1);
    }
}
