use chrono::Utc;
use memory_center::{
    InMemoryKnowledgeStore, KnowledgeKind, KnowledgeLocatorMappings, KnowledgeRecord,
    KnowledgeSink, KnowledgeStore, LocatorMappings, SelectorRecord, PATTERN_LOCATOR_PREFIX,
};
use std::sync::Arc;

fn pattern_record(kind: &str, confidence: f64) -> KnowledgeRecord {
    KnowledgeRecord::selector(SelectorRecord {
        locator: format!("{}{}", PATTERN_LOCATOR_PREFIX, kind),
        element_category: kind.to_string(),
        description: format!("Learned pattern with {} confidence", confidence),
        reliability: confidence,
        last_verified: Utc::now(),
        alternatives: vec!["[aria-label=\"Close\"]".to_string()],
    })
}

#[tokio::test]
async fn sink_writes_are_visible_after_flush_and_survive_reload() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("knowledge.json");

    let store = Arc::new(InMemoryKnowledgeStore::with_persistence(&path).expect("store"));
    let sink = KnowledgeSink::new(store.clone());
    sink.submit(pattern_record("close_button", 0.6));
    sink.submit(pattern_record("navigation_trigger", 0.6));
    sink.flush().await;

    let reloaded = InMemoryKnowledgeStore::with_persistence(&path).expect("reload");
    let patterns = reloaded
        .query("Selector: pattern:", Some(KnowledgeKind::Selector), 10)
        .await
        .expect("query");
    assert_eq!(patterns.len(), 2);
    assert!(patterns
        .iter()
        .all(|r| r.as_selector().unwrap().locator.starts_with(PATTERN_LOCATOR_PREFIX)));
}

#[tokio::test]
async fn mappings_share_storage_with_discovered_selectors() {
    let store = Arc::new(InMemoryKnowledgeStore::new());
    store
        .store(KnowledgeRecord::selector(SelectorRecord {
            locator: "#login".to_string(),
            element_category: "button".to_string(),
            description: "Log in".to_string(),
            reliability: 1.0,
            last_verified: Utc::now(),
            alternatives: vec![],
        }))
        .await
        .expect("store");

    let mappings = KnowledgeLocatorMappings::new(store.clone());
    mappings.remember("#login", "[data-testid=\"login\"]").await;

    assert_eq!(store.len(), 1);
    assert_eq!(
        mappings.alternatives("#login").await,
        vec!["[data-testid=\"login\"]".to_string()]
    );
}
