use decision_engine::{
    DecisionContext, DecisionEngine, DecisionSource, PatternStore, ScriptedOracle, SkipMatcher,
};
use soulscout_core_types::{
    ElementCategory, ElementClassification, ElementDescriptor, InteractionKind, PatternKind,
};
use std::sync::Arc;

fn root_context(patterns: &PatternStore) -> DecisionContext<'_> {
    DecisionContext {
        current_overlay: None,
        explored_count: 4,
        depth: 0,
        page_origin: Some("https://shop.test"),
        patterns,
    }
}

#[tokio::test]
async fn log_in_button_is_skipped_by_login_entry() {
    let mut patterns = PatternStore::new();
    for _ in 0..5 {
        patterns.reinforce(PatternKind::SafeAction, "button:has-text(\"Log In\")");
    }
    let oracle = Arc::new(ScriptedOracle::new());
    let engine = DecisionEngine::new(SkipMatcher::new(["login"]), oracle.clone());
    let element = ElementDescriptor::new(
        "button:has-text(\"Log In\")",
        "Log In",
        ElementCategory::Button,
    );

    let decision = engine.decide(&element, &root_context(&patterns)).await;

    assert!(!decision.should_interact);
    assert_eq!(decision.interaction, InteractionKind::Skip);
    assert_eq!(decision.confidence, 1.0);
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn prose_wrapped_verdict_is_used() {
    let oracle = Arc::new(ScriptedOracle::with_responses([
        "Looking at this element, I think:\n{\"shouldInteract\": true, \"interactionType\": \"explore_deeper\", \"reasoning\": \"Opens the cart drawer\", \"confidence\": 0.72, \"elementClassification\": \"action_button\"}\nLet me know if you need more.",
    ]));
    let engine = DecisionEngine::new(SkipMatcher::default(), oracle.clone());
    let patterns = PatternStore::new();
    let element = ElementDescriptor::new("[data-testid=\"cart\"]", "Cart", ElementCategory::Button)
        .with_attribute("data-testid", "cart");

    let (decision, source) = engine.decide_traced(&element, &root_context(&patterns)).await;

    assert_eq!(source, DecisionSource::Oracle);
    assert!(decision.should_interact);
    assert_eq!(decision.interaction, InteractionKind::ExploreDeeper);
    assert_eq!(decision.classification, ElementClassification::ActionButton);
    assert_eq!(decision.rationale, "Opens the cart drawer");

    let prompts = oracle.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Elements explored: 4"));
    assert!(prompts[0].contains("Selector: [data-testid=\"cart\"]"));
}
