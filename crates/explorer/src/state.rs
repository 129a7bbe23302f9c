//! Per-run traversal state owned by a single traversal context

use chrono::{DateTime, Utc};
use decision_engine::{Pattern, PatternStore};
use memory_center::SelectorRecord;
use serde::Serialize;
use soulscout_core_types::{IdentityKey, InteractionLogEntry, RunId};
use std::collections::{BTreeMap, HashSet};
use tracing::{error, warn};

/// Ordered record of the overlays currently being explored.
///
/// Frames are only pushed through [`ModalStack::enter`] and only popped by
/// handing the returned [`ModalScope`] back to [`ModalStack::exit`].
#[derive(Debug, Default, Clone)]
pub struct ModalStack {
    frames: Vec<String>,
    pushes: u64,
    pops: u64,
}

/// Proof that an overlay frame is on the stack. Must be returned via `exit`.
#[must_use = "a modal scope must be handed back to ModalStack::exit"]
#[derive(Debug)]
pub struct ModalScope {
    id: String,
    height: usize,
    released: bool,
}

impl ModalScope {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for ModalScope {
    fn drop(&mut self) {
        if !self.released {
            error!(overlay = %self.id, "overlay scope dropped without exit");
        }
    }
}

impl ModalStack {
    pub fn enter(&mut self, id: impl Into<String>) -> ModalScope {
        let id = id.into();
        self.frames.push(id.clone());
        self.pushes += 1;
        ModalScope {
            id,
            height: self.frames.len(),
            released: false,
        }
    }

    pub fn exit(&mut self, mut scope: ModalScope) {
        if self.frames.len() != scope.height || self.top() != Some(scope.id.as_str()) {
            warn!(
                overlay = %scope.id,
                expected_height = scope.height,
                actual_height = self.frames.len(),
                "modal stack out of order on exit"
            );
        }
        self.frames.truncate(scope.height.saturating_sub(1));
        self.pops += 1;
        scope.released = true;
    }

    pub fn top(&self) -> Option<&str> {
        self.frames.last().map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.frames.iter().any(|frame| frame == id)
    }

    /// Frames belonging to `id`, including its form steps.
    pub fn frames_for(&self, id: &str) -> usize {
        let step_prefix = format!("{}-step-", id);
        self.frames
            .iter()
            .filter(|frame| frame.as_str() == id || frame.starts_with(&step_prefix))
            .count()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    /// True when every push has been matched by a pop.
    pub fn is_balanced(&self) -> bool {
        self.pushes == self.pops && self.frames.is_empty()
    }

    pub fn pushes(&self) -> u64 {
        self.pushes
    }
}

/// Everything one run accumulates.
#[derive(Debug)]
pub struct ExplorationState {
    pub run_id: RunId,
    pub start_url: String,
    pub origin: Option<String>,
    pub visited: HashSet<IdentityKey>,
    pub modal_stack: ModalStack,
    pub discovered: BTreeMap<String, SelectorRecord>,
    pub log: Vec<InteractionLogEntry>,
    pub patterns: PatternStore,
    pub deepest: usize,
    pub aborted: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl ExplorationState {
    pub fn new(start_url: impl Into<String>, patterns: PatternStore) -> Self {
        Self {
            run_id: RunId::new(),
            start_url: start_url.into(),
            origin: None,
            visited: HashSet::new(),
            modal_stack: ModalStack::default(),
            discovered: BTreeMap::new(),
            log: Vec::new(),
            patterns,
            deepest: 0,
            aborted: None,
            started_at: Utc::now(),
        }
    }

    /// "root" or "overlay:<id>" for the innermost frame.
    pub fn context_label(&self) -> String {
        match self.modal_stack.top() {
            Some(id) => format!("overlay:{}", id),
            None => "root".to_string(),
        }
    }

    pub fn into_report(self, final_url: Option<String>) -> ExplorationReport {
        ExplorationReport {
            run_id: self.run_id.to_string(),
            url: self.start_url,
            final_url,
            visited_count: self.visited.len(),
            deepest: self.deepest,
            stack_balanced: self.modal_stack.is_balanced(),
            discovered: self.discovered.into_values().collect(),
            interactions: self.log,
            patterns: self.patterns.patterns().cloned().collect(),
            aborted: self.aborted,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Exportable summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct ExplorationReport {
    pub run_id: String,
    pub url: String,
    pub final_url: Option<String>,
    pub visited_count: usize,
    pub deepest: usize,
    pub stack_balanced: bool,
    pub discovered: Vec<SelectorRecord>,
    pub interactions: Vec<InteractionLogEntry>,
    pub patterns: Vec<Pattern>,
    pub aborted: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExplorationReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Log entries whose element carries `locator`.
    pub fn entries_for<'a>(
        &'a self,
        locator: &'a str,
    ) -> impl Iterator<Item = &'a InteractionLogEntry> {
        self.interactions
            .iter()
            .filter(move |entry| entry.element.locator == locator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_and_exit_pair_up() {
        let mut stack = ModalStack::default();
        let outer = stack.enter("signup-modal");
        let inner = stack.enter("signup-modal-step-1");
        assert_eq!(stack.frames_for("signup-modal"), 2);
        stack.exit(inner);
        assert_eq!(stack.top(), Some("signup-modal"));
        stack.exit(outer);
        assert!(stack.is_balanced());
        assert_eq!(stack.pushes(), 2);
    }

    #[test]
    fn nested_overlays_sharing_a_prefix_are_not_form_steps() {
        let mut stack = ModalStack::default();
        let menu = stack.enter("menu");
        let settings = stack.enter("menu-settings");
        let step = stack.enter("menu-step-2");
        assert_eq!(stack.frames_for("menu"), 2);
        assert_eq!(stack.frames_for("menu-settings"), 1);
        stack.exit(step);
        stack.exit(settings);
        stack.exit(menu);
        assert!(stack.is_balanced());
    }

    #[test]
    fn out_of_order_exit_still_truncates() {
        let mut stack = ModalStack::default();
        let outer = stack.enter("a");
        let inner = stack.enter("b");
        stack.exit(outer);
        assert!(stack.is_empty());
        stack.exit(inner);
        assert!(stack.is_balanced());
    }

    #[test]
    fn context_label_tracks_top_frame() {
        let mut state = ExplorationState::new("https://app.test", PatternStore::new());
        assert_eq!(state.context_label(), "root");
        let scope = state.modal_stack.enter("cart");
        assert_eq!(state.context_label(), "overlay:cart");
        state.modal_stack.exit(scope);
    }
}
