//! Traversal controller
//!
//! Owns one run end to end: opens the page, walks the interactive scope,
//! recurses into overlays that open along the way, and exports an
//! [`ExplorationReport`]. All mutable run state lives in a single
//! [`ExplorationState`] passed down the recursion by `&mut`.

use action_primitives::BrowserSurface;
use async_recursion::async_recursion;
use chrono::Utc;
use decision_engine::{DecisionContext, DecisionEngine, PatternStore, SharedOracle, SkipMatcher};
use memory_center::{ExplorationRecord, KnowledgeRecord, KnowledgeSink, SelectorRecord};
use soulscout_core_types::{ElementDescriptor, InteractionLogEntry};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::discovery::{discover, Candidate};
use crate::errors::ExploreError;
use crate::executor::{ElementExecutor, ExecutionContext};
use crate::learner::{seed_patterns, OutcomeLearner};
use crate::options::ExplorerOptions;
use crate::scope::{origin_of, resolve_scope, Scope};
use crate::state::{ExplorationReport, ExplorationState};

pub struct Explorer {
    surface: Arc<dyn BrowserSurface>,
    engine: DecisionEngine,
    executor: ElementExecutor,
    learner: OutcomeLearner,
    sink: Option<KnowledgeSink>,
    options: ExplorerOptions,
    cancel: CancellationToken,
}

impl Explorer {
    pub fn new(
        surface: Arc<dyn BrowserSurface>,
        oracle: SharedOracle,
        options: ExplorerOptions,
    ) -> Self {
        let engine = DecisionEngine::new(SkipMatcher::new(options.skip_overlays.clone()), oracle)
            .with_oracle_timeout(options.oracle_timeout());
        let cancel = CancellationToken::new();
        Self {
            surface,
            engine,
            executor: ElementExecutor::new(options.action_timeout(), cancel.clone()),
            learner: OutcomeLearner::default(),
            sink: None,
            options,
            cancel,
        }
    }

    /// Persist learned patterns and discoveries, and seed from earlier runs.
    pub fn with_knowledge(mut self, sink: KnowledgeSink) -> Self {
        self.learner = OutcomeLearner::new(Some(sink.clone()));
        self.sink = Some(sink);
        self
    }

    pub fn options(&self) -> &ExplorerOptions {
        &self.options
    }

    /// Token that stops the run at the next element boundary.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Explore `url`. Only a failure to open the page is an error; anything
    /// that stops the run later is reported in [`ExplorationReport::aborted`].
    pub async fn explore(&self, url: &str) -> Result<ExplorationReport, ExploreError> {
        let mut patterns = PatternStore::new();
        if let Some(sink) = &self.sink {
            let seeded = seed_patterns(sink.store().as_ref(), &mut patterns).await;
            if seeded > 0 {
                info!(seeded, "patterns seeded from knowledge store");
            }
        }

        info!(url, max_depth = self.options.max_depth, "starting exploration");
        self.surface
            .goto(url)
            .await
            .map_err(|err| ExploreError::Navigation {
                url: url.to_string(),
                reason: err.to_string(),
            })?;

        let mut state = ExplorationState::new(url, patterns);
        let landed = self.surface.current_url().await.unwrap_or_else(|_| url.to_string());
        state.origin = origin_of(&landed);

        if let Err(err) = self.explore_scope(&mut state, 0).await {
            warn!(error = %err, severity = err.severity(), "exploration stopped early");
            state.aborted = Some(err.to_string());
        }

        self.persist_discoveries(&state);
        let final_url = self.surface.current_url().await.ok();
        info!(
            visited = state.visited.len(),
            interactions = state.log.len(),
            patterns = state.patterns.len(),
            "exploration complete"
        );
        Ok(state.into_report(final_url))
    }

    /// Explore the current scope at `depth`.
    #[async_recursion]
    async fn explore_scope(
        &self,
        state: &mut ExplorationState,
        depth: usize,
    ) -> Result<(), ExploreError> {
        self.ensure_live()?;
        if self.surface.is_closed().await {
            return Err(ExploreError::SurfaceLost("page closed".to_string()));
        }
        if depth >= self.options.max_depth {
            debug!(depth, "max depth reached");
            return Ok(());
        }

        let Some(scope) = resolve_scope(self.surface.as_ref(), state.origin.as_deref()).await else {
            info!(depth, context = %state.context_label(), "no interactive scope; ending branch");
            return Ok(());
        };
        state.deepest = state.deepest.max(depth);

        let nested = !state.modal_stack.is_empty();
        let candidates = discover(self.surface.as_ref(), &scope, nested).await?;
        debug!(
            depth,
            scope = scope.label(),
            found = candidates.len(),
            context = %state.context_label(),
            "discovered elements"
        );
        for candidate in &candidates {
            record_discovery(state, &candidate.element);
        }

        for candidate in candidates {
            self.ensure_live()?;
            if self.surface.is_closed().await {
                return Err(ExploreError::SurfaceLost("page closed".to_string()));
            }
            if resolve_scope(self.surface.as_ref(), state.origin.as_deref()).await.is_none() {
                info!(depth, "scope lost mid-branch; ending branch");
                return Ok(());
            }
            if !state.visited.insert(candidate.element.identity_key()) {
                continue;
            }
            self.visit(state, &scope, candidate, depth).await?;
        }
        Ok(())
    }

    async fn visit(
        &self,
        state: &mut ExplorationState,
        scope: &Scope,
        candidate: Candidate,
        depth: usize,
    ) -> Result<(), ExploreError> {
        let decision = {
            let ctx = DecisionContext {
                current_overlay: state.modal_stack.top(),
                explored_count: state.visited.len(),
                depth,
                page_origin: state.origin.as_deref(),
                patterns: &state.patterns,
            };
            let (decision, source) = self.engine.decide_traced(&candidate.element, &ctx).await;
            debug!(
                depth,
                locator = %candidate.element.locator,
                interaction = %decision.interaction,
                confidence = decision.confidence,
                ?source,
                rationale = %decision.rationale,
                "decision"
            );
            decision
        };

        let outcome = if decision.is_skip() {
            None
        } else {
            let ctx = ExecutionContext {
                scope,
                current_overlay: state.modal_stack.top(),
                stack: state.modal_stack.frames(),
            };
            let outcome = self
                .executor
                .execute(self.surface.as_ref(), &candidate, &decision, ctx)
                .await;
            self.learner
                .learn(&mut state.patterns, &candidate.element, &decision, &outcome);
            Some(outcome)
        };

        let opened = outcome
            .as_ref()
            .filter(|outcome| outcome.success && outcome.overlay_opened)
            .and_then(|outcome| outcome.overlay_id.clone());
        state.log.push(InteractionLogEntry {
            element: candidate.element,
            decision,
            outcome,
            context: state.context_label(),
            depth,
            timestamp: Utc::now(),
        });

        match opened {
            Some(overlay) => self.handle_new_overlay(state, overlay, depth).await,
            None => Ok(()),
        }
    }

    async fn handle_new_overlay(
        &self,
        state: &mut ExplorationState,
        overlay: String,
        depth: usize,
    ) -> Result<(), ExploreError> {
        if self.engine.skip_matcher().matches_overlay(&overlay) {
            info!(overlay = %overlay, "skip-listed overlay; closing without exploring");
            self.close_overlay().await;
            return Ok(());
        }

        if !state.modal_stack.contains(&overlay) {
            if depth + 1 >= self.options.max_depth {
                info!(overlay = %overlay, depth, "overlay beyond max depth; not exploring");
                self.close_overlay().await;
                return Ok(());
            }
            return self.explore_overlay(state, overlay, depth, true).await;
        }

        let steps = state.modal_stack.frames_for(&overlay);
        if steps >= self.options.max_form_steps {
            info!(overlay = %overlay, steps, "max form steps reached");
            return Ok(());
        }
        let step = format!("{}-step-{}", overlay, steps + 1);
        info!(overlay = %overlay, step = %step, "form step changed; re-exploring");
        self.explore_overlay(state, step, depth, false).await
    }

    /// Push `overlay`, explore it one level deeper, then close it and pop.
    ///
    /// The close and the pop run whatever the recursive call returned. A
    /// branch-local surface error ends this overlay only; surface loss and
    /// cancellation keep unwinding.
    async fn explore_overlay(
        &self,
        state: &mut ExplorationState,
        overlay: String,
        depth: usize,
        close_on_exit: bool,
    ) -> Result<(), ExploreError> {
        let scope = state.modal_stack.enter(overlay);
        debug!(overlay = scope.id(), depth = depth + 1, "entering overlay");

        let result = match self.explore_scope(state, depth + 1).await {
            Err(err) if err.is_branch_local() => {
                warn!(
                    overlay = scope.id(),
                    error = %err,
                    severity = err.severity(),
                    "overlay branch failed; continuing with siblings"
                );
                Ok(())
            }
            other => other,
        };

        if close_on_exit {
            self.close_overlay().await;
        }
        debug!(overlay = scope.id(), "leaving overlay");
        state.modal_stack.exit(scope);
        result
    }

    /// Press Escape. Against a closed page this is a logged no-op.
    async fn close_overlay(&self) {
        if self.surface.is_closed().await {
            debug!("page closed; skipping overlay close");
            return;
        }
        let ctx = action_primitives::ExecCtx::with_timeout(
            self.options.action_timeout(),
            self.cancel.child_token(),
        );
        if let Err(err) = self.surface.press_key(&ctx, "Escape").await {
            warn!(error = %err, "failed to close overlay");
        }
    }

    fn ensure_live(&self) -> Result<(), ExploreError> {
        if self.cancel.is_cancelled() {
            return Err(ExploreError::Cancelled);
        }
        Ok(())
    }

    fn persist_discoveries(&self, state: &ExplorationState) {
        let Some(sink) = &self.sink else {
            return;
        };
        for record in state.discovered.values() {
            let interactions = state
                .log
                .iter()
                .filter(|entry| entry.element.locator == record.locator)
                .map(|entry| entry.decision.interaction.to_string())
                .collect();
            let context = state
                .log
                .iter()
                .find(|entry| entry.element.locator == record.locator)
                .map(|entry| entry.context.clone())
                .unwrap_or_else(|| "root".to_string());
            sink.submit(KnowledgeRecord::exploration(ExplorationRecord {
                url: state.start_url.clone(),
                element_category: record.element_category.clone(),
                locator: record.locator.clone(),
                text: record.description.clone(),
                parent_context: context,
                interactions,
            }));
            sink.submit(KnowledgeRecord::selector(record.clone()));
        }
    }
}

fn record_discovery(state: &mut ExplorationState, element: &ElementDescriptor) {
    if state.discovered.contains_key(&element.locator) {
        return;
    }
    let placeholder = element.attr("placeholder").unwrap_or_default();
    let description = [element.text.as_str(), element.aria_label(), placeholder]
        .into_iter()
        .find(|value| !value.trim().is_empty())
        .unwrap_or_default()
        .to_string();
    state.discovered.insert(
        element.locator.clone(),
        SelectorRecord {
            locator: element.locator.clone(),
            element_category: element.category.to_string(),
            description,
            reliability: 1.0,
            last_verified: Utc::now(),
            alternatives: Vec::new(),
        },
    );
}
