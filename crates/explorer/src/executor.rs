//! Runs one decision against the page and reports what changed

use action_primitives::{ActionError, BrowserSurface, ExecCtx};
use decision_engine::{is_date_picker_trigger, is_dropdown_trigger};
use once_cell::sync::Lazy;
use regex::Regex;
use soulscout_core_types::{Decision, ElementDescriptor, InteractionKind, InteractionOutcome};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::discovery::Candidate;
use crate::scope::{is_still_visible, visible_overlays, Scope};

const CONTINUE_TEXTS: &[&str] = &[
    "continue",
    "submit",
    "next",
    "next step",
    "create account",
    "sign up",
    "register",
    "save changes",
    "save",
];

static DAY_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([1-9]|[12][0-9]|3[01])$").expect("static regex"));

static STEP_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"-step-\d+$").expect("static regex"));

/// What the executor needs to know about where it is running.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext<'a> {
    pub scope: &'a Scope,
    /// Innermost modal stack frame, if any.
    pub current_overlay: Option<&'a str>,
    /// Every frame currently on the modal stack.
    pub stack: &'a [String],
}

pub struct ElementExecutor {
    timeout: Duration,
    cancel: CancellationToken,
}

impl ElementExecutor {
    pub fn new(timeout: Duration, cancel: CancellationToken) -> Self {
        Self { timeout, cancel }
    }

    fn exec_ctx(&self) -> ExecCtx {
        ExecCtx::with_timeout(self.timeout, self.cancel.child_token())
    }

    /// Execute `decision`. Action failures come back as a failed outcome.
    pub async fn execute(
        &self,
        surface: &dyn BrowserSurface,
        candidate: &Candidate,
        decision: &Decision,
        ctx: ExecutionContext<'_>,
    ) -> InteractionOutcome {
        match self.run(surface, candidate, decision, ctx).await {
            Ok(outcome) => outcome,
            Err(err) => {
                debug!(locator = %candidate.element.locator, error = %err, "interaction failed");
                InteractionOutcome::failed(err.to_string())
            }
        }
    }

    async fn run(
        &self,
        surface: &dyn BrowserSurface,
        candidate: &Candidate,
        decision: &Decision,
        ctx: ExecutionContext<'_>,
    ) -> Result<InteractionOutcome, ActionError> {
        let element = &candidate.element;
        match decision.interaction {
            InteractionKind::Skip => Ok(InteractionOutcome::default()),
            InteractionKind::Fill => {
                let value = test_value(element);
                let exec = self.exec_ctx();
                self.bounded(&exec, surface.fill(&exec, &candidate.handle, value))
                    .await?;
                Ok(InteractionOutcome::succeeded())
            }
            InteractionKind::Click | InteractionKind::ExploreDeeper => {
                if is_date_picker_trigger(element) || is_dropdown_trigger(element) {
                    self.click(surface, candidate).await?;
                    self.complete_selection(surface, element).await;
                    return Ok(InteractionOutcome::succeeded());
                }
                if is_continue_button(element) {
                    return self.click_continue(surface, candidate, ctx).await;
                }
                let before = Snapshot::take(surface).await?;
                self.click(surface, candidate).await?;
                self.observe(surface, ctx, before).await
            }
        }
    }

    async fn click(
        &self,
        surface: &dyn BrowserSurface,
        candidate: &Candidate,
    ) -> Result<(), ActionError> {
        let exec = self.exec_ctx();
        self.bounded(&exec, surface.click(&exec, &candidate.handle)).await
    }

    /// Enforce the action deadline even when the surface does not.
    async fn bounded<F>(&self, exec: &ExecCtx, action: F) -> Result<(), ActionError>
    where
        F: std::future::Future<Output = Result<(), ActionError>>,
    {
        match tokio::time::timeout(exec.remaining_time(), action).await {
            Ok(result) => result,
            Err(_) => Err(ActionError::Timeout(format!(
                "action {} exceeded {:?}",
                exec.action_id, self.timeout
            ))),
        }
    }

    /// Click a continue-style button. Inside an overlay, a change in the
    /// number of visible inputs is reported as a form step of that overlay.
    async fn click_continue(
        &self,
        surface: &dyn BrowserSurface,
        candidate: &Candidate,
        ctx: ExecutionContext<'_>,
    ) -> Result<InteractionOutcome, ActionError> {
        let before = Snapshot::take(surface).await?;
        let inputs_before = visible_input_count(surface, ctx.scope).await?;
        self.click(surface, candidate).await?;
        if surface.is_closed().await {
            return Ok(InteractionOutcome::succeeded());
        }

        if let (Some(current), Some(handle)) = (ctx.current_overlay, ctx.scope.handle()) {
            let inputs_after = visible_input_count(surface, ctx.scope).await?;
            if inputs_after != inputs_before && is_still_visible(surface, handle).await {
                debug!(inputs_before, inputs_after, overlay = current, "form progressed");
                let mut outcome = InteractionOutcome::succeeded();
                outcome.overlay_opened = true;
                outcome.overlay_id = Some(STEP_SUFFIX.replace(current, "").into_owned());
                return Ok(outcome);
            }
        }
        self.observe(surface, ctx, before).await
    }

    async fn observe(
        &self,
        surface: &dyn BrowserSurface,
        ctx: ExecutionContext<'_>,
        before: Snapshot,
    ) -> Result<InteractionOutcome, ActionError> {
        let mut outcome = InteractionOutcome::succeeded();
        if surface.is_closed().await {
            return Ok(outcome);
        }
        outcome.navigated = surface.current_url().await? != before.url;

        let overlays = visible_overlays(surface).await?;
        let fresh = overlays.into_iter().find(|overlay| {
            !ctx.stack.iter().any(|frame| frame == &overlay.id)
                && !before.overlays.contains(&overlay.id)
        });
        if let Some(overlay) = fresh {
            outcome.overlay_opened = true;
            outcome.overlay_id = Some(overlay.id);
        }

        if let Some(handle) = ctx.scope.handle() {
            outcome.overlay_closed = !is_still_visible(surface, handle).await;
        }
        Ok(outcome)
    }

    /// Pick a value once a date picker or dropdown is open.
    async fn complete_selection(&self, surface: &dyn BrowserSurface, trigger: &ElementDescriptor) {
        let option = if is_date_picker_trigger(trigger) {
            first_day_button(surface).await
        } else {
            surface
                .first_visible(None, r#"[role="option"]"#)
                .await
                .ok()
                .flatten()
                .map(|(handle, _)| handle)
        };
        let Some(option) = option else {
            debug!(locator = %trigger.locator, "no selectable option after opening picker");
            return;
        };
        let exec = self.exec_ctx();
        if let Err(err) = self.bounded(&exec, surface.click(&exec, &option)).await {
            warn!(locator = %trigger.locator, error = %err, "failed to complete picker selection");
        }
    }
}

/// Page state captured before a click.
struct Snapshot {
    url: String,
    overlays: Vec<String>,
}

impl Snapshot {
    async fn take(surface: &dyn BrowserSurface) -> Result<Self, ActionError> {
        let url = surface.current_url().await?;
        let overlays = visible_overlays(surface)
            .await?
            .into_iter()
            .map(|overlay| overlay.id)
            .collect();
        Ok(Self { url, overlays })
    }
}

async fn first_day_button(
    surface: &dyn BrowserSurface,
) -> Option<action_primitives::ElementHandle> {
    let handles = surface.query(None, "button").await.ok()?;
    for handle in handles {
        let Ok(snapshot) = surface.inspect(&handle).await else {
            continue;
        };
        if snapshot.visible && snapshot.enabled && DAY_NUMBER.is_match(snapshot.text.trim()) {
            return Some(handle);
        }
    }
    None
}

async fn visible_input_count(
    surface: &dyn BrowserSurface,
    scope: &Scope,
) -> Result<usize, ActionError> {
    Ok(surface.query(scope.handle(), "input:visible").await?.len())
}

pub fn is_continue_button(element: &ElementDescriptor) -> bool {
    let text = element.text.trim().to_lowercase();
    CONTINUE_TEXTS.contains(&text.as_str())
}

/// Fill value matching the field's type, name, id or placeholder.
pub fn test_value(element: &ElementDescriptor) -> &'static str {
    let field = |name: &str| element.attr(name).unwrap_or_default().to_lowercase();
    let (kind, name, id) = (field("type"), field("name"), field("id"));
    let placeholder = field("placeholder");
    let mentions = |needle: &str| kind == needle || name.contains(needle) || id.contains(needle);

    if mentions("email") {
        "test@example.com"
    } else if mentions("password") {
        "TestPassword123!"
    } else if mentions("tel") || mentions("phone") {
        "+1234567890"
    } else if placeholder.contains("name") {
        "Test User"
    } else {
        "test input"
    }
}
