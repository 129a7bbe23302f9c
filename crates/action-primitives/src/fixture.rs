//! In-memory page used by the CLI's offline mode and by tests
//!
//! A fixture is a flat list of nodes with optional parent links, plus click
//! effects that show or hide nodes, navigate, fail, stall or close the page.
//! Escape hides the last visible overlay-like node.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use soulscout_core_types::Geometry;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::errors::ActionError;
use crate::selector::{Selector, SelectorTarget};
use crate::surface::BrowserSurface;
use crate::types::{ElementHandle, ElementSnapshot, ExecCtx};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixture: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse fixture: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid fixture: {0}")]
    Invalid(String),
}

/// Side effect applied when a node is clicked.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", content = "value", rename_all = "snake_case")]
pub enum ClickEffect {
    Show(String),
    Hide(String),
    Navigate(String),
    ClosePage,
    Fail(String),
    DelayMs(u64),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixtureNode {
    /// Fixture-internal key, referenced by `parent` and click effects.
    #[serde(default)]
    pub key: Option<String>,
    pub tag: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub on_click: Vec<ClickEffect>,
}

fn default_true() -> bool {
    true
}

impl FixtureNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            key: None,
            tag: tag.into(),
            text: String::new(),
            attributes: BTreeMap::new(),
            visible: true,
            enabled: true,
            parent: None,
            geometry: None,
            on_click: Vec::new(),
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn child_of(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn on_click(mut self, effect: ClickEffect) -> Self {
        self.on_click.push(effect);
        self
    }
}

/// Serialized fixture document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FixtureDocument {
    pub url: String,
    #[serde(default)]
    pub nodes: Vec<FixtureNode>,
}

struct PageState {
    url: String,
    closed: bool,
    nodes: Vec<FixtureNode>,
    /// Parent index per node, resolved at load time.
    parents: Vec<Option<usize>>,
    index: HashMap<String, usize>,
    journal: Vec<String>,
}

pub struct FixturePage {
    state: Mutex<PageState>,
}

struct NodeView<'a> {
    node: &'a FixtureNode,
    visible: bool,
}

impl SelectorTarget for NodeView<'_> {
    fn tag(&self) -> &str {
        &self.node.tag
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.node.attributes.get(name).map(String::as_str)
    }

    fn text(&self) -> &str {
        &self.node.text
    }

    fn is_visible(&self) -> bool {
        self.visible
    }
}

impl FixturePage {
    pub fn new(url: impl Into<String>, nodes: Vec<FixtureNode>) -> Result<Self, FixtureError> {
        let mut nodes = nodes;
        let mut index = HashMap::new();
        for (position, node) in nodes.iter_mut().enumerate() {
            let key = node
                .key
                .get_or_insert_with(|| format!("node-{}", position))
                .clone();
            if index.insert(key.clone(), position).is_some() {
                return Err(FixtureError::Invalid(format!("duplicate node key '{}'", key)));
            }
        }

        let mut parents = Vec::with_capacity(nodes.len());
        for (position, node) in nodes.iter().enumerate() {
            let parent = match &node.parent {
                Some(parent) => {
                    let Some(&parent_pos) = index.get(parent) else {
                        return Err(FixtureError::Invalid(format!(
                            "node {} references unknown parent '{}'",
                            position, parent
                        )));
                    };
                    if parent_pos >= position {
                        return Err(FixtureError::Invalid(format!(
                            "parent '{}' must be declared before its children",
                            parent
                        )));
                    }
                    Some(parent_pos)
                }
                None => None,
            };
            parents.push(parent);
        }

        for node in &nodes {
            for effect in &node.on_click {
                if let ClickEffect::Show(target) | ClickEffect::Hide(target) = effect {
                    if !index.contains_key(target) {
                        return Err(FixtureError::Invalid(format!(
                            "click effect references unknown node '{}'",
                            target
                        )));
                    }
                }
            }
        }

        Ok(Self {
            state: Mutex::new(PageState {
                url: url.into(),
                closed: false,
                nodes,
                parents,
                index,
                journal: Vec::new(),
            }),
        })
    }

    pub fn from_document(document: FixtureDocument) -> Result<Self, FixtureError> {
        Self::new(document.url, document.nodes)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, FixtureError> {
        let document: FixtureDocument = serde_yaml::from_str(raw)?;
        Self::from_document(document)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    /// Recorded clicks, fills and key presses in order.
    pub fn journal(&self) -> Vec<String> {
        self.state.lock().journal.clone()
    }

    /// Effective visibility of the node with `key`.
    pub fn is_visible(&self, key: &str) -> bool {
        let state = self.state.lock();
        state
            .index
            .get(key)
            .map(|&pos| state.effective_visible(pos))
            .unwrap_or(false)
    }

    pub fn attribute(&self, key: &str, name: &str) -> Option<String> {
        let state = self.state.lock();
        let pos = *state.index.get(key)?;
        state.nodes[pos].attributes.get(name).cloned()
    }

    /// Simulate the browser going away.
    pub fn close(&self) {
        self.state.lock().closed = true;
    }

    fn with_open<T>(
        &self,
        op: impl FnOnce(&mut PageState) -> Result<T, ActionError>,
    ) -> Result<T, ActionError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(ActionError::PageClosed(state.url.clone()));
        }
        op(&mut state)
    }
}

impl PageState {
    fn effective_visible(&self, pos: usize) -> bool {
        let mut current = Some(pos);
        while let Some(p) = current {
            if !self.nodes[p].visible {
                return false;
            }
            current = self.parents[p];
        }
        true
    }

    /// Node positions from the root down to `pos`.
    fn path(&self, pos: usize) -> Vec<usize> {
        let mut path = vec![pos];
        let mut current = self.parents[pos];
        while let Some(p) = current {
            path.push(p);
            current = self.parents[p];
        }
        path.reverse();
        path
    }

    fn lookup(&self, handle: &ElementHandle) -> Result<usize, ActionError> {
        self.index
            .get(&handle.0)
            .copied()
            .ok_or_else(|| ActionError::ElementNotFound(handle.0.clone()))
    }

    fn key_of(&self, pos: usize) -> String {
        self.nodes[pos].key.clone().unwrap_or_default()
    }

    fn is_overlay_like(&self, pos: usize) -> bool {
        let attrs = &self.nodes[pos].attributes;
        let role = attrs.get("role").map(String::as_str).unwrap_or_default();
        let test_id = attrs
            .get("data-testid")
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();
        matches!(role, "dialog" | "menu" | "listbox" | "tooltip")
            || attrs.get("aria-modal").map(String::as_str) == Some("true")
            || attrs.get("data-state").map(String::as_str) == Some("open")
            || ["modal", "dialog", "overlay"]
                .iter()
                .any(|needle| test_id.contains(needle))
    }

    fn interactable(&self, pos: usize) -> Result<(), ActionError> {
        let key = self.key_of(pos);
        if !self.effective_visible(pos) {
            return Err(ActionError::NotInteractable(format!("node '{}' is hidden", key)));
        }
        if !self.nodes[pos].enabled {
            return Err(ActionError::NotEnabled(format!("node '{}' is disabled", key)));
        }
        Ok(())
    }

    fn apply(&mut self, effect: &ClickEffect) {
        match effect {
            ClickEffect::Show(target) => self.set_visible(target, true),
            ClickEffect::Hide(target) => self.set_visible(target, false),
            ClickEffect::Navigate(url) => self.url = url.clone(),
            ClickEffect::ClosePage => self.closed = true,
            ClickEffect::Fail(_) | ClickEffect::DelayMs(_) => {}
        }
    }

    fn set_visible(&mut self, key: &str, visible: bool) {
        if let Some(&pos) = self.index.get(key) {
            self.nodes[pos].visible = visible;
        }
    }
}

/// Reject actions whose context is already cancelled or past its deadline.
fn admit(ctx: &ExecCtx, action: &str) -> Result<(), ActionError> {
    if ctx.is_cancelled() {
        return Err(ActionError::Interrupted("context cancelled".to_string()));
    }
    if ctx.is_timeout() {
        return Err(ActionError::Timeout(format!(
            "{} started after deadline of action {}",
            action, ctx.action_id
        )));
    }
    Ok(())
}

#[async_trait]
impl BrowserSurface for FixturePage {
    async fn goto(&self, url: &str) -> Result<(), ActionError> {
        self.with_open(|state| {
            state.url = url.to_string();
            Ok(())
        })
    }

    async fn current_url(&self) -> Result<String, ActionError> {
        self.with_open(|state| Ok(state.url.clone()))
    }

    async fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    async fn query(
        &self,
        scope: Option<&ElementHandle>,
        locator: &str,
    ) -> Result<Vec<ElementHandle>, ActionError> {
        let selector = Selector::parse(locator)?;
        self.with_open(|state| {
            let scope_pos = match scope {
                Some(handle) => Some(state.lookup(handle)?),
                None => None,
            };
            let mut found = Vec::new();
            for pos in 0..state.nodes.len() {
                let path = state.path(pos);
                if let Some(scope_pos) = scope_pos {
                    if pos == scope_pos || !path.contains(&scope_pos) {
                        continue;
                    }
                }
                let views: Vec<NodeView<'_>> = path
                    .iter()
                    .map(|&p| NodeView {
                        node: &state.nodes[p],
                        visible: state.effective_visible(p),
                    })
                    .collect();
                let targets: Vec<&dyn SelectorTarget> =
                    views.iter().map(|v| v as &dyn SelectorTarget).collect();
                if selector.matches_path(&targets) {
                    found.push(ElementHandle(state.key_of(pos)));
                }
            }
            Ok(found)
        })
    }

    async fn inspect(&self, element: &ElementHandle) -> Result<ElementSnapshot, ActionError> {
        self.with_open(|state| {
            let pos = state.lookup(element)?;
            let node = &state.nodes[pos];
            Ok(ElementSnapshot {
                tag: node.tag.clone(),
                text: node.text.clone(),
                attributes: node.attributes.clone(),
                visible: state.effective_visible(pos),
                enabled: node.enabled,
                geometry: node.geometry,
            })
        })
    }

    async fn click(&self, ctx: &ExecCtx, element: &ElementHandle) -> Result<(), ActionError> {
        admit(ctx, "click")?;
        let effects = self.with_open(|state| {
            let pos = state.lookup(element)?;
            state.interactable(pos)?;
            state.journal.push(format!("click:{}", element.0));
            Ok(state.nodes[pos].on_click.clone())
        })?;

        for effect in &effects {
            if let ClickEffect::Fail(reason) = effect {
                return Err(ActionError::SurfaceIo(reason.clone()));
            }
        }

        let delay: u64 = effects
            .iter()
            .filter_map(|effect| match effect {
                ClickEffect::DelayMs(ms) => Some(*ms),
                _ => None,
            })
            .sum();
        if delay > 0 {
            let delay = Duration::from_millis(delay);
            let remaining = ctx.remaining_time();
            if delay > remaining {
                tokio::time::sleep(remaining).await;
                return Err(ActionError::Timeout(format!(
                    "click on '{}' exceeded its deadline",
                    element.0
                )));
            }
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        for effect in &effects {
            state.apply(effect);
        }
        debug!(element = %element, effects = effects.len(), "fixture click applied");
        Ok(())
    }

    async fn fill(
        &self,
        ctx: &ExecCtx,
        element: &ElementHandle,
        value: &str,
    ) -> Result<(), ActionError> {
        admit(ctx, "fill")?;
        self.with_open(|state| {
            let pos = state.lookup(element)?;
            state.interactable(pos)?;
            let tag = state.nodes[pos].tag.to_ascii_lowercase();
            if tag != "input" && tag != "textarea" {
                return Err(ActionError::NotInteractable(format!(
                    "node '{}' is not an editable field",
                    element.0
                )));
            }
            state.nodes[pos]
                .attributes
                .insert("value".to_string(), value.to_string());
            state.journal.push(format!("fill:{}={}", element.0, value));
            Ok(())
        })
    }

    async fn press_key(&self, ctx: &ExecCtx, key: &str) -> Result<(), ActionError> {
        admit(ctx, "press_key")?;
        self.with_open(|state| {
            state.journal.push(format!("key:{}", key));
            if key == "Escape" {
                let top = (0..state.nodes.len())
                    .rev()
                    .find(|&pos| state.is_overlay_like(pos) && state.effective_visible(pos));
                if let Some(pos) = top {
                    state.nodes[pos].visible = false;
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> ExecCtx {
        ExecCtx::with_timeout(Duration::from_millis(200), CancellationToken::new())
    }

    fn page() -> FixturePage {
        FixturePage::new(
            "https://app.test/",
            vec![
                FixtureNode::new("button")
                    .key("open")
                    .text("Open")
                    .on_click(ClickEffect::Show("dialog".into())),
                FixtureNode::new("div")
                    .key("dialog")
                    .attr("role", "dialog")
                    .hidden(),
                FixtureNode::new("input")
                    .key("email")
                    .attr("type", "email")
                    .child_of("dialog"),
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn click_effects_and_escape() {
        let page = page();
        let dialog = page.first_visible(None, r#"[role="dialog"]"#).await.unwrap();
        assert!(dialog.is_none());

        page.click(&ctx(), &ElementHandle("open".into())).await.unwrap();
        assert!(page.is_visible("dialog"));
        assert!(page.is_visible("email"));

        page.press_key(&ctx(), "Escape").await.unwrap();
        assert!(!page.is_visible("dialog"));
        assert!(!page.is_visible("email"));
    }

    #[tokio::test]
    async fn scoped_query_returns_descendants_only() {
        let page = page();
        let scope = ElementHandle("dialog".into());
        let inside = page.query(Some(&scope), "input").await.unwrap();
        assert_eq!(inside, vec![ElementHandle("email".into())]);
        let everywhere = page.query(None, "button").await.unwrap();
        assert_eq!(everywhere.len(), 1);
    }

    #[tokio::test]
    async fn hidden_elements_reject_input() {
        let page = page();
        let err = page
            .fill(&ctx(), &ElementHandle("email".into()), "a@b.c")
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::NotInteractable(_)));
    }

    #[tokio::test]
    async fn delayed_click_times_out() {
        let page = FixturePage::new(
            "https://app.test/",
            vec![FixtureNode::new("button")
                .key("slow")
                .on_click(ClickEffect::DelayMs(5_000))],
        )
        .unwrap();
        let err = page
            .click(&ctx(), &ElementHandle("slow".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Timeout(_)));
    }

    #[tokio::test]
    async fn expired_context_is_rejected_before_acting() {
        let page = page();
        let expired = ExecCtx::new(std::time::Instant::now(), CancellationToken::new());
        let err = page
            .click(&expired, &ElementHandle("open".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Timeout(_)));
        assert!(page.journal().is_empty());
    }

    #[tokio::test]
    async fn closed_page_rejects_everything() {
        let page = page();
        page.close();
        assert!(page.is_closed().await);
        assert!(matches!(
            page.current_url().await,
            Err(ActionError::PageClosed(_))
        ));
    }

    #[test]
    fn goto_updates_url() {
        let page = page();
        tokio_test::block_on(page.goto("https://app.test/next")).unwrap();
        let url = tokio_test::block_on(page.current_url()).unwrap();
        assert_eq!(url, "https://app.test/next");
    }

    #[test]
    fn parses_yaml_documents() {
        let raw = r#"
url: https://app.test/
nodes:
  - key: cta
    tag: button
    text: Sign up
    on_click:
      - effect: show
        value: signup
      - effect: close_page
  - key: signup
    tag: div
    visible: false
    attributes:
      role: dialog
      data-testid: signup-modal
"#;
        let page = FixturePage::from_yaml_str(raw).unwrap();
        assert!(!page.is_visible("signup"));
        assert_eq!(
            page.attribute("signup", "data-testid").as_deref(),
            Some("signup-modal")
        );
    }

    #[test]
    fn rejects_forward_parent_references() {
        let err = FixturePage::new(
            "https://app.test/",
            vec![
                FixtureNode::new("input").key("a").child_of("b"),
                FixtureNode::new("div").key("b"),
            ],
        );
        assert!(matches!(err, Err(FixtureError::Invalid(_))));
    }
}
