//! Core data types for the browser automation surface

use serde::{Deserialize, Serialize};
use soulscout_core_types::Geometry;
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::selector::SelectorTarget;

/// Execution context for a single browser operation
///
/// Carries the deadline used to bound the operation and a cancellation
/// token shared with the whole run.
#[derive(Clone, Debug)]
pub struct ExecCtx {
    /// Deadline for this operation
    pub deadline: Instant,

    /// Cancellation token for cooperative cancellation
    pub cancel_token: CancellationToken,

    /// Unique identifier for this action
    pub action_id: String,
}

impl ExecCtx {
    /// Create a new execution context
    pub fn new(deadline: Instant, cancel_token: CancellationToken) -> Self {
        Self {
            deadline,
            cancel_token,
            action_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Context whose deadline is `timeout` from now
    pub fn with_timeout(timeout: Duration, cancel_token: CancellationToken) -> Self {
        Self::new(Instant::now() + timeout, cancel_token)
    }

    /// Check if this context has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Check if this context has exceeded its deadline
    pub fn is_timeout(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Get remaining time until deadline
    pub fn remaining_time(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// Opaque reference to a live element, valid until the next DOM mutation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(pub String);

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Introspection result for one element.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub tag: String,
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    pub visible: bool,
    pub enabled: bool,
    pub geometry: Option<Geometry>,
}

impl ElementSnapshot {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }
}

impl SelectorTarget for ElementSnapshot {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attr(name)
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn is_visible(&self) -> bool {
        self.visible
    }
}
