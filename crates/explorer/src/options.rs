use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MAX_DEPTH: usize = 5;
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 3_000;
pub const DEFAULT_MAX_FORM_STEPS: usize = 3;
pub const DEFAULT_ORACLE_TIMEOUT_MS: u64 = 15_000;

/// Knobs for a single exploration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerOptions {
    /// Overlay nesting limit. The root scope is depth 0.
    pub max_depth: usize,
    pub action_timeout_ms: u64,
    pub max_form_steps: usize,
    pub oracle_timeout_ms: u64,
    /// Overlay ids (and trigger aliases) never explored.
    pub skip_overlays: Vec<String>,
}

impl Default for ExplorerOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            action_timeout_ms: DEFAULT_ACTION_TIMEOUT_MS,
            max_form_steps: DEFAULT_MAX_FORM_STEPS,
            oracle_timeout_ms: DEFAULT_ORACLE_TIMEOUT_MS,
            skip_overlays: Vec::new(),
        }
    }
}

impl ExplorerOptions {
    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }
}
