use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::OracleError;
use crate::prompt::OraclePrompt;

/// External reasoning capability consulted when no learned pattern applies.
///
/// Returns the raw model output; verdict parsing happens in the engine.
#[async_trait]
pub trait ReasoningOracle: Send + Sync {
    async fn consult(&self, prompt: &OraclePrompt) -> Result<String, OracleError>;

    fn name(&self) -> &str {
        "oracle"
    }
}

pub type SharedOracle = Arc<dyn ReasoningOracle>;

/// Deterministic oracle used for tests and offline runs.
///
/// Replays queued responses in order; once drained it answers with the
/// default response, or `OracleError::Exhausted` when none is set.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    queue: Mutex<VecDeque<Result<String, OracleError>>>,
    default_response: Option<String>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let oracle = Self::new();
        for response in responses {
            oracle.push_response(response);
        }
        oracle
    }

    pub fn with_default(mut self, response: impl Into<String>) -> Self {
        self.default_response = Some(response.into());
        self
    }

    /// Delay every answer, for exercising oracle timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_response(&self, response: impl Into<String>) {
        self.queue.lock().push_back(Ok(response.into()));
    }

    pub fn push_error(&self, error: OracleError) {
        self.queue.lock().push_back(Err(error));
    }

    /// Rendered prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl ReasoningOracle for ScriptedOracle {
    async fn consult(&self, prompt: &OraclePrompt) -> Result<String, OracleError> {
        self.prompts.lock().push(prompt.render());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.queue.lock().pop_front();
        match next {
            Some(response) => response,
            None => self
                .default_response
                .clone()
                .ok_or(OracleError::Exhausted),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soulscout_core_types::{ElementCategory, ElementDescriptor};

    fn prompt() -> OraclePrompt {
        OraclePrompt {
            element: ElementDescriptor::new("#a", "A", ElementCategory::Button),
            current_overlay: None,
            explored_count: 0,
            depth: 0,
            known_patterns: vec![],
        }
    }

    #[test]
    fn replays_queue_then_default() {
        futures::executor::block_on(async {
            let oracle = ScriptedOracle::with_responses(["first"]).with_default("fallback");
            oracle.push_error(OracleError::transport("boom"));
            assert_eq!(oracle.consult(&prompt()).await.unwrap(), "first");
            assert!(oracle.consult(&prompt()).await.is_err());
            assert_eq!(oracle.consult(&prompt()).await.unwrap(), "fallback");
            assert_eq!(oracle.calls(), 3);
        });
    }

    #[test]
    fn drained_oracle_without_default_is_exhausted() {
        futures::executor::block_on(async {
            let oracle = ScriptedOracle::new();
            assert_eq!(oracle.consult(&prompt()).await, Err(OracleError::Exhausted));
        });
    }
}
