use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use decision_engine::{OpenAiCompatibleOracle, OpenAiConfig, ScriptedOracle, SharedOracle};
use memory_center::InMemoryKnowledgeStore;
use tracing::info;

use crate::config::{OracleProvider, SoulScoutConfig};

/// Verdict the offline oracle gives every element it is asked about.
const OFFLINE_VERDICT: &str = r#"{"shouldInteract":true,"interactionType":"click","reasoning":"offline exploration clicks every candidate","confidence":0.6,"elementClassification":"action_button"}"#;

pub struct CliContext {
    config: SoulScoutConfig,
    config_path: Option<PathBuf>,
    knowledge: Arc<InMemoryKnowledgeStore>,
}

impl CliContext {
    pub fn new(config: SoulScoutConfig, config_path: Option<PathBuf>) -> Result<Self> {
        let knowledge = match &config.knowledge.path {
            Some(path) => {
                let store = InMemoryKnowledgeStore::with_persistence(path).with_context(|| {
                    format!("Failed to open knowledge store {}", path.display())
                })?;
                info!(path = %path.display(), records = store.len(), "knowledge store loaded");
                store
            }
            None => InMemoryKnowledgeStore::new(),
        };
        Ok(Self {
            config,
            config_path,
            knowledge: Arc::new(knowledge),
        })
    }

    pub fn config(&self) -> &SoulScoutConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn knowledge(&self) -> Arc<InMemoryKnowledgeStore> {
        self.knowledge.clone()
    }

    /// The reasoning oracle for `provider`, or the configured one.
    pub fn oracle(&self, provider: Option<OracleProvider>) -> Result<SharedOracle> {
        let settings = &self.config.oracle;
        match provider.unwrap_or(settings.provider) {
            OracleProvider::Scripted => {
                Ok(Arc::new(ScriptedOracle::new().with_default(OFFLINE_VERDICT)))
            }
            OracleProvider::Openai => {
                let oracle = OpenAiCompatibleOracle::new(OpenAiConfig {
                    api_keys: self.config.oracle_api_keys(),
                    model: settings.model.clone(),
                    api_base: settings.api_base.clone(),
                    temperature: settings.temperature,
                    timeout: Duration::from_millis(settings.timeout_ms),
                })
                .with_context(|| {
                    format!("Set {} to use the openai oracle", settings.api_key_env)
                })?;
                Ok(Arc::new(oracle))
            }
        }
    }
}
