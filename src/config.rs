//! Configuration for the `soulscout` binary
//!
//! Loaded from YAML, every section optional. Environment variables override
//! a handful of values after loading.

use decision_engine::openai::{DEFAULT_API_BASE, DEFAULT_MODEL};
use explorer::ExplorerOptions;
use failure_triage::DEFAULT_ESCALATION_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_MAX_DEPTH: &str = "SOULSCOUT_MAX_DEPTH";
pub const ENV_ORACLE_MODEL: &str = "SOULSCOUT_ORACLE_MODEL";
pub const ENV_ORACLE_BASE: &str = "SOULSCOUT_ORACLE_BASE";
pub const ENV_KNOWLEDGE_PATH: &str = "SOULSCOUT_KNOWLEDGE_PATH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidOverride { key: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoulScoutConfig {
    pub explorer: ExplorerOptions,
    pub oracle: OracleSettings,
    pub knowledge: KnowledgeSettings,
    pub triage: TriageSettings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OracleProvider {
    /// Offline replay, no network
    #[default]
    Scripted,
    /// Any OpenAI-compatible chat completions endpoint
    Openai,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSettings {
    pub provider: OracleProvider,
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_ms: u64,
    /// Variable holding one key, or several separated by commas
    pub api_key_env: String,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            provider: OracleProvider::Scripted,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            timeout_ms: 15_000,
            api_key_env: "GROQ_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeSettings {
    /// JSON file mirroring the knowledge store. In-memory only when unset.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageSettings {
    pub escalation_threshold: f64,
}

impl Default for TriageSettings {
    fn default() -> Self {
        Self {
            escalation_threshold: DEFAULT_ESCALATION_THRESHOLD,
        }
    }
}

impl SoulScoutConfig {
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get(ENV_MAX_DEPTH) {
            self.explorer.max_depth =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidOverride {
                        key: ENV_MAX_DEPTH,
                        value,
                    })?;
        }
        if let Some(value) = get(ENV_ORACLE_MODEL) {
            self.oracle.model = value;
        }
        if let Some(value) = get(ENV_ORACLE_BASE) {
            self.oracle.api_base = value;
        }
        if let Some(value) = get(ENV_KNOWLEDGE_PATH) {
            self.knowledge.path = Some(PathBuf::from(value));
        }
        Ok(())
    }

    /// Keys found in the configured variable, in rotation order.
    pub fn oracle_api_keys(&self) -> Vec<String> {
        std::env::var(&self.oracle.api_key_env)
            .map(|raw| split_keys(&raw))
            .unwrap_or_default()
    }
}

fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = SoulScoutConfig::from_yaml_str("explorer:\n  max_depth: 2\n").unwrap();
        assert_eq!(config.explorer.max_depth, 2);
        assert_eq!(config.explorer.max_form_steps, 3);
        assert_eq!(config.oracle.model, "llama-3.3-70b-versatile");
        assert_eq!(config.oracle.provider, OracleProvider::Scripted);
        assert_eq!(config.triage.escalation_threshold, 0.7);
        assert_eq!(SoulScoutConfig::from_yaml_str("").unwrap(), SoulScoutConfig::default());
    }

    #[test]
    fn environment_wins_over_file() {
        let env: HashMap<&str, &str> = [
            (ENV_MAX_DEPTH, "7"),
            (ENV_ORACLE_MODEL, "mixtral"),
            (ENV_KNOWLEDGE_PATH, "/tmp/knowledge.json"),
            (ENV_ORACLE_BASE, "  "),
        ]
        .into_iter()
        .collect();
        let mut config = SoulScoutConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.explorer.max_depth, 7);
        assert_eq!(config.oracle.model, "mixtral");
        assert_eq!(config.oracle.api_base, DEFAULT_API_BASE);
        assert_eq!(
            config.knowledge.path.as_deref(),
            Some(Path::new("/tmp/knowledge.json"))
        );
    }

    #[test]
    fn bad_depth_override_is_rejected() {
        let mut config = SoulScoutConfig::default();
        let err = config
            .apply_overrides(|key| (key == ENV_MAX_DEPTH).then(|| "deep".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { .. }));
    }

    #[test]
    fn api_keys_split_on_commas() {
        assert_eq!(split_keys("a, b,,c "), vec!["a", "b", "c"]);
    }
}
