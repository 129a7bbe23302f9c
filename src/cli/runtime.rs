use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use super::output::LogFormat;
use crate::config::SoulScoutConfig;

pub fn init_logging(level: &str, debug: bool, format: LogFormat) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));
    let registry = tracing_subscriber::registry().with(filter);

    // Reports go to stdout, so logs stay on stderr.
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }

    Ok(())
}

pub struct LoadedConfig {
    pub config: SoulScoutConfig,
    pub path: Option<PathBuf>,
}

pub fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let candidate = match config_path {
        Some(path) => {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            Some(path.clone())
        }
        None => {
            // Priority: ./config/soulscout.yaml > ~/.config/soulscout/config.yaml
            let local_config = PathBuf::from("config/soulscout.yaml");
            if local_config.exists() {
                Some(local_config)
            } else {
                dirs::config_dir()
                    .map(|dir| dir.join("soulscout").join("config.yaml"))
                    .filter(|path| path.exists())
            }
        }
    };

    let mut loaded = match &candidate {
        Some(path) => match SoulScoutConfig::from_path(path) {
            Ok(config) => {
                info!("Loaded configuration from: {}", path.display());
                LoadedConfig {
                    config,
                    path: candidate.clone(),
                }
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "config unreadable, using defaults");
                LoadedConfig {
                    config: SoulScoutConfig::default(),
                    path: None,
                }
            }
        },
        None => {
            info!("No config file found, using defaults");
            LoadedConfig {
                config: SoulScoutConfig::default(),
                path: None,
            }
        }
    };

    loaded
        .config
        .apply_env_overrides()
        .context("Invalid environment override")?;
    Ok(loaded)
}
