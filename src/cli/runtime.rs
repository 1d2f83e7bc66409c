use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// `RUST_LOG` wins over `--debug`, which wins over `level`. Logs go to
/// stderr; stdout carries command output.
pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(())
}

pub struct LoadedConfig {
    pub config: Config,
    /// Where the configuration came from; `None` when defaults are used.
    pub path: Option<PathBuf>,
}

/// Lookup order: the explicit path, `./config/formfill.yaml`, then
/// `<config dir>/formfill/config.yaml`.
pub fn config_candidates(explicit: Option<&Path>) -> Vec<PathBuf> {
    if let Some(path) = explicit {
        return vec![path.to_path_buf()];
    }
    let mut candidates = vec![PathBuf::from("config/formfill.yaml")];
    if let Some(mut dir) = dirs::config_dir() {
        dir.push("formfill");
        dir.push("config.yaml");
        candidates.push(dir);
    }
    candidates
}

pub async fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    for path in config_candidates(explicit) {
        if !fs::try_exists(&path).await.unwrap_or(false) {
            if explicit.is_some() {
                anyhow::bail!("config file {} does not exist", path.display());
            }
            continue;
        }
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        return Ok(LoadedConfig {
            config,
            path: Some(path),
        });
    }
    Ok(LoadedConfig {
        config: Config::default(),
        path: None,
    })
}
