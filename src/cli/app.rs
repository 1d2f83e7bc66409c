use anyhow::Result;
use clap::Parser;
use tracing::{debug, error, info};

use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::{init_logging, load_config, LoadedConfig};

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();

    let LoadedConfig { config, path } = load_config(cli.config.as_deref()).await?;
    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    init_logging(&level, cli.debug)?;

    debug!("Starting formfill v{}", env!("CARGO_PKG_VERSION"));
    match &path {
        Some(path) => info!("Loaded configuration from: {}", path.display()),
        None => debug!("No configuration file found, using defaults"),
    }
    let ctx = CliContext::new(config, path);

    match dispatch(&cli, &ctx).await {
        Ok(()) => {
            debug!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
