use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use super::config::ConfigArgs;
use super::fill::FillArgs;
use super::inspect::ScanArgs;
use super::serve::ServeArgs;
use crate::backend::Backend;
use crate::config::Config;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Fill the current page from a source record
    Fill(FillArgs),

    /// Classify the current page
    Context(PageArgs),

    /// List the page's controls and the options of every list
    Scan(ScanArgs),

    /// Inspect and validate configuration
    Config(ConfigArgs),

    /// Answer line-delimited JSON requests on stdin
    Serve(ServeArgs),
}

/// Which page to work on.
#[derive(Args, Clone, Debug, Default)]
pub struct PageArgs {
    /// Page snapshot (JSON) rendered in memory; nothing leaves the process
    #[arg(long, value_name = "FILE", conflicts_with = "cdp")]
    pub page: Option<PathBuf>,

    /// DevTools endpoint of a running Chromium (ws://… or http://host:port)
    #[arg(long, value_name = "ENDPOINT")]
    pub cdp: Option<String>,
}

impl PageArgs {
    pub async fn open(&self, config: &Config) -> Result<Backend> {
        Backend::open(self.page.as_deref(), self.cdp.as_deref(), config).await
    }
}
