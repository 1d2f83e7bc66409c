use anyhow::Result;
use clap::Args;
use tokio::io::{self, BufReader};
use tracing::info;

use super::commands::PageArgs;
use super::context::CliContext;
use crate::control::ControlSurface;

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub target: PageArgs,
}

/// Requests on stdin, responses on stdout, until stdin closes.
pub async fn cmd_serve(args: ServeArgs, ctx: &CliContext) -> Result<()> {
    let engine = ctx.engine()?;
    let backend = args.target.open(ctx.config()).await?;
    info!(backend = %backend.describe(), "serving requests on stdin");

    let mut surface = ControlSurface::new(&engine, &backend);
    surface
        .run(BufReader::new(io::stdin()), io::stdout())
        .await?;

    info!("input closed, shutting down");
    Ok(())
}
