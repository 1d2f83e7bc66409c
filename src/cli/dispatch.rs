use anyhow::Result;

use super::config::cmd_config;
use super::context::CliContext;
use super::env::CliArgs;
use super::fill::cmd_fill;
use super::inspect::{cmd_context, cmd_scan};
use super::serve::cmd_serve;
use crate::cli::commands::Commands;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Fill(args) => cmd_fill(args, ctx, cli.output).await,
        Commands::Context(args) => cmd_context(args, ctx, cli.output).await,
        Commands::Scan(args) => cmd_scan(args, ctx, cli.output).await,
        Commands::Config(args) => cmd_config(args, ctx, cli.output).await,
        Commands::Serve(args) => cmd_serve(args, ctx).await,
    }
}
