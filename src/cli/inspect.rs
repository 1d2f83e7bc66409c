use std::fmt::Write as _;
use std::path::PathBuf;

use action_flow::{ControlInventory, FormFiller};
use anyhow::{Context, Result};
use clap::Args;
use page_context::PageContext;
use tokio::fs;

use super::commands::PageArgs;
use super::context::CliContext;
use super::output::{emit, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub target: PageArgs,

    /// Write the observed option lists as a hints file for `fill --hints`
    #[arg(long, value_name = "FILE")]
    pub hints_out: Option<PathBuf>,
}

pub async fn cmd_context(args: PageArgs, ctx: &CliContext, format: OutputFormat) -> Result<()> {
    let engine = ctx.engine()?;
    let backend = args.open(ctx.config()).await?;
    let context = engine.context(backend.page()).await?;
    emit(&context, format, render_context)
}

pub async fn cmd_scan(args: ScanArgs, ctx: &CliContext, format: OutputFormat) -> Result<()> {
    let engine = ctx.engine()?;
    let backend = args.target.open(ctx.config()).await?;
    let inventory = engine.scan(backend.page()).await?;

    if let Some(path) = &args.hints_out {
        fs::write(path, serde_json::to_vec_pretty(&inventory.hints())?)
            .await
            .with_context(|| format!("writing hints {}", path.display()))?;
    }
    emit(&inventory, format, render_inventory)
}

fn render_context(context: &PageContext) -> String {
    let mut out = format!("{}  {}", context.kind, context.location);
    if !context.heading.is_empty() {
        let _ = write!(out, "  \"{}\"", context.heading);
    }
    out
}

fn render_inventory(inventory: &ControlInventory) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "page {} ({})", inventory.page, inventory.location);
    let _ = writeln!(out, "text entries: {}", inventory.text_entries.len());
    for entry in &inventory.text_entries {
        let name = [&entry.label, &entry.name, &entry.id]
            .into_iter()
            .find(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| entry.tag.clone());
        let required = if entry.required { " *" } else { "" };
        let _ = writeln!(out, "  {name}{required} [{}] = {:?}", entry.input_type, entry.value);
    }
    for (title, lists) in [
        ("native lists", &inventory.native_lists),
        ("custom dropdowns", &inventory.custom_dropdowns),
    ] {
        let _ = writeln!(out, "{title}: {}", lists.len());
        for (key, list) in lists {
            let _ = writeln!(out, "  {key}: {}", list.options.join(" | "));
        }
    }
    let _ = write!(out, "options observed: {}", inventory.option_count());
    out
}
