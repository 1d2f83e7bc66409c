use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use action_flow::{FillReport, FormFiller, OutcomeStatus, VocabularyHints};
use anyhow::{Context, Result};
use clap::Args;
use formfill_core_types::{FieldKind, SourceRecord};
use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::info;

use super::commands::PageArgs;
use super::context::CliContext;
use super::output::{emit, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct FillArgs {
    #[command(flatten)]
    pub target: PageArgs,

    /// Source record (JSON object); `-` reads stdin
    #[arg(short, long, value_name = "FILE")]
    pub record: PathBuf,

    /// Observed option lists (JSON object of label to options)
    #[arg(long, value_name = "FILE")]
    pub hints: Option<PathBuf>,

    /// Scan the page first and use its option lists as hints
    #[arg(long)]
    pub scan_first: bool,

    /// Also write the report to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

pub async fn cmd_fill(args: FillArgs, ctx: &CliContext, format: OutputFormat) -> Result<()> {
    let record = SourceRecord::from_value(read_json(&args.record).await?)
        .with_context(|| format!("invalid source record {}", args.record.display()))?;
    let mut hints = match &args.hints {
        Some(path) => VocabularyHints::from_value(read_json(path).await?)
            .with_context(|| format!("invalid hints {}", path.display()))?,
        None => VocabularyHints::new(),
    };

    let engine = ctx.engine()?;
    let backend = args.target.open(ctx.config()).await?;

    if args.scan_first {
        let mut scanned = engine.scan(backend.page()).await?.hints();
        scanned.merge(hints);
        hints = scanned;
    }

    let report = engine.fill(backend.page(), &record, &hints).await?;
    info!(
        backend = %backend.describe(),
        applied = report.applied(),
        skipped = report.skipped(),
        "fill finished"
    );

    if let Some(path) = &args.report {
        fs::write(path, serde_json::to_vec_pretty(&report)?)
            .await
            .with_context(|| format!("writing report {}", path.display()))?;
    }
    emit(&report, format, render_report)
}

/// JSON from a file, or from stdin for `-`.
pub async fn read_json(path: &Path) -> Result<Value> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("reading stdin")?;
        buf
    } else {
        fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?
    };
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

pub fn render_report(report: &FillReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "page {} ({}) session {}",
        report.page, report.location, report.session_id
    );
    for outcome in &report.outcomes {
        let status = match outcome.status {
            OutcomeStatus::Applied => "applied",
            OutcomeStatus::AppliedOnRetry => "retried",
            OutcomeStatus::Skipped => "skipped",
        };
        let detail = match (&outcome.matched, &outcome.reason) {
            (_, Some(reason)) => reason.clone(),
            (Some(matched), None) => format!("-> {matched}"),
            (None, None) => String::new(),
        };
        let _ = writeln!(
            out,
            "  {status:<8} {:<9} {:<28} {detail}",
            outcome.kind.label(),
            outcome.field
        );
    }
    for kind in [
        FieldKind::Text,
        FieldKind::Dropdown,
        FieldKind::Toggle,
        FieldKind::Action,
    ] {
        let counts = report.counts.of(kind);
        let _ = writeln!(
            out,
            "{:<9} applied {} (on retry {}) skipped {}",
            kind.label(),
            counts.applied,
            counts.applied_on_retry,
            counts.skipped
        );
    }
    let _ = write!(out, "finished in {} ms", report.latency_ms);
    out
}
