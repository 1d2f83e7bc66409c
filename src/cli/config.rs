use anyhow::Result;
use clap::{Args, Subcommand};
use fill_config::{FieldConfig, PatternWarning};
use serde::Serialize;

use super::context::CliContext;
use super::output::{emit, OutputFormat};
use crate::config::Config;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective runtime configuration
    Show,

    /// Load the configuration and field mapping and report problems
    Validate,

    /// Print the effective field mapping
    Fields,
}

#[derive(Serialize)]
struct ValidationSummary {
    config_file: Option<String>,
    field_mapping: String,
    text_fields: usize,
    dropdowns: usize,
    toggles: usize,
    entity_groups: usize,
    warnings: Vec<PatternWarning>,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext, format: OutputFormat) -> Result<()> {
    match args.action {
        ConfigAction::Show => emit(ctx.config(), format, |config: &Config| {
            let source = ctx
                .config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "defaults".into());
            format!(
                "Current configuration ({source}):\n{}",
                serde_yaml::to_string(config).unwrap_or_default()
            )
        }),
        ConfigAction::Validate => {
            let fields = ctx.config().field_config()?;
            let summary = ValidationSummary {
                config_file: ctx.config_path().map(|p| p.display().to_string()),
                field_mapping: ctx
                    .config()
                    .field_mapping
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "embedded".into()),
                text_fields: fields.text_fields.len(),
                dropdowns: fields.dropdowns.base.len()
                    + fields.dropdowns.auto.len()
                    + fields.dropdowns.home.len(),
                toggles: fields.toggles.fields.len(),
                entity_groups: fields.entities.len(),
                warnings: fields.pattern_warnings(),
            };
            emit(&summary, format, render_validation)
        }
        ConfigAction::Fields => {
            let fields = ctx.config().field_config()?;
            emit(&fields, format, |fields: &FieldConfig| {
                serde_yaml::to_string(fields).unwrap_or_default()
            })
        }
    }
}

fn render_validation(summary: &ValidationSummary) -> String {
    let mut lines = vec![
        format!(
            "Configuration {} is valid",
            summary.config_file.as_deref().unwrap_or("(defaults)")
        ),
        format!(
            "Field mapping {}: {} text fields, {} dropdowns, {} toggles, {} entity groups",
            summary.field_mapping,
            summary.text_fields,
            summary.dropdowns,
            summary.toggles,
            summary.entity_groups
        ),
    ];
    for warning in &summary.warnings {
        lines.push(format!(
            "warning: {} pattern {:?} skipped: {}",
            warning.location, warning.pattern, warning.reason
        ));
    }
    lines.join("\n")
}
