//! Runtime configuration
//!
//! Log level, engine timings, where the field mapping lives and how to reach
//! a browser. Read from YAML; every key is optional.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use fill_config::{default_fields, load_fields_from_path, FieldConfig, Timings};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub timings: Timings,
    /// Field mapping file; the embedded mapping when absent.
    pub field_mapping: Option<PathBuf>,
    /// DevTools endpoint used when no backend flag is given.
    pub cdp_endpoint: Option<String>,
    /// Added to the mapping's own generic hosts.
    pub generic_hosts: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            timings: Timings::default(),
            field_mapping: None,
            cdp_endpoint: None,
            generic_hosts: Vec::new(),
        }
    }
}

impl Config {
    /// Load and validate the field mapping this configuration points at.
    pub fn field_config(&self) -> Result<FieldConfig> {
        let mut fields = match &self.field_mapping {
            Some(path) => {
                let fields = load_fields_from_path(path)
                    .with_context(|| format!("loading field mapping {}", path.display()))?;
                info!(path = %path.display(), "loaded field mapping");
                fields
            }
            None => default_fields().context("embedded field mapping is invalid")?,
        };

        if !self.generic_hosts.is_empty() {
            let mut hosts: BTreeSet<String> = fields.generic_hosts.drain(..).collect();
            hosts.extend(self.generic_hosts.iter().map(|h| h.trim().to_lowercase()));
            fields.generic_hosts = hosts.into_iter().filter(|h| !h.is_empty()).collect();
        }
        Ok(fields)
    }
}
