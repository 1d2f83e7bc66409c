use std::sync::Arc;

use action_flow::FillOrchestrator;
use anyhow::Result;

use crate::config::Config;

/// Fill engine wired from the runtime configuration, waiting on the tokio
/// timer.
pub fn build_engine(config: &Config) -> Result<FillOrchestrator> {
    let fields = config.field_config()?;
    Ok(FillOrchestrator::builder(Arc::new(fields))
        .with_timings(config.timings.clone())
        .build())
}
