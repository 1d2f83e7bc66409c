//! Page backends: a snapshot rendered in memory, or a live browser tab.

use std::path::{Path, PathBuf};

use action_locator::{Locatable, MemoryPage, PageSnapshot};
use anyhow::{bail, Context, Result};
use cdp_adapter::{CdpConfig, CdpPage};
use tracing::info;

use crate::config::Config;

pub enum Backend {
    Snapshot { page: MemoryPage, source: PathBuf },
    Live { page: CdpPage, endpoint: String },
}

impl Backend {
    /// `snapshot` wins over `cdp`, which wins over the configured endpoint.
    pub async fn open(snapshot: Option<&Path>, cdp: Option<&str>, config: &Config) -> Result<Self> {
        if let Some(path) = snapshot {
            return Self::snapshot(path).await;
        }
        let endpoint = cdp
            .map(str::to_string)
            .or_else(|| config.cdp_endpoint.clone());
        match endpoint {
            Some(endpoint) => Self::live(&endpoint).await,
            None => bail!("no page backend: pass --page <snapshot.json> or --cdp <endpoint>"),
        }
    }

    pub async fn snapshot(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading page snapshot {}", path.display()))?;
        let page = MemoryPage::from_json(&raw)
            .with_context(|| format!("parsing page snapshot {}", path.display()))?;
        info!(source = %path.display(), "using in-memory page");
        Ok(Backend::Snapshot {
            page,
            source: path.to_path_buf(),
        })
    }

    pub async fn live(endpoint: &str) -> Result<Self> {
        let page = CdpPage::connect(&CdpConfig::new(endpoint))
            .await
            .with_context(|| format!("attaching to browser at {endpoint}"))?;
        info!(%endpoint, target = page.target_id(), "attached to live page");
        Ok(Backend::Live {
            page,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn page(&self) -> &dyn Locatable {
        match self {
            Backend::Snapshot { page, .. } => page,
            Backend::Live { page, .. } => page,
        }
    }

    /// Replace the in-memory document; live pages navigate on their own.
    pub fn load(&self, snapshot: PageSnapshot) -> Result<()> {
        match self {
            Backend::Snapshot { page, .. } => {
                page.navigate(snapshot);
                Ok(())
            }
            Backend::Live { .. } => bail!("a live page cannot load a snapshot"),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Backend::Snapshot { source, .. } => format!("snapshot {}", source.display()),
            Backend::Live { endpoint, .. } => format!("cdp {endpoint}"),
        }
    }
}
