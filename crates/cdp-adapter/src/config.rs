use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where to find the browser and how long to wait for it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CdpConfig {
    /// `ws://…/devtools/browser/…`, or an `http://host:port` debugging
    /// endpoint whose `/json/version` names the socket.
    pub endpoint: String,
    pub command_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl CdpConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for CdpConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9222".into(),
            command_timeout_ms: 10_000,
            connect_timeout_ms: 5_000,
        }
    }
}
