use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::CdpConfig;
use crate::error::CdpError;

/// Resolve the browser-level DevTools websocket URL. Websocket endpoints are
/// returned as given; HTTP endpoints are asked for `/json/version`.
pub async fn resolve_ws_url(cfg: &CdpConfig) -> Result<String, CdpError> {
    let endpoint = Url::parse(cfg.endpoint.trim())
        .map_err(|err| CdpError::Connect(format!("invalid endpoint '{}': {err}", cfg.endpoint)))?;
    match endpoint.scheme() {
        "ws" | "wss" => Ok(endpoint.to_string()),
        "http" | "https" => {
            let version = endpoint
                .join("/json/version")
                .map_err(|err| CdpError::Connect(err.to_string()))?;
            debug!(target: "cdp-transport", url = %version, "discovering websocket endpoint");
            let client = reqwest::Client::builder()
                .timeout(cfg.connect_timeout())
                .build()
                .map_err(|err| CdpError::Connect(err.to_string()))?;
            let payload: Value = client
                .get(version)
                .send()
                .await
                .and_then(|resp| resp.error_for_status())
                .map_err(|err| CdpError::Connect(err.to_string()))?
                .json()
                .await
                .map_err(|err| CdpError::Connect(err.to_string()))?;
            ws_url_from_version(&payload)
        }
        other => Err(CdpError::Connect(format!("unsupported endpoint scheme '{other}'"))),
    }
}

/// Pick `webSocketDebuggerUrl` out of a `/json/version` response.
pub fn ws_url_from_version(payload: &Value) -> Result<String, CdpError> {
    payload
        .get("webSocketDebuggerUrl")
        .and_then(Value::as_str)
        .filter(|ws| ws.starts_with("ws"))
        .map(str::to_string)
        .ok_or_else(|| CdpError::Payload("version response lacks webSocketDebuggerUrl".into()))
}
