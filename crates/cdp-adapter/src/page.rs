//! Live page over DevTools.
//!
//! Every capability call evaluates one small script in the attached page.
//! Elements are tagged with a `data-formfill-ref` attribute the first time a
//! query returns them; handles carry that token and re-find the element on
//! each call, so a removed element reports [`LocatorError::StaleHandle`].

use std::fmt;
use std::sync::Arc;

use action_locator::{
    ControlHandle, ControlInfo, ControlRef, DomEvent, Locatable, LocatorError, LocatorPattern,
    NativeOption, HEADING_PATTERN,
};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::CdpConfig;
use crate::error::CdpError;
use crate::transport::{CdpTransport, ChromiumTransport, CommandTarget};
use crate::util::resolve_ws_url;

const RUNTIME: &str = include_str!("runtime.js");
const DOCUMENT: &str = "document";

#[derive(Serialize)]
struct Request<'a> {
    op: &'a str,
    token: Option<&'a str>,
    args: Value,
}

struct Session {
    transport: Arc<dyn CdpTransport>,
    session_id: String,
}

impl Session {
    async fn evaluate(&self, expression: String) -> Result<Value, CdpError> {
        let response = self
            .transport
            .send_command(
                CommandTarget::Session(self.session_id.clone()),
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "awaitPromise": true,
                    "returnByValue": true,
                    "userGesture": true,
                }),
            )
            .await?;

        if let Some(details) = response.get("exceptionDetails") {
            let text = details
                .pointer("/exception/description")
                .or_else(|| details.get("text"))
                .and_then(Value::as_str)
                .unwrap_or("uncaught exception");
            return Err(CdpError::Script(text.to_string()));
        }
        Ok(response
            .pointer("/result/value")
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn call(&self, op: &str, token: Option<&str>, args: Value) -> Result<Value, LocatorError> {
        let pattern = args
            .get("pattern")
            .and_then(Value::as_str)
            .map(str::to_string);
        let request = serde_json::to_string(&Request { op, token, args })
            .map_err(|err| LocatorError::Internal(err.to_string()))?;
        let reply = self
            .evaluate(format!("({})({request})", RUNTIME.trim()))
            .await?;

        if reply.get("stale").and_then(Value::as_bool) == Some(true) {
            return Err(LocatorError::StaleHandle(token.unwrap_or(DOCUMENT).to_string()));
        }
        if let Some(reason) = reply.get("invalid").and_then(Value::as_str) {
            return Err(LocatorError::InvalidPattern {
                pattern: pattern.unwrap_or_default(),
                reason: reason.to_string(),
            });
        }
        if let Some(error) = reply.get("error").and_then(Value::as_str) {
            return Err(LocatorError::Backend(format!("{op}: {error}")));
        }
        reply
            .get("ok")
            .cloned()
            .ok_or_else(|| LocatorError::Backend(format!("{op}: malformed runtime reply")))
    }

    async fn key(&self, params: Value) -> Result<(), LocatorError> {
        self.transport
            .send_command(
                CommandTarget::Session(self.session_id.clone()),
                "Input.dispatchKeyEvent",
                params,
            )
            .await?;
        Ok(())
    }
}

fn checked(pattern: &str) -> Result<(), LocatorError> {
    LocatorPattern::parse(pattern).map(|_| ())
}

fn control(session: &Arc<Session>, value: Value) -> Option<ControlRef> {
    value.as_str().map(|token| {
        Arc::new(CdpControl {
            session: session.clone(),
            token: token.to_string(),
        }) as ControlRef
    })
}

fn controls(session: &Arc<Session>, value: Value) -> Vec<ControlRef> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| control(session, item))
            .collect(),
        _ => Vec::new(),
    }
}

fn string(value: Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}

fn virtual_key_code(key: &str) -> Option<u32> {
    Some(match key {
        "Escape" => 27,
        "Enter" => 13,
        "Tab" => 9,
        "Backspace" => 8,
        "ArrowUp" => 38,
        "ArrowDown" => 40,
        _ => return None,
    })
}

/// The first page tab of a browser, attached in flat session mode.
#[derive(Clone)]
pub struct CdpPage {
    session: Arc<Session>,
    target_id: String,
}

impl fmt::Debug for CdpPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CdpPage")
            .field("target_id", &self.target_id)
            .field("session_id", &self.session.session_id)
            .finish()
    }
}

impl CdpPage {
    /// Resolve the endpoint, open the socket and attach to the first page.
    pub async fn connect(cfg: &CdpConfig) -> Result<Self, CdpError> {
        let ws_url = resolve_ws_url(cfg).await?;
        let transport = tokio::time::timeout(
            cfg.connect_timeout(),
            ChromiumTransport::connect(&ws_url, cfg.command_timeout()),
        )
        .await
        .map_err(|_| CdpError::Timeout("connect".into()))??;
        Self::attach(Arc::new(transport)).await
    }

    pub async fn attach(transport: Arc<dyn CdpTransport>) -> Result<Self, CdpError> {
        let targets = transport
            .send_command(CommandTarget::Browser, "Target.getTargets", json!({}))
            .await?;
        let target_id = targets
            .get("targetInfos")
            .and_then(Value::as_array)
            .and_then(|infos| {
                infos
                    .iter()
                    .find(|info| info.get("type").and_then(Value::as_str) == Some("page"))
            })
            .and_then(|info| info.get("targetId"))
            .and_then(Value::as_str)
            .ok_or(CdpError::NoPage)?
            .to_string();

        let attached = transport
            .send_command(
                CommandTarget::Browser,
                "Target.attachToTarget",
                json!({ "targetId": target_id, "flatten": true }),
            )
            .await?;
        let session_id = attached
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| CdpError::Payload("attachToTarget returned no sessionId".into()))?
            .to_string();

        info!(target: "cdp-transport", %target_id, %session_id, "attached to page");
        Ok(Self {
            session: Arc::new(Session {
                transport,
                session_id,
            }),
            target_id,
        })
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn session_id(&self) -> &str {
        &self.session.session_id
    }
}

#[async_trait]
impl Locatable for CdpPage {
    async fn query_all(&self, pattern: &str) -> Result<Vec<ControlRef>, LocatorError> {
        checked(pattern)?;
        let found = self
            .session
            .call("query", None, json!({ "pattern": pattern }))
            .await?;
        Ok(controls(&self.session, found))
    }

    async fn by_id(&self, id: &str) -> Result<Option<ControlRef>, LocatorError> {
        let found = self.session.call("by_id", None, json!({ "id": id })).await?;
        Ok(control(&self.session, found))
    }

    async fn dispatch_key(&self, event: DomEvent) -> Result<(), LocatorError> {
        match &event {
            DomEvent::KeyDown(key) => {
                let mut down = json!({ "type": "keyDown", "key": key });
                match virtual_key_code(key) {
                    Some(code) => {
                        down["type"] = json!("rawKeyDown");
                        down["code"] = json!(key);
                        down["windowsVirtualKeyCode"] = json!(code);
                    }
                    None => down["text"] = json!(key),
                }
                self.session.key(down).await?;
                let mut up = json!({ "type": "keyUp", "key": key });
                if let Some(code) = virtual_key_code(key) {
                    up["code"] = json!(key);
                    up["windowsVirtualKeyCode"] = json!(code);
                }
                self.session.key(up).await
            }
            DomEvent::KeyPress(ch) => {
                self.session
                    .key(json!({ "type": "char", "key": ch, "text": ch }))
                    .await
            }
            other => {
                debug!(event = other.name(), "dispatching at document");
                self.session
                    .call("dispatch", None, json!({ "event": other }))
                    .await
                    .map(|_| ())
            }
        }
    }

    async fn location(&self) -> Result<String, LocatorError> {
        Ok(string(self.session.call("location", None, json!({})).await?))
    }

    async fn heading(&self) -> Result<String, LocatorError> {
        let heading = self
            .session
            .call("heading", None, json!({ "pattern": HEADING_PATTERN }))
            .await?;
        Ok(string(heading))
    }
}

/// Handle to one tagged element of a [`CdpPage`].
pub struct CdpControl {
    session: Arc<Session>,
    token: String,
}

impl fmt::Debug for CdpControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CdpControl")
            .field("token", &self.token)
            .finish()
    }
}

impl CdpControl {
    async fn call(&self, op: &str, args: Value) -> Result<Value, LocatorError> {
        self.session.call(op, Some(&self.token), args).await
    }
}

#[async_trait]
impl ControlHandle for CdpControl {
    fn token(&self) -> &str {
        &self.token
    }

    async fn describe(&self) -> Result<ControlInfo, LocatorError> {
        let info = self.call("describe", json!({})).await?;
        serde_json::from_value(info).map_err(|err| LocatorError::Backend(err.to_string()))
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, LocatorError> {
        let value = self.call("attribute", json!({ "name": name })).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn text(&self) -> Result<String, LocatorError> {
        Ok(string(self.call("text", json!({})).await?))
    }

    async fn is_visible(&self) -> Result<bool, LocatorError> {
        Ok(self
            .call("visible", json!({}))
            .await?
            .as_bool()
            .unwrap_or(false))
    }

    async fn value(&self) -> Result<String, LocatorError> {
        Ok(string(self.call("value", json!({})).await?))
    }

    async fn is_checked(&self) -> Result<bool, LocatorError> {
        Ok(self
            .call("checked", json!({}))
            .await?
            .as_bool()
            .unwrap_or(false))
    }

    async fn set_value(&self, value: &str) -> Result<(), LocatorError> {
        self.call("set_value", json!({ "value": value })).await?;
        Ok(())
    }

    async fn dispatch(&self, event: DomEvent) -> Result<(), LocatorError> {
        self.call("dispatch", json!({ "event": event })).await?;
        Ok(())
    }

    async fn click(&self) -> Result<(), LocatorError> {
        self.call("click", json!({})).await?;
        Ok(())
    }

    async fn options(&self) -> Result<Vec<NativeOption>, LocatorError> {
        let options = self.call("options", json!({})).await?;
        serde_json::from_value(options).map_err(|err| LocatorError::Backend(err.to_string()))
    }

    async fn closest(&self, pattern: &str) -> Result<Option<ControlRef>, LocatorError> {
        checked(pattern)?;
        let found = self.call("closest", json!({ "pattern": pattern })).await?;
        Ok(control(&self.session, found))
    }

    async fn query(&self, pattern: &str) -> Result<Vec<ControlRef>, LocatorError> {
        checked(pattern)?;
        let found = self.call("query", json!({ "pattern": pattern })).await?;
        Ok(controls(&self.session, found))
    }

    async fn parent(&self) -> Result<Option<ControlRef>, LocatorError> {
        let found = self.call("parent", json!({})).await?;
        Ok(control(&self.session, found))
    }

    async fn next_siblings(&self) -> Result<Vec<ControlRef>, LocatorError> {
        let found = self.call("siblings", json!({})).await?;
        Ok(controls(&self.session, found))
    }
}
