use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::target::SessionId as OxideSessionId;
use chromiumoxide::cdp::events::CdpEventMessage;
use chromiumoxide::conn::Connection;
use chromiumoxide::error::CdpError as OxideError;
use chromiumoxide_types::{CallId, Message, MethodId, Response};
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use crate::error::CdpError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandTarget {
    Browser,
    /// Flat-mode session of an attached target
    Session(String),
}

/// Request/response channel to a browser.
#[async_trait]
pub trait CdpTransport: Send + Sync {
    async fn send_command(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, CdpError>;
}

type Responder = oneshot::Sender<Result<Value, CdpError>>;

struct ControlMessage {
    target: CommandTarget,
    method: String,
    params: Value,
    responder: Responder,
}

struct Inflight {
    method: String,
    responder: Responder,
}

/// Transport over a raw chromiumoxide connection. A background task owns the
/// socket; commands reach it through a channel and wait for their response
/// up to the configured deadline.
pub struct ChromiumTransport {
    command_tx: mpsc::Sender<ControlMessage>,
    loop_task: JoinHandle<()>,
    alive: Arc<AtomicBool>,
    deadline: Duration,
}

impl ChromiumTransport {
    pub async fn connect(ws_url: &str, deadline: Duration) -> Result<Self, CdpError> {
        let conn = Connection::<CdpEventMessage>::connect(ws_url)
            .await
            .map_err(|err| CdpError::Connect(err.to_string()))?;

        let (command_tx, command_rx) = mpsc::channel(64);
        let alive = Arc::new(AtomicBool::new(true));
        let loop_alive = alive.clone();
        let loop_task = tokio::spawn(async move {
            let result = Self::run_loop(conn, command_rx).await;
            loop_alive.store(false, Ordering::Relaxed);
            if let Err(err) = result {
                error!(target: "cdp-transport", %err, "transport loop terminated with error");
            }
        });

        info!(target: "cdp-transport", url = %ws_url, "devtools connection established");
        Ok(Self {
            command_tx,
            loop_task,
            alive,
            deadline,
        })
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    async fn run_loop(
        mut conn: Connection<CdpEventMessage>,
        mut command_rx: mpsc::Receiver<ControlMessage>,
    ) -> Result<(), CdpError> {
        let mut inflight: HashMap<CallId, Inflight> = HashMap::new();

        loop {
            tokio::select! {
                Some(cmd) = command_rx.recv() => {
                    Self::submit(&mut conn, cmd, &mut inflight);
                }
                message = conn.next() => match message {
                    Some(Ok(Message::Response(resp))) => Self::resolve(resp, &mut inflight),
                    Some(Ok(Message::Event(_))) => {}
                    Some(Err(err)) => {
                        let err = Self::map_oxide_error(err);
                        for (_, pending) in inflight.drain() {
                            let _ = pending.responder.send(Err(err.clone()));
                        }
                        return Err(err);
                    }
                    None => {
                        let err = CdpError::Io("devtools connection closed".into());
                        for (_, pending) in inflight.drain() {
                            let _ = pending.responder.send(Err(err.clone()));
                        }
                        return Ok(());
                    }
                },
            }
        }
    }

    fn submit(
        conn: &mut Connection<CdpEventMessage>,
        cmd: ControlMessage,
        inflight: &mut HashMap<CallId, Inflight>,
    ) {
        let session = match cmd.target {
            CommandTarget::Browser => None,
            CommandTarget::Session(id) => Some(OxideSessionId::from(id)),
        };
        let method_id: MethodId = cmd.method.clone().into();
        match conn.submit_command(method_id, session, cmd.params) {
            Ok(call_id) => {
                trace!(target: "cdp-transport", method = %cmd.method, "command submitted");
                inflight.insert(
                    call_id,
                    Inflight {
                        method: cmd.method,
                        responder: cmd.responder,
                    },
                );
            }
            Err(err) => {
                let _ = cmd.responder.send(Err(CdpError::Io(err.to_string())));
            }
        }
    }

    fn resolve(resp: Response, inflight: &mut HashMap<CallId, Inflight>) {
        let Some(pending) = inflight.remove(&resp.id) else {
            debug!(target: "cdp-transport", id = ?resp.id, "response without a waiting command");
            return;
        };
        let result = match (resp.result, resp.error) {
            (Some(result), _) => Ok(result),
            (None, Some(error)) => Err(CdpError::Protocol {
                method: pending.method,
                code: error.code,
                message: error.message,
            }),
            (None, None) => Err(CdpError::Payload("empty cdp response".into())),
        };
        let _ = pending.responder.send(result);
    }

    fn map_oxide_error(err: OxideError) -> CdpError {
        match err {
            OxideError::Timeout => CdpError::Timeout("connection".into()),
            other => CdpError::Io(other.to_string()),
        }
    }
}

#[async_trait]
impl CdpTransport for ChromiumTransport {
    async fn send_command(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, CdpError> {
        if !self.is_alive() {
            return Err(CdpError::Io("devtools connection closed".into()));
        }
        let (responder, response) = oneshot::channel();
        self.command_tx
            .send(ControlMessage {
                target,
                method: method.to_string(),
                params,
                responder,
            })
            .await
            .map_err(|err| CdpError::Io(err.to_string()))?;

        match tokio::time::timeout(self.deadline, response).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::Io("command response channel closed".into())),
            Err(_) => Err(CdpError::Timeout(method.to_string())),
        }
    }
}

impl Drop for ChromiumTransport {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Relaxed);
        self.loop_task.abort();
    }
}
