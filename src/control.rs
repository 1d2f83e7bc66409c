//! Line-delimited JSON control surface.
//!
//! One request per input line, one response per output line, handled
//! strictly in order so a fill pass owns the page until it finishes.
//!
//! ```text
//! {"op":"fill","record":{..},"hints":{..}}
//! {"op":"context"}
//! {"op":"scan"}
//! {"op":"navigated","location":"..","heading":".."}
//! ```
//!
//! Responses are `{"ok":true,"result":..}` or `{"ok":false,"error":".."}`.

use action_flow::{FillOrchestrator, FlowError, FormFiller, VocabularyHints};
use action_locator::PageSnapshot;
use formfill_core_types::{RecordError, SourceRecord};
use page_context::PageContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

use crate::backend::Backend;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Fill {
        record: Value,
        #[serde(default)]
        hints: Option<Value>,
    },
    Context,
    Scan,
    Navigated {
        location: String,
        #[serde(default)]
        heading: String,
        /// New document for an in-memory page.
        #[serde(default)]
        snapshot: Option<PageSnapshot>,
    },
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::Fill { .. } => "fill",
            Request::Context => "context",
            Request::Scan => "scan",
            Request::Navigated { .. } => "navigated",
        }
    }
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("malformed request: {0}")]
    Malformed(String),
    #[error("invalid record: {0}")]
    Record(#[from] RecordError),
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error("{0}")]
    Backend(String),
    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn success(result: Value) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(err: impl std::fmt::Display) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(err.to_string()),
        }
    }
}

/// Serves requests against one page. Option lists seen by the last scan are
/// reused by fills that bring no hints of their own, until the page changes.
pub struct ControlSurface<'a> {
    engine: &'a FillOrchestrator,
    backend: &'a Backend,
    hints: VocabularyHints,
    context: Option<PageContext>,
}

impl<'a> ControlSurface<'a> {
    pub fn new(engine: &'a FillOrchestrator, backend: &'a Backend) -> Self {
        Self {
            engine,
            backend,
            hints: VocabularyHints::new(),
            context: None,
        }
    }

    /// Context from the last `context`, `navigated` or fill request.
    pub fn context(&self) -> Option<&PageContext> {
        self.context.as_ref()
    }

    pub async fn handle_line(&mut self, line: &str) -> Response {
        let request = match serde_json::from_str::<Request>(line) {
            Ok(request) => request,
            Err(err) => return Response::failure(RequestError::Malformed(err.to_string())),
        };
        match self.handle(request).await {
            Ok(result) => Response::success(result),
            Err(err) => {
                warn!(%err, "request failed");
                Response::failure(err)
            }
        }
    }

    #[instrument(skip_all, fields(op = request.name()))]
    pub async fn handle(&mut self, request: Request) -> Result<Value, RequestError> {
        let page = self.backend.page();
        match request {
            Request::Fill { record, hints } => {
                let record = SourceRecord::from_value(record)?;
                let hints = match hints {
                    Some(value) => VocabularyHints::from_value(value)?,
                    None => self.hints.clone(),
                };
                let report = self.engine.fill(page, &record, &hints).await?;
                self.context = Some(PageContext {
                    kind: report.page,
                    location: report.location.clone(),
                    heading: self
                        .context
                        .as_ref()
                        .map(|c| c.heading.clone())
                        .unwrap_or_default(),
                });
                Ok(serde_json::to_value(report)?)
            }
            Request::Context => {
                let context = self.engine.context(page).await?;
                self.context = Some(context.clone());
                Ok(serde_json::to_value(context)?)
            }
            Request::Scan => {
                let inventory = self.engine.scan(page).await?;
                self.hints = inventory.hints();
                debug!(lists = self.hints.len(), "scan hints kept for later fills");
                Ok(serde_json::to_value(inventory)?)
            }
            Request::Navigated {
                location,
                heading,
                snapshot,
            } => {
                if let Some(snapshot) = snapshot {
                    self.backend
                        .load(snapshot)
                        .map_err(|err| RequestError::Backend(err.to_string()))?;
                }
                self.hints = VocabularyHints::new();
                let context = self.engine.classifier().context(&location, &heading);
                info!(page = %context.kind, %location, "navigation noted");
                self.context = Some(context.clone());
                Ok(serde_json::to_value(context)?)
            }
        }
    }

    /// Read requests until end of input, writing one response line each.
    pub async fn run<R, W>(&mut self, reader: R, mut writer: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let response = self.handle_line(&line).await;
            let mut encoded = serde_json::to_string(&response)?;
            encoded.push('\n');
            writer.write_all(encoded.as_bytes()).await?;
            writer.flush().await?;
        }
        Ok(())
    }
}
