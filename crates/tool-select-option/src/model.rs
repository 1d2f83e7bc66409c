use std::time::Instant;

use serde::Serialize;

use crate::errors::SelectError;
use crate::state::Trail;

/// Which branch of the machine handled the control.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListPath {
    Native,
    Custom,
}

/// How the chosen option was found.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Exact,
    Fuzzy,
    /// The panel closed on its own after typing the value.
    Typeahead,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchedOption {
    /// Option label, or the typed text for a typeahead selection.
    pub label: String,
    pub source: MatchSource,
    pub score: f64,
}

#[derive(Clone, Debug)]
pub struct SelectReport {
    pub ok: bool,
    pub path: Option<ListPath>,
    pub trail: Trail,
    pub matched: Option<MatchedOption>,
    pub failure: Option<SelectError>,
    pub started_at: Instant,
    pub finished_at: Instant,
    pub latency_ms: u128,
}

impl SelectReport {
    pub fn new(started_at: Instant) -> Self {
        Self {
            ok: false,
            path: None,
            trail: Trail::new(),
            matched: None,
            failure: None,
            started_at,
            finished_at: started_at,
            latency_ms: 0,
        }
    }

    pub fn finish(mut self, finished_at: Instant) -> Self {
        self.finished_at = finished_at;
        self.latency_ms = finished_at
            .saturating_duration_since(self.started_at)
            .as_millis();
        self
    }

    /// Human-readable failure reason, if any.
    pub fn reason(&self) -> Option<String> {
        self.failure.as_ref().map(|err| err.to_string())
    }
}
