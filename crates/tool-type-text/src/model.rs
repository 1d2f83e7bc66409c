use std::time::Instant;

use action_locator::DomEvent;

/// What one fill did to the control.
#[derive(Clone, Debug)]
pub struct TypeReport {
    pub ok: bool,
    pub started_at: Instant,
    pub finished_at: Instant,
    pub latency_ms: u128,
    /// Value length before the write, in characters.
    pub previous_len: usize,
    pub value_len: usize,
    pub changed: bool,
    /// Notifications dispatched, in order.
    pub events: Vec<DomEvent>,
}

impl TypeReport {
    pub fn new(started_at: Instant) -> Self {
        Self {
            ok: false,
            started_at,
            finished_at: started_at,
            latency_ms: 0,
            previous_len: 0,
            value_len: 0,
            changed: false,
            events: Vec::new(),
        }
    }

    pub fn finish(mut self, finished_at: Instant) -> Self {
        self.finished_at = finished_at;
        self.latency_ms = finished_at
            .saturating_duration_since(self.started_at)
            .as_millis();
        self
    }
}
