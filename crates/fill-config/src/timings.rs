use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fixed pauses the fill engine observes, in milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// After every field attempt.
    pub settle_ms: u64,
    /// After clicking a custom dropdown trigger.
    pub dropdown_open_ms: u64,
    pub typeahead_char_ms: u64,
    pub typeahead_settle_ms: u64,
    pub escape_settle_ms: u64,
    /// After clicking a panel option.
    pub option_settle_ms: u64,
    /// Before the retry pass over failed dropdowns.
    pub retry_delay_ms: u64,
    /// After clicking an add-entry trigger.
    pub entity_render_ms: u64,
    /// After switching a toggle on, for the section it reveals.
    pub toggle_render_ms: u64,
}

impl Timings {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn dropdown_open(&self) -> Duration {
        Duration::from_millis(self.dropdown_open_ms)
    }

    pub fn typeahead_char(&self) -> Duration {
        Duration::from_millis(self.typeahead_char_ms)
    }

    pub fn typeahead_settle(&self) -> Duration {
        Duration::from_millis(self.typeahead_settle_ms)
    }

    pub fn escape_settle(&self) -> Duration {
        Duration::from_millis(self.escape_settle_ms)
    }

    pub fn option_settle(&self) -> Duration {
        Duration::from_millis(self.option_settle_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn entity_render(&self) -> Duration {
        Duration::from_millis(self.entity_render_ms)
    }

    pub fn toggle_render(&self) -> Duration {
        Duration::from_millis(self.toggle_render_ms)
    }

    /// Every pause set to zero, for dry runs against an in-memory page.
    pub fn instant() -> Self {
        Self {
            settle_ms: 0,
            dropdown_open_ms: 0,
            typeahead_char_ms: 0,
            typeahead_settle_ms: 0,
            escape_settle_ms: 0,
            option_settle_ms: 0,
            retry_delay_ms: 0,
            entity_render_ms: 0,
            toggle_render_ms: 0,
        }
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            settle_ms: 250,
            dropdown_open_ms: 1000,
            typeahead_char_ms: 40,
            typeahead_settle_ms: 200,
            escape_settle_ms: 200,
            option_settle_ms: 200,
            retry_delay_ms: 1800,
            entity_render_ms: 1800,
            toggle_render_ms: 500,
        }
    }
}
