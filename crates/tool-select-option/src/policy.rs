use serde::{Deserialize, Serialize};
use std::time::Duration;

use value_match::DEFAULT_CUTOFF;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectPolicyView {
    pub enabled: bool,
    /// Option patterns for an open panel, in priority order.
    pub panels: Vec<String>,
    /// Patterns whose presence means a panel is open.
    pub panel_patterns: Vec<String>,
    /// Option texts that never count as a choice, compared lowercase.
    pub placeholders: Vec<String>,
    pub cutoff: f64,
    /// Escape presses before an open panel is reported stuck.
    pub max_escapes: u32,
    pub timeouts: SelectTimeouts,
}

impl Default for SelectPolicyView {
    fn default() -> Self {
        Self {
            enabled: true,
            panels: vec![
                ".cdk-overlay-container mat-option".into(),
                ".cdk-overlay-container [role=\"option\"]".into(),
                "[role=\"listbox\"] [role=\"option\"]".into(),
                ".mat-select-panel mat-option".into(),
                ".mat-option".into(),
                ".cdk-overlay-pane mat-option".into(),
                "[class*=\"overlay\"] [role=\"option\"]".into(),
                "[class*=\"dropdown\"] li".into(),
                "[class*=\"select-panel\"] [class*=\"option\"]".into(),
            ],
            panel_patterns: vec![
                ".cdk-overlay-container mat-option".into(),
                ".cdk-overlay-container [role=\"option\"]".into(),
            ],
            placeholders: [
                "",
                "select",
                "select one",
                "-- select --",
                "--select--",
                "choose",
                "choose one",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            cutoff: DEFAULT_CUTOFF,
            max_escapes: 3,
            timeouts: SelectTimeouts::default(),
        }
    }
}

impl SelectPolicyView {
    pub fn is_placeholder(&self, label: &str) -> bool {
        let label = label.trim().to_lowercase();
        label.is_empty() || self.placeholders.iter().any(|p| p.trim().to_lowercase() == label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectTimeouts {
    pub open_ms: u64,
    pub typeahead_char_ms: u64,
    pub typeahead_settle_ms: u64,
    pub escape_settle_ms: u64,
    pub option_settle_ms: u64,
}

impl SelectTimeouts {
    pub fn open(&self) -> Duration {
        Duration::from_millis(self.open_ms)
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
}

impl Default for SelectTimeouts {
    fn default() -> Self {
        Self {
            open_ms: 1000,
            typeahead_char_ms: 40,
            typeahead_settle_ms: 200,
            escape_settle_ms: 200,
            option_settle_ms: 200,
        }
    }
}
