//! Option choice: exact match first, fuzzy match second.

use value_match::best_match;

use crate::model::{MatchSource, MatchedOption};

/// One selectable entry as seen by the machine.
#[derive(Clone, Debug, PartialEq)]
pub struct OptionEntry {
    pub label: String,
    /// Submitted value of a native option; `None` for panel options.
    pub value: Option<String>,
}

impl OptionEntry {
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: None,
        }
    }

    fn equals(&self, wanted: &str) -> bool {
        let wanted = wanted.to_lowercase();
        self.label.trim().to_lowercase() == wanted
            || self
                .value
                .as_deref()
                .is_some_and(|v| v.trim().to_lowercase() == wanted)
    }
}

/// Index of the entry to pick for `candidates` (preferred first).
///
/// Every candidate is tried for an exact, case-insensitive match against
/// labels and values before any fuzzy match over labels is considered.
pub fn choose(
    candidates: &[String],
    entries: &[OptionEntry],
    cutoff: f64,
) -> Option<(usize, MatchedOption)> {
    for candidate in candidates {
        let wanted = candidate.trim();
        if wanted.is_empty() {
            continue;
        }
        if let Some(index) = entries.iter().position(|e| e.equals(wanted)) {
            return Some((
                index,
                MatchedOption {
                    label: entries[index].label.trim().to_string(),
                    source: MatchSource::Exact,
                    score: 1.0,
                },
            ));
        }
    }

    let labels: Vec<&str> = entries.iter().map(|e| e.label.trim()).collect();
    for candidate in candidates {
        let wanted = candidate.trim();
        if wanted.is_empty() {
            continue;
        }
        if let Some(found) = best_match(wanted, &labels, cutoff) {
            if let Some(index) = labels.iter().position(|l| *l == found.text) {
                return Some((
                    index,
                    MatchedOption {
                        label: found.text,
                        source: MatchSource::Fuzzy,
                        score: found.score,
                    },
                ));
            }
        }
    }
    None
}
