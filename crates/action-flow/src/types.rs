//! Report and hint types produced and consumed by a fill pass

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use formfill_core_types::{FieldKind, SessionId};
use page_context::{PageContext, PageKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::FlowError;

/// Final state of one field in a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Applied,
    AppliedOnRetry,
    Skipped,
}

/// One reported field or action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOutcome {
    /// Field key, `<Prefix><n>.<Key>` for entity fields, `<Prefix><n>` for
    /// add-entry actions
    pub field: String,

    pub kind: FieldKind,

    pub status: OutcomeStatus,

    /// Why the field was skipped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Option label chosen for a dropdown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
}

impl FieldOutcome {
    pub fn applied(field: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            field: field.into(),
            kind,
            status: OutcomeStatus::Applied,
            reason: None,
            matched: None,
        }
    }

    pub fn skipped(field: impl Into<String>, kind: FieldKind, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            status: OutcomeStatus::Skipped,
            reason: Some(reason.into()),
            matched: None,
        }
    }

    pub fn with_matched(mut self, matched: Option<String>) -> Self {
        self.matched = matched;
        self
    }

    pub fn is_applied(&self) -> bool {
        self.status != OutcomeStatus::Skipped
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
    pub applied: u32,
    pub applied_on_retry: u32,
    pub skipped: u32,
}

impl KindCounts {
    fn add(&mut self, status: OutcomeStatus) {
        match status {
            OutcomeStatus::Applied => self.applied += 1,
            OutcomeStatus::AppliedOnRetry => self.applied_on_retry += 1,
            OutcomeStatus::Skipped => self.skipped += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillCounts {
    pub text: KindCounts,
    pub dropdown: KindCounts,
    pub toggle: KindCounts,
    pub action: KindCounts,
}

impl FillCounts {
    pub fn of(&self, kind: FieldKind) -> &KindCounts {
        match kind {
            FieldKind::Text => &self.text,
            FieldKind::Dropdown => &self.dropdown,
            FieldKind::Toggle => &self.toggle,
            FieldKind::Action => &self.action,
        }
    }

    fn of_mut(&mut self, kind: FieldKind) -> &mut KindCounts {
        match kind {
            FieldKind::Text => &mut self.text,
            FieldKind::Dropdown => &mut self.dropdown,
            FieldKind::Toggle => &mut self.toggle,
            FieldKind::Action => &mut self.action,
        }
    }
}

/// Result of one fill pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillReport {
    pub session_id: SessionId,

    pub page: PageKind,

    pub location: String,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,

    /// Total latency in milliseconds
    pub latency_ms: u64,

    pub counts: FillCounts,

    /// Outcomes in attempt order; a retried field keeps its first position
    pub outcomes: Vec<FieldOutcome>,
}

impl FillReport {
    pub fn new(session_id: SessionId, context: &PageContext) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            page: context.kind,
            location: context.location.clone(),
            started_at: now,
            finished_at: now,
            latency_ms: 0,
            counts: FillCounts::default(),
            outcomes: Vec::new(),
        }
    }

    pub fn with_outcome(mut self, outcome: FieldOutcome) -> Self {
        self.record(outcome);
        self
    }

    pub fn record(&mut self, outcome: FieldOutcome) {
        self.counts.of_mut(outcome.kind).add(outcome.status);
        self.outcomes.push(outcome);
    }

    /// Turn the skipped outcome of `field` into an on-retry success.
    /// Returns false when no skipped outcome exists for it.
    pub fn promote(&mut self, field: &str, matched: Option<String>) -> bool {
        let Some(outcome) = self
            .outcomes
            .iter_mut()
            .find(|o| o.field == field && o.status == OutcomeStatus::Skipped)
        else {
            return false;
        };
        outcome.status = OutcomeStatus::AppliedOnRetry;
        outcome.reason = None;
        outcome.matched = matched;
        let counts = self.counts.of_mut(outcome.kind);
        counts.skipped = counts.skipped.saturating_sub(1);
        counts.applied_on_retry += 1;
        true
    }

    pub fn outcome(&self, field: &str) -> Option<&FieldOutcome> {
        self.outcomes.iter().find(|o| o.field == field)
    }

    pub fn applied(&self) -> u32 {
        [
            FieldKind::Text,
            FieldKind::Dropdown,
            FieldKind::Toggle,
            FieldKind::Action,
        ]
            .iter()
            .map(|kind| {
                let counts = self.counts.of(*kind);
                counts.applied + counts.applied_on_retry
            })
            .sum()
    }

    pub fn skipped(&self) -> u32 {
        self.counts.text.skipped
            + self.counts.dropdown.skipped
            + self.counts.toggle.skipped
            + self.counts.action.skipped
    }

    /// Set finish time and calculate latency
    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self.latency_ms = (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64;
        self
    }
}

/// Option vocabularies observed on the page, keyed by control label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VocabularyHints(pub BTreeMap<String, Vec<String>>);

impl VocabularyHints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, label: impl Into<String>, options: Vec<String>) -> Self {
        self.insert(label, options);
        self
    }

    /// Empty option lists are dropped.
    pub fn insert(&mut self, label: impl Into<String>, options: Vec<String>) {
        if !options.is_empty() {
            self.0.insert(label.into(), options);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Later entries replace earlier ones with the same label.
    pub fn merge(&mut self, other: VocabularyHints) {
        for (label, options) in other.0 {
            self.insert(label, options);
        }
    }

    pub fn from_value(value: Value) -> Result<Self, FlowError> {
        serde_json::from_value(value).map_err(|err| FlowError::Hints(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> FillReport {
        let context = PageContext {
            kind: PageKind::LeadInfo,
            location: "https://app.example/lead-info".into(),
            heading: String::new(),
        };
        FillReport::new(SessionId::new(), &context)
    }

    #[test]
    fn counts_follow_outcomes() {
        let mut report = report()
            .with_outcome(FieldOutcome::applied("FirstName", FieldKind::Text))
            .with_outcome(FieldOutcome::skipped("Gender", FieldKind::Dropdown, "no options"));
        assert_eq!(report.counts.text.applied, 1);
        assert_eq!(report.counts.dropdown.skipped, 1);

        assert!(report.promote("Gender", Some("Male".into())));
        assert!(!report.promote("Gender", None));
        let gender = report.outcome("Gender").unwrap();
        assert_eq!(gender.status, OutcomeStatus::AppliedOnRetry);
        assert_eq!(gender.reason, None);
        assert_eq!(report.counts.dropdown.skipped, 0);
        assert_eq!(report.counts.dropdown.applied_on_retry, 1);
        assert_eq!(report.applied(), 2);
        assert_eq!(report.skipped(), 0);
    }

    #[test]
    fn report_serializes_statuses_snake_case() {
        let report = report()
            .with_outcome(FieldOutcome::skipped("Driver2", FieldKind::Action, "not found"))
            .finish();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["page"], "lead-info");
        assert_eq!(json["outcomes"][0]["status"], "skipped");
        assert_eq!(json["outcomes"][0]["kind"], "action");
        assert!(json["outcomes"][0].get("matched").is_none());
        assert!(json["started_at"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn hints_parse_from_json() {
        let hints = VocabularyHints::from_value(serde_json::json!({
            "Roof Type": ["Asphalt Shingle", "Metal"],
            "Empty": []
        }))
        .unwrap();
        assert_eq!(hints.len(), 2);
        assert!(VocabularyHints::from_value(serde_json::json!(["x"])).is_err());

        let mut merged = VocabularyHints::new();
        merged.merge(hints);
        assert_eq!(merged.len(), 1);
    }
}
