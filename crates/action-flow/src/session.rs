//! Per-pass fill state.

use std::collections::BTreeMap;

use formfill_core_types::SessionId;
use page_context::PageContext;

use crate::types::{FieldOutcome, FillReport};

/// Which attempt of a field is about to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    First,
    Retry,
}

/// Everything one fill pass reads and writes. Created per pass and threaded
/// through every step, so two passes never share state.
#[derive(Debug)]
pub struct FillSession {
    id: SessionId,
    context: PageContext,
    values: BTreeMap<String, String>,
    attempts: BTreeMap<String, u32>,
    failed: Vec<String>,
    report: FillReport,
}

impl FillSession {
    pub fn new(context: PageContext, values: BTreeMap<String, String>) -> Self {
        let id = SessionId::new();
        let report = FillReport::new(id.clone(), &context);
        Self {
            id,
            context,
            values,
            attempts: BTreeMap::new(),
            failed: Vec::new(),
            report,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn context(&self) -> &PageContext {
        &self.context
    }

    /// Prepared, non-blank value for a scalar field.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Claims an attempt for `field`. A field gets one first attempt, and one
    /// retry only after failing its first attempt.
    pub fn begin(&mut self, field: &str, attempt: Attempt) -> bool {
        let count = self.attempts.entry(field.to_string()).or_insert(0);
        let allowed = match attempt {
            Attempt::First => *count == 0,
            Attempt::Retry => *count == 1 && self.failed.iter().any(|f| f == field),
        };
        if allowed {
            *count += 1;
        }
        allowed
    }

    pub fn attempts(&self, field: &str) -> u32 {
        self.attempts.get(field).copied().unwrap_or(0)
    }

    pub fn record(&mut self, outcome: FieldOutcome) {
        self.report.record(outcome);
    }

    /// Queue a dropdown for the retry pass.
    pub fn mark_failed(&mut self, field: &str) {
        if !self.failed.iter().any(|f| f == field) {
            self.failed.push(field.to_string());
        }
    }

    pub fn failed(&self) -> &[String] {
        &self.failed
    }

    pub fn promote(&mut self, field: &str, matched: Option<String>) -> bool {
        self.report.promote(field, matched)
    }

    pub fn report(&self) -> &FillReport {
        &self.report
    }

    pub fn finish(self) -> FillReport {
        self.report.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_context::PageKind;

    fn session() -> FillSession {
        let context = PageContext {
            kind: PageKind::HomeDwelling,
            location: "https://app.example/rating/home/dwelling".into(),
            heading: String::new(),
        };
        let values = BTreeMap::from([("RoofType".to_string(), "Metal".to_string())]);
        FillSession::new(context, values)
    }

    #[test]
    fn retry_needs_a_failed_first_attempt() {
        let mut session = session();
        assert!(!session.begin("RoofType", Attempt::Retry));
        assert!(session.begin("RoofType", Attempt::First));
        assert!(!session.begin("RoofType", Attempt::First));
        assert!(!session.begin("RoofType", Attempt::Retry));

        session.mark_failed("RoofType");
        session.mark_failed("RoofType");
        assert_eq!(session.failed(), ["RoofType".to_string()]);
        assert!(session.begin("RoofType", Attempt::Retry));
        assert!(!session.begin("RoofType", Attempt::Retry));
        assert_eq!(session.attempts("RoofType"), 2);
    }

    #[test]
    fn report_carries_session_and_page() {
        let session = session();
        let id = session.id().clone();
        assert_eq!(session.value("RoofType"), Some("Metal"));
        assert_eq!(session.value("Gender"), None);
        let report = session.finish();
        assert_eq!(report.session_id, id);
        assert_eq!(report.page, PageKind::HomeDwelling);
    }
}
