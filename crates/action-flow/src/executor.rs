//! Fill orchestrator implementation

use std::sync::Arc;

use action_locator::{ControlLocator, FieldTarget, Locatable};
use async_trait::async_trait;
use fill_config::{DropdownField, FieldConfig, PatternConfig, Timings};
use formfill_core_types::{FieldKind, SourceRecord, TokioWaiter, Waiter};
use page_context::{Classifier, PageContext};
use tool_select_option::{DropdownFiller, SelectPolicyView, SelectTimeouts, SelectToolBuilder};
use tool_type_text::{TextFiller, TypeTextTool};
use tracing::{debug, info, instrument};

use crate::errors::FlowError;
use crate::inventory::ControlInventory;
use crate::prepare::prepare_values;
use crate::session::{Attempt, FillSession};
use crate::types::{FieldOutcome, FillReport, VocabularyHints};

pub(crate) const NOT_FOUND: &str = "control not found";

/// Fill engine trait
#[async_trait]
pub trait FormFiller: Send + Sync {
    /// Classify the page currently shown
    async fn context(&self, page: &dyn Locatable) -> Result<PageContext, FlowError>;

    /// Run one full pass: toggles, text fields, dropdowns, the dropdown
    /// retry and entity lists
    async fn fill(
        &self,
        page: &dyn Locatable,
        record: &SourceRecord,
        hints: &VocabularyHints,
    ) -> Result<FillReport, FlowError>;

    /// List the page's controls and option vocabularies
    async fn scan(&self, page: &dyn Locatable) -> Result<ControlInventory, FlowError>;
}

/// Panel patterns, placeholders and pauses of the dropdown machine, taken
/// from the field mapping and the runtime timings.
pub fn select_policy(patterns: &PatternConfig, timings: &Timings) -> SelectPolicyView {
    SelectPolicyView {
        panels: patterns.panels.clone(),
        panel_patterns: patterns.panel_patterns.clone(),
        placeholders: patterns.placeholders.clone(),
        timeouts: SelectTimeouts {
            open_ms: timings.dropdown_open_ms,
            typeahead_char_ms: timings.typeahead_char_ms,
            typeahead_settle_ms: timings.typeahead_settle_ms,
            escape_settle_ms: timings.escape_settle_ms,
            option_settle_ms: timings.option_settle_ms,
        },
        ..SelectPolicyView::default()
    }
}

pub struct FillOrchestratorBuilder {
    config: Arc<FieldConfig>,
    timings: Timings,
    waiter: Option<Arc<dyn Waiter>>,
    text: Option<Arc<dyn TextFiller>>,
    dropdown: Option<Arc<dyn DropdownFiller>>,
}

impl FillOrchestratorBuilder {
    pub fn new(config: Arc<FieldConfig>) -> Self {
        Self {
            config,
            timings: Timings::default(),
            waiter: None,
            text: None,
            dropdown: None,
        }
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_waiter(mut self, waiter: Arc<dyn Waiter>) -> Self {
        self.waiter = Some(waiter);
        self
    }

    pub fn with_text_filler(mut self, text: Arc<dyn TextFiller>) -> Self {
        self.text = Some(text);
        self
    }

    pub fn with_dropdown_filler(mut self, dropdown: Arc<dyn DropdownFiller>) -> Self {
        self.dropdown = Some(dropdown);
        self
    }

    /// Missing collaborators fall back to the tokio timer, the text tool and
    /// a select tool configured from the mapping.
    pub fn build(self) -> FillOrchestrator {
        let waiter = self.waiter.unwrap_or_else(|| Arc::new(TokioWaiter));
        let select_policy = select_policy(&self.config.patterns, &self.timings);
        let dropdown = self.dropdown.unwrap_or_else(|| {
            SelectToolBuilder::new(select_policy.clone())
                .with_waiter(waiter.clone())
                .build()
        });
        FillOrchestrator {
            classifier: Classifier::new(self.config.generic_hosts.iter().cloned()),
            locator: ControlLocator::new(self.config.patterns.locator_settings()),
            text: self
                .text
                .unwrap_or_else(|| Arc::new(TypeTextTool::default())),
            dropdown,
            select_policy,
            waiter,
            timings: self.timings,
            config: self.config,
        }
    }
}

/// Default fill engine
pub struct FillOrchestrator {
    pub(crate) config: Arc<FieldConfig>,
    pub(crate) timings: Timings,
    pub(crate) classifier: Classifier,
    pub(crate) locator: ControlLocator,
    pub(crate) select_policy: SelectPolicyView,
    pub(crate) text: Arc<dyn TextFiller>,
    pub(crate) dropdown: Arc<dyn DropdownFiller>,
    pub(crate) waiter: Arc<dyn Waiter>,
}

impl FillOrchestrator {
    pub fn builder(config: Arc<FieldConfig>) -> FillOrchestratorBuilder {
        FillOrchestratorBuilder::new(config)
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    #[instrument(skip_all, fields(session = %session.id(), page = %session.context().kind))]
    async fn run_pass(
        &self,
        page: &dyn Locatable,
        record: &SourceRecord,
        session: &mut FillSession,
    ) {
        self.toggle_pass(page, record, session).await;
        self.text_pass(page, session).await;
        self.dropdown_pass(page, session).await;
        self.retry_pass(page, session).await;
        self.expand_entities(page, record, session).await;
    }

    async fn text_pass(&self, page: &dyn Locatable, session: &mut FillSession) {
        for field in &self.config.text_fields {
            let Some(value) = session.value(&field.key).map(str::to_owned) else {
                continue;
            };
            if !session.begin(&field.key, Attempt::First) {
                continue;
            }
            let target = FieldTarget::text(&field.key, &field.patterns, &field.labels);
            let outcome = match self.apply_text(page, &target, &value).await {
                Ok(()) => FieldOutcome::applied(&field.key, FieldKind::Text),
                Err(reason) => {
                    debug!(field = %field.key, %reason, "text field skipped");
                    FieldOutcome::skipped(&field.key, FieldKind::Text, reason)
                }
            };
            session.record(outcome);
            self.settle().await;
        }
    }

    async fn dropdown_pass(&self, page: &dyn Locatable, session: &mut FillSession) {
        let kind = session.context().kind;
        for field in self.config.active_dropdowns(kind) {
            let Some(value) = session.value(&field.key).map(str::to_owned) else {
                continue;
            };
            if !session.begin(&field.key, Attempt::First) {
                continue;
            }
            let outcome = match self.apply_dropdown(page, field, &value).await {
                Ok(matched) => {
                    FieldOutcome::applied(&field.key, FieldKind::Dropdown).with_matched(matched)
                }
                Err(reason) => {
                    debug!(field = %field.key, %reason, "dropdown failed, queued for retry");
                    session.mark_failed(&field.key);
                    FieldOutcome::skipped(&field.key, FieldKind::Dropdown, reason)
                }
            };
            session.record(outcome);
            self.settle().await;
        }
    }

    /// Dependent dropdowns often load their options only after an earlier
    /// choice, so every failed dropdown gets one more attempt.
    async fn retry_pass(&self, page: &dyn Locatable, session: &mut FillSession) {
        let failed = session.failed().to_vec();
        if failed.is_empty() {
            return;
        }
        info!(count = failed.len(), "retrying failed dropdowns");
        self.waiter.wait(self.timings.retry_delay()).await;

        let active = self.config.active_dropdowns(session.context().kind);
        for key in failed {
            let Some(field) = active.iter().find(|f| f.key == key) else {
                continue;
            };
            let Some(value) = session.value(&key).map(str::to_owned) else {
                continue;
            };
            if !session.begin(&key, Attempt::Retry) {
                continue;
            }
            match self.apply_dropdown(page, field, &value).await {
                Ok(matched) => {
                    info!(field = %key, "dropdown applied on retry");
                    session.promote(&key, matched);
                }
                Err(reason) => debug!(field = %key, %reason, "dropdown retry failed"),
            }
            self.settle().await;
        }
    }

    pub(crate) async fn apply_text(
        &self,
        page: &dyn Locatable,
        target: &FieldTarget<'_>,
        value: &str,
    ) -> Result<(), String> {
        let Some(located) = self.locator.locate(page, target).await else {
            return Err(NOT_FOUND.into());
        };
        match self.text.run(located.control.as_ref(), value).await {
            Ok(report) if report.ok => Ok(()),
            Ok(_) => Err("value not applied".into()),
            Err(err) => Err(err.to_string()),
        }
    }

    async fn apply_dropdown(
        &self,
        page: &dyn Locatable,
        field: &DropdownField,
        value: &str,
    ) -> Result<Option<String>, String> {
        let target = FieldTarget::dropdown(&field.key, &field.patterns, &field.labels);
        self.select(page, &target, &field.key, value).await
    }

    /// Locate a dropdown and choose `value`, expanded through the
    /// abbreviation table under `context`. Returns the chosen label.
    pub(crate) async fn select(
        &self,
        page: &dyn Locatable,
        target: &FieldTarget<'_>,
        context: &str,
        value: &str,
    ) -> Result<Option<String>, String> {
        let candidates = self.config.abbreviations.candidates(value, context);
        let Some(located) = self.locator.locate(page, target).await else {
            return Err(NOT_FOUND.into());
        };
        match self
            .dropdown
            .run(page, target.key, &located, &candidates)
            .await
        {
            Ok(report) if report.ok => Ok(report.matched.map(|m| m.label)),
            Ok(report) => Err(report
                .reason()
                .unwrap_or_else(|| "no option selected".into())),
            Err(err) => Err(err.to_string()),
        }
    }

    pub(crate) async fn settle(&self) {
        self.waiter.wait(self.timings.settle()).await;
    }
}

#[async_trait]
impl FormFiller for FillOrchestrator {
    async fn context(&self, page: &dyn Locatable) -> Result<PageContext, FlowError> {
        let location = page.location().await?;
        let heading = page.heading().await.unwrap_or_default();
        Ok(self.classifier.context(&location, &heading))
    }

    async fn fill(
        &self,
        page: &dyn Locatable,
        record: &SourceRecord,
        hints: &VocabularyHints,
    ) -> Result<FillReport, FlowError> {
        let context = self.context(page).await?;
        let values = prepare_values(record, &self.config, hints);
        let mut session = FillSession::new(context, values);
        self.run_pass(page, record, &mut session).await;

        let report = session.finish();
        info!(
            session = %report.session_id,
            page = %report.page,
            applied = report.applied(),
            skipped = report.skipped(),
            latency_ms = report.latency_ms,
            "fill pass finished"
        );
        Ok(report)
    }

    async fn scan(&self, page: &dyn Locatable) -> Result<ControlInventory, FlowError> {
        self.inventory(page).await
    }
}
