//! Multi-entity expansion: one entry per element of a sub-entity list.
//!
//! The first element of a group fills the entry already rendered on the
//! page. Every later element first clicks the add-entry control, waits for
//! the new entry to render and then fills the most recently rendered
//! matching controls.

use action_locator::{FieldTarget, Locatable, Pick};
use fill_config::{EntityConfig, EntityField, EntityFieldKind};
use formfill_core_types::{EntityRecord, FieldKind, SourceRecord};
use tracing::{debug, info, warn};

use crate::executor::FillOrchestrator;
use crate::session::{Attempt, FillSession};
use crate::types::FieldOutcome;

impl FillOrchestrator {
    pub(crate) async fn expand_entities(
        &self,
        page: &dyn Locatable,
        record: &SourceRecord,
        session: &mut FillSession,
    ) {
        let kind = session.context().kind;
        for entity in self.config.entities_on(kind) {
            let all = record.list(&entity.list);
            if all.is_empty() {
                if let Some(reason) = &entity.empty_reason {
                    if session.begin(&entity.list, Attempt::First) {
                        session.record(FieldOutcome::skipped(
                            &entity.list,
                            FieldKind::Action,
                            reason.as_str(),
                        ));
                    }
                }
                continue;
            }
            let elements: Vec<&EntityRecord> = all
                .iter()
                .filter(|element| {
                    entity
                        .filter
                        .as_ref()
                        .map_or(true, |f| f.accepts(element.value(&f.source).as_deref()))
                })
                .collect();
            if elements.is_empty() {
                continue;
            }
            info!(list = %entity.list, group = %entity.prefix, count = elements.len(), "expanding entity list");

            for (index, element) in elements.into_iter().enumerate() {
                let name = format!("{}{}", entity.prefix, index + 1);
                let pick = if index == 0 {
                    Pick::First
                } else {
                    match self.add_entry(page, entity).await {
                        Ok(()) => {
                            session.record(FieldOutcome::applied(&name, FieldKind::Action));
                        }
                        Err(reason) => {
                            warn!(entry = %name, %reason, "entry not added");
                            session.record(FieldOutcome::skipped(&name, FieldKind::Action, reason));
                            continue;
                        }
                    }
                    Pick::Last
                };
                self.fill_entry(page, entity, element, index, &name, pick, session)
                    .await;
            }
        }
    }

    async fn add_entry(&self, page: &dyn Locatable, entity: &EntityConfig) -> Result<(), String> {
        let Some(trigger) = self
            .locator
            .find_add_trigger(page, &entity.add_phrases)
            .await
        else {
            return Err(format!(
                "no add-entry control matching {}",
                entity.add_phrases.join(" / ")
            ));
        };
        trigger
            .click()
            .await
            .map_err(|err| format!("add-entry click failed: {err}"))?;
        self.waiter.wait(self.timings.entity_render()).await;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn fill_entry(
        &self,
        page: &dyn Locatable,
        entity: &EntityConfig,
        element: &EntityRecord,
        index: usize,
        name: &str,
        pick: Pick,
        session: &mut FillSession,
    ) {
        for mapping in &entity.fields {
            let Some(value) = element.value(&mapping.source) else {
                continue;
            };
            let outcome_name = format!("{name}.{}", mapping.outcome_name());
            if !session.begin(&outcome_name, Attempt::First) {
                continue;
            }
            let kind = match mapping.kind {
                EntityFieldKind::Text => FieldKind::Text,
                EntityFieldKind::Dropdown => FieldKind::Dropdown,
            };
            let outcome = match self
                .apply_entity_field(page, mapping, index, pick, &outcome_name, &value)
                .await
            {
                Ok(matched) => FieldOutcome::applied(&outcome_name, kind).with_matched(matched),
                Err(reason) => {
                    debug!(field = %outcome_name, %reason, "entity field skipped");
                    FieldOutcome::skipped(&outcome_name, kind, reason)
                }
            };
            session.record(outcome);
            self.settle().await;
        }
    }

    async fn apply_entity_field(
        &self,
        page: &dyn Locatable,
        mapping: &EntityField,
        index: usize,
        pick: Pick,
        name: &str,
        value: &str,
    ) -> Result<Option<String>, String> {
        if let Some(key) = &mapping.target {
            let field = self
                .config
                .text_field(key)
                .ok_or_else(|| format!("text field '{key}' is not configured"))?;
            let target =
                FieldTarget::text(&field.key, &field.patterns, &field.labels).with_pick(pick);
            return self.apply_text(page, &target, value).await.map(|()| None);
        }
        let patterns = mapping.patterns_for(index);
        match mapping.kind {
            EntityFieldKind::Text => {
                let target = FieldTarget::text(name, &patterns, &mapping.labels).with_pick(pick);
                self.apply_text(page, &target, value).await.map(|()| None)
            }
            EntityFieldKind::Dropdown => {
                let target =
                    FieldTarget::dropdown(name, &patterns, &mapping.labels).with_pick(pick);
                self.select(page, &target, &mapping.source, value).await
            }
        }
    }
}
