//! Yes/No toggle pass.
//!
//! Runs before the text pass: switching a toggle on often reveals the
//! section holding later fields. Toggles are only ever switched on.

use action_locator::Locatable;
use formfill_core_types::{FieldKind, SourceRecord};
use tracing::{debug, info};

use crate::executor::FillOrchestrator;
use crate::session::{Attempt, FillSession};
use crate::types::FieldOutcome;

const TOGGLE_PREFIX: &str = "Toggle.";
const NOT_ON_PAGE: &str = "toggle not found on page";

/// Report name of a toggle, kept apart from a dropdown sharing its key.
pub fn toggle_outcome_name(key: &str) -> String {
    format!("{TOGGLE_PREFIX}{key}")
}

impl FillOrchestrator {
    pub(crate) async fn toggle_pass(
        &self,
        page: &dyn Locatable,
        record: &SourceRecord,
        session: &mut FillSession,
    ) {
        let toggles = &self.config.toggles;
        for field in &toggles.fields {
            let Some(value) = record.value(&field.key) else {
                continue;
            };
            if !field.is_on(&value) {
                continue;
            }
            let name = toggle_outcome_name(&field.key);
            if !session.begin(&name, Attempt::First) {
                continue;
            }
            let outcome = match self
                .locator
                .find_toggle(page, &field.labels, &toggles.exclude)
                .await
            {
                None => FieldOutcome::skipped(&name, FieldKind::Toggle, NOT_ON_PAGE),
                Some(found) if found.active => {
                    debug!(toggle = %field.key, "toggle already on");
                    FieldOutcome::applied(&name, FieldKind::Toggle)
                }
                Some(found) => match found.switch_on().await {
                    Ok(()) => {
                        info!(toggle = %field.key, style = ?found.style, "toggle switched on");
                        self.waiter.wait(self.timings.toggle_render()).await;
                        FieldOutcome::applied(&name, FieldKind::Toggle)
                    }
                    Err(err) => FieldOutcome::skipped(
                        &name,
                        FieldKind::Toggle,
                        format!("toggle click failed: {err}"),
                    ),
                },
            };
            session.record(outcome);
        }
    }
}
