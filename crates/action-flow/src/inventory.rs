//! Page inventory: the controls a page offers and the option vocabulary of
//! every list, read without changing any value.

use std::collections::BTreeMap;

use action_locator::{ControlKind, ControlRef, DomEvent, Locatable};
use chrono::{DateTime, Utc};
use page_context::{PageContext, PageKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::errors::FlowError;
use crate::executor::{FillOrchestrator, FormFiller};
use crate::types::VocabularyHints;

const TEXT_PATTERN: &str = "input, textarea";
const NATIVE_PATTERN: &str = "select";
const CUSTOM_PATTERN: &str = "mat-select, [role=\"listbox\"], [role=\"combobox\"]";
const OVERLAY_PATTERN: &str = ".cdk-overlay-container";
const PANE_PATTERN: &str = ".cdk-overlay-container .cdk-overlay-pane";
const OPTION_PATTERN: &str = "mat-option, [role=\"option\"]";
const VALUE_TEXT_PATTERN: &str =
    ".mat-select-value-text, .mat-mdc-select-value-text, [class*=\"select-value\"]";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextEntryInfo {
    pub tag: String,
    pub input_type: String,
    pub name: String,
    pub id: String,
    pub placeholder: String,
    pub label: String,
    pub value: String,
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListInfo {
    pub id: String,
    pub name: String,
    pub label: String,
    pub options: Vec<String>,
    /// Label currently shown
    pub current: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlInventory {
    pub page: PageKind,
    pub location: String,
    pub scanned_at: DateTime<Utc>,
    pub text_entries: Vec<TextEntryInfo>,
    /// Keyed by label, falling back to name, id or position
    pub native_lists: BTreeMap<String, ListInfo>,
    /// Keyed by label, falling back to `aria-label`, id or position
    pub custom_dropdowns: BTreeMap<String, ListInfo>,
}

impl ControlInventory {
    pub fn new(context: &PageContext) -> Self {
        Self {
            page: context.kind,
            location: context.location.clone(),
            scanned_at: Utc::now(),
            text_entries: Vec::new(),
            native_lists: BTreeMap::new(),
            custom_dropdowns: BTreeMap::new(),
        }
    }

    /// Every observed option list, custom dropdowns winning over native
    /// lists with the same key.
    pub fn hints(&self) -> VocabularyHints {
        let mut hints = VocabularyHints::new();
        for (key, list) in self.native_lists.iter().chain(&self.custom_dropdowns) {
            hints.insert(key.clone(), list.options.clone());
        }
        hints
    }

    pub fn option_count(&self) -> usize {
        self.native_lists
            .values()
            .chain(self.custom_dropdowns.values())
            .map(|l| l.options.len())
            .sum()
    }
}

impl FillOrchestrator {
    #[instrument(skip_all)]
    pub async fn inventory(&self, page: &dyn Locatable) -> Result<ControlInventory, FlowError> {
        let context = self.context(page).await?;
        let mut inventory = ControlInventory::new(&context);

        self.scan_text_entries(page, &mut inventory).await?;
        self.scan_native_lists(page, &mut inventory).await?;
        self.close_panels(page).await;
        self.scan_custom_dropdowns(page, &mut inventory).await?;

        debug!(
            page = %inventory.page,
            text_entries = inventory.text_entries.len(),
            native_lists = inventory.native_lists.len(),
            custom_dropdowns = inventory.custom_dropdowns.len(),
            options = inventory.option_count(),
            "inventory complete"
        );
        Ok(inventory)
    }

    async fn scan_text_entries(
        &self,
        page: &dyn Locatable,
        inventory: &mut ControlInventory,
    ) -> Result<(), FlowError> {
        for control in page.query_all(TEXT_PATTERN).await? {
            if !control.is_visible().await.unwrap_or(false) {
                continue;
            }
            let Ok(info) = control.describe().await else {
                continue;
            };
            if info.kind() != ControlKind::TextEntry {
                continue;
            }
            inventory.text_entries.push(TextEntryInfo {
                input_type: info.input_type.clone().unwrap_or_else(|| "text".into()),
                tag: info.tag,
                name: attr(&control, "name").await,
                id: attr(&control, "id").await,
                placeholder: attr(&control, "placeholder").await,
                label: self.locator.label_for(page, &control).await.unwrap_or_default(),
                value: control.value().await.unwrap_or_default(),
                required: is_required(&control).await,
            });
        }
        Ok(())
    }

    async fn scan_native_lists(
        &self,
        page: &dyn Locatable,
        inventory: &mut ControlInventory,
    ) -> Result<(), FlowError> {
        for (index, control) in page.query_all(NATIVE_PATTERN).await?.into_iter().enumerate() {
            if !control.is_visible().await.unwrap_or(false) {
                continue;
            }
            let entries = control.options().await.unwrap_or_default();
            let value = control.value().await.unwrap_or_default();
            let current = entries
                .iter()
                .find(|o| o.value == value)
                .map(|o| o.label.trim().to_string())
                .filter(|label| !self.select_policy.is_placeholder(label))
                .unwrap_or_default();
            let options = entries
                .into_iter()
                .map(|o| o.label.trim().to_string())
                .filter(|label| !self.select_policy.is_placeholder(label))
                .collect();

            let list = ListInfo {
                id: attr(&control, "id").await,
                name: attr(&control, "name").await,
                label: self.locator.label_for(page, &control).await.unwrap_or_default(),
                options,
                current,
            };
            let key = first_non_empty(&[&list.label, &list.name, &list.id])
                .unwrap_or_else(|| format!("select_{index}"));
            inventory.native_lists.insert(key, list);
        }
        Ok(())
    }

    async fn scan_custom_dropdowns(
        &self,
        page: &dyn Locatable,
        inventory: &mut ControlInventory,
    ) -> Result<(), FlowError> {
        for (index, control) in page.query_all(CUSTOM_PATTERN).await?.into_iter().enumerate() {
            if !control.is_visible().await.unwrap_or(false) {
                continue;
            }
            if matches!(control.closest(OVERLAY_PATTERN).await, Ok(Some(_))) {
                continue;
            }
            let current = match control.query(VALUE_TEXT_PATTERN).await {
                Ok(nodes) => match nodes.first() {
                    Some(node) => node.text().await.unwrap_or_default(),
                    None => String::new(),
                },
                Err(_) => String::new(),
            };
            let aria_label = attr(&control, "aria-label").await;
            let list = ListInfo {
                id: attr(&control, "id").await,
                name: attr(&control, "formcontrolname").await,
                label: self.locator.label_for(page, &control).await.unwrap_or_default(),
                options: self.read_panel(page, &control).await,
                current,
            };
            let key = first_non_empty(&[&list.label, &aria_label, &list.id])
                .unwrap_or_else(|| format!("custom_dd_{index}"));
            inventory.custom_dropdowns.insert(key, list);
        }
        Ok(())
    }

    /// Opens the trigger's panel, reads its option labels and closes it.
    async fn read_panel(&self, page: &dyn Locatable, trigger: &ControlRef) -> Vec<String> {
        if let Err(err) = trigger.click().await {
            debug!(control = %trigger.token(), %err, "trigger did not open");
            return Vec::new();
        }
        self.waiter.wait(self.timings.dropdown_open()).await;

        let mut nodes = Vec::new();
        let owned = match attr(trigger, "aria-owns").await {
            id if !id.is_empty() => id,
            _ => attr(trigger, "aria-controls").await,
        };
        if !owned.is_empty() {
            if let Ok(Some(panel)) = page.by_id(&owned).await {
                nodes = panel.query(OPTION_PATTERN).await.unwrap_or_default();
            }
        }
        if nodes.is_empty() {
            if let Ok(panes) = page.query_all(PANE_PATTERN).await {
                if let Some(pane) = panes.last() {
                    nodes = pane.query(OPTION_PATTERN).await.unwrap_or_default();
                }
            }
        }

        let mut options = Vec::with_capacity(nodes.len());
        for node in nodes {
            let label = node.text().await.unwrap_or_default();
            if !self.select_policy.is_placeholder(&label) {
                options.push(label.trim().to_string());
            }
        }
        self.close_panels(page).await;
        options
    }

    /// Escapes until no panel pattern matches, within the escape budget.
    async fn close_panels(&self, page: &dyn Locatable) {
        for _ in 0..self.select_policy.max_escapes {
            if !self.panel_visible(page).await {
                return;
            }
            if let Err(err) = page.dispatch_key(DomEvent::escape()).await {
                warn!(%err, "escape dispatch failed");
                return;
            }
            self.waiter.wait(self.timings.escape_settle()).await;
        }
        if self.panel_visible(page).await {
            warn!("option panel still open after scan");
        }
    }

    async fn panel_visible(&self, page: &dyn Locatable) -> bool {
        for pattern in &self.select_policy.panel_patterns {
            if page.any_visible(pattern).await.unwrap_or(false) {
                return true;
            }
        }
        false
    }
}

async fn attr(control: &ControlRef, name: &str) -> String {
    control
        .attribute(name)
        .await
        .ok()
        .flatten()
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

async fn is_required(control: &ControlRef) -> bool {
    matches!(control.attribute("required").await, Ok(Some(_)))
        || attr(control, "aria-required").await == "true"
}

fn first_non_empty(values: &[&String]) -> Option<String> {
    values.iter().find(|v| !v.is_empty()).map(|v| v.to_string())
}
