//! Yes/No switches: slide toggles, check boxes and "Yes" radio buttons.
//!
//! Search order per label synonym:
//! 1. Slide toggles whose own text names the synonym
//! 2. Styled check boxes whose own text names the synonym
//! 3. The "Yes" radio button in the container of a matching label node
//! 4. A native check box pointed at by a matching `label[for]`

use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::LocatorError;
use crate::ports::{ControlRef, Locatable};
use crate::resolver::ControlLocator;
use crate::types::normalize_label;

const SLIDE_TOGGLES: &str = "mat-slide-toggle, [class*=\"mat-slide-toggle\"]";
const SLIDE_TOGGLE_ON: &[&str] = &["mat-checked", "mat-mdc-slide-toggle-checked"];
const CHECKBOXES: &str = "mat-checkbox, [class*=\"mat-checkbox\"]";
const CHECKBOX_ON: &[&str] = &["mat-checkbox-checked", "mat-mdc-checkbox-checked"];
const RADIOS: &str = "mat-radio-button, [class*=\"mat-radio-button\"]";
const RADIO_ON: &[&str] = &["mat-radio-checked", "mat-mdc-radio-checked"];
const INNER_SWITCH: &str = "input[type=\"checkbox\"], input[type=\"radio\"]";
const LINKED_LABELS: &str = "label[for]";
const YES: &str = "yes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleStyle {
    SlideToggle,
    Checkbox,
    YesRadio,
    NativeCheckbox,
}

/// A located switch and whether it is already on.
#[derive(Debug, Clone)]
pub struct ToggleControl {
    pub control: ControlRef,
    pub style: ToggleStyle,
    pub active: bool,
}

impl ToggleControl {
    /// Clicks the inner input when there is one, the element itself otherwise.
    pub async fn switch_on(&self) -> Result<(), LocatorError> {
        if self.style != ToggleStyle::NativeCheckbox {
            if let Some(inner) = self.control.query(INNER_SWITCH).await?.into_iter().next() {
                return inner.click().await;
            }
        }
        self.control.click().await
    }
}

impl ControlLocator {
    /// First switch named by one of `labels`. Slide toggles and check boxes
    /// whose text contains an `excluded` phrase are passed over.
    pub async fn find_toggle(
        &self,
        page: &dyn Locatable,
        labels: &[String],
        excluded: &[String],
    ) -> Option<ToggleControl> {
        let excluded: Vec<String> = excluded
            .iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        for label in labels.iter().map(|l| normalize_label(l)) {
            if label.is_empty() {
                continue;
            }
            match self.toggle_for(page, &label, &excluded).await {
                Ok(Some(found)) => {
                    debug!(label = %label, style = ?found.style, active = found.active, "found toggle");
                    return Some(found);
                }
                Ok(None) => {}
                Err(err) if err.is_not_found() => {
                    debug!(label = %label, %err, "toggle went away");
                }
                Err(err) => {
                    warn!(label = %label, %err, "toggle search failed");
                }
            }
        }
        None
    }

    async fn toggle_for(
        &self,
        page: &dyn Locatable,
        label: &str,
        excluded: &[String],
    ) -> Result<Option<ToggleControl>, LocatorError> {
        let styled = [
            (SLIDE_TOGGLES, ToggleStyle::SlideToggle, SLIDE_TOGGLE_ON),
            (CHECKBOXES, ToggleStyle::Checkbox, CHECKBOX_ON),
        ];
        for (pattern, style, on) in styled {
            for control in page.query_all(pattern).await? {
                if !control.is_visible().await.unwrap_or(false) {
                    continue;
                }
                let text = normalize_label(&control.text().await?);
                if !names(&text, label) || excluded.iter().any(|w| text.contains(w.as_str())) {
                    continue;
                }
                let active = has_class(&control, on).await? || inner_checked(&control).await?;
                return Ok(Some(ToggleControl {
                    control,
                    style,
                    active,
                }));
            }
        }

        let settings = self.settings();
        for node in page.query_all(&settings.label_nodes.join(", ")).await? {
            let text = normalize_label(&node.text().await?);
            if text.chars().count() > settings.max_label_len || !names(&text, label) {
                continue;
            }
            let container = match node.closest(&settings.containers.join(", ")).await? {
                Some(container) => Some(container),
                None => node.parent().await?,
            };
            let Some(container) = container else {
                continue;
            };
            for radio in container.query(RADIOS).await? {
                if radio.text().await?.to_lowercase().contains(YES) {
                    let active = has_class(&radio, RADIO_ON).await? || inner_checked(&radio).await?;
                    return Ok(Some(ToggleControl {
                        control: radio,
                        style: ToggleStyle::YesRadio,
                        active,
                    }));
                }
            }
        }

        for node in page.query_all(LINKED_LABELS).await? {
            let text = normalize_label(&node.text().await?);
            if !names(&text, label) {
                continue;
            }
            let Some(id) = node.attribute("for").await? else {
                continue;
            };
            let Some(input) = page.by_id(&id).await? else {
                continue;
            };
            let info = input.describe().await?;
            let checkbox = info.tag.eq_ignore_ascii_case("input")
                && info
                    .input_type
                    .as_deref()
                    .is_some_and(|t| t.eq_ignore_ascii_case("checkbox"));
            if checkbox && input.is_visible().await? {
                let active = input.is_checked().await?;
                return Ok(Some(ToggleControl {
                    control: input,
                    style: ToggleStyle::NativeCheckbox,
                    active,
                }));
            }
        }
        Ok(None)
    }
}

/// Either text contains the other; blank text never names anything.
fn names(text: &str, label: &str) -> bool {
    !text.is_empty() && (text.contains(label) || label.contains(text))
}

async fn has_class(control: &ControlRef, wanted: &[&str]) -> Result<bool, LocatorError> {
    let class = control.attribute("class").await?.unwrap_or_default();
    Ok(class.split_whitespace().any(|c| wanted.contains(&c)))
}

async fn inner_checked(control: &ControlRef) -> Result<bool, LocatorError> {
    match control.query(INNER_SWITCH).await?.into_iter().next() {
        Some(inner) => inner.is_checked().await,
        None => Ok(false),
    }
}
