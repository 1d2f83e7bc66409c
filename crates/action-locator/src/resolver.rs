//! Control resolver with fallback chain orchestration

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::ports::{ControlRef, Locatable};
use crate::strategies::*;
use crate::types::*;

/// Resolves logical fields to live controls.
pub struct ControlLocator {
    settings: LocatorSettings,
    pattern_strategy: Arc<PatternStrategy>,
    label_strategy: Arc<LabelStrategy>,
    ownership_strategy: Arc<OwnershipStrategy>,
}

impl Default for ControlLocator {
    fn default() -> Self {
        Self::new(LocatorSettings::default())
    }
}

impl ControlLocator {
    pub fn new(settings: LocatorSettings) -> Self {
        Self {
            settings,
            pattern_strategy: Arc::new(PatternStrategy),
            label_strategy: Arc::new(LabelStrategy),
            ownership_strategy: Arc::new(OwnershipStrategy),
        }
    }

    pub fn settings(&self) -> &LocatorSettings {
        &self.settings
    }

    fn get_strategy(&self, strategy_type: LocatorStrategy) -> Arc<dyn Strategy> {
        match strategy_type {
            LocatorStrategy::Pattern => self.pattern_strategy.clone(),
            LocatorStrategy::LabelProximity => self.label_strategy.clone(),
            LocatorStrategy::OwnershipLink => self.ownership_strategy.clone(),
        }
    }

    /// Resolve a field through the fallback chain. A miss on every strategy,
    /// a stale handle and a failing backend all read as `None`.
    pub async fn locate(
        &self,
        page: &dyn Locatable,
        target: &FieldTarget<'_>,
    ) -> Option<LocatedControl> {
        for strategy_type in LocatorStrategy::fallback_chain() {
            let strategy = self.get_strategy(strategy_type);
            match strategy.resolve(page, target, &self.settings).await {
                Ok(Some(found)) => {
                    debug!(
                        field = target.key,
                        strategy = strategy.name(),
                        "resolved control"
                    );
                    return Some(found);
                }
                Ok(None) => {
                    debug!(field = target.key, strategy = strategy.name(), "no match");
                }
                Err(err) if err.is_not_found() => {
                    debug!(field = target.key, strategy = strategy.name(), %err, "control went away");
                }
                Err(err) => {
                    warn!(field = target.key, strategy = strategy.name(), %err, "strategy failed");
                }
            }
        }
        None
    }

    /// First visible add-entry control whose text contains one of `phrases`,
    /// falling back to any visible element whose `aria-label` or `title`
    /// contains one.
    pub async fn find_add_trigger(
        &self,
        page: &dyn Locatable,
        phrases: &[String],
    ) -> Option<ControlRef> {
        let phrases: Vec<String> = phrases
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        if phrases.is_empty() {
            return None;
        }
        let pattern = self.settings.add_triggers.join(", ");
        let controls = match page.query_all(&pattern).await {
            Ok(controls) => controls,
            Err(err) => {
                warn!(%err, "add-trigger scan failed");
                return None;
            }
        };

        let mut visible = Vec::with_capacity(controls.len());
        for control in controls {
            if control.is_visible().await.unwrap_or(false) {
                visible.push(control);
            }
        }

        for control in &visible {
            let text = control.text().await.unwrap_or_default().to_lowercase();
            if phrases.iter().any(|p| text.contains(p.as_str())) {
                info!(text = %text, "found add trigger");
                return Some(control.clone());
            }
        }
        for phrase in &phrases {
            let quoted = phrase.replace('"', "");
            let pattern = format!("[aria-label*=\"{quoted}\" i], [title*=\"{quoted}\" i]");
            let Ok(found) = page.query_all(&pattern).await else {
                continue;
            };
            for control in found {
                if control.is_visible().await.unwrap_or(false) {
                    info!(phrase = %phrase, "found add trigger by attribute");
                    return Some(control);
                }
            }
        }
        None
    }

    /// Human-readable label of a control: `aria-label`, a `label[for]`, the
    /// first label node in its container, then `placeholder` or `name`.
    pub async fn label_for(&self, page: &dyn Locatable, control: &ControlRef) -> Option<String> {
        if let Ok(Some(label)) = control.attribute("aria-label").await {
            if !label.trim().is_empty() {
                return Some(clean(&label));
            }
        }
        if let Ok(Some(id)) = control.attribute("id").await {
            let pattern = format!("label[for=\"{}\"]", id.replace('"', ""));
            if let Ok(Some(label)) = page.find_first_visible(&pattern).await {
                if let Some(text) = non_empty_text(&label).await {
                    return Some(text);
                }
            }
        }
        if let Ok(Some(container)) = control.closest(&self.settings.containers.join(", ")).await {
            if let Ok(labels) = container.query(&self.settings.label_nodes.join(", ")).await {
                for label in labels {
                    if let Some(text) = non_empty_text(&label).await {
                        if text.chars().count() <= self.settings.max_label_len {
                            return Some(text);
                        }
                    }
                }
            }
        }
        for attr in ["placeholder", "name"] {
            if let Ok(Some(value)) = control.attribute(attr).await {
                if !value.trim().is_empty() {
                    return Some(clean(&value));
                }
            }
        }
        None
    }
}

async fn non_empty_text(control: &ControlRef) -> Option<String> {
    let text = clean(&control.text().await.ok()?);
    (!text.is_empty()).then_some(text)
}

fn clean(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches([':', '*', ' '])
        .to_string()
}
