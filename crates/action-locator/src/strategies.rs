//! Control resolution strategies
//!
//! Three strategies in fallback order:
//! 1. Pattern - configured structural patterns
//! 2. LabelProximity - label text, then `for`, container, or sibling
//! 3. OwnershipLink - dropdown triggers named through ARIA attributes

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::errors::LocatorError;
use crate::ports::{ControlRef, Locatable};
use crate::types::*;

/// Strategy trait for control resolution
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Attempt to resolve the target using this strategy
    async fn resolve(
        &self,
        page: &dyn Locatable,
        target: &FieldTarget<'_>,
        settings: &LocatorSettings,
    ) -> Result<Option<LocatedControl>, LocatorError>;

    /// Get strategy type
    fn strategy_type(&self) -> LocatorStrategy;

    /// Get strategy name
    fn name(&self) -> &'static str {
        self.strategy_type().name()
    }
}

/// Kind of `control` when it is visible and compatible with `want`.
/// Stale handles read as not qualifying.
pub(crate) async fn qualifies(control: &ControlRef, want: TargetKind) -> Option<ControlKind> {
    let kind = control.kind().await.ok()?;
    if !want.accepts(kind) {
        return None;
    }
    if !control.is_visible().await.unwrap_or(false) {
        return None;
    }
    Some(kind)
}

/// Panel id advertised by a custom trigger through `aria-controls` or `aria-owns`.
pub async fn owned_panel_id(control: &ControlRef) -> Option<String> {
    for attr in ["aria-controls", "aria-owns"] {
        if let Ok(Some(value)) = control.attribute(attr).await {
            if let Some(first) = value.split_whitespace().next() {
                return Some(first.to_string());
            }
        }
    }
    None
}

async fn located(
    control: ControlRef,
    kind: ControlKind,
    strategy: LocatorStrategy,
) -> LocatedControl {
    let panel_id = if kind == ControlKind::CustomList {
        owned_panel_id(&control).await
    } else {
        None
    };
    LocatedControl {
        control,
        kind,
        strategy,
        panel_id,
    }
}

fn ordered<T>(mut items: Vec<T>, pick: Pick) -> Vec<T> {
    if pick == Pick::Last {
        items.reverse();
    }
    items
}

/// Configured structural patterns, tried in order.
#[derive(Debug, Default, Clone)]
pub struct PatternStrategy;

#[async_trait]
impl Strategy for PatternStrategy {
    async fn resolve(
        &self,
        page: &dyn Locatable,
        target: &FieldTarget<'_>,
        _settings: &LocatorSettings,
    ) -> Result<Option<LocatedControl>, LocatorError> {
        for pattern in target.patterns {
            let matches = match page.query_all(pattern).await {
                Ok(matches) => matches,
                Err(err @ LocatorError::InvalidPattern { .. }) => {
                    warn!(field = target.key, %err, "skipping locator pattern");
                    continue;
                }
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(err),
            };
            for control in ordered(matches, target.pick) {
                if let Some(kind) = qualifies(&control, target.kind).await {
                    debug!(field = target.key, pattern = %pattern, "pattern matched");
                    return Ok(Some(located(control, kind, self.strategy_type()).await));
                }
            }
        }
        Ok(None)
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::Pattern
    }
}

/// Label text search followed by a proximity walk.
#[derive(Debug, Default, Clone)]
pub struct LabelStrategy;

impl LabelStrategy {
    async fn resolve_near(
        &self,
        page: &dyn Locatable,
        label: &ControlRef,
        target: &FieldTarget<'_>,
        settings: &LocatorSettings,
    ) -> Result<Option<(ControlRef, ControlKind)>, LocatorError> {
        if let Some(for_id) = label.attribute("for").await? {
            if let Some(control) = page.by_id(&for_id).await? {
                if let Some(kind) = qualifies(&control, target.kind).await {
                    return Ok(Some((control, kind)));
                }
            }
        }

        let container = match label.closest(&settings.containers.join(", ")).await {
            Ok(Some(container)) => Some(container),
            Ok(None) => label.parent().await?,
            Err(err @ LocatorError::InvalidPattern { .. }) => {
                warn!(%err, "container patterns are invalid");
                label.parent().await?
            }
            Err(err) => return Err(err),
        };
        if let Some(container) = container {
            let candidates = container.query(target.kind.candidate_pattern()).await?;
            for control in ordered(candidates, target.pick) {
                if let Some(kind) = qualifies(&control, target.kind).await {
                    return Ok(Some((control, kind)));
                }
            }
        }

        for sibling in label.next_siblings().await? {
            if let Some(kind) = qualifies(&sibling, target.kind).await {
                return Ok(Some((sibling, kind)));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl Strategy for LabelStrategy {
    async fn resolve(
        &self,
        page: &dyn Locatable,
        target: &FieldTarget<'_>,
        settings: &LocatorSettings,
    ) -> Result<Option<LocatedControl>, LocatorError> {
        if target.labels.is_empty() {
            return Ok(None);
        }
        let nodes = page.query_all(&settings.label_nodes.join(", ")).await?;
        let mut labels = Vec::with_capacity(nodes.len());
        for node in nodes {
            let Ok(raw) = node.text().await else {
                continue;
            };
            let text = normalize_label(&raw);
            if text.is_empty() || text.chars().count() > settings.max_label_len {
                continue;
            }
            labels.push((node, text));
        }
        let labels = ordered(labels, target.pick);

        for synonym in target.labels {
            for (label, text) in &labels {
                if !label_matches(text, synonym) {
                    continue;
                }
                match self.resolve_near(page, label, target, settings).await {
                    Ok(Some((control, kind))) => {
                        debug!(field = target.key, label = %text, "label matched");
                        return Ok(Some(located(control, kind, self.strategy_type()).await));
                    }
                    Ok(None) => {}
                    Err(err) if err.is_not_found() => {}
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(None)
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::LabelProximity
    }
}

const OWNED_TRIGGERS: &str = "[aria-controls], [aria-owns]";

/// Dropdown triggers whose accessible name matches a synonym and that name
/// their option panel directly.
#[derive(Debug, Default, Clone)]
pub struct OwnershipStrategy;

impl OwnershipStrategy {
    async fn accessible_name(
        &self,
        page: &dyn Locatable,
        control: &ControlRef,
    ) -> Result<String, LocatorError> {
        if let Some(label) = control.attribute("aria-label").await? {
            if !label.trim().is_empty() {
                return Ok(normalize_label(&label));
            }
        }
        let mut parts = Vec::new();
        if let Some(ids) = control.attribute("aria-labelledby").await? {
            for id in ids.split_whitespace() {
                if let Some(node) = page.by_id(id).await? {
                    parts.push(node.text().await?);
                }
            }
        }
        Ok(normalize_label(&parts.join(" ")))
    }
}

#[async_trait]
impl Strategy for OwnershipStrategy {
    async fn resolve(
        &self,
        page: &dyn Locatable,
        target: &FieldTarget<'_>,
        _settings: &LocatorSettings,
    ) -> Result<Option<LocatedControl>, LocatorError> {
        if target.kind != TargetKind::Dropdown || target.labels.is_empty() {
            return Ok(None);
        }
        let triggers = ordered(page.query_all(OWNED_TRIGGERS).await?, target.pick);
        let mut named = Vec::with_capacity(triggers.len());
        for trigger in triggers {
            let Some(kind) = qualifies(&trigger, target.kind).await else {
                continue;
            };
            let Ok(name) = self.accessible_name(page, &trigger).await else {
                continue;
            };
            if !name.is_empty() {
                named.push((trigger, kind, name));
            }
        }

        for synonym in target.labels {
            for (trigger, kind, name) in &named {
                if !label_matches(name, synonym) {
                    continue;
                }
                let Some(panel_id) = owned_panel_id(trigger).await else {
                    continue;
                };
                debug!(field = target.key, panel = %panel_id, "ownership link matched");
                return Ok(Some(LocatedControl {
                    control: trigger.clone(),
                    kind: *kind,
                    strategy: self.strategy_type(),
                    panel_id: Some(panel_id),
                }));
            }
        }
        Ok(None)
    }

    fn strategy_type(&self) -> LocatorStrategy {
        LocatorStrategy::OwnershipLink
    }
}
