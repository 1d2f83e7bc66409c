use std::time::Instant;

use action_locator::{
    ControlHandle, ControlKind, ControlRef, DomEvent, Locatable, LocatedControl, LocatorError,
};
use formfill_core_types::Waiter;
use tracing::{debug, instrument, warn};

use crate::errors::SelectError;
use crate::matching::{choose, OptionEntry};
use crate::model::{ListPath, MatchSource, MatchedOption, SelectReport};
use crate::policy::SelectPolicyView;
use crate::state::{DropdownState, Resolution, Trail};

/// Options inside a panel reached through an ownership attribute.
const OWNED_OPTION_PATTERN: &str = "mat-option, [role=\"option\"], li";

pub struct RuntimeDeps<'a> {
    pub page: &'a dyn Locatable,
    pub waiter: &'a dyn Waiter,
    pub policy: &'a SelectPolicyView,
}

#[instrument(skip_all, fields(field = key, kind = ?located.kind, strategy = located.strategy.name()))]
pub async fn execute(
    key: &str,
    located: &LocatedControl,
    candidates: &[String],
    deps: RuntimeDeps<'_>,
) -> Result<SelectReport, SelectError> {
    if !deps.policy.enabled {
        return Err(SelectError::Disabled);
    }
    let candidates: Vec<String> = candidates
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if candidates.is_empty() {
        return Err(SelectError::BlankValue);
    }

    let mut report = SelectReport::new(Instant::now());
    report.trail.advance(DropdownState::Located)?;

    let outcome = match located.kind {
        ControlKind::NativeList => {
            report.path = Some(ListPath::Native);
            report.trail.advance(DropdownState::NativeResolve)?;
            resolve_native(located.control.as_ref(), &candidates, &deps).await
        }
        ControlKind::CustomList => {
            report.path = Some(ListPath::Custom);
            resolve_custom(located, &candidates, &deps, &mut report.trail).await
        }
        ControlKind::TextEntry | ControlKind::Other => Err(SelectError::NotAList),
    };

    match outcome {
        Ok(matched) => {
            report
                .trail
                .advance(DropdownState::Resolved(Resolution::Success))?;
            debug!(label = %matched.label, source = ?matched.source, "dropdown resolved");
            report.matched = Some(matched);
            report.ok = true;
        }
        Err(err) => {
            if matches!(err, SelectError::IllegalTransition { .. }) {
                return Err(err);
            }
            report
                .trail
                .advance(DropdownState::Resolved(Resolution::Failure))?;
            debug!(error = %err, "dropdown not resolved");
            report.failure = Some(err);
        }
    }

    if report.path == Some(ListPath::Custom) {
        if let Err(err) = ensure_closed(&deps, located.panel_id.as_deref(), !report.ok).await {
            warn!(error = %err, "option panel could not be closed");
        }
    }
    report.trail.advance(DropdownState::Closed)?;
    debug!(trail = %report.trail.render(), "dropdown machine finished");
    Ok(report.finish(Instant::now()))
}

async fn resolve_native(
    control: &dyn ControlHandle,
    candidates: &[String],
    deps: &RuntimeDeps<'_>,
) -> Result<MatchedOption, SelectError> {
    let entries: Vec<OptionEntry> = control
        .options()
        .await?
        .into_iter()
        .filter(|o| !deps.policy.is_placeholder(&o.label))
        .map(|o| OptionEntry {
            label: o.label,
            value: Some(o.value),
        })
        .collect();
    if entries.is_empty() {
        return Err(SelectError::NoOptions);
    }

    let (index, matched) = choose(candidates, &entries, deps.policy.cutoff)
        .ok_or_else(|| SelectError::NoConfidentMatch(candidates[0].clone()))?;
    let value = entries[index].value.clone().unwrap_or_default();
    control.set_value(&value).await?;
    control.dispatch(DomEvent::Change).await?;
    Ok(matched)
}

async fn resolve_custom(
    located: &LocatedControl,
    candidates: &[String],
    deps: &RuntimeDeps<'_>,
    trail: &mut Trail,
) -> Result<MatchedOption, SelectError> {
    let control = located.control.as_ref();
    let panel_id = located.panel_id.as_deref();
    let timeouts = &deps.policy.timeouts;

    control.click().await?;
    trail.advance(DropdownState::Opened)?;
    deps.waiter.wait(timeouts.open()).await;

    if panel_open(deps, panel_id).await? {
        trail.advance(DropdownState::Typeahead)?;
        let preferred = &candidates[0];
        for ch in preferred.chars() {
            let key = ch.to_string();
            deps.page.dispatch_key(DomEvent::KeyDown(key.clone())).await?;
            deps.page.dispatch_key(DomEvent::KeyPress(key)).await?;
            deps.waiter.wait(timeouts.typeahead_char()).await;
        }
        deps.waiter.wait(timeouts.typeahead_settle()).await;
        if !panel_open(deps, panel_id).await? {
            return Ok(MatchedOption {
                label: preferred.clone(),
                source: MatchSource::Typeahead,
                score: 1.0,
            });
        }
    } else {
        debug!("no option panel after opening, skipping typeahead");
    }

    deps.page.dispatch_key(DomEvent::escape()).await?;
    deps.waiter.wait(timeouts.escape_settle()).await;
    control.click().await?;
    deps.waiter.wait(timeouts.open()).await;
    trail.advance(DropdownState::PanelEnumerate)?;

    let options: Vec<(ControlRef, OptionEntry)> = enumerate(panel_id, deps)
        .await?
        .into_iter()
        .filter(|(_, entry)| !deps.policy.is_placeholder(&entry.label))
        .collect();
    if options.is_empty() {
        return Err(SelectError::NoOptions);
    }

    let entries: Vec<OptionEntry> = options.iter().map(|(_, e)| e.clone()).collect();
    let (index, matched) = choose(candidates, &entries, deps.policy.cutoff)
        .ok_or_else(|| SelectError::NoConfidentMatch(candidates[0].clone()))?;
    options[index].0.click().await?;
    deps.waiter.wait(timeouts.option_settle()).await;
    Ok(matched)
}

/// Options of the open panel: the ownership-linked panel first, then the
/// first configured pattern that yields anything.
async fn enumerate(
    panel_id: Option<&str>,
    deps: &RuntimeDeps<'_>,
) -> Result<Vec<(ControlRef, OptionEntry)>, SelectError> {
    if let Some(id) = panel_id {
        if let Some(panel) = deps.page.by_id(id).await? {
            let found = panel.query(OWNED_OPTION_PATTERN).await?;
            if !found.is_empty() {
                debug!(panel = id, count = found.len(), "options from linked panel");
                return labelled(found).await;
            }
        }
    }
    for pattern in &deps.policy.panels {
        let found = match deps.page.query_all(pattern).await {
            Ok(found) => found,
            Err(LocatorError::InvalidPattern { .. }) => continue,
            Err(err) => return Err(err.into()),
        };
        if !found.is_empty() {
            debug!(pattern = %pattern, count = found.len(), "options from panel pattern");
            return labelled(found).await;
        }
    }
    Ok(Vec::new())
}

async fn labelled(found: Vec<ControlRef>) -> Result<Vec<(ControlRef, OptionEntry)>, SelectError> {
    let mut out = Vec::with_capacity(found.len());
    for option in found {
        let label = option.text().await?;
        out.push((option, OptionEntry::labelled(label.trim())));
    }
    Ok(out)
}

/// A visible ownership-linked panel counts as open wherever it is rendered.
async fn panel_open(deps: &RuntimeDeps<'_>, panel_id: Option<&str>) -> Result<bool, SelectError> {
    if let Some(id) = panel_id {
        if let Some(panel) = deps.page.by_id(id).await? {
            match panel.is_visible().await {
                Ok(true) => return Ok(true),
                Ok(false) | Err(LocatorError::StaleHandle(_)) => {}
                Err(err) => return Err(err.into()),
            }
        }
    }
    for pattern in &deps.policy.panel_patterns {
        match deps.page.query_all(pattern).await {
            Ok(found) if !found.is_empty() => return Ok(true),
            Ok(_) | Err(LocatorError::InvalidPattern { .. }) => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(false)
}

/// Escapes until neither the linked panel nor any panel pattern is showing.
/// A failed fill escapes at least once: a panel that rendered no options
/// matches no pattern.
async fn ensure_closed(
    deps: &RuntimeDeps<'_>,
    panel_id: Option<&str>,
    escape_first: bool,
) -> Result<(), SelectError> {
    let mut attempts = 0u32;
    if escape_first {
        deps.page.dispatch_key(DomEvent::escape()).await?;
        deps.waiter.wait(deps.policy.timeouts.escape_settle()).await;
        attempts += 1;
    }
    while panel_open(deps, panel_id).await? {
        if attempts >= deps.policy.max_escapes {
            return Err(SelectError::PanelStuckOpen(attempts));
        }
        deps.page.dispatch_key(DomEvent::escape()).await?;
        deps.waiter.wait(deps.policy.timeouts.escape_settle()).await;
        attempts += 1;
    }
    Ok(())
}
