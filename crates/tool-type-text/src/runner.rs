use std::time::Instant;

use action_locator::{ControlHandle, ControlKind, DomEvent};
use tracing::{debug, instrument};

use crate::errors::TypeError;
use crate::model::TypeReport;
use crate::policy::TypePolicyView;
use crate::redact;

pub struct RuntimeDeps<'a> {
    pub control: &'a dyn ControlHandle,
    pub policy: &'a TypePolicyView,
}

const NOTIFICATIONS: [DomEvent; 3] = [DomEvent::Input, DomEvent::Change, DomEvent::Blur];

#[instrument(skip_all, fields(control = %deps.control.token(), value = %redact::preview(value)))]
pub async fn execute(value: &str, deps: RuntimeDeps<'_>) -> Result<TypeReport, TypeError> {
    if !deps.policy.enabled {
        return Err(TypeError::Disabled);
    }
    if value.trim().is_empty() {
        return Err(TypeError::BlankValue);
    }
    let value_len = value.chars().count();
    if value_len > deps.policy.max_text_len {
        return Err(TypeError::TextTooLong(deps.policy.max_text_len));
    }
    if deps.policy.require_text_entry && deps.control.kind().await? != ControlKind::TextEntry {
        return Err(TypeError::NotTextEntry);
    }

    let mut report = TypeReport::new(Instant::now());
    let previous = deps.control.value().await?;

    deps.control.dispatch(DomEvent::Focus).await?;
    report.events.push(DomEvent::Focus);
    // Bound inputs ignore an assignment equal to their model value.
    deps.control.set_value("").await?;
    deps.control.set_value(value).await?;
    for event in NOTIFICATIONS {
        deps.control.dispatch(event.clone()).await?;
        report.events.push(event);
    }

    report.previous_len = previous.chars().count();
    report.value_len = value_len;
    report.changed = previous != value;
    report.ok = true;
    debug!(changed = report.changed, "text value applied");
    Ok(report.finish(Instant::now()))
}
