use action_locator::LocatorError;
use thiserror::Error;

use crate::state::DropdownState;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SelectError {
    #[error("tool disabled by policy")]
    Disabled,
    #[error("no non-blank value to select")]
    BlankValue,
    #[error("control is not a dropdown")]
    NotAList,
    #[error("no selectable options found")]
    NoOptions,
    #[error("no option matches '{0}' confidently")]
    NoConfidentMatch(String),
    #[error("option panel still open after {0} escape attempts")]
    PanelStuckOpen(u32),
    #[error("illegal dropdown transition {from} -> {to}")]
    IllegalTransition {
        from: DropdownState,
        to: DropdownState,
    },
    #[error("control went stale: {0}")]
    Stale(String),
    #[error("backend error: {0}")]
    Backend(LocatorError),
}

impl From<LocatorError> for SelectError {
    fn from(err: LocatorError) -> Self {
        match err {
            LocatorError::StaleHandle(token) => SelectError::Stale(token),
            other => SelectError::Backend(other),
        }
    }
}

impl SelectError {
    /// Failures a later attempt may not repeat, e.g. a panel that had not
    /// finished loading.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SelectError::NoOptions | SelectError::Stale(_) | SelectError::Backend(_)
        )
    }
}
