//! Fill pass error types

use action_locator::LocatorError;
use thiserror::Error;

/// Errors that abort a whole pass. Per-field failures never surface here;
/// they are recorded as skipped outcomes in the report.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The page could not be read at all
    #[error("page unavailable: {0}")]
    Page(#[from] LocatorError),

    /// Vocabulary hints were not a label to option-list map
    #[error("invalid vocabulary hints: {0}")]
    Hints(String),
}
