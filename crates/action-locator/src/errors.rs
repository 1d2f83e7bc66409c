//! Error types for locator system

use thiserror::Error;

/// Locator error enumeration
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocatorError {
    /// Element not found with any strategy
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Malformed structural pattern; the pattern is skipped
    #[error("Invalid locator pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Handle refers to an element that is no longer attached
    #[error("Stale control handle: {0}")]
    StaleHandle(String),

    /// Strategy execution failed
    #[error("Strategy '{strategy}' failed: {reason}")]
    StrategyFailed { strategy: String, reason: String },

    /// Page backend communication error
    #[error("Backend error: {0}")]
    Backend(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LocatorError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, LocatorError::Backend(_))
    }

    /// Errors that mean "no usable element" rather than a broken backend.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LocatorError::ElementNotFound(_) | LocatorError::StaleHandle(_)
        )
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            LocatorError::Internal(_) => 3,
            LocatorError::Backend(_) => 2,
            LocatorError::ElementNotFound(_)
            | LocatorError::StaleHandle(_)
            | LocatorError::StrategyFailed { .. } => 1,
            LocatorError::InvalidPattern { .. } => 0,
        }
    }
}
