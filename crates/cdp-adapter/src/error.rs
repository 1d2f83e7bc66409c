//! Error types for the DevTools backend

use action_locator::LocatorError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CdpError {
    /// Endpoint could not be resolved or the socket could not be opened
    #[error("cdp connection failed: {0}")]
    Connect(String),

    /// Socket or channel failure after the connection was up
    #[error("cdp i/o error: {0}")]
    Io(String),

    /// The browser answered a command with an error
    #[error("cdp command '{method}' failed ({code}): {message}")]
    Protocol {
        method: String,
        code: i64,
        message: String,
    },

    #[error("cdp command '{0}' timed out")]
    Timeout(String),

    /// No page tab to attach to
    #[error("no page target available")]
    NoPage,

    /// Evaluated script threw
    #[error("script raised: {0}")]
    Script(String),

    /// Response did not have the expected shape
    #[error("unexpected cdp payload: {0}")]
    Payload(String),
}

impl CdpError {
    pub fn is_retriable(&self) -> bool {
        match self {
            CdpError::Io(_) | CdpError::Timeout(_) => true,
            CdpError::Protocol { code, .. } => *code >= 500,
            _ => false,
        }
    }
}

impl From<CdpError> for LocatorError {
    fn from(err: CdpError) -> Self {
        LocatorError::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_failures_surface_as_locator_backend_errors() {
        let err: LocatorError = CdpError::Timeout("Runtime.evaluate".into()).into();
        assert!(err.is_retryable());
        assert!(!err.is_not_found());
        assert!(CdpError::Protocol {
            method: "Runtime.evaluate".into(),
            code: 503,
            message: "busy".into()
        }
        .is_retriable());
        assert!(!CdpError::NoPage.is_retriable());
    }
}
