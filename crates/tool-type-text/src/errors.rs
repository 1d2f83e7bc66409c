use action_locator::LocatorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypeError {
    #[error("tool disabled by policy")]
    Disabled,
    #[error("value is blank")]
    BlankValue,
    #[error("text exceeds max length ({0})")]
    TextTooLong(usize),
    #[error("control is not a text entry")]
    NotTextEntry,
    #[error("control went stale: {0}")]
    Stale(String),
    #[error("backend error: {0}")]
    Backend(LocatorError),
}

impl From<LocatorError> for TypeError {
    fn from(err: LocatorError) -> Self {
        match err {
            LocatorError::StaleHandle(token) => TypeError::Stale(token),
            other => TypeError::Backend(other),
        }
    }
}
