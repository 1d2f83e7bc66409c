use thiserror::Error;
use value_match::TableError;

/// Errors surfaced while loading or validating a field mapping.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to deserialize field mapping: {0}")]
    Deserialize(String),
    #[error("unsupported field mapping version {0} (expected {expected})", expected = crate::model::CURRENT_VERSION)]
    UnsupportedVersion(u32),
    #[error("empty field key in {0}")]
    EmptyKey(String),
    #[error("field key '{key}' is defined in both {first} and {second}")]
    DuplicateKey {
        key: String,
        first: String,
        second: String,
    },
    #[error("dropdown '{0}' has neither label synonyms nor patterns")]
    UnreachableDropdown(String),
    #[error("abbreviation table rejected: {0}")]
    Abbreviations(#[from] TableError),
    #[error("entity list '{list}' is invalid: {reason}")]
    InvalidEntity { list: String, reason: String },
}
