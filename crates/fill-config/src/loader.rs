//! Reading field mappings from JSON or YAML.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::errors::ConfigError;
use crate::model::FieldConfig;

const DEFAULT_FIELDS: &str = include_str!("../defaults/fields.yaml");

pub fn load_fields_from_reader<R: Read>(mut reader: R) -> Result<FieldConfig, ConfigError> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    parse_fields_str(&buf)
}

pub fn load_fields_from_path(path: impl AsRef<Path>) -> Result<FieldConfig, ConfigError> {
    let file = File::open(path.as_ref())?;
    load_fields_from_reader(file)
}

/// Parse and validate a mapping given as JSON or YAML.
pub fn parse_fields_str(raw: &str) -> Result<FieldConfig, ConfigError> {
    let config: FieldConfig = match serde_json::from_str(raw) {
        Ok(config) => config,
        Err(json_err) => serde_yaml::from_str(raw).map_err(|yaml_err| {
            ConfigError::Deserialize(format!(
                "json error: {}; yaml error: {}",
                json_err, yaml_err
            ))
        })?,
    };
    config.validated()
}

/// The mapping shipped with the binary.
pub fn default_fields() -> Result<FieldConfig, ConfigError> {
    parse_fields_str(DEFAULT_FIELDS)
}

/// Raw text of the shipped mapping.
pub fn default_fields_source() -> &'static str {
    DEFAULT_FIELDS
}
