use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecordError {
    #[error("source record must be a JSON object")]
    NotAnObject,
    #[error("list '{list}' element {index} is not an object")]
    InvalidEntity { list: String, index: usize },
}

/// A single source value. Only its trimmed text form matters to the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl Scalar {
    pub fn as_text(&self) -> String {
        match self {
            Scalar::Bool(flag) => flag.to_string(),
            Scalar::Number(num) => num.to_string(),
            Scalar::Text(text) => text.trim().to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.as_text().is_empty()
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

fn scalar_from(value: &Value) -> Option<Scalar> {
    match value {
        Value::Bool(flag) => Some(Scalar::Bool(*flag)),
        Value::Number(num) => Some(Scalar::Number(num.clone())),
        Value::String(text) => Some(Scalar::Text(text.clone())),
        _ => None,
    }
}

/// One element of a sub-entity list such as a driver or a vehicle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub fields: BTreeMap<String, Scalar>,
}

impl EntityRecord {
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Trimmed, non-blank text for `key`.
    pub fn value(&self, key: &str) -> Option<String> {
        non_blank(self.fields.get(key))
    }
}

/// Structured input for one fill pass: scalar fields plus named sub-entity lists.
///
/// Parsed from a JSON object. Top-level strings, numbers and booleans become
/// scalar fields; arrays of objects become sub-entity lists; nulls, nested
/// objects and arrays of scalars are ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct SourceRecord {
    fields: BTreeMap<String, Scalar>,
    lists: BTreeMap<String, Vec<EntityRecord>>,
}

impl SourceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_list(mut self, name: impl Into<String>, entries: Vec<EntityRecord>) -> Self {
        self.lists.insert(name.into(), entries);
        self
    }

    /// Trimmed, non-blank text for a scalar field.
    pub fn value(&self, key: &str) -> Option<String> {
        non_blank(self.fields.get(key))
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn list(&self, name: &str) -> &[EntityRecord] {
        self.lists.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        let Value::Object(map) = value else {
            return Err(RecordError::NotAnObject);
        };
        let mut record = SourceRecord::default();
        for (key, value) in map {
            match &value {
                Value::Array(items) if items.iter().any(Value::is_object) => {
                    let mut entries = Vec::with_capacity(items.len());
                    for (index, item) in items.iter().enumerate() {
                        let Value::Object(obj) = item else {
                            return Err(RecordError::InvalidEntity { list: key, index });
                        };
                        let fields = obj
                            .iter()
                            .filter_map(|(k, v)| scalar_from(v).map(|s| (k.clone(), s)))
                            .collect();
                        entries.push(EntityRecord { fields });
                    }
                    record.lists.insert(key, entries);
                }
                other => {
                    if let Some(scalar) = scalar_from(other) {
                        record.fields.insert(key, scalar);
                    }
                }
            }
        }
        Ok(record)
    }
}

impl TryFrom<Value> for SourceRecord {
    type Error = RecordError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        SourceRecord::from_value(value)
    }
}

impl From<SourceRecord> for Value {
    fn from(record: SourceRecord) -> Self {
        let mut map = Map::new();
        for (key, scalar) in record.fields {
            map.insert(key, serde_json::to_value(scalar).unwrap_or(Value::Null));
        }
        for (name, entries) in record.lists {
            let items = entries
                .into_iter()
                .map(|entry| {
                    Value::Object(
                        entry
                            .fields
                            .into_iter()
                            .map(|(k, v)| (k, serde_json::to_value(v).unwrap_or(Value::Null)))
                            .collect(),
                    )
                })
                .collect();
            map.insert(name, Value::Array(items));
        }
        Value::Object(map)
    }
}

fn non_blank(scalar: Option<&Scalar>) -> Option<String> {
    scalar.map(Scalar::as_text).filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn splits_scalars_and_lists() {
        let record: SourceRecord = serde_json::from_value(json!({
            "FirstName": " Jane ",
            "AnnualMiles": 12000,
            "Notes": null,
            "Address": {"Line1": "ignored"},
            "Drivers": [{"FirstName": "Jane"}, {"FirstName": "John", "DOB": "01/02/1990"}]
        }))
        .unwrap();

        assert_eq!(record.value("FirstName").as_deref(), Some("Jane"));
        assert_eq!(record.value("AnnualMiles").as_deref(), Some("12000"));
        assert_eq!(record.value("Notes"), None);
        assert_eq!(record.value("Address"), None);
        assert_eq!(record.list("Drivers").len(), 2);
        assert_eq!(record.list("Drivers")[1].value("DOB").as_deref(), Some("01/02/1990"));
        assert!(record.list("Vehicles").is_empty());
    }

    #[test]
    fn blank_values_read_as_absent() {
        let record = SourceRecord::new().with_field("City", "   ");
        assert_eq!(record.value("City"), None);
    }

    #[test]
    fn rejects_non_object_roots_and_mixed_lists() {
        assert_eq!(
            SourceRecord::from_value(json!(["x"])),
            Err(RecordError::NotAnObject)
        );
        let err = SourceRecord::from_value(json!({"Drivers": [{"a": "b"}, "oops"]})).unwrap_err();
        assert_eq!(
            err,
            RecordError::InvalidEntity {
                list: "Drivers".into(),
                index: 1
            }
        );
    }
}
