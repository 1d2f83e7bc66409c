//! Value pre-processing ahead of the fill passes.

use std::collections::BTreeMap;

use fill_config::FieldConfig;
use formfill_core_types::SourceRecord;
use tracing::debug;
use value_match::{best_match, DEFAULT_CUTOFF};

use crate::types::VocabularyHints;

pub const ZIP_KEY: &str = "Zip";
const ZIP_DIGITS: usize = 5;
/// Minimum shared letters between a hint label and a field key.
const HINT_MIN_OVERLAP: usize = 3;
const HINT_MIN_SCORE: f64 = 0.6;

/// Non-blank scalar values of `record`, with the ZIP cut to five digits and
/// list values refined against observed option vocabularies. Text field
/// values are never refined.
pub fn prepare_values(
    record: &SourceRecord,
    config: &FieldConfig,
    hints: &VocabularyHints,
) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();
    for (key, scalar) in record.fields() {
        let mut value = scalar.as_text();
        if key == ZIP_KEY {
            value = value
                .chars()
                .filter(char::is_ascii_digit)
                .take(ZIP_DIGITS)
                .collect();
        }
        if value.is_empty() {
            continue;
        }
        if !config.is_text_key(key) {
            if let Some(refined) = refine(key, &value, config, hints) {
                debug!(field = key, from = %value, to = %refined, "value refined from page vocabulary");
                value = refined;
            }
        }
        values.insert(key.to_string(), value);
    }
    values
}

fn refine(
    key: &str,
    value: &str,
    config: &FieldConfig,
    hints: &VocabularyHints,
) -> Option<String> {
    let key_letters = letters(key);
    if key_letters.len() < HINT_MIN_OVERLAP {
        return None;
    }
    let candidates = config.abbreviations.candidates(value, key);
    for (label, options) in hints.iter() {
        let label_letters = letters(label);
        if label_letters.len() < HINT_MIN_OVERLAP {
            continue;
        }
        if !label_letters.contains(&key_letters) && !key_letters.contains(&label_letters) {
            continue;
        }
        let found = candidates
            .iter()
            .find_map(|candidate| best_match(candidate, options, DEFAULT_CUTOFF));
        if let Some(found) = found.filter(|m| m.score >= HINT_MIN_SCORE) {
            return Some(found.text);
        }
    }
    None
}

fn letters(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FieldConfig {
        fill_config::default_fields().unwrap()
    }

    #[test]
    fn zip_keeps_five_digits() {
        let record = SourceRecord::new().with_field("Zip", "98101-1234");
        let values = prepare_values(&record, &config(), &VocabularyHints::new());
        assert_eq!(values["Zip"], "98101");

        let record = SourceRecord::new().with_field("Zip", "n/a");
        assert!(prepare_values(&record, &config(), &VocabularyHints::new()).is_empty());
    }

    #[test]
    fn blank_values_are_dropped() {
        let record = SourceRecord::new()
            .with_field("MiddleName", "   ")
            .with_field("FirstName", " Ada ");
        let values = prepare_values(&record, &config(), &VocabularyHints::new());
        assert_eq!(values.len(), 1);
        assert_eq!(values["FirstName"], "Ada");
    }

    #[test]
    fn list_values_follow_related_hints() {
        let hints = VocabularyHints::new()
            .with("Roof Type", vec!["Asphalt Shingles".into(), "Metal".into()])
            .with("Type", vec!["Composition".into()]);
        let record = SourceRecord::new().with_field("RoofType", "asphalt shingle");
        let values = prepare_values(&record, &config(), &hints);
        assert_eq!(values["RoofType"], "Asphalt Shingles");
    }

    #[test]
    fn text_values_and_weak_matches_are_untouched() {
        let hints = VocabularyHints::new()
            .with("First Name", vec!["Adam".into()])
            .with("Roof Type", vec!["Metal".into()]);
        let record = SourceRecord::new()
            .with_field("FirstName", "Ada")
            .with_field("RoofType", "Slate");
        let values = prepare_values(&record, &config(), &hints);
        assert_eq!(values["FirstName"], "Ada");
        assert_eq!(values["RoofType"], "Slate");
    }
}
