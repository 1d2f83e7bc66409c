//! Abbreviation normalization.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TableError {
    #[error("duplicate abbreviation '{key}' in {scope}")]
    DuplicateKey { scope: String, key: String },
    #[error("empty abbreviation key in {0}")]
    EmptyKey(String),
    #[error("context group '{0}' has no field patterns")]
    EmptyContext(String),
    #[error("'{key}' maps to '{canonical}' in {scope}, which would normalize again to '{next}'")]
    NotIdempotent {
        scope: String,
        key: String,
        canonical: String,
        next: String,
    },
}

/// Codes that only make sense for certain fields, e.g. `MA` under an
/// education field.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextGroup {
    pub name: String,
    /// Lowercase substrings of a field key that select this group.
    pub field_patterns: Vec<String>,
    pub entries: BTreeMap<String, String>,
}

impl ContextGroup {
    fn applies_to(&self, field_key_lower: &str) -> bool {
        self.field_patterns
            .iter()
            .any(|p| field_key_lower.contains(&p.to_lowercase()))
    }
}

/// Raw code to canonical label, looked up case-insensitively.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AbbreviationTable {
    #[serde(default)]
    pub entries: BTreeMap<String, String>,
    #[serde(default)]
    pub contexts: Vec<ContextGroup>,
}

impl AbbreviationTable {
    /// Upper-cases every key and rejects tables that would not normalize
    /// idempotently.
    pub fn validated(mut self) -> Result<Self, TableError> {
        self.entries = upper_keys("global table", self.entries)?;
        let mut names = HashSet::new();
        for group in &mut self.contexts {
            let scope = format!("context '{}'", group.name);
            if !names.insert(group.name.clone()) {
                return Err(TableError::DuplicateKey {
                    scope: "context groups".into(),
                    key: group.name.clone(),
                });
            }
            if group.field_patterns.iter().all(|p| p.trim().is_empty()) {
                return Err(TableError::EmptyContext(group.name.clone()));
            }
            group.entries = upper_keys(&scope, std::mem::take(&mut group.entries))?;
        }

        check_idempotent("global table", &self.entries, None)?;
        for group in &self.contexts {
            check_idempotent(
                &format!("context '{}'", group.name),
                &group.entries,
                Some(&self.entries),
            )?;
        }
        Ok(self)
    }

    /// Canonical label for `raw`, or `raw` unchanged.
    pub fn normalize(&self, raw: &str) -> String {
        let upper = raw.trim().to_uppercase();
        match self.entries.get(&upper) {
            Some(canonical) => canonical.clone(),
            None => raw.to_string(),
        }
    }

    /// Like [`normalize`](Self::normalize) but consults the first context
    /// group whose patterns match `field_key` before the global table.
    pub fn normalize_for(&self, raw: &str, field_key: &str) -> String {
        let upper = raw.trim().to_uppercase();
        if upper.is_empty() {
            return raw.to_string();
        }
        let key_lower = field_key.to_lowercase();
        if let Some(group) = self.contexts.iter().find(|g| g.applies_to(&key_lower)) {
            if let Some(canonical) = group.entries.get(&upper) {
                trace!(field = field_key, context = %group.name, "context abbreviation");
                return canonical.clone();
            }
        }
        self.normalize(raw)
    }

    /// Values to try, in order: the normalized form, then the original when it differs.
    pub fn candidates(&self, raw: &str, field_key: &str) -> Vec<String> {
        let normalized = self.normalize_for(raw, field_key);
        let original = raw.trim().to_string();
        if normalized.eq_ignore_ascii_case(&original) {
            vec![normalized]
        } else {
            vec![normalized, original]
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn upper_keys(
    scope: &str,
    entries: BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, TableError> {
    let mut out = BTreeMap::new();
    for (key, value) in entries {
        let upper = key.trim().to_uppercase();
        if upper.is_empty() {
            return Err(TableError::EmptyKey(scope.to_string()));
        }
        if out.insert(upper.clone(), value).is_some() {
            return Err(TableError::DuplicateKey {
                scope: scope.to_string(),
                key: upper,
            });
        }
    }
    Ok(out)
}

fn check_idempotent(
    scope: &str,
    entries: &BTreeMap<String, String>,
    fallback: Option<&BTreeMap<String, String>>,
) -> Result<(), TableError> {
    let lookup = |upper: &str| {
        entries
            .get(upper)
            .or_else(|| fallback.and_then(|f| f.get(upper)))
    };
    for (key, canonical) in entries {
        let upper = canonical.trim().to_uppercase();
        if let Some(next) = lookup(&upper) {
            if next != canonical {
                return Err(TableError::NotIdempotent {
                    scope: scope.to_string(),
                    key: key.clone(),
                    canonical: canonical.clone(),
                    next: next.clone(),
                });
            }
        }
    }
    Ok(())
}
