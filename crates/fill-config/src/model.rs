//! Field mapping model and load-time validation.

use std::collections::{BTreeMap, HashSet};

use action_locator::{LocatorPattern, LocatorSettings};
use page_context::{Overlay, PageKind};
use serde::{Deserialize, Serialize};
use tracing::warn;
use value_match::AbbreviationTable;

use crate::errors::ConfigError;

pub const CURRENT_VERSION: u32 = 1;

/// Static field mapping file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub version: u32,
    /// Hosts that classify as `generic` when no page rule fires.
    #[serde(default)]
    pub generic_hosts: Vec<String>,
    #[serde(default)]
    pub patterns: PatternConfig,
    /// Text fields in fill order.
    #[serde(default)]
    pub text_fields: Vec<TextField>,
    #[serde(default)]
    pub dropdowns: DropdownSets,
    #[serde(default)]
    pub abbreviations: AbbreviationTable,
    #[serde(default)]
    pub toggles: ToggleSet,
    #[serde(default)]
    pub entities: Vec<EntityConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextField {
    pub key: String,
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Label synonyms; the key split into words when empty.
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DropdownField {
    pub key: String,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Direct trigger and native-list patterns, tried before any label search.
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Dropdowns grouped by the overlay that activates them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropdownSets {
    pub base: Vec<DropdownField>,
    pub auto: Vec<DropdownField>,
    pub home: Vec<DropdownField>,
}

impl DropdownSets {
    fn named(&self) -> [(&'static str, &[DropdownField]); 3] {
        [
            ("dropdowns.base", self.base.as_slice()),
            ("dropdowns.auto", self.auto.as_slice()),
            ("dropdowns.home", self.home.as_slice()),
        ]
    }

    fn for_overlay(&self, overlay: Overlay) -> &[DropdownField] {
        match overlay {
            Overlay::Auto => &self.auto,
            Overlay::Home => &self.home,
        }
    }
}

/// Yes/No switches turned on before any text field is filled, so the
/// sections they reveal exist when the text pass runs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToggleSet {
    /// Phrases that disqualify a switch's own text (compared lowercase).
    pub exclude: Vec<String>,
    pub fields: Vec<ToggleField>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToggleField {
    pub key: String,
    /// Label synonyms; the key split into words when empty.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Record values that mean "on" (compared lowercase).
    #[serde(default = "default_on_values")]
    pub on_values: Vec<String>,
}

fn default_on_values() -> Vec<String> {
    vec!["yes".into(), "true".into()]
}

impl ToggleField {
    pub fn is_on(&self, value: &str) -> bool {
        let value = value.trim().to_lowercase();
        !value.is_empty() && self.on_values.iter().any(|v| v.trim().to_lowercase() == value)
    }
}

/// Structural patterns shared by every field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub label_nodes: Vec<String>,
    pub containers: Vec<String>,
    pub add_triggers: Vec<String>,
    /// Option patterns for an open panel, in priority order.
    pub panels: Vec<String>,
    /// Patterns whose presence means a panel is still open.
    pub panel_patterns: Vec<String>,
    /// Option texts that never count as a real choice (compared lowercase).
    pub placeholders: Vec<String>,
    pub max_label_len: usize,
}

impl Default for PatternConfig {
    fn default() -> Self {
        let locator = LocatorSettings::default();
        Self {
            label_nodes: locator.label_nodes,
            containers: locator.containers,
            add_triggers: locator.add_triggers,
            panels: [
                ".cdk-overlay-container mat-option",
                ".cdk-overlay-container [role=\"option\"]",
                "[role=\"listbox\"] [role=\"option\"]",
                ".mat-select-panel mat-option",
                ".mat-option",
                ".cdk-overlay-pane mat-option",
                "[class*=\"overlay\"] [role=\"option\"]",
                "[class*=\"dropdown\"] li",
                "[class*=\"select-panel\"] [class*=\"option\"]",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            panel_patterns: vec![
                ".cdk-overlay-container mat-option".into(),
                ".cdk-overlay-container [role=\"option\"]".into(),
            ],
            placeholders: [
                "",
                "select",
                "select one",
                "-- select --",
                "--select--",
                "choose",
                "choose one",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            max_label_len: locator.max_label_len,
        }
    }
}

impl PatternConfig {
    pub fn locator_settings(&self) -> LocatorSettings {
        LocatorSettings {
            label_nodes: self.label_nodes.clone(),
            containers: self.containers.clone(),
            add_triggers: self.add_triggers.clone(),
            max_label_len: self.max_label_len,
        }
    }
}

/// A repeating sub-entity of the source record, e.g. `Drivers`.
///
/// Several groups may share one list when each carries a `filter`; the
/// `Incidents` list splits into accidents, violations and losses that way.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityConfig {
    /// Name of the list in the source record.
    pub list: String,
    /// The page kind on which this list is expanded.
    pub page: PageKind,
    /// Outcome prefix; entries report as `<prefix><n>.<key>`.
    pub prefix: String,
    /// Text of the add-entry control.
    pub add_phrases: Vec<String>,
    /// Keeps only the elements this group fills.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<EntityFilter>,
    /// Reported once, as a skipped action named after the list, when the
    /// record's list is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_reason: Option<String>,
    pub fields: Vec<EntityField>,
}

/// Element attribute `source` must equal one of `values`, ignoring case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityFilter {
    pub source: String,
    pub values: Vec<String>,
}

impl EntityFilter {
    pub fn accepts(&self, value: Option<&str>) -> bool {
        let Some(value) = value.map(str::trim) else {
            return false;
        };
        self.values.iter().any(|v| v.trim().eq_ignore_ascii_case(value))
    }
}

#[derive(Clone, Debug, Default, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityFieldKind {
    #[default]
    Text,
    Dropdown,
}

/// Maps an entity attribute onto a control. With `target` the patterns and
/// labels of that configured text field are reused; otherwise `patterns`
/// and `labels` locate the control, and `{i}` in a pattern stands for the
/// zero-based position of the element within its group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityField {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub kind: EntityFieldKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// Outcome suffix; the source attribute when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Placeholder for the element's position in entity field patterns.
pub const ENTRY_INDEX: &str = "{i}";

impl EntityField {
    pub fn outcome_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.source)
    }

    /// Own patterns with the entry position filled in.
    pub fn patterns_for(&self, index: usize) -> Vec<String> {
        let index = index.to_string();
        self.patterns
            .iter()
            .map(|p| p.replace(ENTRY_INDEX, &index))
            .collect()
    }
}

/// A malformed structural pattern found during validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PatternWarning {
    pub location: String,
    pub pattern: String,
    pub reason: String,
}

impl FieldConfig {
    /// Check the whole mapping, fill derived label synonyms and upper-case
    /// abbreviation keys. Malformed patterns are logged and kept; they are
    /// skipped at locate time.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.version != CURRENT_VERSION {
            return Err(ConfigError::UnsupportedVersion(self.version));
        }

        let mut seen: BTreeMap<String, String> = BTreeMap::new();
        let mut claim = |key: &str, scope: &str| -> Result<(), ConfigError> {
            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigError::EmptyKey(scope.to_string()));
            }
            if let Some(first) = seen.insert(key.to_string(), scope.to_string()) {
                return Err(ConfigError::DuplicateKey {
                    key: key.to_string(),
                    first,
                    second: scope.to_string(),
                });
            }
            Ok(())
        };
        for field in &self.text_fields {
            claim(&field.key, "text_fields")?;
        }
        for (scope, fields) in self.dropdowns.named() {
            for field in fields {
                claim(&field.key, scope)?;
                if field.labels.is_empty() && field.patterns.is_empty() {
                    return Err(ConfigError::UnreachableDropdown(field.key.clone()));
                }
            }
        }

        for field in &mut self.text_fields {
            if field.labels.is_empty() {
                field.labels = vec![split_key(&field.key)];
            }
        }

        let mut toggle_keys = HashSet::new();
        for toggle in &mut self.toggles.fields {
            let key = toggle.key.trim();
            if key.is_empty() {
                return Err(ConfigError::EmptyKey("toggles".into()));
            }
            if !toggle_keys.insert(key.to_string()) {
                return Err(ConfigError::DuplicateKey {
                    key: key.to_string(),
                    first: "toggles".into(),
                    second: "toggles".into(),
                });
            }
            if toggle.labels.is_empty() {
                toggle.labels = vec![split_key(&toggle.key)];
            }
        }

        self.abbreviations = self.abbreviations.validated()?;
        self.validate_entities()?;

        for warning in self.pattern_warnings() {
            warn!(
                location = %warning.location,
                pattern = %warning.pattern,
                reason = %warning.reason,
                "malformed locator pattern will be skipped"
            );
        }
        Ok(self)
    }

    fn validate_entities(&self) -> Result<(), ConfigError> {
        let text_keys: HashSet<&str> = self.text_fields.iter().map(|f| f.key.as_str()).collect();
        let mut prefixes = HashSet::new();
        let mut unfiltered = HashSet::new();
        for entity in &self.entities {
            let invalid = |reason: String| ConfigError::InvalidEntity {
                list: entity.list.clone(),
                reason,
            };
            if entity.prefix.trim().is_empty() {
                return Err(invalid("empty outcome prefix".into()));
            }
            if !prefixes.insert(entity.prefix.as_str()) {
                return Err(invalid(format!(
                    "outcome prefix '{}' is used by another group",
                    entity.prefix
                )));
            }
            if entity.filter.is_none() && !unfiltered.insert(entity.list.as_str()) {
                return Err(invalid("defined more than once without a filter".into()));
            }
            if entity
                .filter
                .as_ref()
                .is_some_and(|f| f.values.iter().all(|v| v.trim().is_empty()))
            {
                return Err(invalid("filter has no values".into()));
            }
            if entity.fields.is_empty() {
                return Err(invalid("no fields".into()));
            }
            if entity.add_phrases.iter().all(|p| p.trim().is_empty()) {
                return Err(invalid("no add-entry phrases".into()));
            }
            for field in &entity.fields {
                match &field.target {
                    Some(target) if field.kind == EntityFieldKind::Dropdown => {
                        return Err(invalid(format!(
                            "dropdown '{}' cannot reuse text field '{target}'",
                            field.source
                        )));
                    }
                    Some(target) if !text_keys.contains(target.as_str()) => {
                        return Err(invalid(format!(
                            "target '{target}' is not a configured text field"
                        )));
                    }
                    Some(_) => {}
                    None if field.patterns.is_empty() && field.labels.is_empty() => {
                        return Err(invalid(format!(
                            "'{}' has no target, patterns or labels",
                            field.source
                        )));
                    }
                    None => {}
                }
            }
        }
        Ok(())
    }

    /// Every pattern that fails to parse, with where it was configured.
    pub fn pattern_warnings(&self) -> Vec<PatternWarning> {
        let mut groups: Vec<(String, &[String])> = vec![
            ("patterns.label_nodes".into(), self.patterns.label_nodes.as_slice()),
            ("patterns.containers".into(), self.patterns.containers.as_slice()),
            ("patterns.add_triggers".into(), self.patterns.add_triggers.as_slice()),
            ("patterns.panels".into(), self.patterns.panels.as_slice()),
            ("patterns.panel_patterns".into(), self.patterns.panel_patterns.as_slice()),
        ];
        for field in &self.text_fields {
            groups.push((format!("text_fields.{}", field.key), field.patterns.as_slice()));
        }
        for (scope, fields) in self.dropdowns.named() {
            for field in fields {
                groups.push((format!("{scope}.{}", field.key), field.patterns.as_slice()));
            }
        }
        let indexed: Vec<(String, Vec<String>)> = self
            .entities
            .iter()
            .flat_map(|entity| {
                entity.fields.iter().map(move |field| {
                    (
                        format!("entities.{}.{}", entity.prefix, field.source),
                        field.patterns_for(0),
                    )
                })
            })
            .collect();
        for (location, patterns) in &indexed {
            groups.push((location.clone(), patterns.as_slice()));
        }

        let mut warnings = Vec::new();
        for (location, patterns) in groups {
            for pattern in patterns {
                if let Err(err) = LocatorPattern::parse(pattern) {
                    let reason = match err {
                        action_locator::LocatorError::InvalidPattern { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    warnings.push(PatternWarning {
                        location: location.clone(),
                        pattern: pattern.clone(),
                        reason,
                    });
                }
            }
        }
        warnings
    }

    /// Base dropdowns followed by each overlay set active on `kind`.
    pub fn active_dropdowns(&self, kind: PageKind) -> Vec<&DropdownField> {
        let mut active: Vec<&DropdownField> = self.dropdowns.base.iter().collect();
        for overlay in kind.overlays() {
            active.extend(self.dropdowns.for_overlay(*overlay));
        }
        active
    }

    pub fn text_field(&self, key: &str) -> Option<&TextField> {
        self.text_fields.iter().find(|f| f.key == key)
    }

    /// Every configured field key, text fields first.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.text_fields.iter().map(|f| f.key.as_str()).chain(
            self.dropdowns
                .named()
                .into_iter()
                .flat_map(|(_, fields)| fields.iter().map(|f| f.key.as_str())),
        )
    }

    pub fn is_text_key(&self, key: &str) -> bool {
        self.text_field(key).is_some()
    }

    /// Entity groups expanded on `kind`, in configured order.
    pub fn entities_on(&self, kind: PageKind) -> impl Iterator<Item = &EntityConfig> {
        self.entities.iter().filter(move |e| e.page == kind)
    }
}

/// `"CellPhone"` to `"cell phone"`, `"DLState"` to `"dl state"`.
pub fn split_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower)
            {
                out.push(' ');
            }
        }
        if *c == '_' || *c == '-' {
            out.push(' ');
            continue;
        }
        out.extend(c.to_lowercase());
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> FieldConfig {
        serde_yaml::from_str(
            r#"
version: 1
text_fields:
  - key: FirstName
    patterns: ["input[name*='FirstName' i]"]
  - key: VIN
    patterns: ["input[name*='VIN' i", "input[id*='VIN' i]"]
dropdowns:
  base:
    - key: State
      labels: [address state, state]
  auto:
    - key: VehicleUse
      labels: [vehicle use]
  home:
    - key: RoofType
      labels: [roof type]
"#,
        )
        .unwrap()
    }

    #[test]
    fn splits_keys_at_case_boundaries() {
        assert_eq!(split_key("CellPhone"), "cell phone");
        assert_eq!(split_key("DLState"), "dl state");
        assert_eq!(split_key("DOB"), "dob");
        assert_eq!(split_key("SqFt"), "sq ft");
        assert_eq!(split_key("SR22Required"), "sr22 required");
    }

    #[test]
    fn derives_text_labels() {
        let config = minimal().validated().unwrap();
        assert_eq!(config.text_field("FirstName").unwrap().labels, vec!["first name"]);
    }

    #[test]
    fn malformed_patterns_only_warn() {
        let config = minimal().validated().unwrap();
        let warnings = config.pattern_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].location, "text_fields.VIN");
    }

    #[test]
    fn duplicate_keys_across_sets_are_rejected() {
        let mut config = minimal();
        config.dropdowns.home.push(DropdownField {
            key: "FirstName".into(),
            labels: vec!["first".into()],
            patterns: vec![],
        });
        match config.validated() {
            Err(ConfigError::DuplicateKey { key, first, second }) => {
                assert_eq!(key, "FirstName");
                assert_eq!(first, "text_fields");
                assert_eq!(second, "dropdowns.home");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn active_sets_follow_overlays() {
        let config = minimal().validated().unwrap();
        let keys = |kind| {
            config
                .active_dropdowns(kind)
                .into_iter()
                .map(|f| f.key.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(keys(PageKind::LeadInfo), vec!["State"]);
        assert_eq!(keys(PageKind::AutoDriver), vec!["State", "VehicleUse"]);
        assert_eq!(keys(PageKind::HomeCoverage), vec!["State", "RoofType"]);
        assert_eq!(keys(PageKind::Applicant), vec!["State", "RoofType", "VehicleUse"]);
    }

    #[test]
    fn entity_targets_must_be_text_fields() {
        let mut config = minimal();
        config.entities.push(EntityConfig {
            list: "Drivers".into(),
            page: PageKind::AutoDriver,
            prefix: "Driver".into(),
            add_phrases: vec!["Add Driver".into()],
            filter: None,
            empty_reason: None,
            fields: vec![EntityField {
                source: "State".into(),
                target: Some("State".into()),
                kind: EntityFieldKind::Text,
                patterns: Vec::new(),
                labels: Vec::new(),
                name: None,
            }],
        });
        assert!(matches!(
            config.validated(),
            Err(ConfigError::InvalidEntity { .. })
        ));
    }

    fn incidents(yaml: &str) -> Result<FieldConfig, ConfigError> {
        let mut config = minimal();
        config.entities = serde_yaml::from_str(yaml).unwrap();
        config.validated()
    }

    #[test]
    fn filtered_groups_may_share_a_list() {
        let config = incidents(
            r#"
- list: Incidents
  page: auto-incident
  prefix: Accident
  add_phrases: [Add Incident]
  filter: { source: Type, values: [accident] }
  fields:
    - { source: Date, patterns: ["input[id='accidentDate-{i}']"] }
    - { source: Driver, kind: dropdown, labels: [accident driver] }
- list: Incidents
  page: auto-incident
  prefix: Violation
  add_phrases: [Add Incident]
  filter: { source: Type, values: [violation] }
  fields:
    - { source: Date, patterns: ["input[id='violationDate-{i}']"] }
"#,
        )
        .unwrap();
        assert_eq!(config.entities_on(PageKind::AutoIncident).count(), 2);
        let date = &config.entities[0].fields[0];
        assert_eq!(date.patterns_for(2), vec!["input[id='accidentDate-2']"]);
        assert!(config.entities[0].filter.as_ref().unwrap().accepts(Some(" ACCIDENT")));
        assert!(!config.entities[0].filter.as_ref().unwrap().accepts(None));
    }

    #[test]
    fn unfiltered_groups_and_prefixes_stay_unique() {
        let twice = r#"
- { list: Drivers, page: auto-driver, prefix: Driver, add_phrases: [Add], fields: [{ source: FirstName, target: FirstName }] }
- { list: Drivers, page: auto-driver, prefix: Operator, add_phrases: [Add], fields: [{ source: FirstName, target: FirstName }] }
"#;
        assert!(matches!(incidents(twice), Err(ConfigError::InvalidEntity { .. })));

        let same_prefix = r#"
- { list: Incidents, page: auto-incident, prefix: Loss, add_phrases: [Add], filter: { source: Type, values: [claim] }, fields: [{ source: Date, labels: [date of loss] }] }
- { list: Incidents, page: auto-incident, prefix: Loss, add_phrases: [Add], filter: { source: Type, values: [loss] }, fields: [{ source: Date, labels: [date of loss] }] }
"#;
        assert!(matches!(incidents(same_prefix), Err(ConfigError::InvalidEntity { .. })));

        let unreachable = r#"
- { list: Incidents, page: auto-incident, prefix: Loss, add_phrases: [Add], fields: [{ source: Date }] }
"#;
        assert!(matches!(incidents(unreachable), Err(ConfigError::InvalidEntity { .. })));
    }

    #[test]
    fn toggle_labels_and_on_values() {
        let mut config = minimal();
        config.toggles = serde_yaml::from_str(
            r#"
exclude: [client center]
fields:
  - key: SR22Required
  - key: Pool
    labels: [swimming pool]
    on_values: [yes, in ground]
"#,
        )
        .unwrap();
        let config = config.validated().unwrap();
        let sr22 = &config.toggles.fields[0];
        assert_eq!(sr22.labels, vec!["sr22 required"]);
        assert!(sr22.is_on(" YES "));
        assert!(!sr22.is_on("no"));
        assert!(config.toggles.fields[1].is_on("In Ground"));
        assert!(!config.toggles.fields[1].is_on(""));
    }

    #[test]
    fn toggle_keys_may_repeat_dropdown_keys_but_not_each_other() {
        let mut config = minimal();
        config.toggles.fields = serde_yaml::from_str("[{ key: State }, { key: State }]").unwrap();
        assert!(matches!(
            config.validated(),
            Err(ConfigError::DuplicateKey { key, .. }) if key == "State"
        ));

        let mut config = minimal();
        config.toggles.fields = serde_yaml::from_str("[{ key: State }]").unwrap();
        assert!(config.validated().is_ok());
    }

    #[test]
    fn rejects_unknown_version() {
        let mut config = minimal();
        config.version = 2;
        assert!(matches!(
            config.validated(),
            Err(ConfigError::UnsupportedVersion(2))
        ));
    }
}
