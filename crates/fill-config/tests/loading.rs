use std::io::Write;

use fill_config::{
    default_fields, load_fields_from_path, parse_fields_str, ConfigError, CURRENT_VERSION,
};
use page_context::PageKind;

#[test]
fn shipped_mapping_is_valid() {
    let config = default_fields().expect("default mapping validates");
    assert_eq!(config.version, CURRENT_VERSION);
    assert!(config.pattern_warnings().is_empty());
    assert!(config.is_text_key("FirstName"));
    assert!(!config.is_text_key("GarageSpaces"));
    assert_eq!(config.text_field("CellPhone").unwrap().labels, vec!["cell phone", "mobile phone"]);
    assert_eq!(config.text_field("City").unwrap().labels, vec!["city"]);
    assert_eq!(config.entities.len(), 5);
    assert_eq!(config.entities_on(PageKind::AutoIncident).count(), 3);
    assert_eq!(config.toggles.fields.len(), 17);
    assert!(config.toggles.exclude.contains(&"client center".to_string()));
}

#[test]
fn shipped_abbreviations_resolve_by_context() {
    let config = default_fields().unwrap();
    let table = &config.abbreviations;
    assert_eq!(table.normalize_for("MA", "State"), "Massachusetts");
    assert_eq!(table.normalize_for("MA", "Education"), "Masters");
    assert_eq!(table.normalize_for("MD", "Education"), "Medical Degree");
    assert_eq!(table.normalize_for("central", "HeatingType"), "Forced Air");
    assert_eq!(table.normalize_for("monitored", "BurglarAlarm"), "Central");
    assert_eq!(table.normalize_for("M", "Gender"), "Male");
    assert_eq!(table.normalize_for("sfr", "DwellingType"), "One Family");
}

#[test]
fn shipped_dropdown_sets_depend_on_page() {
    let config = default_fields().unwrap();
    let keys = |kind| {
        config
            .active_dropdowns(kind)
            .into_iter()
            .map(|f| f.key.as_str())
            .collect::<Vec<_>>()
    };
    let lead = keys(PageKind::LeadInfo);
    assert!(lead.contains(&"Gender"));
    assert!(!lead.contains(&"DLState"));
    assert!(!lead.contains(&"RoofType"));

    let driver = keys(PageKind::AutoDriver);
    assert!(driver.contains(&"DLState"));
    assert!(!driver.contains(&"RoofType"));

    let dwelling = keys(PageKind::HomeDwelling);
    assert!(dwelling.contains(&"RoofType"));
    assert!(!dwelling.contains(&"VehicleUse"));
}

#[test]
fn loads_yaml_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "version: 1\ntext_fields:\n  - key: Email\n    patterns: [\"input[type='email']\"]\n"
    )
    .unwrap();
    let config = load_fields_from_path(file.path()).unwrap();
    assert_eq!(config.text_fields.len(), 1);
    assert_eq!(config.text_fields[0].labels, vec!["email"]);
}

#[test]
fn loads_json_mapping() {
    let raw = r#"{
        "version": 1,
        "dropdowns": { "base": [ { "key": "Gender", "labels": ["gender"] } ] },
        "abbreviations": { "entries": { "m": "Male" } }
    }"#;
    let config = parse_fields_str(raw).unwrap();
    assert_eq!(config.dropdowns.base[0].key, "Gender");
    assert_eq!(config.abbreviations.normalize("M"), "Male");
}

#[test]
fn reports_both_parse_errors() {
    let err = parse_fields_str("version: [unterminated").unwrap_err();
    match err {
        ConfigError::Deserialize(message) => {
            assert!(message.contains("json error"));
            assert!(message.contains("yaml error"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn rejects_unreachable_dropdown() {
    let raw = "version: 1\ndropdowns:\n  home:\n    - key: Pool\n";
    assert!(matches!(
        parse_fields_str(raw),
        Err(ConfigError::UnreachableDropdown(key)) if key == "Pool"
    ));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_fields_from_path(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}
