//! Core types for locator system

use serde::{Deserialize, Serialize};

use crate::ports::ControlRef;

/// What a resolved element can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    /// `input` (text-like types) or `textarea`
    TextEntry,
    /// Native `select`
    NativeList,
    /// Trigger of a custom dropdown that renders a detached option panel
    CustomList,
    Other,
}

impl ControlKind {
    pub fn is_list(&self) -> bool {
        matches!(self, ControlKind::NativeList | ControlKind::CustomList)
    }
}

const NON_TEXT_INPUTS: &[&str] = &[
    "hidden", "submit", "button", "reset", "checkbox", "radio", "file", "image",
];

/// Tag, type and role of an element, as reported by a page backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlInfo {
    pub tag: String,
    #[serde(default)]
    pub input_type: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl ControlInfo {
    pub fn kind(&self) -> ControlKind {
        let tag = self.tag.to_ascii_lowercase();
        let role = self.role.as_deref().map(str::to_ascii_lowercase);
        match tag.as_str() {
            "textarea" => ControlKind::TextEntry,
            "input" => {
                let ty = self
                    .input_type
                    .as_deref()
                    .map(str::to_ascii_lowercase)
                    .unwrap_or_default();
                if NON_TEXT_INPUTS.contains(&ty.as_str()) {
                    ControlKind::Other
                } else {
                    ControlKind::TextEntry
                }
            }
            "select" => ControlKind::NativeList,
            "mat-select" => ControlKind::CustomList,
            _ => match role.as_deref() {
                Some("listbox") | Some("combobox") => ControlKind::CustomList,
                _ => ControlKind::Other,
            },
        }
    }
}

/// An entry of a native list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeOption {
    pub label: String,
    pub value: String,
}

/// Notifications a control (or the document) can receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "key", rename_all = "snake_case")]
pub enum DomEvent {
    Focus,
    Input,
    Change,
    Blur,
    Click,
    KeyDown(String),
    KeyPress(String),
}

impl DomEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomEvent::Focus => "focus",
            DomEvent::Input => "input",
            DomEvent::Change => "change",
            DomEvent::Blur => "blur",
            DomEvent::Click => "click",
            DomEvent::KeyDown(_) => "keydown",
            DomEvent::KeyPress(_) => "keypress",
        }
    }

    pub fn escape() -> Self {
        DomEvent::KeyDown("Escape".into())
    }
}

/// Locator strategy enumeration, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorStrategy {
    /// Configured structural patterns
    Pattern,
    /// Label text near the control
    LabelProximity,
    /// Trigger linked to its panel through an ownership attribute
    OwnershipLink,
}

impl LocatorStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            LocatorStrategy::Pattern => "pattern",
            LocatorStrategy::LabelProximity => "label",
            LocatorStrategy::OwnershipLink => "ownership",
        }
    }

    pub fn fallback_chain() -> Vec<LocatorStrategy> {
        vec![
            LocatorStrategy::Pattern,
            LocatorStrategy::LabelProximity,
            LocatorStrategy::OwnershipLink,
        ]
    }
}

/// The kind of control a field needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Text,
    Dropdown,
}

impl TargetKind {
    pub fn accepts(&self, kind: ControlKind) -> bool {
        match self {
            TargetKind::Text => kind == ControlKind::TextEntry,
            TargetKind::Dropdown => kind.is_list(),
        }
    }

    /// Broad pattern for candidate controls inside a container.
    pub fn candidate_pattern(&self) -> &'static str {
        match self {
            TargetKind::Text => "input, textarea",
            TargetKind::Dropdown => {
                "select, mat-select, [role=\"listbox\"], [role=\"combobox\"]"
            }
        }
    }
}

/// Which match to take when several qualify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pick {
    #[default]
    First,
    /// The most recently rendered match, used for appended entity entries.
    Last,
}

/// A logical field to locate.
#[derive(Debug, Clone)]
pub struct FieldTarget<'a> {
    pub key: &'a str,
    pub kind: TargetKind,
    pub patterns: &'a [String],
    pub labels: &'a [String],
    pub pick: Pick,
}

impl<'a> FieldTarget<'a> {
    pub fn text(key: &'a str, patterns: &'a [String], labels: &'a [String]) -> Self {
        Self {
            key,
            kind: TargetKind::Text,
            patterns,
            labels,
            pick: Pick::First,
        }
    }

    pub fn dropdown(key: &'a str, patterns: &'a [String], labels: &'a [String]) -> Self {
        Self {
            key,
            kind: TargetKind::Dropdown,
            patterns,
            labels,
            pick: Pick::First,
        }
    }

    pub fn with_pick(mut self, pick: Pick) -> Self {
        self.pick = pick;
        self
    }
}

/// Resolution result
#[derive(Debug, Clone)]
pub struct LocatedControl {
    pub control: ControlRef,
    pub kind: ControlKind,
    pub strategy: LocatorStrategy,
    /// Panel id from an ownership attribute, when known.
    pub panel_id: Option<String>,
}

/// Patterns and limits shared by the locator strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorSettings {
    pub label_nodes: Vec<String>,
    pub containers: Vec<String>,
    pub add_triggers: Vec<String>,
    pub max_label_len: usize,
}

impl Default for LocatorSettings {
    fn default() -> Self {
        Self {
            label_nodes: vec![
                "label".into(),
                "legend".into(),
                ".mat-form-field-label".into(),
                "[class*=\"label\"]".into(),
                "[class*=\"form-field\"] > span".into(),
                "[class*=\"form-field\"] > div".into(),
            ],
            containers: vec![
                ".mat-form-field".into(),
                "fieldset".into(),
                ".form-group".into(),
                ".form-field".into(),
                "[class*=\"form-field\"]".into(),
                "[class*=\"form-group\"]".into(),
                ".field-wrapper".into(),
                ".col".into(),
                ".column".into(),
                "[class*=\"col-\"]".into(),
            ],
            add_triggers: vec![
                "button".into(),
                "a".into(),
                "[role=\"button\"]".into(),
                "mat-icon".into(),
                ".mat-button".into(),
                ".mat-raised-button".into(),
                ".mat-flat-button".into(),
            ],
            max_label_len: 60,
        }
    }
}

/// Lowercased label text with required-markers and colons removed and
/// whitespace collapsed.
pub fn normalize_label(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| *c != '*' && *c != ':').collect();
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Label text matches a synonym when equal to it or containing it.
pub fn label_matches(normalized: &str, synonym: &str) -> bool {
    let synonym = synonym.trim().to_lowercase();
    !synonym.is_empty() && (normalized == synonym || normalized.contains(&synonym))
}
