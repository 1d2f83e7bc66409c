use action_locator::{
    ControlKind, ControlLocator, FieldTarget, Locatable, LocatorStrategy, MemoryPage, Pick,
    ToggleStyle,
};
use serde_json::json;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn applicant_page() -> MemoryPage {
    MemoryPage::from_value(json!({
        "location": "https://app.example.com/account/create",
        "title": "Applicant",
        "body": [
            {"tag": "input", "attrs": {"name": "applicant.firstName", "style": "display:none"}},
            {"tag": "input", "attrs": {"id": "fn-visible", "name": "applicant.firstName"}},
            {"tag": "label", "attrs": {"for": "ln"}, "text": "Last Name *"},
            {"tag": "input", "attrs": {"id": "ln"}},
            {"tag": "div", "attrs": {"class": "form-group"}, "children": [
                {"tag": "label", "text": "Marital Status:"},
                {"tag": "select", "attrs": {"id": "marital"}, "options": [
                    {"label": "Single"}, {"label": "Married"}
                ]}
            ]},
            {"tag": "div", "children": [
                {"tag": "legend", "text": "City"},
                {"tag": "span", "text": "note"},
                {"tag": "input", "attrs": {"id": "city"}}
            ]},
            {"tag": "span", "attrs": {"id": "res-label"}, "text": "Residence Type"},
            {"tag": "div", "attrs": {
                "id": "residence", "role": "combobox",
                "aria-labelledby": "res-label", "aria-controls": "res-panel"
            }},
            {"tag": "label", "text": "This label is far too long to be a field caption and reads like a paragraph of help"},
            {"tag": "input", "attrs": {"id": "long"}},
            {"tag": "button", "attrs": {"aria-label": "Add another vehicle"}, "text": "+"},
            {"tag": "a", "text": "Add Driver"}
        ]
    }))
    .unwrap()
}

async fn id_of(located: &action_locator::LocatedControl) -> Option<String> {
    located.control.attribute("id").await.unwrap()
}

#[tokio::test]
async fn pattern_strategy_skips_hidden_and_invalid_patterns() {
    let page = applicant_page();
    let locator = ControlLocator::default();
    let patterns = strings(&["input[name=", "input[name*=\"firstname\" i]"]);
    let target = FieldTarget::text("FirstName", &patterns, &[]);

    let located = locator.locate(&page, &target).await.unwrap();
    assert_eq!(located.strategy, LocatorStrategy::Pattern);
    assert_eq!(id_of(&located).await.as_deref(), Some("fn-visible"));
}

#[tokio::test]
async fn pattern_strategy_rejects_incompatible_kind() {
    let page = applicant_page();
    let locator = ControlLocator::default();
    let patterns = strings(&["#marital"]);
    let target = FieldTarget::text("Marital", &patterns, &[]);
    assert!(locator.locate(&page, &target).await.is_none());
}

#[tokio::test]
async fn label_strategy_follows_for_attribute() {
    let page = applicant_page();
    let locator = ControlLocator::default();
    let labels = strings(&["last name"]);
    let target = FieldTarget::text("LastName", &[], &labels);

    let located = locator.locate(&page, &target).await.unwrap();
    assert_eq!(located.strategy, LocatorStrategy::LabelProximity);
    assert_eq!(id_of(&located).await.as_deref(), Some("ln"));
}

#[tokio::test]
async fn label_strategy_searches_container_then_siblings() {
    let page = applicant_page();
    let locator = ControlLocator::default();

    let marital = strings(&["marital status"]);
    let target = FieldTarget::dropdown("MaritalStatus", &[], &marital);
    let located = locator.locate(&page, &target).await.unwrap();
    assert_eq!(located.kind, ControlKind::NativeList);
    assert_eq!(id_of(&located).await.as_deref(), Some("marital"));

    let city = strings(&["city"]);
    let target = FieldTarget::text("City", &[], &city);
    let located = locator.locate(&page, &target).await.unwrap();
    assert_eq!(id_of(&located).await.as_deref(), Some("city"));
}

#[tokio::test]
async fn long_labels_are_ignored() {
    let page = applicant_page();
    let locator = ControlLocator::default();
    let labels = strings(&["field caption"]);
    let target = FieldTarget::text("Caption", &[], &labels);
    assert!(locator.locate(&page, &target).await.is_none());
}

#[tokio::test]
async fn ownership_link_records_panel_id() {
    let page = applicant_page();
    let locator = ControlLocator::default();
    let labels = strings(&["residence type"]);
    let target = FieldTarget::dropdown("ResidenceType", &[], &labels);

    let located = locator.locate(&page, &target).await.unwrap();
    assert_eq!(located.strategy, LocatorStrategy::OwnershipLink);
    assert_eq!(located.kind, ControlKind::CustomList);
    assert_eq!(located.panel_id.as_deref(), Some("res-panel"));

    let text = FieldTarget::text("ResidenceType", &[], &labels);
    assert!(locator.locate(&page, &text).await.is_none());
}

#[tokio::test]
async fn pick_last_targets_newest_entry() {
    let page = MemoryPage::from_value(json!({
        "location": "https://app.example.com/rating/auto/driver",
        "body": [
            {"tag": "input", "attrs": {"id": "d0", "name": "driverFirstName"}},
            {"tag": "input", "attrs": {"id": "d1", "name": "driverFirstName"}}
        ]
    }))
    .unwrap();
    let locator = ControlLocator::default();
    let patterns = strings(&["input[name=\"driverFirstName\"]"]);

    let first = FieldTarget::text("FirstName", &patterns, &[]);
    let found = locator.locate(&page, &first).await.unwrap();
    assert_eq!(id_of(&found).await.as_deref(), Some("d0"));

    let last = first.clone().with_pick(Pick::Last);
    let found = locator.locate(&page, &last).await.unwrap();
    assert_eq!(id_of(&found).await.as_deref(), Some("d1"));
}

#[tokio::test]
async fn add_trigger_by_text_then_attribute() {
    let page = applicant_page();
    let locator = ControlLocator::default();

    let driver = locator
        .find_add_trigger(&page, &strings(&["Add Driver", "+ Driver"]))
        .await
        .unwrap();
    assert_eq!(driver.text().await.unwrap(), "Add Driver");

    let vehicle = locator
        .find_add_trigger(&page, &strings(&["Add Vehicle", "Add Another Vehicle"]))
        .await
        .unwrap();
    assert_eq!(vehicle.text().await.unwrap(), "+");

    assert!(locator
        .find_add_trigger(&page, &strings(&["Add Incident"]))
        .await
        .is_none());
}

#[tokio::test]
async fn add_trigger_attribute_fallback_covers_any_element() {
    let page = MemoryPage::from_value(json!({
        "location": "https://app.example.com/rating/auto/incident",
        "body": [
            {"tag": "span", "attrs": {"id": "hidden-add", "title": "Add Incident", "hidden": ""}},
            {"tag": "div", "attrs": {"id": "add-incident", "class": "icon-plus", "title": "ADD INCIDENT"}},
            {"tag": "button", "text": "Save"}
        ]
    }))
    .unwrap();
    let locator = ControlLocator::default();

    let found = locator
        .find_add_trigger(&page, &strings(&["Add Incident"]))
        .await
        .unwrap();
    assert_eq!(
        found.attribute("id").await.unwrap().as_deref(),
        Some("add-incident")
    );
}

fn switches_page() -> MemoryPage {
    MemoryPage::from_value(json!({
        "location": "https://app.example.com/rating/auto/driver",
        "body": [
            {"tag": "div", "attrs": {"class": "form-group"}, "children": [
                {"tag": "label", "text": "SR-22 Required"},
                {"tag": "mat-radio-button", "attrs": {"class": "mat-radio-button"}, "children": [
                    {"tag": "input", "attrs": {"id": "sr22-no", "type": "radio"}},
                    {"tag": "span", "text": "No"}
                ]},
                {"tag": "mat-radio-button", "attrs": {"class": "mat-radio-button"}, "children": [
                    {"tag": "input", "attrs": {"id": "sr22-yes", "type": "radio"}},
                    {"tag": "span", "text": "Yes"}
                ]}
            ]},
            {"tag": "div", "children": [
                {"tag": "label", "attrs": {"for": "gated"}, "text": "Gated Community"},
                {"tag": "input", "attrs": {"id": "gated", "type": "checkbox"}}
            ]},
            {"tag": "div", "children": [
                {"tag": "label", "attrs": {"for": "fence"}, "text": "Fence"},
                {"tag": "input", "attrs": {"id": "fence", "type": "checkbox", "checked": ""}}
            ]}
        ]
    }))
    .unwrap()
}

#[tokio::test]
async fn yes_radio_next_to_a_label_is_a_toggle() {
    let page = switches_page();
    let locator = ControlLocator::default();
    let labels = strings(&["sr-22", "sr22"]);

    let found = locator.find_toggle(&page, &labels, &[]).await.unwrap();
    assert_eq!(found.style, ToggleStyle::YesRadio);
    assert!(!found.active);

    found.switch_on().await.unwrap();
    assert_eq!(page.events_for("sr22-yes").len(), 2);
    assert!(page.events_for("sr22-no").is_empty());
    assert!(locator.find_toggle(&page, &labels, &[]).await.unwrap().active);
}

#[tokio::test]
async fn linked_native_checkbox_is_a_toggle() {
    let page = switches_page();
    let locator = ControlLocator::default();

    let gated = locator
        .find_toggle(&page, &strings(&["gated community"]), &[])
        .await
        .unwrap();
    assert_eq!(gated.style, ToggleStyle::NativeCheckbox);
    assert!(!gated.active);
    gated.switch_on().await.unwrap();
    assert!(gated.control.is_checked().await.unwrap());

    let fence = locator
        .find_toggle(&page, &strings(&["fence"]), &[])
        .await
        .unwrap();
    assert!(fence.active);
    assert!(locator
        .find_toggle(&page, &strings(&["wood stove"]), &[])
        .await
        .is_none());
}

#[tokio::test]
async fn labels_for_inventory() {
    let page = applicant_page();
    let locator = ControlLocator::default();

    let last = page.by_id("ln").await.unwrap().unwrap();
    assert_eq!(
        locator.label_for(&page, &last).await.as_deref(),
        Some("Last Name")
    );
    let marital = page.by_id("marital").await.unwrap().unwrap();
    assert_eq!(
        locator.label_for(&page, &marital).await.as_deref(),
        Some("Marital Status")
    );
    let first = page.by_id("fn-visible").await.unwrap().unwrap();
    assert_eq!(
        locator.label_for(&page, &first).await.as_deref(),
        Some("applicant.firstName")
    );
}
