use std::sync::Arc;

use action_flow::{FillOrchestrator, FormFiller};
use action_locator::{MemoryPage, NodeSpec, PageSnapshot, PanelSpec};
use fill_config::{default_fields, Timings};
use formfill_core_types::VirtualWaiter;
use page_context::PageKind;

fn engine(waiter: &VirtualWaiter) -> FillOrchestrator {
    FillOrchestrator::builder(Arc::new(default_fields().unwrap()))
        .with_timings(Timings::default())
        .with_waiter(Arc::new(waiter.clone()))
        .build()
}

fn page() -> MemoryPage {
    MemoryPage::new(
        PageSnapshot::new("https://app.ezlynx.com/rating/home/dwelling")
            .with_node(
                NodeSpec::new("div")
                    .attr("class", "form-group")
                    .child(NodeSpec::new("label").attr("for", "sqft").text("Square Feet *"))
                    .child(
                        NodeSpec::new("input")
                            .attr("id", "sqft")
                            .attr("name", "SqFt")
                            .attr("required", "")
                            .attr("value", "1800"),
                    ),
            )
            .with_node(
                NodeSpec::new("input")
                    .attr("id", "year")
                    .attr("type", "number")
                    .attr("placeholder", "Year Built"),
            )
            .with_node(NodeSpec::new("input").attr("type", "hidden").attr("name", "token"))
            .with_node(NodeSpec::new("input").attr("type", "checkbox").attr("id", "pool"))
            .with_node(
                NodeSpec::new("input")
                    .attr("id", "ghost")
                    .attr("style", "display: none"),
            )
            .with_node(
                NodeSpec::new("div")
                    .attr("class", "form-group")
                    .child(NodeSpec::new("label").attr("for", "roof").text("Roof Type"))
                    .child(
                        NodeSpec::new("select")
                            .attr("id", "roof")
                            .attr("name", "RoofType")
                            .option("-- Select --", "")
                            .option("Asphalt Shingles", "AS")
                            .option("Metal", "MT"),
                    ),
            )
            .with_node(
                NodeSpec::new("div")
                    .attr("class", "mat-form-field")
                    .child(NodeSpec::new("label").text("Foundation"))
                    .child(
                        NodeSpec::new("mat-select")
                            .attr("id", "foundation")
                            .attr("aria-controls", "foundation-panel")
                            .panel(
                                PanelSpec::new(["Select", "Basement", "Crawlspace", "Slab"])
                                    .with_id("foundation-panel"),
                            ),
                    ),
            )
            .with_node(
                NodeSpec::new("mat-select")
                    .attr("id", "heating")
                    .attr("aria-label", "Heating Type")
                    .panel(PanelSpec::new(["Forced Air", "Radiant"])),
            ),
    )
}

#[tokio::test]
async fn lists_controls_and_vocabularies() {
    let page = page();
    let waiter = VirtualWaiter::new();
    let inventory = engine(&waiter).scan(&page).await.unwrap();

    assert_eq!(inventory.page, PageKind::HomeDwelling);

    let ids: Vec<&str> = inventory.text_entries.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["sqft", "year"]);
    let sqft = &inventory.text_entries[0];
    assert_eq!(sqft.label, "Square Feet");
    assert_eq!(sqft.value, "1800");
    assert!(sqft.required);
    assert_eq!(inventory.text_entries[1].input_type, "number");
    assert_eq!(inventory.text_entries[1].label, "Year Built");

    let roof = &inventory.native_lists["Roof Type"];
    assert_eq!(roof.options, ["Asphalt Shingles", "Metal"]);
    assert_eq!(roof.current, "");

    let foundation = &inventory.custom_dropdowns["Foundation"];
    assert_eq!(foundation.options, ["Basement", "Crawlspace", "Slab"]);
    let heating = &inventory.custom_dropdowns["Heating Type"];
    assert_eq!(heating.options, ["Forced Air", "Radiant"]);
    assert_eq!(inventory.option_count(), 7);
}

#[tokio::test]
async fn scanning_leaves_the_page_neutral() {
    let page = page();
    let waiter = VirtualWaiter::new();
    let inventory = engine(&waiter).scan(&page).await.unwrap();

    assert!(!page.panel_open());
    assert_eq!(page.selected_label("foundation"), None);
    assert_eq!(page.value_of("roof").as_deref(), Some(""));

    let hints = inventory.hints();
    assert_eq!(hints.len(), 3);
    assert!(hints.iter().any(|(label, _)| label == "Foundation"));
}
