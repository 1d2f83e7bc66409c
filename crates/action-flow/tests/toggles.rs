use std::sync::Arc;
use std::time::Duration;

use action_flow::{FillOrchestrator, FormFiller, OutcomeStatus, VocabularyHints};
use action_locator::{MemoryPage, NodeSpec, PageSnapshot};
use fill_config::{default_fields, Timings};
use formfill_core_types::{FieldKind, SourceRecord, VirtualWaiter};

const TOGGLE_RENDER: Duration = Duration::from_millis(500);

fn engine(waiter: &VirtualWaiter) -> FillOrchestrator {
    FillOrchestrator::builder(Arc::new(default_fields().unwrap()))
        .with_timings(Timings::default())
        .with_waiter(Arc::new(waiter.clone()))
        .build()
}

fn slide_toggle(id: &str, text: &str, reveals: &str) -> NodeSpec {
    NodeSpec::new("mat-slide-toggle")
        .attr("id", id)
        .attr("class", "mat-slide-toggle")
        .child(
            NodeSpec::new("input")
                .attr("id", format!("{id}-input"))
                .attr("type", "checkbox")
                .on_click_reveal(reveals),
        )
        .child(NodeSpec::new("span").text(text))
}

fn lead_page() -> MemoryPage {
    MemoryPage::new(
        PageSnapshot::new("https://app.ezlynx.com/web/lead-info")
            .with_title("Lead Info")
            .with_node(slide_toggle(
                "alerts",
                "Client Center new purchase alerts",
                "alert-settings",
            ))
            .with_node(NodeSpec::new("div").attr("id", "alert-settings").attr("hidden", ""))
            .with_node(slide_toggle("new-purchase", "New Purchase", "purchase-section"))
            .with_node(
                NodeSpec::new("div")
                    .attr("id", "purchase-section")
                    .attr("hidden", "")
                    .child(
                        NodeSpec::new("input")
                            .attr("id", "purchase-date")
                            .attr("name", "PurchaseDate"),
                    ),
            )
            .with_node(
                NodeSpec::new("mat-checkbox")
                    .attr("id", "trampoline")
                    .attr("class", "mat-checkbox mat-checkbox-checked")
                    .text("Trampoline"),
            ),
    )
}

#[tokio::test]
async fn toggle_reveals_a_field_the_text_pass_fills() {
    let page = lead_page();
    let waiter = VirtualWaiter::new();
    let record = SourceRecord::new()
        .with_field("NewPurchase", "Yes")
        .with_field("PurchaseDate", "01/15/2024")
        .with_field("Trampoline", "true")
        .with_field("Smoker", "No")
        .with_field("Fence", "yes");

    let report = engine(&waiter)
        .fill(&page, &record, &VocabularyHints::new())
        .await
        .unwrap();

    let fields: Vec<&str> = report.outcomes.iter().map(|o| o.field.as_str()).collect();
    assert_eq!(
        fields,
        [
            "Toggle.Trampoline",
            "Toggle.Fence",
            "Toggle.NewPurchase",
            "PurchaseDate",
        ]
    );
    assert_eq!(report.outcome("PurchaseDate").unwrap().status, OutcomeStatus::Applied);
    assert_eq!(page.value_of("purchase-date").as_deref(), Some("01/15/2024"));

    let fence = report.outcome("Toggle.Fence").unwrap();
    assert_eq!(fence.kind, FieldKind::Toggle);
    assert_eq!(fence.status, OutcomeStatus::Skipped);
    assert_eq!(fence.reason.as_deref(), Some("toggle not found on page"));
    assert_eq!(report.counts.toggle.applied, 2);
    assert_eq!(report.counts.toggle.skipped, 1);

    assert!(page.events_for("alerts-input").is_empty());
    assert!(page.events_for("trampoline").is_empty());
    assert!(!page.events_for("new-purchase-input").is_empty());
    assert_eq!(waiter.count(TOGGLE_RENDER), 1);
}

#[tokio::test]
async fn off_values_leave_the_page_alone() {
    let page = lead_page();
    let waiter = VirtualWaiter::new();
    let record = SourceRecord::new()
        .with_field("NewPurchase", "No")
        .with_field("PurchaseDate", "01/15/2024");

    let report = engine(&waiter)
        .fill(&page, &record, &VocabularyHints::new())
        .await
        .unwrap();

    let date = report.outcome("PurchaseDate").unwrap();
    assert_eq!(date.status, OutcomeStatus::Skipped);
    assert_eq!(report.counts.toggle, Default::default());
    assert!(page.events_for("new-purchase-input").is_empty());
    assert_eq!(waiter.count(TOGGLE_RENDER), 0);
}
