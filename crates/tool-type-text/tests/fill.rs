use action_locator::{DomEvent, Locatable, MemoryPage, NodeSpec, PageSnapshot};
use tool_type_text::{TextFiller, TypeError, TypePolicyView, TypeTextTool};

fn page() -> MemoryPage {
    MemoryPage::new(
        PageSnapshot::new("https://app.example.com/account/create")
            .with_node(NodeSpec::new("input").attr("id", "first").attr("value", "Old"))
            .with_node(NodeSpec::new("textarea").attr("id", "notes"))
            .with_node(NodeSpec::new("select").attr("id", "state").option("Ohio", "OH")),
    )
}

#[tokio::test]
async fn writes_value_and_notifies_in_order() {
    let page = page();
    let control = page.by_id("first").await.unwrap().unwrap();
    let tool = TypeTextTool::default();

    let report = tool.run(control.as_ref(), "Jane").await.unwrap();
    assert!(report.ok);
    assert!(report.changed);
    assert_eq!(report.previous_len, 3);
    assert_eq!(page.value_of("first").as_deref(), Some("Jane"));
    assert_eq!(
        page.events_for("first"),
        vec![
            DomEvent::Focus,
            DomEvent::Input,
            DomEvent::Change,
            DomEvent::Blur
        ]
    );
}

#[tokio::test]
async fn refilling_same_value_is_harmless() {
    let page = page();
    let control = page.by_id("notes").await.unwrap().unwrap();
    let tool = TypeTextTool::default();
    assert!(tool.fill(control.as_ref(), "Garage on site").await);
    assert!(tool.fill(control.as_ref(), "Garage on site").await);
    assert_eq!(page.value_of("notes").as_deref(), Some("Garage on site"));
    let report = tool.run(control.as_ref(), "Garage on site").await.unwrap();
    assert!(!report.changed);
}

#[tokio::test]
async fn blank_value_is_a_no_op() {
    let page = page();
    let control = page.by_id("first").await.unwrap().unwrap();
    let tool = TypeTextTool::default();
    assert!(!tool.fill(control.as_ref(), "   ").await);
    assert!(matches!(
        tool.run(control.as_ref(), "").await,
        Err(TypeError::BlankValue)
    ));
    assert_eq!(page.value_of("first").as_deref(), Some("Old"));
    assert!(page.events().is_empty());
}

#[tokio::test]
async fn stale_handle_fails_closed() {
    let page = page();
    let control = page.by_id("first").await.unwrap().unwrap();
    page.navigate(PageSnapshot::new("https://app.example.com/next"));
    let tool = TypeTextTool::default();
    assert!(!tool.fill(control.as_ref(), "Jane").await);
    assert!(matches!(
        tool.run(control.as_ref(), "Jane").await,
        Err(TypeError::Stale(_))
    ));
}

#[tokio::test]
async fn refuses_non_text_controls() {
    let page = page();
    let control = page.by_id("state").await.unwrap().unwrap();
    let tool = TypeTextTool::default();
    assert!(matches!(
        tool.run(control.as_ref(), "OH").await,
        Err(TypeError::NotTextEntry)
    ));
}

#[tokio::test]
async fn policy_limits_apply() {
    let page = page();
    let control = page.by_id("first").await.unwrap().unwrap();
    let tool = TypeTextTool::new(TypePolicyView {
        max_text_len: 3,
        ..Default::default()
    });
    assert!(matches!(
        tool.run(control.as_ref(), "Jane").await,
        Err(TypeError::TextTooLong(3))
    ));

    let disabled = TypeTextTool::new(TypePolicyView {
        enabled: false,
        ..Default::default()
    });
    assert!(matches!(
        disabled.run(control.as_ref(), "Jo").await,
        Err(TypeError::Disabled)
    ));
}
