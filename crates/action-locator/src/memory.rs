//! In-memory page backend.
//!
//! Renders a [`PageSnapshot`] into an element arena and simulates the bits of
//! browser behavior a fill depends on: visibility, native value setters,
//! detached option panels, typeahead, add-entry buttons, check boxes that
//! reveal dependent sections, and stale handles.
//! Used for `--page` dry runs and for deterministic tests.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::errors::LocatorError;
use crate::pattern::{LocatorPattern, PatternTree};
use crate::ports::{ControlHandle, ControlRef, Locatable};
use crate::types::{ControlInfo, DomEvent, NativeOption};

/// Heading-like nodes consulted by [`Locatable::heading`].
pub const HEADING_PATTERN: &str = "h1, h2, .page-title, [class*=\"title\"]";

const OVERLAY_CONTAINER: &str = "cdk-overlay-container";
const DOCUMENT: &str = "document";

/// Serialized page: location, title and body tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub location: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Vec<NodeSpec>,
}

impl PageSnapshot {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_node(mut self, node: NodeSpec) -> Self {
        self.body.push(node);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeSpec {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
    /// Entries of a native list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionSpec>,
    /// Option panel rendered when this trigger is clicked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel: Option<PanelSpec>,
    /// Entry appended somewhere in the page when this control is clicked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_click_append: Option<AppendSpec>,
    /// Id of an element whose `hidden` attribute is dropped when this
    /// control is clicked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_click_reveal: Option<String>,
}

impl NodeSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn option(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push(OptionSpec {
            label: label.into(),
            value: Some(value.into()),
            selected: false,
        });
        self
    }

    pub fn panel(mut self, panel: PanelSpec) -> Self {
        self.panel = Some(panel);
        self
    }

    pub fn on_click_append(mut self, target: impl Into<String>, template: NodeSpec) -> Self {
        self.on_click_append = Some(AppendSpec {
            target: target.into(),
            template: Box::new(template),
        });
        self
    }

    pub fn on_click_reveal(mut self, target: impl Into<String>) -> Self {
        self.on_click_reveal = Some(target.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionSpec {
    pub label: String,
    /// Defaults to the label.
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub selected: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PanelSpec {
    /// Id of the rendered pane; defaults to `panel-<node>`.
    #[serde(default)]
    pub id: Option<String>,
    pub options: Vec<String>,
    /// Typed characters select an option whose label equals the typed text.
    #[serde(default)]
    pub typeahead: bool,
    /// Number of openings that render an empty pane before options load.
    #[serde(default)]
    pub empty_opens: u32,
}

impl PanelSpec {
    pub fn new<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            options: options.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_typeahead(mut self) -> Self {
        self.typeahead = true;
        self
    }

    pub fn with_empty_opens(mut self, opens: u32) -> Self {
        self.empty_opens = opens;
        self
    }
}

/// `{n}` in attribute values and text is replaced by the entry index
/// (the first appended entry is 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendSpec {
    /// Id of the element receiving the entry; the body when absent.
    pub target: String,
    pub template: Box<NodeSpec>,
}

/// Notification observed by the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    /// `id` attribute of the element, `document` for document-level keys.
    pub target: String,
    pub event: DomEvent,
}

#[derive(Debug)]
struct Node {
    tag: String,
    attrs: BTreeMap<String, String>,
    text: String,
    parent: Option<usize>,
    children: Vec<usize>,
    attached: bool,
    value: String,
    options: Vec<NativeOption>,
    selected: Option<usize>,
    chosen: Option<String>,
    panel: Option<PanelSpec>,
    append: Option<AppendSpec>,
    reveal: Option<String>,
    checked: bool,
    opens: u32,
    appended: u32,
}

#[derive(Debug)]
struct OpenPanel {
    trigger: usize,
    container: usize,
    pane: usize,
    typed: String,
}

#[derive(Debug)]
struct Dom {
    generation: u64,
    nodes: Vec<Node>,
    root: usize,
    location: String,
    title: String,
    open: Option<OpenPanel>,
    events: Vec<EventRecord>,
    queries: usize,
}

impl PatternTree for Dom {
    type Id = usize;

    fn tag(&self, id: usize) -> &str {
        &self.nodes[id].tag
    }

    fn attr(&self, id: usize, name: &str) -> Option<&str> {
        self.nodes[id].attrs.get(name).map(String::as_str)
    }

    fn parent(&self, id: usize) -> Option<usize> {
        self.nodes[id].parent
    }
}

impl Dom {
    fn build(snapshot: PageSnapshot, generation: u64) -> Self {
        let mut dom = Dom {
            generation,
            nodes: Vec::new(),
            root: 0,
            location: snapshot.location,
            title: snapshot.title,
            open: None,
            events: Vec::new(),
            queries: 0,
        };
        let root = NodeSpec {
            tag: "body".into(),
            children: snapshot.body,
            ..Default::default()
        };
        dom.root = dom.insert(&root, None);
        dom
    }

    fn insert(&mut self, spec: &NodeSpec, parent: Option<usize>) -> usize {
        let options: Vec<NativeOption> = spec
            .options
            .iter()
            .map(|o| NativeOption {
                label: o.label.clone(),
                value: o.value.clone().unwrap_or_else(|| o.label.clone()),
            })
            .collect();
        let id = self.nodes.len();
        self.nodes.push(Node {
            tag: spec.tag.to_ascii_lowercase(),
            attrs: spec.attrs.clone(),
            text: spec.text.clone().unwrap_or_default(),
            parent,
            children: Vec::new(),
            attached: true,
            value: spec.attrs.get("value").cloned().unwrap_or_default(),
            options,
            selected: spec.options.iter().position(|o| o.selected),
            chosen: None,
            panel: spec.panel.clone(),
            append: spec.on_click_append.clone(),
            reveal: spec.on_click_reveal.clone(),
            checked: spec.attrs.contains_key("checked"),
            opens: 0,
            appended: 0,
        });
        if let Some(parent) = parent {
            self.nodes[parent].children.push(id);
        }
        for child in &spec.children {
            self.insert(child, Some(id));
        }
        id
    }

    fn detach(&mut self, id: usize) {
        if let Some(parent) = self.nodes[id].parent {
            self.nodes[parent].children.retain(|c| *c != id);
        }
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            self.nodes[node].attached = false;
            stack.extend(self.nodes[node].children.iter().copied());
        }
    }

    /// Descendants of `from` in document order, excluding `from`.
    fn descendants(&self, from: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.nodes[from].children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id].children.iter().rev().copied());
        }
        out
    }

    fn query(&self, from: usize, pattern: &str) -> Result<Vec<usize>, LocatorError> {
        let pattern = LocatorPattern::parse(pattern)?;
        Ok(self
            .descendants(from)
            .into_iter()
            .filter(|id| pattern.matches(self, *id))
            .collect())
    }

    fn closest(&self, from: usize, pattern: &str) -> Result<Option<usize>, LocatorError> {
        let pattern = LocatorPattern::parse(pattern)?;
        let mut current = Some(from);
        while let Some(id) = current {
            if id != self.root && pattern.matches(self, id) {
                return Ok(Some(id));
            }
            current = self.nodes[id].parent;
        }
        Ok(None)
    }

    fn by_id(&self, id: &str) -> Option<usize> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.nodes[*n].attrs.get("id").map(String::as_str) == Some(id))
    }

    fn is_within(&self, node: usize, ancestor: usize) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes[id].parent;
        }
        false
    }

    fn is_visible(&self, id: usize) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            let node = &self.nodes[node];
            if !node.attached || node.attrs.contains_key("hidden") {
                return false;
            }
            if node.attrs.get("style").is_some_and(|s| hidden_by_style(s)) {
                return false;
            }
            current = node.parent;
        }
        true
    }

    fn text(&self, id: usize) -> String {
        let mut parts = vec![self.nodes[id].text.as_str()];
        let descendants = self.descendants(id);
        parts.extend(descendants.iter().map(|d| self.nodes[*d].text.as_str()));
        parts
            .iter()
            .flat_map(|p| p.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn target_name(&self, id: usize) -> String {
        self.nodes[id]
            .attrs
            .get("id")
            .cloned()
            .unwrap_or_else(|| format!("#{id}"))
    }

    fn record(&mut self, target: String, event: DomEvent) {
        self.events.push(EventRecord { target, event });
    }

    fn is_native_list(&self, id: usize) -> bool {
        self.nodes[id].tag == "select"
    }

    fn is_custom_trigger(&self, id: usize) -> bool {
        let node = &self.nodes[id];
        node.panel.is_some() || node.tag == "mat-select"
    }

    fn value(&self, id: usize) -> String {
        let node = &self.nodes[id];
        if self.is_native_list(id) {
            node.selected
                .and_then(|i| node.options.get(i))
                .map(|o| o.value.clone())
                .unwrap_or_default()
        } else if self.is_custom_trigger(id) {
            node.chosen.clone().unwrap_or_default()
        } else {
            node.value.clone()
        }
    }

    fn set_value(&mut self, id: usize, value: &str) {
        if self.is_native_list(id) {
            let node = &mut self.nodes[id];
            node.selected = node.options.iter().position(|o| o.value == value);
        } else {
            self.nodes[id].value = value.to_string();
        }
    }

    fn close_panel(&mut self) -> bool {
        match self.open.take() {
            Some(open) => {
                self.detach(open.container);
                true
            }
            None => false,
        }
    }

    fn open_panel(&mut self, trigger: usize) {
        self.close_panel();
        let Some(panel) = self.nodes[trigger].panel.clone() else {
            return;
        };
        self.nodes[trigger].opens += 1;
        let loaded = self.nodes[trigger].opens > panel.empty_opens;
        let pane_id = panel
            .id
            .clone()
            .unwrap_or_else(|| format!("panel-{trigger}"));
        let mut pane = NodeSpec::new("div")
            .attr("class", "cdk-overlay-pane mat-select-panel")
            .attr("role", "listbox")
            .attr("id", pane_id);
        if loaded {
            for label in &panel.options {
                pane = pane.child(
                    NodeSpec::new("mat-option")
                        .attr("class", "mat-option")
                        .attr("role", "option")
                        .text(label.clone()),
                );
            }
        }
        let container = NodeSpec::new("div")
            .attr("class", OVERLAY_CONTAINER)
            .child(pane);
        let root = self.root;
        let container = self.insert(&container, Some(root));
        let pane = self.nodes[container].children[0];
        self.open = Some(OpenPanel {
            trigger,
            container,
            pane,
            typed: String::new(),
        });
    }

    fn choose(&mut self, trigger: usize, label: String) {
        self.nodes[trigger].chosen = Some(label);
        let name = self.target_name(trigger);
        self.record(name, DomEvent::Change);
        self.close_panel();
    }

    fn append_entry(&mut self, id: usize) {
        let Some(spec) = self.nodes[id].append.clone() else {
            return;
        };
        self.nodes[id].appended += 1;
        let index = self.nodes[id].appended;
        let target = self.by_id(&spec.target).unwrap_or(self.root);
        let entry = instantiate(&spec.template, index);
        self.insert(&entry, Some(target));
    }

    fn click(&mut self, id: usize) {
        let name = self.target_name(id);
        self.record(name, DomEvent::Click);

        if let Some(open) = &self.open {
            let is_option = self.nodes[id].tag == "mat-option"
                || self.nodes[id].attrs.get("role").map(String::as_str) == Some("option");
            if is_option && self.is_within(id, open.pane) {
                let trigger = open.trigger;
                let label = self.text(id);
                self.choose(trigger, label);
                return;
            }
        }
        if self.nodes[id].tag == "input" {
            let checked = match self.nodes[id].attrs.get("type").map(String::as_str) {
                Some("checkbox") => Some(!self.nodes[id].checked),
                Some("radio") => Some(true),
                _ => None,
            };
            if let Some(checked) = checked {
                self.nodes[id].checked = checked;
                let name = self.target_name(id);
                self.record(name, DomEvent::Change);
            }
        }
        if let Some(target) = self.nodes[id].reveal.clone() {
            if let Some(revealed) = self.by_id(&target) {
                self.nodes[revealed].attrs.remove("hidden");
            }
        }
        if self.nodes[id].append.is_some() {
            self.append_entry(id);
        }
        if self.nodes[id].panel.is_some() {
            if self.open.as_ref().is_some_and(|o| o.trigger == id) {
                self.close_panel();
            } else {
                self.open_panel(id);
            }
        }
    }

    fn key(&mut self, event: &DomEvent) {
        match event {
            DomEvent::KeyDown(key) if key == "Escape" => {
                self.close_panel();
            }
            DomEvent::KeyPress(ch) => {
                let Some(open) = self.open.as_mut() else {
                    return;
                };
                let typeahead = self.nodes[open.trigger]
                    .panel
                    .as_ref()
                    .is_some_and(|p| p.typeahead);
                if !typeahead {
                    return;
                }
                open.typed.push_str(ch);
                let typed = open.typed.to_lowercase();
                let trigger = open.trigger;
                let hit = self.nodes[trigger].panel.as_ref().and_then(|p| {
                    p.options
                        .iter()
                        .find(|label| label.to_lowercase() == typed)
                        .cloned()
                });
                if let Some(label) = hit {
                    self.choose(trigger, label);
                }
            }
            _ => {}
        }
    }
}

fn hidden_by_style(style: &str) -> bool {
    let compact: String = style
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    compact.contains("display:none") || compact.contains("visibility:hidden")
}

fn instantiate(spec: &NodeSpec, index: u32) -> NodeSpec {
    let n = index.to_string();
    let mut out = spec.clone();
    out.text = spec.text.as_ref().map(|t| t.replace("{n}", &n));
    for value in out.attrs.values_mut() {
        *value = value.replace("{n}", &n);
    }
    if let Some(id) = out.panel.as_mut().and_then(|p| p.id.as_mut()) {
        *id = id.replace("{n}", &n);
    }
    out.children = spec.children.iter().map(|c| instantiate(c, index)).collect();
    out
}

/// A page held entirely in memory. Clones share the same document.
#[derive(Clone)]
pub struct MemoryPage {
    dom: Arc<Mutex<Dom>>,
}

impl fmt::Debug for MemoryPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dom = self.dom.lock();
        f.debug_struct("MemoryPage")
            .field("location", &dom.location)
            .field("nodes", &dom.nodes.len())
            .finish()
    }
}

impl MemoryPage {
    pub fn new(snapshot: PageSnapshot) -> Self {
        Self {
            dom: Arc::new(Mutex::new(Dom::build(snapshot, 0))),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, LocatorError> {
        let snapshot: PageSnapshot = serde_json::from_str(json)
            .map_err(|err| LocatorError::Backend(format!("invalid page snapshot: {err}")))?;
        Ok(Self::new(snapshot))
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, LocatorError> {
        let snapshot: PageSnapshot = serde_json::from_value(value)
            .map_err(|err| LocatorError::Backend(format!("invalid page snapshot: {err}")))?;
        Ok(Self::new(snapshot))
    }

    /// Replace the document. Every handle taken before becomes stale.
    pub fn navigate(&self, snapshot: PageSnapshot) {
        let mut dom = self.dom.lock();
        let generation = dom.generation + 1;
        *dom = Dom::build(snapshot, generation);
    }

    /// Current value of the element with `id`.
    pub fn value_of(&self, id: &str) -> Option<String> {
        let dom = self.dom.lock();
        dom.by_id(id).map(|n| dom.value(n))
    }

    /// Label shown by a native list or custom trigger.
    pub fn selected_label(&self, id: &str) -> Option<String> {
        let dom = self.dom.lock();
        let node = dom.by_id(id)?;
        if dom.is_native_list(node) {
            let n = &dom.nodes[node];
            n.selected
                .and_then(|i| n.options.get(i))
                .map(|o| o.label.clone())
        } else {
            dom.nodes[node].chosen.clone()
        }
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.dom.lock().events.clone()
    }

    pub fn events_for(&self, id: &str) -> Vec<DomEvent> {
        self.dom
            .lock()
            .events
            .iter()
            .filter(|e| e.target == id)
            .map(|e| e.event.clone())
            .collect()
    }

    /// Number of document-level queries served so far.
    pub fn query_count(&self) -> usize {
        self.dom.lock().queries
    }

    pub fn panel_open(&self) -> bool {
        self.dom.lock().open.is_some()
    }

    /// Number of elements currently matching `pattern`.
    pub fn count(&self, pattern: &str) -> Result<usize, LocatorError> {
        let dom = self.dom.lock();
        Ok(dom.query(dom.root, pattern)?.len())
    }

    fn handle(&self, generation: u64, node: usize) -> ControlRef {
        Arc::new(MemoryControl {
            dom: self.dom.clone(),
            node,
            generation,
            token: format!("m{generation}-{node}"),
        })
    }
}

#[async_trait]
impl Locatable for MemoryPage {
    async fn query_all(&self, pattern: &str) -> Result<Vec<ControlRef>, LocatorError> {
        let (generation, found) = {
            let mut dom = self.dom.lock();
            dom.queries += 1;
            (dom.generation, dom.query(dom.root, pattern)?)
        };
        Ok(found
            .into_iter()
            .map(|node| self.handle(generation, node))
            .collect())
    }

    async fn by_id(&self, id: &str) -> Result<Option<ControlRef>, LocatorError> {
        let dom = self.dom.lock();
        let generation = dom.generation;
        Ok(dom.by_id(id).map(|node| self.handle(generation, node)))
    }

    async fn dispatch_key(&self, event: DomEvent) -> Result<(), LocatorError> {
        let mut dom = self.dom.lock();
        dom.record(DOCUMENT.into(), event.clone());
        dom.key(&event);
        Ok(())
    }

    async fn location(&self) -> Result<String, LocatorError> {
        Ok(self.dom.lock().location.clone())
    }

    async fn heading(&self) -> Result<String, LocatorError> {
        let dom = self.dom.lock();
        let heading = dom
            .query(dom.root, HEADING_PATTERN)?
            .into_iter()
            .find(|n| dom.is_visible(*n))
            .map(|n| dom.text(n))
            .filter(|t| !t.is_empty());
        Ok(heading.unwrap_or_else(|| dom.title.clone()))
    }
}

/// Handle to one element of a [`MemoryPage`].
pub struct MemoryControl {
    dom: Arc<Mutex<Dom>>,
    node: usize,
    generation: u64,
    token: String,
}

impl fmt::Debug for MemoryControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryControl")
            .field("token", &self.token)
            .finish()
    }
}

impl MemoryControl {
    fn with<R>(&self, f: impl FnOnce(&mut Dom, usize) -> R) -> Result<R, LocatorError> {
        let mut dom = self.dom.lock();
        if dom.generation != self.generation || !dom.nodes[self.node].attached {
            return Err(LocatorError::StaleHandle(self.token.clone()));
        }
        Ok(f(&mut dom, self.node))
    }

    fn wrap(&self, node: usize) -> ControlRef {
        Arc::new(MemoryControl {
            dom: self.dom.clone(),
            node,
            generation: self.generation,
            token: format!("m{}-{node}", self.generation),
        })
    }

    fn wrap_all(&self, nodes: Vec<usize>) -> Vec<ControlRef> {
        nodes.into_iter().map(|n| self.wrap(n)).collect()
    }
}

#[async_trait]
impl ControlHandle for MemoryControl {
    fn token(&self) -> &str {
        &self.token
    }

    async fn describe(&self) -> Result<ControlInfo, LocatorError> {
        self.with(|dom, id| {
            let node = &dom.nodes[id];
            ControlInfo {
                tag: node.tag.clone(),
                input_type: node.attrs.get("type").cloned(),
                role: node.attrs.get("role").cloned(),
            }
        })
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, LocatorError> {
        self.with(|dom, id| dom.nodes[id].attrs.get(name).cloned())
    }

    async fn text(&self) -> Result<String, LocatorError> {
        self.with(|dom, id| dom.text(id))
    }

    async fn is_visible(&self) -> Result<bool, LocatorError> {
        self.with(|dom, id| dom.is_visible(id))
    }

    async fn value(&self) -> Result<String, LocatorError> {
        self.with(|dom, id| dom.value(id))
    }

    async fn is_checked(&self) -> Result<bool, LocatorError> {
        self.with(|dom, id| dom.nodes[id].checked)
    }

    async fn set_value(&self, value: &str) -> Result<(), LocatorError> {
        self.with(|dom, id| dom.set_value(id, value))
    }

    async fn dispatch(&self, event: DomEvent) -> Result<(), LocatorError> {
        self.with(|dom, id| {
            let name = dom.target_name(id);
            dom.record(name, event.clone());
            dom.key(&event);
        })
    }

    async fn click(&self) -> Result<(), LocatorError> {
        self.with(|dom, id| dom.click(id))
    }

    async fn options(&self) -> Result<Vec<NativeOption>, LocatorError> {
        self.with(|dom, id| dom.nodes[id].options.clone())
    }

    async fn closest(&self, pattern: &str) -> Result<Option<ControlRef>, LocatorError> {
        let found = self.with(|dom, id| dom.closest(id, pattern))??;
        Ok(found.map(|n| self.wrap(n)))
    }

    async fn query(&self, pattern: &str) -> Result<Vec<ControlRef>, LocatorError> {
        let found = self.with(|dom, id| dom.query(id, pattern))??;
        Ok(self.wrap_all(found))
    }

    async fn parent(&self) -> Result<Option<ControlRef>, LocatorError> {
        let parent = self.with(|dom, id| dom.nodes[id].parent)?;
        Ok(parent.map(|n| self.wrap(n)))
    }

    async fn next_siblings(&self) -> Result<Vec<ControlRef>, LocatorError> {
        let siblings = self.with(|dom, id| match dom.nodes[id].parent {
            Some(parent) => dom.nodes[parent]
                .children
                .iter()
                .skip_while(|c| **c != id)
                .skip(1)
                .copied()
                .collect(),
            None => Vec::new(),
        })?;
        Ok(self.wrap_all(siblings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> MemoryPage {
        MemoryPage::new(
            PageSnapshot::new("https://app.example.com/rating/auto/driver")
                .with_title("Drivers")
                .with_node(
                    NodeSpec::new("div")
                        .attr("style", "display: none")
                        .child(NodeSpec::new("input").attr("id", "hidden-input")),
                )
                .with_node(NodeSpec::new("input").attr("id", "first"))
                .with_node(
                    NodeSpec::new("mat-select")
                        .attr("id", "state")
                        .attr("aria-controls", "state-panel")
                        .panel(
                            PanelSpec::new(["Washington", "Washington DC"])
                                .with_id("state-panel")
                                .with_typeahead(),
                        ),
                )
                .with_node(NodeSpec::new("div").attr("id", "drivers"))
                .with_node(
                    NodeSpec::new("button").text("Add Driver").on_click_append(
                        "drivers",
                        NodeSpec::new("input").attr("id", "driver-{n}"),
                    ),
                ),
        )
    }

    #[tokio::test]
    async fn hidden_ancestor_hides_descendants() {
        let page = page();
        let hidden = page.by_id("hidden-input").await.unwrap().unwrap();
        assert!(!hidden.is_visible().await.unwrap());
        let shown = page.by_id("first").await.unwrap().unwrap();
        assert!(shown.is_visible().await.unwrap());
    }

    #[tokio::test]
    async fn panel_opens_and_option_click_selects() {
        let page = page();
        let trigger = page.by_id("state").await.unwrap().unwrap();
        trigger.click().await.unwrap();
        assert!(page.panel_open());
        let options = page
            .query_all(".cdk-overlay-container mat-option")
            .await
            .unwrap();
        assert_eq!(options.len(), 2);
        options[1].click().await.unwrap();
        assert!(!page.panel_open());
        assert_eq!(page.selected_label("state").as_deref(), Some("Washington DC"));
        assert!(matches!(
            options[0].text().await,
            Err(LocatorError::StaleHandle(_))
        ));
    }

    #[tokio::test]
    async fn typeahead_selects_exact_label() {
        let page = page();
        page.by_id("state").await.unwrap().unwrap().click().await.unwrap();
        for ch in "washington".chars() {
            page.dispatch_key(DomEvent::KeyPress(ch.to_string()))
                .await
                .unwrap();
        }
        assert!(!page.panel_open());
        assert_eq!(page.value_of("state").as_deref(), Some("Washington"));
    }

    #[tokio::test]
    async fn escape_closes_panel() {
        let page = page();
        page.by_id("state").await.unwrap().unwrap().click().await.unwrap();
        page.dispatch_key(DomEvent::escape()).await.unwrap();
        assert!(!page.panel_open());
        assert_eq!(page.value_of("state").as_deref(), Some(""));
    }

    #[tokio::test]
    async fn add_button_appends_numbered_entry() {
        let page = page();
        let add = page.find_first_visible("button").await.unwrap().unwrap();
        add.click().await.unwrap();
        add.click().await.unwrap();
        assert!(page.by_id("driver-1").await.unwrap().is_some());
        assert!(page.by_id("driver-2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn checkbox_click_flips_state_and_reveals_section() {
        let page = MemoryPage::new(
            PageSnapshot::new("https://x.test/")
                .with_node(
                    NodeSpec::new("input")
                        .attr("id", "pool")
                        .attr("type", "checkbox")
                        .on_click_reveal("pool-details"),
                )
                .with_node(
                    NodeSpec::new("div")
                        .attr("id", "pool-details")
                        .attr("hidden", ""),
                ),
        );
        let details = page.by_id("pool-details").await.unwrap().unwrap();
        assert!(!details.is_visible().await.unwrap());

        let pool = page.by_id("pool").await.unwrap().unwrap();
        assert!(!pool.is_checked().await.unwrap());
        pool.click().await.unwrap();
        assert!(pool.is_checked().await.unwrap());
        assert!(details.is_visible().await.unwrap());
        assert_eq!(page.events_for("pool"), vec![DomEvent::Click, DomEvent::Change]);
    }

    #[tokio::test]
    async fn navigation_invalidates_handles() {
        let page = page();
        let first = page.by_id("first").await.unwrap().unwrap();
        page.navigate(PageSnapshot::new("https://app.example.com/rating/home/"));
        assert!(matches!(
            first.value().await,
            Err(LocatorError::StaleHandle(_))
        ));
        assert_eq!(
            page.location().await.unwrap(),
            "https://app.example.com/rating/home/"
        );
    }

    #[tokio::test]
    async fn heading_falls_back_to_title() {
        let page = page();
        assert_eq!(page.heading().await.unwrap(), "Drivers");
    }

    #[test]
    fn snapshot_json_shape() {
        let page = MemoryPage::from_json(
            r#"{"location":"https://x.test/","body":[
                {"tag":"select","attrs":{"id":"s"},"options":[{"label":"Yes"},{"label":"No","value":"n","selected":true}]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(page.value_of("s").as_deref(), Some("n"));
        assert!(MemoryPage::from_json("{").is_err());
    }
}
