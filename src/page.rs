//! In-memory host document.
//!
//! `Page` stands in for the browser: it owns the node tree, the resolved
//! style and layout of every element, the observer registration and the
//! style elements injected into the head. Captured pages are loaded from a
//! [`PageSnapshot`] and their recorded timeline is replayed through
//! [`Page::apply`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::dom::{
    ComputedStyle, Document, MutationKind, MutationRecord, NodeId, NodeKind, ObserveOptions, ReadyState, Rect,
    StyleInjector, Viewport,
};
use crate::error::SnapshotError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ElementSpec {
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub style: ComputedStyle,
    #[serde(default)]
    pub rect: Rect,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

/// A node tree to be inserted into a [`Page`].
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    Text { text: String },
    Element(ElementSpec),
}

impl NodeSpec {
    pub fn element(tag: &str) -> Self {
        NodeSpec::Element(ElementSpec {
            tag: tag.to_ascii_lowercase(),
            ..ElementSpec::default()
        })
    }

    pub fn text(text: &str) -> Self {
        NodeSpec::Text { text: text.to_string() }
    }

    fn map_element(mut self, f: impl FnOnce(&mut ElementSpec)) -> Self {
        if let NodeSpec::Element(el) = &mut self {
            f(el);
        }
        self
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn attr(self, name: &str, value: &str) -> Self {
        self.map_element(|el| {
            el.attributes.insert(name.to_string(), value.to_string());
        })
    }

    pub fn background(self, color: &str) -> Self {
        self.map_element(|el| el.style.background_color = color.to_string())
    }

    pub fn background_image(self, image: &str) -> Self {
        self.map_element(|el| el.style.background_image = image.to_string())
    }

    pub fn size(self, width: f64, height: f64) -> Self {
        self.map_element(|el| el.rect = Rect::sized(width, height))
    }

    pub fn child(self, child: NodeSpec) -> Self {
        self.map_element(|el| el.children.push(child))
    }
}

/// A scripted change made by the page itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostAction {
    /// Appends `node` under the element with `parent_id`, or under `body`.
    Append {
        #[serde(default)]
        parent_id: Option<String>,
        node: NodeSpec,
    },
    Remove {
        target_id: String,
    },
    /// Final layout of an element changed (images or fonts settled).
    Layout {
        target_id: String,
        rect: Rect,
    },
    /// Parsing finished (`DOMContentLoaded`).
    Ready,
    /// The window `load` event.
    Load,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineStep {
    #[serde(default)]
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: HostAction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageSnapshot {
    pub hostname: String,
    #[serde(default)]
    pub viewport: Viewport,
    /// State at capture time. A `loading` page becomes interactive at its
    /// `ready` timeline step.
    #[serde(default)]
    pub ready_state: ReadyState,
    #[serde(default)]
    pub body_style: ComputedStyle,
    #[serde(default)]
    pub body: Vec<NodeSpec>,
    #[serde(default)]
    pub timeline: Vec<TimelineStep>,
}

impl PageSnapshot {
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    tag: Option<String>,
    text: Option<String>,
    attributes: BTreeMap<String, String>,
    style: ComputedStyle,
    rect: Rect,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn element(tag: &str) -> Self {
        NodeData {
            kind: NodeKind::Element,
            tag: Some(tag.to_ascii_lowercase()),
            text: None,
            attributes: BTreeMap::new(),
            style: ComputedStyle::default(),
            rect: Rect::default(),
            parent: None,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleElement {
    pub id: String,
    pub css: String,
}

#[derive(Debug, Clone)]
pub struct Page {
    hostname: String,
    viewport: Viewport,
    ready_state: ReadyState,
    nodes: Vec<NodeData>,
    root: NodeId,
    body: NodeId,
    observing: Option<ObserveOptions>,
    records: Vec<MutationRecord>,
    styles: Vec<StyleElement>,
}

impl Page {
    pub fn new(hostname: &str, viewport: Viewport) -> Self {
        let mut page = Page {
            hostname: hostname.to_string(),
            viewport,
            ready_state: ReadyState::Interactive,
            nodes: vec![NodeData::element("html")],
            root: NodeId(0),
            body: NodeId(0),
            observing: None,
            records: Vec::new(),
            styles: Vec::new(),
        };
        page.nodes[0].rect = Rect::sized(viewport.width, viewport.height);
        page.attach(page.root, NodeSpec::element("head"));
        page.body = page.attach(
            page.root,
            NodeSpec::element("body").size(viewport.width, viewport.height),
        );
        page
    }

    pub fn from_snapshot(snapshot: &PageSnapshot) -> Self {
        let mut page = Page::new(&snapshot.hostname, snapshot.viewport);
        page.ready_state = snapshot.ready_state;
        let body = page.body;
        page.set_style(body, snapshot.body_style.clone());
        for spec in &snapshot.body {
            page.attach(body, spec.clone());
        }
        page
    }

    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0)
    }

    fn build(&mut self, spec: NodeSpec, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        match spec {
            NodeSpec::Text { text } => {
                self.nodes.push(NodeData {
                    kind: NodeKind::Text,
                    tag: None,
                    text: Some(text),
                    attributes: BTreeMap::new(),
                    style: ComputedStyle::default(),
                    rect: Rect::default(),
                    parent: Some(parent),
                    children: Vec::new(),
                });
            }
            NodeSpec::Element(el) => {
                let mut data = NodeData::element(&el.tag);
                data.attributes = el.attributes;
                data.style = el.style;
                data.rect = el.rect;
                data.parent = Some(parent);
                self.nodes.push(data);
                for child in el.children {
                    let child_id = self.build(child, id);
                    self.nodes[id.0].children.push(child_id);
                }
            }
        }
        id
    }

    fn is_observed_target(&self, target: NodeId) -> bool {
        match self.observing {
            Some(opts) if opts.subtree => self.is_connected(target),
            Some(_) => target == self.root,
            None => false,
        }
    }

    /// `parent` must be a known element.
    fn attach(&mut self, parent: NodeId, spec: NodeSpec) -> NodeId {
        let id = self.build(spec, parent);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Appends a subtree as the last child of `parent`, like the page's own
    /// scripts would. Returns `None`, changing nothing, when `parent` is not
    /// an element of this page.
    pub fn append(&mut self, parent: NodeId, spec: NodeSpec) -> Option<NodeId> {
        if !self.is_element(parent) {
            return None;
        }
        let id = self.attach(parent, spec);
        let observed = self.observing.is_some_and(|o| o.child_list) && self.is_observed_target(parent);
        if observed {
            self.records.push(MutationRecord::child_list(parent, vec![id], Vec::new()));
        }
        Some(id)
    }

    /// Detaches `node` from its parent. The node keeps its own subtree.
    pub fn remove(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.node(node).and_then(|n| n.parent) else {
            return false;
        };
        let observed = self.observing.is_some_and(|o| o.child_list) && self.is_observed_target(parent);
        self.nodes[parent.0].children.retain(|c| *c != node);
        self.nodes[node.0].parent = None;
        if observed {
            self.records.push(MutationRecord::child_list(parent, Vec::new(), vec![node]));
        }
        true
    }

    pub fn set_rect(&mut self, node: NodeId, rect: Rect) {
        if let Some(data) = self.nodes.get_mut(node.0) {
            data.rect = rect;
        }
    }

    pub fn set_style(&mut self, node: NodeId, style: ComputedStyle) {
        if let Some(data) = self.nodes.get_mut(node.0) {
            data.style = style;
        }
    }

    pub fn set_ready_state(&mut self, state: ReadyState) {
        self.ready_state = state;
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .find(|(idx, n)| {
                n.attributes.get("id").is_some_and(|v| v == id) && self.is_connected(NodeId(*idx))
            })
            .map(|(idx, _)| NodeId(idx))
    }

    pub fn style_element(&self, id: &str) -> Option<&str> {
        self.styles.iter().find(|s| s.id == id).map(|s| s.css.as_str())
    }

    pub fn style_elements(&self) -> &[StyleElement] {
        &self.styles
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        self.node(node).and_then(|n| n.text.as_deref())
    }

    /// Applies one scripted host change. `Ready` and `Load` only advance the
    /// ready state.
    pub fn apply(&mut self, action: &HostAction) -> Result<(), SnapshotError> {
        match action {
            HostAction::Append { parent_id, node } => {
                let parent = match parent_id {
                    Some(id) => self
                        .element_by_id(id)
                        .ok_or_else(|| SnapshotError::UnknownElement(id.clone()))?,
                    None => self.body,
                };
                self.append(parent, node.clone());
            }
            HostAction::Remove { target_id } => {
                let target = self
                    .element_by_id(target_id)
                    .ok_or_else(|| SnapshotError::UnknownElement(target_id.clone()))?;
                self.remove(target);
            }
            HostAction::Layout { target_id, rect } => {
                let target = self
                    .element_by_id(target_id)
                    .ok_or_else(|| SnapshotError::UnknownElement(target_id.clone()))?;
                self.set_rect(target, *rect);
            }
            HostAction::Ready => {
                if !self.ready_state.is_interactive() {
                    self.ready_state = ReadyState::Interactive;
                }
            }
            HostAction::Load => self.ready_state = ReadyState::Complete,
        }
        Ok(())
    }
}

impl Document for Page {
    fn root(&self) -> Option<NodeId> {
        Some(self.root)
    }

    fn body(&self) -> Option<NodeId> {
        Some(self.body)
    }

    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.node(node).map(|n| n.kind)
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.node(node).and_then(|n| n.tag.as_deref())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node).and_then(|n| n.attributes.get(name)).map(String::as_str)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> bool {
        if self.kind(node) != Some(NodeKind::Element) || !self.is_connected(node) {
            return false;
        }
        self.nodes[node.0]
            .attributes
            .insert(name.to_string(), value.to_string());
        let observed = self.observing.is_some_and(|o| o.attributes) && self.is_observed_target(node);
        if observed {
            self.records.push(MutationRecord {
                kind: MutationKind::Attributes { name: name.to_string() },
                target: node,
                added_nodes: Vec::new(),
                removed_nodes: Vec::new(),
            });
        }
        true
    }

    fn is_connected(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.root {
                return true;
            }
            current = self.node(id).and_then(|n| n.parent);
        }
        false
    }

    fn computed_style(&self, node: NodeId) -> Option<ComputedStyle> {
        if !self.is_element(node) || !self.is_connected(node) {
            return None;
        }
        self.node(node).map(|n| n.style.clone())
    }

    fn bounding_rect(&self, node: NodeId) -> Option<Rect> {
        if !self.is_element(node) || !self.is_connected(node) {
            return None;
        }
        self.node(node).map(|n| n.rect)
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    fn observe(&mut self, options: ObserveOptions) {
        self.observing = Some(options);
    }

    fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }
}

impl StyleInjector for Page {
    fn inject_style(&mut self, id: &str, css: &str) {
        match self.styles.iter_mut().find(|s| s.id == id) {
            Some(existing) => existing.css = css.to_string(),
            None => self.styles.push(StyleElement {
                id: id.to_string(),
                css: css.to_string(),
            }),
        }
    }
}
