//! DOM boundary.
//!
//! The engine never talks to a concrete browser. It reads resolved style,
//! layout geometry, tag names and marks through [`Document`], writes
//! attributes back through the same trait, and hands its rule set to a
//! [`StyleInjector`]. [`crate::page::Page`] is the in-memory host used for
//! replaying captured pages and for tests.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn sized(width: f64, height: f64) -> Self {
        Rect { x: 0.0, y: 0.0, width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport { width: 1280.0, height: 800.0 }
    }
}

/// The subset of `getComputedStyle` the classifier consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedStyle {
    #[serde(default = "default_background_color")]
    pub background_color: String,
    #[serde(default = "default_background_image")]
    pub background_image: String,
}

fn default_background_color() -> String {
    "rgba(0, 0, 0, 0)".to_string()
}

fn default_background_image() -> String {
    "none".to_string()
}

impl Default for ComputedStyle {
    fn default() -> Self {
        ComputedStyle {
            background_color: default_background_color(),
            background_image: default_background_image(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MutationKind {
    ChildList,
    Attributes { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
}

impl MutationRecord {
    pub fn child_list(target: NodeId, added_nodes: Vec<NodeId>, removed_nodes: Vec<NodeId>) -> Self {
        MutationRecord {
            kind: MutationKind::ChildList,
            target,
            added_nodes,
            removed_nodes,
        }
    }
}

/// `document.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    Loading,
    #[default]
    Interactive,
    Complete,
}

impl ReadyState {
    /// The tree has been parsed (`DOMContentLoaded` has fired).
    pub fn is_interactive(self) -> bool {
        self != ReadyState::Loading
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub subtree: bool,
    pub attributes: bool,
}

impl ObserveOptions {
    /// What the engine registers: structure changes anywhere in the tree,
    /// never attribute changes (its own mark writes must not come back).
    pub const ENGINE: ObserveOptions = ObserveOptions {
        child_list: true,
        subtree: true,
        attributes: false,
    };
}

pub trait Document {
    fn root(&self) -> Option<NodeId>;
    fn body(&self) -> Option<NodeId>;
    fn kind(&self, node: NodeId) -> Option<NodeKind>;
    /// Lowercase tag name, `None` for non-elements.
    fn tag_name(&self, node: NodeId) -> Option<&str>;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    /// Child nodes in document order.
    fn children(&self, node: NodeId) -> Vec<NodeId>;
    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;
    /// Returns false, leaving the document untouched, when the node is
    /// unknown or no longer attached.
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> bool;
    fn is_connected(&self, node: NodeId) -> bool;
    fn computed_style(&self, node: NodeId) -> Option<ComputedStyle>;
    fn bounding_rect(&self, node: NodeId) -> Option<Rect>;
    fn viewport(&self) -> Viewport;
    fn hostname(&self) -> &str;
    fn ready_state(&self) -> ReadyState;
    fn observe(&mut self, options: ObserveOptions);
    /// Drains the mutation records queued since the last call.
    fn take_records(&mut self) -> Vec<MutationRecord>;

    fn is_element(&self, node: NodeId) -> bool {
        self.kind(node) == Some(NodeKind::Element)
    }
}

pub trait StyleInjector {
    /// Ensures exactly one style element with `id` exists and replaces its
    /// content with `css`.
    fn inject_style(&mut self, id: &str, css: &str);
}

/// Pre-order walk of every node below (and including) `root`.
///
/// Uses an explicit stack, so deeply nested pages cannot overflow.
pub fn descendants<D: Document + ?Sized>(doc: &D, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        out.push(node);
        let children = doc.children(node);
        stack.extend(children.into_iter().rev());
    }
    out
}
