//! Applies classifier decisions as attribute marks.
//!
//! The marker never writes inline styles. Colors come from the static rule
//! set keyed on the mark attributes, so a theme change re-colors every
//! marked element without touching the tree again.

use serde::{Deserialize, Serialize};

use crate::classifier::Decision;
use crate::dom::{Document, NodeId};

/// Block, row and cell-like containers that are made transparent under an
/// overridden ancestor.
pub const NEUTRALIZE_TAGS: &[&str] = &[
    "div", "section", "article", "main", "aside", "nav", "header", "footer", "p", "span", "ul", "ol", "li", "dl",
    "dt", "dd", "table", "thead", "tbody", "tfoot", "tr", "td", "th", "form", "fieldset", "blockquote", "figure",
    "figcaption",
];

const MARK_VALUE: &str = "true";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mark {
    Override,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MarkNames {
    pub override_attribute: String,
    pub neutral_attribute: String,
}

impl Default for MarkNames {
    fn default() -> Self {
        MarkNames {
            override_attribute: "eye-protected".to_string(),
            neutral_attribute: "eye-transparent".to_string(),
        }
    }
}

impl MarkNames {
    pub fn mark_of<D: Document + ?Sized>(&self, doc: &D, node: NodeId) -> Option<Mark> {
        if doc.attribute(node, &self.override_attribute).is_some() {
            Some(Mark::Override)
        } else if doc.attribute(node, &self.neutral_attribute).is_some() {
            Some(Mark::Neutral)
        } else {
            None
        }
    }
}

/// What a single `apply` changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Applied {
    pub marked: bool,
    pub neutralized: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Marker {
    names: MarkNames,
}

impl Marker {
    pub fn new(names: MarkNames) -> Self {
        Marker { names }
    }

    pub fn names(&self) -> &MarkNames {
        &self.names
    }

    pub fn apply<D: Document + ?Sized>(&self, doc: &mut D, node: NodeId, decision: Decision) -> Applied {
        match decision {
            Decision::Skip(_) => Applied::default(),
            Decision::Mark => {
                if self.names.mark_of(doc, node).is_some() {
                    return Applied::default();
                }
                if !doc.set_attribute(node, &self.names.override_attribute, MARK_VALUE) {
                    return Applied::default();
                }
                Applied {
                    marked: true,
                    neutralized: self.neutralize_below(doc, node),
                }
            }
        }
    }

    /// Neutralizes the descendants of an override element. Independently
    /// overridden descendants own their subtree and are not entered.
    fn neutralize_below<D: Document + ?Sized>(&self, doc: &mut D, owner: NodeId) -> usize {
        let mut stack: Vec<NodeId> = doc.children(owner).into_iter().rev().collect();
        self.neutralize_walk(doc, &mut stack)
    }

    /// Neutralizes `root` and its subtree as content belonging to an
    /// already overridden ancestor.
    pub fn neutralize_subtree<D: Document + ?Sized>(&self, doc: &mut D, root: NodeId) -> usize {
        let mut stack = vec![root];
        self.neutralize_walk(doc, &mut stack)
    }

    fn neutralize_walk<D: Document + ?Sized>(&self, doc: &mut D, stack: &mut Vec<NodeId>) -> usize {
        let mut count = 0;
        while let Some(node) = stack.pop() {
            if !doc.is_element(node) {
                continue;
            }
            match self.names.mark_of(doc, node) {
                Some(Mark::Override) => continue,
                Some(Mark::Neutral) => {}
                None => {
                    let eligible = doc.tag_name(node).is_some_and(|tag| NEUTRALIZE_TAGS.contains(&tag));
                    if eligible && doc.set_attribute(node, &self.names.neutral_attribute, MARK_VALUE) {
                        count += 1;
                    }
                }
            }
            stack.extend(doc.children(node).into_iter().rev());
        }
        count
    }

    /// Nearest ancestor carrying the override mark.
    pub fn owning_override<D: Document + ?Sized>(&self, doc: &D, node: NodeId) -> Option<NodeId> {
        let mut current = doc.parent(node);
        while let Some(id) = current {
            if self.names.mark_of(doc, id) == Some(Mark::Override) {
                return Some(id);
            }
            current = doc.parent(id);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::SkipReason;
    use crate::dom::Viewport;
    use crate::page::{NodeSpec, Page};

    fn page_with(spec: NodeSpec) -> (Page, NodeId) {
        let mut page = Page::new("example.com", Viewport::default());
        let body = page.body().unwrap();
        let node = page.append(body, spec).unwrap();
        (page, node)
    }

    fn id(page: &Page, id: &str) -> NodeId {
        page.element_by_id(id).unwrap()
    }

    #[test]
    fn test_mark_cascades_neutralizer() {
        let (mut page, block) = page_with(
            NodeSpec::element("div")
                .child(NodeSpec::text("text"))
                .child(NodeSpec::element("span").id("s"))
                .child(NodeSpec::element("a").id("link").child(NodeSpec::element("p").id("inner")))
                .child(NodeSpec::element("img").id("pic")),
        );
        let marker = Marker::default();

        let applied = marker.apply(&mut page, block, Decision::Mark);
        assert_eq!(applied, Applied { marked: true, neutralized: 2 });
        assert_eq!(marker.names().mark_of(&page, block), Some(Mark::Override));
        assert_eq!(marker.names().mark_of(&page, id(&page, "s")), Some(Mark::Neutral));
        assert_eq!(marker.names().mark_of(&page, id(&page, "inner")), Some(Mark::Neutral));
        assert_eq!(marker.names().mark_of(&page, id(&page, "link")), None);
        assert_eq!(marker.names().mark_of(&page, id(&page, "pic")), None);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let (mut page, block) = page_with(NodeSpec::element("div").child(NodeSpec::element("p")));
        let marker = Marker::default();
        marker.apply(&mut page, block, Decision::Mark);
        let before = page.clone();

        let again = marker.apply(&mut page, block, Decision::Mark);
        assert_eq!(again, Applied::default());
        for node in crate::dom::descendants(&page, page.root().unwrap()) {
            assert_eq!(marker.names().mark_of(&page, node), marker.names().mark_of(&before, node));
        }
    }

    #[test]
    fn test_walk_stops_at_nested_override() {
        let (mut page, block) = page_with(
            NodeSpec::element("section").child(
                NodeSpec::element("div")
                    .id("nested")
                    .attr("eye-protected", "true")
                    .child(NodeSpec::element("p").id("owned")),
            ),
        );
        let marker = Marker::default();
        let applied = marker.apply(&mut page, block, Decision::Mark);
        assert_eq!(applied.neutralized, 0);
        assert_eq!(marker.names().mark_of(&page, id(&page, "nested")), Some(Mark::Override));
        assert_eq!(marker.names().mark_of(&page, id(&page, "owned")), None);
    }

    #[test]
    fn test_skip_and_detached_are_noops() {
        let (mut page, block) = page_with(NodeSpec::element("div"));
        let marker = Marker::default();
        assert_eq!(marker.apply(&mut page, block, Decision::Skip(SkipReason::NotLight)), Applied::default());
        assert_eq!(marker.names().mark_of(&page, block), None);

        page.remove(block);
        assert_eq!(marker.apply(&mut page, block, Decision::Mark), Applied::default());
        assert_eq!(marker.names().mark_of(&page, block), None);
    }

    #[test]
    fn test_owning_override_finds_nearest_block() {
        let (mut page, block) = page_with(
            NodeSpec::element("div").child(NodeSpec::element("ul").child(NodeSpec::element("li").id("item"))),
        );
        let marker = Marker::default();
        let item = id(&page, "item");
        assert_eq!(marker.owning_override(&page, item), None);
        marker.apply(&mut page, block, Decision::Mark);
        assert_eq!(marker.owning_override(&page, item), Some(block));
    }
}
