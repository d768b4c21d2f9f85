use std::collections::HashSet;

use serde::Serialize;

use crate::classifier::{Classifier, Decision, SkipReason};
use crate::dom::{Document, NodeId, descendants};
use crate::marker::Marker;
use crate::scheduler::MutationBatch;

/// Containers revisited on the window `load` event, once final layout is
/// known.
pub const STRUCTURAL_TAGS: &[&str] = &["div", "section", "article", "main", "table", "aside", "nav"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub visited: usize,
    pub marked: usize,
    pub neutralized: usize,
    pub skipped: usize,
    pub detached: usize,
}

impl PassReport {
    pub fn merge(&mut self, other: &PassReport) {
        self.visited += other.visited;
        self.marked += other.marked;
        self.neutralized += other.neutralized;
        self.skipped += other.skipped;
        self.detached += other.detached;
    }
}

/// Classifier and marker, applied over whole subtrees.
#[derive(Debug, Clone)]
pub struct Engine {
    classifier: Classifier,
    marker: Marker,
}

impl Engine {
    pub fn new(classifier: Classifier, marker: Marker) -> Self {
        Engine { classifier, marker }
    }

    /// Classifies and marks a single element.
    pub fn process<D: Document + ?Sized>(&self, doc: &mut D, node: NodeId, report: &mut PassReport) {
        report.visited += 1;
        match self.classifier.classify(doc, node) {
            Decision::Mark => {
                let applied = self.marker.apply(doc, node, Decision::Mark);
                if applied.marked {
                    report.marked += 1;
                }
                report.neutralized += applied.neutralized;
            }
            Decision::Skip(reason) => {
                report.skipped += 1;
                if reason == SkipReason::Detached {
                    report.detached += 1;
                }
            }
        }
    }

    fn visit_subtree<D: Document + ?Sized>(
        &self,
        doc: &mut D,
        root: NodeId,
        only: Option<&[&str]>,
        visited: &mut HashSet<NodeId>,
        report: &mut PassReport,
    ) {
        // Marks never change structure, so the order computed up front holds.
        for node in descendants(doc, root) {
            let Some(tag) = doc.tag_name(node) else {
                continue;
            };
            if only.is_some_and(|tags| !tags.contains(&tag)) {
                continue;
            }
            if !visited.insert(node) {
                continue;
            }
            self.process(doc, node, report);
        }
    }

    /// Classifies every element already in the document.
    pub fn full_pass<D: Document + ?Sized>(&self, doc: &mut D) -> PassReport {
        let mut report = PassReport::default();
        if let Some(root) = doc.root() {
            self.visit_subtree(doc, root, None, &mut HashSet::new(), &mut report);
        }
        report
    }

    /// Re-evaluates structural containers after layout has settled.
    pub fn rescan_structural<D: Document + ?Sized>(&self, doc: &mut D) -> PassReport {
        let mut report = PassReport::default();
        if let Some(root) = doc.root() {
            self.visit_subtree(doc, root, Some(STRUCTURAL_TAGS), &mut HashSet::new(), &mut report);
        }
        report
    }

    /// Processes the added-node roots of one batch in record order, every
    /// element of every root's subtree at most once.
    pub fn drain<D: Document + ?Sized>(&self, doc: &mut D, batch: &MutationBatch) -> PassReport {
        let mut report = PassReport::default();
        let mut visited = HashSet::new();
        for root in batch.added_roots() {
            if !doc.is_element(root) || visited.contains(&root) {
                continue;
            }
            if !doc.is_connected(root) {
                report.detached += 1;
                continue;
            }
            // Content inserted into an overridden block belongs to it.
            if self.marker.owning_override(doc, root).is_some() {
                report.neutralized += self.marker.neutralize_subtree(doc, root);
            }
            self.visit_subtree(doc, root, None, &mut visited, &mut report);
        }
        report
    }
}
