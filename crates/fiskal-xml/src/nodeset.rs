#![forbid(unsafe_code)]

//! NodeSet type for document-subset canonicalization.
//!
//! A `NodeSet` is the set of document nodes visible to the canonicalizer,
//! identified by their `NodeId`. The enveloped profile needs exactly two
//! operations: building the set for a subtree (comments excluded, per the
//! W3C DSig rules for same-document references) and removing the
//! signature subtree (the enveloped-signature transform).

use std::collections::HashSet;

/// A set of XML document nodes identified by `NodeId`.
#[derive(Debug, Clone)]
pub struct NodeSet {
    nodes: HashSet<roxmltree::NodeId>,
}

impl NodeSet {
    /// Create an empty node set.
    pub fn new() -> Self {
        Self {
            nodes: HashSet::new(),
        }
    }

    /// Create a node set containing all nodes in the document except comments.
    /// Per W3C DSig, `URI=""` selects the document without comments.
    pub fn all_without_comments(doc: &roxmltree::Document<'_>) -> Self {
        let mut nodes = HashSet::new();
        for node in doc.root().descendants() {
            if !node.is_comment() {
                nodes.insert(node.id());
            }
        }
        Self { nodes }
    }

    /// Create a node set for the subtree rooted at the given node,
    /// excluding comment nodes.
    pub fn tree_without_comments(root: roxmltree::Node<'_, '_>) -> Self {
        let mut nodes = HashSet::new();
        for node in root.descendants() {
            if !node.is_comment() {
                nodes.insert(node.id());
            }
        }
        Self { nodes }
    }

    /// Check if a node is in this set.
    pub fn contains(&self, id: roxmltree::NodeId) -> bool {
        self.nodes.contains(&id)
    }

    /// Remove a node and all its descendants from the set.
    pub fn remove_subtree(&mut self, root: roxmltree::Node<'_, '_>) {
        for node in root.descendants() {
            self.nodes.remove(&node.id());
        }
    }

    /// Check if this set is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes in the set.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

impl Default for NodeSet {
    fn default() -> Self {
        Self::new()
    }
}
