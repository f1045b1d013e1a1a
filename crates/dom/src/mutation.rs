//! Mutation records and observer plumbing
//!
//! A structural change to a connected part of the tree queues one
//! `MutationRecord`. Records name only the top-level inserted/removed nodes;
//! their descendants travel inside the owned `NodeSnapshot` trees, so a
//! consumer that cares about the whole subtree walks the snapshot's children.

use crate::types::{NodeId, NodeType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Owned export of a subtree, taken at mutation time
///
/// Snapshots are self-contained: removed nodes stay inspectable after the
/// live tree has let go of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub node_id: NodeId,
    pub node_type: NodeType,
    pub node_name: String,
    pub node_value: String,
    pub attributes: HashMap<String, String>,
    pub children: Vec<NodeSnapshot>,
    pub uuid: String,
}

impl NodeSnapshot {
    /// Build a bare element snapshot (mainly for tests and doc examples)
    pub fn element(name: &str) -> Self {
        Self {
            node_id: 0,
            node_type: NodeType::Element,
            node_name: name.to_string(),
            node_value: String::new(),
            attributes: HashMap::new(),
            children: Vec::new(),
            uuid: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_child(mut self, child: NodeSnapshot) -> Self {
        self.children.push(child);
        self
    }

    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Whitespace-separated tokens of the `class` attribute
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }
}

/// One child-list change, reported against the parent it happened on
///
/// Attribute and character-data changes are not recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationRecord {
    /// Parent node whose child list changed
    pub target: NodeId,
    pub added_nodes: Vec<NodeSnapshot>,
    pub removed_nodes: Vec<NodeSnapshot>,
}

impl MutationRecord {
    pub fn added(target: NodeId, node: NodeSnapshot) -> Self {
        Self {
            target,
            added_nodes: vec![node],
            removed_nodes: Vec::new(),
        }
    }

    pub fn removed(target: NodeId, node: NodeSnapshot) -> Self {
        Self {
            target,
            added_nodes: Vec::new(),
            removed_nodes: vec![node],
        }
    }
}

/// Handle identifying one observation subscription on a document
pub type ObserverId = u64;

/// What a subscription wants delivered
///
/// All records are child-list records; `subtree: false` narrows delivery to
/// changes directly under the document root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserveOptions {
    pub subtree: bool,
    pub child_list: bool,
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self {
            subtree: true,
            child_list: true,
        }
    }
}

/// Receiver side of a subscription
///
/// Called once per delivered batch, on the same thread that drives
/// `Document::deliver_mutations`.
pub trait MutationHandler {
    fn on_mutations(&mut self, records: &[MutationRecord]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_builder_nests() {
        let snap = NodeSnapshot::element("ul")
            .with_child(NodeSnapshot::element("li").with_attr("class", "item"))
            .with_child(NodeSnapshot::element("li"));

        assert_eq!(snap.children.len(), 2);
        assert_eq!(snap.children[0].attr("class"), Some("item"));
        assert!(snap.is_element());
    }

    #[test]
    fn test_observe_options_default() {
        let opts = ObserveOptions::default();
        assert!(opts.subtree);
        assert!(opts.child_list);
    }
}
