//! Core node types for the live document tree
//!
//! Key design principles:
//! 1. Use u32 indices into the arena instead of pointers
//! 2. Use SmallVec for child lists (most nodes have few children)
//! 3. Keep the node struct flat; no boxed side tables

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Node identifier (index into arena)
/// u32 allows 4 billion nodes, enough for any document
pub type NodeId = u32;

/// Node type matching DOM specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeType {
    Element = 1,
    Attribute = 2,
    Text = 3,
    CdataSection = 4,
    EntityReference = 5,
    Entity = 6,
    ProcessingInstruction = 7,
    Comment = 8,
    Document = 9,
    DocumentType = 10,
    DocumentFragment = 11,
    Notation = 12,
}

impl NodeType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(NodeType::Element),
            2 => Some(NodeType::Attribute),
            3 => Some(NodeType::Text),
            4 => Some(NodeType::CdataSection),
            5 => Some(NodeType::EntityReference),
            6 => Some(NodeType::Entity),
            7 => Some(NodeType::ProcessingInstruction),
            8 => Some(NodeType::Comment),
            9 => Some(NodeType::Document),
            10 => Some(NodeType::DocumentType),
            11 => Some(NodeType::DocumentFragment),
            12 => Some(NodeType::Notation),
            _ => None,
        }
    }
}

/// A node in the live document tree
///
/// Nodes are created detached (`parent_id: None`, `connected: false`) and
/// become connected when attached under a connected ancestor. The `connected`
/// flag is maintained by the arena over whole subtrees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomNode {
    pub node_id: NodeId,
    pub node_type: NodeType,

    /// Tag name for elements, `#text` / `#document` for the rest
    pub node_name: String,

    /// Text content for text/comment nodes, empty for elements
    pub node_value: String,

    pub attributes: HashMap<String, String>,

    pub parent_id: Option<NodeId>,
    pub children_ids: SmallVec<[NodeId; 4]>,

    /// Whether the node is reachable from the document root
    pub connected: bool,

    /// Stable identity, survives detach/reattach
    pub uuid: String,
}

impl DomNode {
    pub fn new(node_id: NodeId, node_type: NodeType, node_name: String) -> Self {
        Self {
            node_id,
            node_type,
            node_name,
            node_value: String::new(),
            attributes: HashMap::new(),
            parent_id: None,
            children_ids: SmallVec::new(),
            connected: false,
            uuid: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    pub fn is_text(&self) -> bool {
        self.node_type == NodeType::Text
    }

    /// Get tag name for element nodes
    pub fn tag_name(&self) -> Option<&str> {
        if self.is_element() {
            Some(&self.node_name)
        } else {
            None
        }
    }

    /// Get attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    /// The `id` attribute, if any
    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Whitespace-separated tokens of the `class` attribute
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_type_roundtrip() {
        assert_eq!(NodeType::from_u8(1), Some(NodeType::Element));
        assert_eq!(NodeType::from_u8(9), Some(NodeType::Document));
        assert_eq!(NodeType::from_u8(0), None);
        assert_eq!(NodeType::from_u8(13), None);
    }

    #[test]
    fn test_classes_tokenized() {
        let mut node = DomNode::new(0, NodeType::Element, "div".to_string());
        node.attributes
            .insert("class".to_string(), "  card  active ".to_string());

        let classes: Vec<&str> = node.classes().collect();
        assert_eq!(classes, vec!["card", "active"]);
    }

    #[test]
    fn test_tag_name_only_for_elements() {
        let elem = DomNode::new(0, NodeType::Element, "span".to_string());
        assert_eq!(elem.tag_name(), Some("span"));

        let text = DomNode::new(1, NodeType::Text, "#text".to_string());
        assert_eq!(text.tag_name(), None);
    }
}
