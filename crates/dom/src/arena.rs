//! Arena-based storage for the live document tree
//!
//! Nodes live in a single `Vec` and refer to each other by 4-byte indices.
//! Detaching a subtree only unlinks it; slots are never reused, so `NodeId`s
//! stay valid for the lifetime of the document and a detached subtree can be
//! re-attached later.

use crate::error::{DomError, Result};
use crate::types::{DomNode, NodeId};
use ahash::AHashMap;

/// Arena allocator for document nodes
///
/// Besides plain storage this maintains the structural invariants the
/// document relies on:
/// - `parent_id`/`children_ids` links stay symmetric across attach/detach
/// - the `connected` flag covers whole subtrees
/// - `id_index` maps the `id` attribute of connected elements to their node
#[derive(Debug, Default)]
pub struct DomArena {
    /// All nodes stored sequentially
    nodes: Vec<DomNode>,

    /// `id` attribute -> node, connected elements only.
    /// Duplicate ids overwrite; removal only clears an entry that still
    /// points at the detached node.
    id_index: AHashMap<String, NodeId>,

    /// Root node ID (if set)
    root_id: Option<NodeId>,
}

impl DomArena {
    pub fn new() -> Self {
        Self {
            nodes: Vec::with_capacity(256),
            id_index: AHashMap::new(),
            root_id: None,
        }
    }

    /// Add a node to the arena, returns its ID
    ///
    /// The node's `node_id` field is overwritten with the assigned slot.
    pub fn add_node(&mut self, mut node: DomNode) -> NodeId {
        let node_id = self.nodes.len() as NodeId;
        node.node_id = node_id;
        self.nodes.push(node);
        node_id
    }

    pub fn get(&self, node_id: NodeId) -> Result<&DomNode> {
        self.nodes
            .get(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    pub fn get_mut(&mut self, node_id: NodeId) -> Result<&mut DomNode> {
        self.nodes
            .get_mut(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    /// Set root node and mark its subtree connected
    pub fn set_root(&mut self, node_id: NodeId) -> Result<()> {
        self.get(node_id)?;
        self.root_id = Some(node_id);
        self.mark_connected(node_id, true)?;
        Ok(())
    }

    pub fn root_id(&self) -> Option<NodeId> {
        self.root_id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_connected(&self, node_id: NodeId) -> Result<bool> {
        Ok(self.get(node_id)?.connected)
    }

    /// Get children of a node
    pub fn children(&self, node_id: NodeId) -> Result<Vec<&DomNode>> {
        let node = self.get(node_id)?;
        node.children_ids
            .iter()
            .map(|&child_id| self.get(child_id))
            .collect()
    }

    /// Find connected element by `id` attribute
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    /// Attach a detached node as the last child of `parent`
    ///
    /// Fails if the child is already attached somewhere, or if the attachment
    /// would create a cycle (the child is the parent or one of its ancestors).
    pub fn attach(&mut self, parent_id: NodeId, child_id: NodeId) -> Result<()> {
        if self.get(child_id)?.parent_id.is_some() {
            return Err(DomError::InvalidStructure(format!(
                "node {child_id} is already attached"
            )));
        }

        // Cycle check: walk up from the parent
        let mut cursor = Some(parent_id);
        while let Some(id) = cursor {
            if id == child_id {
                return Err(DomError::InvalidStructure(format!(
                    "node {child_id} is an ancestor of {parent_id}"
                )));
            }
            cursor = self.get(id)?.parent_id;
        }

        self.get_mut(parent_id)?.children_ids.push(child_id);
        self.get_mut(child_id)?.parent_id = Some(parent_id);

        if self.get(parent_id)?.connected {
            self.mark_connected(child_id, true)?;
        }
        Ok(())
    }

    /// Detach a node from its parent, leaving its subtree intact
    pub fn detach(&mut self, child_id: NodeId) -> Result<NodeId> {
        let parent_id = self
            .get(child_id)?
            .parent_id
            .ok_or(DomError::NodeDetached(child_id))?;

        let was_connected = self.get(child_id)?.connected;
        if was_connected {
            self.mark_connected(child_id, false)?;
        }

        let parent = self.get_mut(parent_id)?;
        parent.children_ids.retain(|id| *id != child_id);
        self.get_mut(child_id)?.parent_id = None;

        Ok(parent_id)
    }

    /// Update an attribute, keeping the id index in sync
    pub fn set_attribute(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        let (old_id, connected) = {
            let node = self.get(node_id)?;
            (node.attributes.get("id").cloned(), node.connected)
        };
        if name == "id" && connected {
            if let Some(old) = old_id {
                if self.id_index.get(&old) == Some(&node_id) {
                    self.id_index.remove(&old);
                }
            }
        }
        self.get_mut(node_id)?
            .attributes
            .insert(name.to_string(), value.to_string());
        if name == "id" && connected {
            self.id_index.insert(value.to_string(), node_id);
        }
        Ok(())
    }

    /// Collect a subtree's node IDs in depth-first pre-order
    pub fn collect_subtree(&self, start_id: NodeId) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut stack = vec![start_id];
        while let Some(node_id) = stack.pop() {
            let node = self.get(node_id)?;
            out.push(node_id);
            for &child_id in node.children_ids.iter().rev() {
                stack.push(child_id);
            }
        }
        Ok(out)
    }

    /// Traverse tree depth-first (iterative, no recursion)
    pub fn traverse_df<F>(&self, start_id: NodeId, mut visit: F) -> Result<()>
    where
        F: FnMut(&DomNode) -> Result<()>,
    {
        let mut stack = vec![start_id];
        while let Some(node_id) = stack.pop() {
            let node = self.get(node_id)?;
            visit(node)?;

            // Push children in reverse order (so they're visited left-to-right)
            for &child_id in node.children_ids.iter().rev() {
                stack.push(child_id);
            }
        }
        Ok(())
    }

    fn mark_connected(&mut self, start_id: NodeId, connected: bool) -> Result<()> {
        for node_id in self.collect_subtree(start_id)? {
            let node = self.get_mut(node_id)?;
            node.connected = connected;
            let id_attr = node.attributes.get("id").cloned();
            if let Some(id_attr) = id_attr {
                if connected {
                    self.id_index.insert(id_attr, node_id);
                } else if self.id_index.get(&id_attr) == Some(&node_id) {
                    self.id_index.remove(&id_attr);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeType;

    fn element(arena: &mut DomArena, name: &str) -> NodeId {
        arena.add_node(DomNode::new(0, NodeType::Element, name.to_string()))
    }

    #[test]
    fn test_attach_links_both_sides() {
        let mut arena = DomArena::new();
        let root = element(&mut arena, "html");
        arena.set_root(root).unwrap();
        let child = element(&mut arena, "div");

        arena.attach(root, child).unwrap();

        assert_eq!(arena.get(child).unwrap().parent_id, Some(root));
        assert_eq!(arena.get(root).unwrap().children_ids.as_slice(), &[child]);
        assert!(arena.is_connected(child).unwrap());
    }

    #[test]
    fn test_detach_disconnects_subtree() {
        let mut arena = DomArena::new();
        let root = element(&mut arena, "html");
        arena.set_root(root).unwrap();
        let branch = element(&mut arena, "div");
        let leaf = element(&mut arena, "span");
        arena.attach(root, branch).unwrap();
        arena.attach(branch, leaf).unwrap();

        arena.detach(branch).unwrap();

        assert_eq!(arena.get(branch).unwrap().parent_id, None);
        assert!(!arena.is_connected(branch).unwrap());
        assert!(!arena.is_connected(leaf).unwrap());
        // Re-attach restores connectivity
        arena.attach(root, branch).unwrap();
        assert!(arena.is_connected(leaf).unwrap());
    }

    #[test]
    fn test_attach_rejects_cycle() {
        let mut arena = DomArena::new();
        let root = element(&mut arena, "html");
        arena.set_root(root).unwrap();
        let child = element(&mut arena, "div");
        arena.attach(root, child).unwrap();

        assert!(arena.attach(child, root).is_err());
        assert!(arena.attach(child, child).is_err());
    }

    #[test]
    fn test_id_index_follows_connectivity() {
        let mut arena = DomArena::new();
        let root = element(&mut arena, "html");
        arena.set_root(root).unwrap();
        let child = element(&mut arena, "div");
        arena.set_attribute(child, "id", "sidebar").unwrap();

        // Detached elements are not indexed
        assert_eq!(arena.find_by_id("sidebar"), None);

        arena.attach(root, child).unwrap();
        assert_eq!(arena.find_by_id("sidebar"), Some(child));

        arena.detach(child).unwrap();
        assert_eq!(arena.find_by_id("sidebar"), None);
    }

    #[test]
    fn test_traverse_df_preorder() {
        let mut arena = DomArena::new();
        let root = element(&mut arena, "html");
        arena.set_root(root).unwrap();
        let a = element(&mut arena, "a");
        let b = element(&mut arena, "b");
        let a1 = element(&mut arena, "a1");
        arena.attach(root, a).unwrap();
        arena.attach(root, b).unwrap();
        arena.attach(a, a1).unwrap();

        let mut visited = Vec::new();
        arena
            .traverse_df(root, |node| {
                visited.push(node.node_name.clone());
                Ok(())
            })
            .unwrap();

        assert_eq!(visited, vec!["html", "a", "a1", "b"]);
    }
}
