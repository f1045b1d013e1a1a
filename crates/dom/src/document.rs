//! Document - the live tree plus its mutation notification facility
//!
//! A `Document` is a cheap-clonable handle over the arena, a pending-record
//! queue, and the subscriber list. The whole model is single-threaded and
//! event-loop shaped: mutations queue records synchronously, and
//! `deliver_mutations` is the explicit checkpoint where batches reach
//! subscribers (the stand-in for the host's microtask-granularity delivery).

use crate::arena::DomArena;
use crate::error::{DomError, Result};
use crate::mutation::{MutationHandler, MutationRecord, NodeSnapshot, ObserveOptions, ObserverId};
use crate::types::{DomNode, NodeId, NodeType};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Configuration for a document
///
/// `mutation_observation: false` models a host without a mutation
/// notification facility: no records are queued and `observe` fails.
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    pub mutation_observation: bool,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            mutation_observation: true,
        }
    }
}

struct Subscriber {
    id: ObserverId,
    options: ObserveOptions,
    /// Records queued before this point are not delivered to the subscriber
    since: u64,
    handler: Weak<RefCell<dyn MutationHandler>>,
}

struct DocumentInner {
    arena: DomArena,
    config: DocumentConfig,
    root_id: NodeId,
    queue: Vec<(u64, MutationRecord)>,
    next_seq: u64,
    subscribers: Vec<Subscriber>,
    next_observer_id: ObserverId,
}

impl DocumentInner {
    fn enqueue(&mut self, record: MutationRecord) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push((seq, record));
    }
}

/// Handle to a live document tree
///
/// Clones share the same underlying document. All methods take `&self`; the
/// interior `RefCell` is never held across a subscriber callback, so
/// callbacks are free to mutate the document they were notified about.
#[derive(Clone)]
pub struct Document {
    inner: Rc<RefCell<DocumentInner>>,
}

impl Document {
    pub fn new() -> Self {
        Self::with_config(DocumentConfig::default())
    }

    pub fn with_config(config: DocumentConfig) -> Self {
        let mut arena = DomArena::new();
        let root = DomNode::new(0, NodeType::Document, "#document".to_string());
        let root_id = arena.add_node(root);
        // Root always exists, set_root cannot fail here
        let _ = arena.set_root(root_id);

        Self {
            inner: Rc::new(RefCell::new(DocumentInner {
                arena,
                config,
                root_id,
                queue: Vec::new(),
                next_seq: 0,
                subscribers: Vec::new(),
                next_observer_id: 1,
            })),
        }
    }

    /// Build a whole document from a JSON tree description
    ///
    /// Initial content is parsed in, not mutated in: no records are queued.
    /// The description is either one node object or an array of them; a node
    /// is `{"name": "div", "attrs": {...}, "children": [...]}` and a bare
    /// JSON string is a text node.
    pub fn from_json(value: &Value) -> Result<Self> {
        let doc = Document::new();
        {
            let mut inner = doc.inner.borrow_mut();
            let root_id = inner.root_id;
            let nodes: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            for node in nodes {
                let node_id = build_node(&mut inner.arena, node)?;
                inner.arena.attach(root_id, node_id)?;
            }
        }
        Ok(doc)
    }

    /// Whether this document can report mutations at all
    pub fn supports_mutation_observation(&self) -> bool {
        self.inner.borrow().config.mutation_observation
    }

    pub fn root_id(&self) -> NodeId {
        self.inner.borrow().root_id
    }

    /// Number of nodes ever created on this document
    pub fn node_count(&self) -> usize {
        self.inner.borrow().arena.len()
    }

    /// Create a detached element
    pub fn create_element(&self, name: &str) -> NodeId {
        let mut inner = self.inner.borrow_mut();
        inner
            .arena
            .add_node(DomNode::new(0, NodeType::Element, name.to_string()))
    }

    /// Create a detached element with initial attributes
    pub fn create_element_with_attrs(&self, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let mut inner = self.inner.borrow_mut();
        let mut node = DomNode::new(0, NodeType::Element, name.to_string());
        for (k, v) in attrs {
            node.attributes.insert((*k).to_string(), (*v).to_string());
        }
        inner.arena.add_node(node)
    }

    /// Create a detached text node
    pub fn create_text(&self, value: &str) -> NodeId {
        let mut inner = self.inner.borrow_mut();
        let mut node = DomNode::new(0, NodeType::Text, "#text".to_string());
        node.node_value = value.to_string();
        inner.arena.add_node(node)
    }

    /// Build a detached subtree from a JSON tree description
    pub fn build_subtree(&self, value: &Value) -> Result<NodeId> {
        let mut inner = self.inner.borrow_mut();
        build_node(&mut inner.arena, value)
    }

    /// Append `child` as the last child of `parent`
    ///
    /// If the parent is connected, one record naming the attached node is
    /// queued; descendants of the attached subtree are not reported
    /// separately, they travel inside the snapshot.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.arena.attach(parent, child)?;
        if inner.config.mutation_observation && inner.arena.is_connected(parent)? {
            let snapshot = export_snapshot(&inner.arena, child)?;
            inner.enqueue(MutationRecord::added(parent, snapshot));
            tracing::trace!(parent, child, "queued added-node record");
        }
        Ok(())
    }

    /// Detach `node` from its parent
    ///
    /// The removed-node snapshot is taken before detaching, so subscribers
    /// still see the subtree as it was inside the document.
    pub fn remove_child(&self, node: NodeId) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        let report = inner.config.mutation_observation && inner.arena.is_connected(node)?;
        let snapshot = if report {
            Some(export_snapshot(&inner.arena, node)?)
        } else {
            None
        };
        let parent = inner.arena.detach(node)?;
        if let Some(snapshot) = snapshot {
            inner.enqueue(MutationRecord::removed(parent, snapshot));
            tracing::trace!(parent, node, "queued removed-node record");
        }
        Ok(())
    }

    /// Set an attribute (no record; only child-list changes are reported)
    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<()> {
        self.inner.borrow_mut().arena.set_attribute(node, name, value)
    }

    /// Copy of a node's current state
    pub fn get_node(&self, node: NodeId) -> Result<DomNode> {
        Ok(self.inner.borrow().arena.get(node)?.clone())
    }

    /// Find a connected element by `id` attribute
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.inner.borrow().arena.find_by_id(id)
    }

    /// Subscribe a handler to this document's mutation batches
    ///
    /// The document holds the handler weakly: dropping the subscriber's side
    /// ends the subscription without an explicit disconnect.
    pub fn observe(
        &self,
        handler: Weak<RefCell<dyn MutationHandler>>,
        options: ObserveOptions,
    ) -> Result<ObserverId> {
        let mut inner = self.inner.borrow_mut();
        if !inner.config.mutation_observation {
            return Err(DomError::ObservationUnsupported);
        }
        let id = inner.next_observer_id;
        inner.next_observer_id += 1;
        let since = inner.next_seq;
        inner.subscribers.push(Subscriber {
            id,
            options,
            since,
            handler,
        });
        tracing::debug!(observer = id, "observation started");
        Ok(id)
    }

    /// End one subscription; unknown ids are ignored
    pub fn disconnect(&self, id: ObserverId) {
        let mut inner = self.inner.borrow_mut();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|s| s.id != id);
        if inner.subscribers.len() != before {
            tracing::debug!(observer = id, "observation stopped");
        }
    }

    /// Number of live subscriptions
    pub fn observer_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|s| s.handler.strong_count() > 0)
            .count()
    }

    /// Number of records queued but not yet delivered
    pub fn pending_mutations(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    /// Deliver all pending records to every live subscriber
    ///
    /// Loops until the queue is quiescent: records produced by callbacks are
    /// delivered in follow-up batches within the same call. Dead subscribers
    /// are pruned. Callback panics are not caught.
    pub fn deliver_mutations(&self) {
        let root_id = self.root_id();
        loop {
            let batch = {
                let mut inner = self.inner.borrow_mut();
                if inner.queue.is_empty() {
                    break;
                }
                std::mem::take(&mut inner.queue)
            };

            let subscribers: Vec<(
                ObserverId,
                ObserveOptions,
                u64,
                Weak<RefCell<dyn MutationHandler>>,
            )> = self
                .inner
                .borrow()
                .subscribers
                .iter()
                .map(|s| (s.id, s.options, s.since, s.handler.clone()))
                .collect();

            let mut dead = Vec::new();
            for (id, options, since, handler) in subscribers {
                if !options.child_list {
                    continue;
                }
                let records: Vec<MutationRecord> = batch
                    .iter()
                    .filter(|(seq, record)| {
                        *seq >= since && (options.subtree || record.target == root_id)
                    })
                    .map(|(_, record)| record.clone())
                    .collect();
                if records.is_empty() {
                    continue;
                }
                match handler.upgrade() {
                    Some(handler) => handler.borrow_mut().on_mutations(&records),
                    None => dead.push(id),
                }
            }
            if !dead.is_empty() {
                self.inner
                    .borrow_mut()
                    .subscribers
                    .retain(|s| !dead.contains(&s.id));
            }
            tracing::debug!(records = batch.len(), "delivered mutation batch");
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Owned export of a connected or detached subtree
fn export_snapshot(arena: &DomArena, node_id: NodeId) -> Result<NodeSnapshot> {
    let node = arena.get(node_id)?;
    let mut children = Vec::with_capacity(node.children_ids.len());
    for &child_id in node.children_ids.iter() {
        children.push(export_snapshot(arena, child_id)?);
    }
    Ok(NodeSnapshot {
        node_id: node.node_id,
        node_type: node.node_type,
        node_name: node.node_name.clone(),
        node_value: node.node_value.clone(),
        attributes: node.attributes.clone(),
        children,
        uuid: node.uuid.clone(),
    })
}

/// Recursively build one node of a JSON tree description
fn build_node(arena: &mut DomArena, value: &Value) -> Result<NodeId> {
    if let Some(text) = value.as_str() {
        let mut node = DomNode::new(0, NodeType::Text, "#text".to_string());
        node.node_value = text.to_string();
        return Ok(arena.add_node(node));
    }

    let obj = value
        .as_object()
        .ok_or_else(|| DomError::MalformedTree("expected object or string".to_string()))?;

    let name = obj
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DomError::MalformedTree("missing element name".to_string()))?;

    let mut node = DomNode::new(0, NodeType::Element, name.to_string());
    if let Some(attrs) = obj.get("attrs") {
        let attrs = attrs
            .as_object()
            .ok_or_else(|| DomError::MalformedTree("attrs must be an object".to_string()))?;
        for (k, v) in attrs {
            let v = v.as_str().ok_or_else(|| {
                DomError::MalformedTree(format!("attribute {k} must be a string"))
            })?;
            node.attributes.insert(k.clone(), v.to_string());
        }
    }

    let node_id = arena.add_node(node);
    if let Some(children) = obj.get("children") {
        let children = children
            .as_array()
            .ok_or_else(|| DomError::MalformedTree("children must be an array".to_string()))?;
        for child in children {
            let child_id = build_node(arena, child)?;
            arena.attach(node_id, child_id)?;
        }
    }
    Ok(node_id)
}
