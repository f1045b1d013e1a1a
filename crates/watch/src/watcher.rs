//! Watcher - selector-driven callbacks over document mutations
//!
//! A `Watcher` owns its rule registries and its started-flag; nothing is
//! process-global. Observation starts lazily on the first registration call
//! and runs until the watcher is disconnected or dropped.

use crate::error::WatchError;
use crate::rules::{RuleKind, RuleRegistry, SelectorRule};
use crate::selector::Selector;
use dom::{Document, MutationHandler, MutationRecord, NodeSnapshot, ObserveOptions, ObserverId};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Dispatch core, shared weakly with the document while observing
struct WatcherCore {
    registry: RuleRegistry,
}

impl MutationHandler for WatcherCore {
    fn on_mutations(&mut self, records: &[MutationRecord]) {
        for record in records {
            // Added nodes first, then removed, within each record
            dispatch(&record.added_nodes, self.registry.rules_mut(RuleKind::Added));
            dispatch(
                &record.removed_nodes,
                self.registry.rules_mut(RuleKind::Removed),
            );
        }
    }
}

/// Depth-first pre-order walk over a reported node list
///
/// The record names only the top-level nodes of an inserted or removed
/// subtree, so matching recurses into snapshot children. Rules run in
/// registration order; a node may fire several of them. Callback panics are
/// not caught.
fn dispatch(nodes: &[NodeSnapshot], rules: &mut Vec<SelectorRule>) {
    for node in nodes {
        if !node.is_element() {
            continue;
        }
        for rule in rules.iter_mut() {
            if rule.selector().matches(node) {
                (rule.callback)(node);
            }
        }
        if !node.children.is_empty() {
            dispatch(&node.children, rules);
        }
    }
}

enum Backend {
    Live {
        document: Document,
        core: Rc<RefCell<WatcherCore>>,
        registration: Option<ObserverId>,
    },
    /// Host without a mutation facility: same surface, nothing ever happens
    Noop,
}

/// Watches a document for elements matching registered selectors
///
/// ```
/// use dom::Document;
/// use watch::Watcher;
///
/// let doc = Document::new();
/// let mut watcher = Watcher::new(&doc);
/// watcher.watch_for_added_elements(".item", |node| {
///     println!("new item: {}", node.node_name);
/// });
///
/// let el = doc.create_element_with_attrs("li", &[("class", "item")]);
/// doc.append_child(doc.root_id(), el).unwrap();
/// doc.deliver_mutations();
/// ```
pub struct Watcher {
    backend: Backend,
}

impl Watcher {
    /// Create a watcher for `document`
    ///
    /// The capability check happens here, once: a document without mutation
    /// observation yields an inert watcher whose registration calls all
    /// succeed trivially.
    pub fn new(document: &Document) -> Self {
        if document.supports_mutation_observation() {
            Self {
                backend: Backend::Live {
                    document: document.clone(),
                    core: Rc::new(RefCell::new(WatcherCore {
                        registry: RuleRegistry::new(),
                    })),
                    registration: None,
                },
            }
        } else {
            tracing::debug!("mutation observation unavailable; watcher is inert");
            Self {
                backend: Backend::Noop,
            }
        }
    }

    /// Register a callback for elements newly present in the document,
    /// including elements arriving inside a larger inserted subtree
    ///
    /// Invalid selectors are dropped silently; use
    /// [`try_watch_for_added_elements`](Self::try_watch_for_added_elements)
    /// to surface the parse error instead.
    pub fn watch_for_added_elements<F>(&mut self, selector: &str, callback: F)
    where
        F: FnMut(&NodeSnapshot) + 'static,
    {
        self.register_silent(RuleKind::Added, selector, callback);
    }

    /// Register a callback for elements removed from the document
    pub fn watch_for_removed_elements<F>(&mut self, selector: &str, callback: F)
    where
        F: FnMut(&NodeSnapshot) + 'static,
    {
        self.register_silent(RuleKind::Removed, selector, callback);
    }

    /// Strict variant of [`watch_for_added_elements`](Self::watch_for_added_elements)
    pub fn try_watch_for_added_elements<F>(
        &mut self,
        selector: &str,
        callback: F,
    ) -> Result<(), WatchError>
    where
        F: FnMut(&NodeSnapshot) + 'static,
    {
        self.register_strict(RuleKind::Added, selector, callback)
    }

    /// Strict variant of [`watch_for_removed_elements`](Self::watch_for_removed_elements)
    pub fn try_watch_for_removed_elements<F>(
        &mut self,
        selector: &str,
        callback: F,
    ) -> Result<(), WatchError>
    where
        F: FnMut(&NodeSnapshot) + 'static,
    {
        self.register_strict(RuleKind::Removed, selector, callback)
    }

    /// Whether the underlying observation has been started
    pub fn is_observing(&self) -> bool {
        matches!(
            &self.backend,
            Backend::Live {
                registration: Some(_),
                ..
            }
        )
    }

    /// Stop observing; registered rules stay but never fire again
    ///
    /// Idempotent. A later registration call restarts observation.
    pub fn disconnect(&mut self) {
        if let Backend::Live {
            document,
            registration,
            ..
        } = &mut self.backend
        {
            if let Some(id) = registration.take() {
                document.disconnect(id);
                tracing::debug!(observer = id, "watcher disconnected");
            }
        }
    }

    fn register_silent<F>(&mut self, kind: RuleKind, selector: &str, callback: F)
    where
        F: FnMut(&NodeSnapshot) + 'static,
    {
        // Activation precedes validation: the first call starts observation
        // even when the registration itself is rejected.
        self.ensure_observing();
        let Backend::Live { core, .. } = &mut self.backend else {
            return;
        };
        match Selector::parse(selector) {
            Ok(parsed) => {
                core.borrow_mut()
                    .registry
                    .push(kind, SelectorRule::new(parsed, callback));
                tracing::debug!(selector, ?kind, "rule registered");
            }
            Err(err) => {
                tracing::debug!(selector, %err, "rule dropped: invalid selector");
            }
        }
    }

    fn register_strict<F>(
        &mut self,
        kind: RuleKind,
        selector: &str,
        callback: F,
    ) -> Result<(), WatchError>
    where
        F: FnMut(&NodeSnapshot) + 'static,
    {
        self.ensure_observing();
        let Backend::Live { core, .. } = &mut self.backend else {
            return Ok(());
        };
        let parsed = Selector::parse(selector).map_err(|source| WatchError::InvalidSelector {
            selector: selector.to_string(),
            source,
        })?;
        core.borrow_mut()
            .registry
            .push(kind, SelectorRule::new(parsed, callback));
        tracing::debug!(selector, ?kind, "rule registered");
        Ok(())
    }

    fn ensure_observing(&mut self) {
        if let Backend::Live {
            document,
            core,
            registration,
        } = &mut self.backend
        {
            if registration.is_none() {
                let weak: Weak<RefCell<WatcherCore>> = Rc::downgrade(&*core);
                let weak: Weak<RefCell<dyn MutationHandler>> = weak;
                match document.observe(weak, ObserveOptions::default()) {
                    Ok(id) => {
                        *registration = Some(id);
                        tracing::debug!(observer = id, "watcher observing");
                    }
                    Err(err) => {
                        tracing::debug!(%err, "could not start observation");
                    }
                }
            }
        }
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.disconnect();
    }
}
