//! Selector rules and the per-watcher registry
//!
//! A rule is the pairing of a parsed selector with a callback, scoped to one
//! event kind. Rules are append-only: there is no removal, identity does not
//! matter, and duplicates are allowed. Insertion order is invocation order.

use crate::selector::Selector;
use dom::NodeSnapshot;

/// Which child-list event a rule fires on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Added,
    Removed,
}

/// One registered (selector, callback) pair
pub struct SelectorRule {
    selector: Selector,
    pub(crate) callback: Box<dyn FnMut(&NodeSnapshot)>,
}

impl SelectorRule {
    pub fn new(selector: Selector, callback: impl FnMut(&NodeSnapshot) + 'static) -> Self {
        Self {
            selector,
            callback: Box::new(callback),
        }
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

/// Two ordered rule sequences, one per event kind
#[derive(Default)]
pub struct RuleRegistry {
    added: Vec<SelectorRule>,
    removed: Vec<SelectorRule>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: RuleKind, rule: SelectorRule) {
        self.rules_mut(kind).push(rule);
    }

    pub fn rules_mut(&mut self, kind: RuleKind) -> &mut Vec<SelectorRule> {
        match kind {
            RuleKind::Added => &mut self.added,
            RuleKind::Removed => &mut self.removed,
        }
    }

    pub fn len(&self, kind: RuleKind) -> usize {
        match kind {
            RuleKind::Added => self.added.len(),
            RuleKind::Removed => self.removed.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_keeps_insertion_order_and_duplicates() {
        let mut registry = RuleRegistry::new();
        let selector = Selector::parse("div").unwrap();
        registry.push(RuleKind::Added, SelectorRule::new(selector.clone(), |_| {}));
        registry.push(RuleKind::Added, SelectorRule::new(selector, |_| {}));

        assert_eq!(registry.len(RuleKind::Added), 2);
        assert_eq!(registry.len(RuleKind::Removed), 0);
        assert_eq!(
            registry.rules_mut(RuleKind::Added)[0].selector().source(),
            "div"
        );
    }
}
