//! Selector Watch Library
//!
//! Register CSS-selector-based callbacks to be invoked when matching
//! elements are added to or removed from a [`dom::Document`].
//!
//! ## Core Design
//!
//! ```text
//! mutation batch → record → snapshot walk (pre-order) → selector match → callback
//! ```
//!
//! One `Watcher` owns its rule registries and its observation handle;
//! observation starts lazily on the first registration and is released on
//! `disconnect` or drop. Documents without a mutation facility yield an
//! inert watcher with the same surface.

pub mod error;
pub mod rules;
pub mod selector;
pub mod watcher;

pub use error::{Result, WatchError};
pub use rules::{RuleKind, RuleRegistry, SelectorRule};
pub use selector::{Selector, SelectorError};
pub use watcher::Watcher;
