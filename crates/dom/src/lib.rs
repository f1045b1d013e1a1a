//! Live Document Tree Library
//!
//! An arena-backed document tree with a child-list mutation notification
//! facility.
//!
//! ## Core Design
//!
//! ```text
//! JSON description → DomArena (owned) → structural change → MutationRecord
//!                         ↓                                      ↓
//!                   NodeIndex (u32)                 deliver_mutations → handlers
//! ```
//!
//! The model is single-threaded and event-loop shaped: mutations queue
//! records synchronously, and `Document::deliver_mutations` is the explicit
//! checkpoint where batches reach subscribed handlers.

pub mod arena;
pub mod document;
pub mod error;
pub mod mutation;
pub mod types;

pub use arena::DomArena;
pub use document::{Document, DocumentConfig};
pub use error::{DomError, Result};
pub use mutation::{MutationHandler, MutationRecord, NodeSnapshot, ObserveOptions, ObserverId};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_document_has_root() {
        let doc = Document::new();
        assert_eq!(doc.node_count(), 1);
        assert!(doc.get_node(doc.root_id()).unwrap().node_type == NodeType::Document);
    }
}
