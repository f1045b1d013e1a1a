//! Error types for document operations
//!
//! Simple, flat error hierarchy. No over-engineering.

use crate::types::NodeId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DomError>;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node {0} has no parent")]
    NodeDetached(NodeId),

    #[error("Invalid tree operation: {0}")]
    InvalidStructure(String),

    #[error("Invalid node type: {0}")]
    InvalidNodeType(u8),

    #[error("Mutation observation is not available on this document")]
    ObservationUnsupported,

    #[error("Malformed tree description: {0}")]
    MalformedTree(String),

    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),
}
