//! DOM Node Operations errors

use crate::NodeId;

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// Node not found
    #[error("Node not found: {0}")]
    NotFound(NodeId),
    /// Hierarchy error (e.g., inserting an ancestor into its descendant)
    #[error("Hierarchy request error")]
    HierarchyRequest,
    /// Invalid node type for the operation
    #[error("Invalid node type for {0}")]
    InvalidNodeType(NodeId),
    /// Node is not a child of the given parent
    #[error("{child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
}
