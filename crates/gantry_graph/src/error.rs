//! Error types for the graph module.

use thiserror::Error;

/// Result type alias for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors that can occur while building or validating a resource graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Duplicate resource name: {0}")]
    DuplicateName(String),

    #[error("Duplicate export name: {0}")]
    DuplicateExport(String),

    #[error("Dependency cycle detected: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("Reference to unknown node: node_{0}")]
    UnknownNode(usize),

    #[error("Unresolved reference to '{node}.{attribute}': {reason}")]
    UnresolvedReference {
        node: String,
        attribute: String,
        reason: String,
    },
}
