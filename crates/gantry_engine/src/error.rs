//! Error types for the engine.

use thiserror::Error;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type alias for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors returned by provider collaborators.
///
/// Providers are treated as opaque, possibly-slow, possibly-failing remote
/// calls; the engine adds no retry logic of its own.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("Provisioning failed: {0}")]
    Failed(String),

    #[error("Unsupported resource type: {0}")]
    Unsupported(String),

    #[error("Invalid properties: {0}")]
    InvalidProperties(String),
}

/// Errors that can occur during planning and apply.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Resource '{node}' blocked by failed dependency '{dependency}'")]
    BlockedDependency { node: String, dependency: String },

    #[error("Graph error: {0}")]
    Graph(#[from] gantry_graph::GraphError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal executor error: {0}")]
    Internal(String),
}
