//! Resource nodes and their lifecycle states.

use serde::{Deserialize, Serialize};

use crate::value::PropertyBag;

/// Unique identifier for a node in the graph.
///
/// Ids are allocated sequentially by the graph builder in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Creates a new node ID.
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

/// Lifecycle state of a resource during an apply.
///
/// `Provisioned`, `Failed` and `Blocked` are terminal. A node enters
/// `Blocked` without ever being attempted when an ancestor fails.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    /// Not yet scheduled
    Pending,
    /// Provider call in flight
    Provisioning,
    /// Provider call succeeded (or the resource was unchanged)
    Provisioned,
    /// Provider call failed
    Failed,
    /// Never attempted because an ancestor failed
    Blocked,
}

impl Default for ResourceState {
    fn default() -> Self {
        Self::Pending
    }
}

impl ResourceState {
    /// Check if the state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Provisioned | Self::Failed | Self::Blocked)
    }
}

impl std::fmt::Display for ResourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Provisioning => "provisioning",
            Self::Provisioned => "provisioned",
            Self::Failed => "failed",
            Self::Blocked => "blocked",
        };
        write!(f, "{}", s)
    }
}

/// A declared resource: identity plus a property bag.
///
/// Nodes are pure data. Declaring one has no side effect beyond appending
/// to the in-memory graph; provisioning happens in the engine crate.
#[derive(Debug, Clone)]
pub struct ResourceNode {
    /// Node id within the graph.
    pub id: NodeId,
    /// Provider type string, e.g. `azure:storage:StorageAccount`.
    pub resource_type: String,
    /// Logical name, unique within the graph.
    pub name: String,
    /// Desired properties; may embed unresolved output references.
    pub properties: PropertyBag,
    /// Explicit dependencies beyond those implied by references.
    pub explicit_deps: Vec<NodeId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId::new(7).to_string(), "node_7");
    }

    #[test]
    fn test_state_terminality() {
        assert!(!ResourceState::Pending.is_terminal());
        assert!(!ResourceState::Provisioning.is_terminal());
        assert!(ResourceState::Provisioned.is_terminal());
        assert!(ResourceState::Failed.is_terminal());
        assert!(ResourceState::Blocked.is_terminal());
    }

    #[test]
    fn test_state_serde_round_trip() {
        let json = serde_json::to_string(&ResourceState::Blocked).unwrap();
        assert_eq!(json, "\"blocked\"");
        let state: ResourceState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, ResourceState::Blocked);
    }
}
