//! Stack state persistence.
//!
//! The state store records, per stack, the last-known properties and
//! attributes of every provisioned resource plus the stack's outputs.
//! The planner consults it for diffing; the executor writes it back after
//! every apply.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gantry_graph::{Attributes, ResolvedProperties};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// Last-known record of a provisioned resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceRecord {
    /// Provider type string.
    pub resource_type: String,
    /// Resolved properties at the time of provisioning.
    pub properties: ResolvedProperties,
    /// Attributes reported by the provider.
    pub attributes: Attributes,
}

/// A stack output after an apply.
///
/// Outputs whose dependency chain failed or was blocked are recorded as
/// `Unavailable` rather than omitted, so consumers can tell "not exported"
/// from "could not be resolved".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "status", content = "value")]
pub enum OutputValue {
    Resolved(serde_json::Value),
    Unavailable,
}

/// Persistent snapshot of a stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackState {
    /// Stack name.
    pub stack: String,
    /// Id of the run that produced this snapshot.
    pub run_id: Uuid,
    /// When the snapshot was written.
    pub updated_at: DateTime<Utc>,
    /// Resource records keyed by logical name.
    pub resources: HashMap<String, ResourceRecord>,
    /// Stack outputs from the last apply.
    pub outputs: BTreeMap<String, OutputValue>,
}

impl StackState {
    /// Create an empty snapshot for a stack.
    pub fn new(stack: impl Into<String>) -> Self {
        Self {
            stack: stack.into(),
            run_id: Uuid::new_v4(),
            updated_at: Utc::now(),
            resources: HashMap::new(),
            outputs: BTreeMap::new(),
        }
    }
}

/// Trait for state store implementations.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the prior snapshot for a stack, if one exists.
    async fn load_prior_state(&self, stack: &str) -> EngineResult<Option<StackState>>;

    /// Persist the snapshot produced by an apply.
    async fn save_posterior_state(&self, state: &StackState) -> EngineResult<()>;
}

/// File-backed state store: one pretty-printed JSON snapshot per stack.
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the snapshot file for a stack.
    pub fn state_path(&self, stack: &str) -> PathBuf {
        self.dir.join(format!("{}.json", stack))
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load_prior_state(&self, stack: &str) -> EngineResult<Option<StackState>> {
        let path = self.state_path(stack);
        if !path.exists() {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&path).await?;
        let state: StackState = serde_json::from_str(&content)
            .map_err(|e| EngineError::Serialization(e.to_string()))?;
        debug!("Loaded prior state for '{}' from {:?}", stack, path);
        Ok(Some(state))
    }

    async fn save_posterior_state(&self, state: &StackState) -> EngineResult<()> {
        let path = self.state_path(&state.stack);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| EngineError::Serialization(e.to_string()))?;
        tokio::fs::write(&path, json).await?;
        debug!("Saved state for '{}' to {:?}", state.stack, path);
        Ok(())
    }
}

/// In-memory state store for tests and previews.
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    states: Arc<RwLock<HashMap<String, StackState>>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct read access for assertions.
    pub fn get(&self, stack: &str) -> Option<StackState> {
        self.states.read().get(stack).cloned()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load_prior_state(&self, stack: &str) -> EngineResult<Option<StackState>> {
        Ok(self.states.read().get(stack).cloned())
    }

    async fn save_posterior_state(&self, state: &StackState) -> EngineResult<()> {
        self.states
            .write()
            .insert(state.stack.clone(), state.clone());
        Ok(())
    }
}

/// Helper for tests and tooling: load a snapshot synchronously from a path.
pub fn read_state_file(path: &Path) -> EngineResult<StackState> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| EngineError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample_state() -> StackState {
        let mut state = StackState::new("demo");
        state.resources.insert(
            "rg".to_string(),
            ResourceRecord {
                resource_type: "azure:resources:ResourceGroup".to_string(),
                properties: [("location".to_string(), json!("westeurope"))]
                    .into_iter()
                    .collect(),
                attributes: [("name".to_string(), json!("rg-demo"))].into_iter().collect(),
            },
        );
        state
            .outputs
            .insert("groupName".to_string(), OutputValue::Resolved(json!("rg-demo")));
        state
            .outputs
            .insert("vmFqdn".to_string(), OutputValue::Unavailable);
        state
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::new(dir.path());

        assert!(store.load_prior_state("demo").await.unwrap().is_none());

        let state = sample_state();
        store.save_posterior_state(&state).await.unwrap();

        let loaded = store.load_prior_state("demo").await.unwrap().unwrap();
        assert_eq!(loaded.stack, "demo");
        assert_eq!(loaded.resources.len(), 1);
        assert_eq!(
            loaded.outputs.get("groupName"),
            Some(&OutputValue::Resolved(json!("rg-demo")))
        );
        assert_eq!(
            loaded.outputs.get("vmFqdn"),
            Some(&OutputValue::Unavailable)
        );
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStateStore::new();
        store.save_posterior_state(&sample_state()).await.unwrap();
        let loaded = store.load_prior_state("demo").await.unwrap().unwrap();
        assert_eq!(loaded.resources["rg"].resource_type, "azure:resources:ResourceGroup");
    }

    #[test]
    fn test_output_value_serde_shape() {
        let resolved = serde_json::to_value(OutputValue::Resolved(json!("abc"))).unwrap();
        assert_eq!(resolved, json!({ "status": "resolved", "value": "abc" }));
        let unavailable = serde_json::to_value(OutputValue::Unavailable).unwrap();
        assert_eq!(unavailable, json!({ "status": "unavailable" }));
    }
}
