//! Deferred output references and their resolution.
//!
//! An [`OutputReference`] is a placeholder for a resource attribute that is
//! only known after provisioning. Each node owns an [`OutputCell`], a
//! single-assignment cell with suspending read semantics: resolving a
//! reference awaits the cell instead of polling, and repeated resolutions
//! return the same cached value.

use serde_json::Value;
use tokio::sync::watch;

use crate::error::{GraphError, GraphResult};
use crate::node::NodeId;
use crate::value::{render_fragment, PropertyBag, PropertyValue, TemplatePart};

/// Attributes reported by the provider for a provisioned resource.
pub type Attributes = serde_json::Map<String, Value>;

/// Resolved property bag, ready to hand to a provider.
pub type ResolvedProperties = serde_json::Map<String, Value>;

/// A deferred handle to an attribute of a resource not yet provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputReference {
    /// The node whose attribute is referenced.
    pub node: NodeId,
    /// The attribute name, e.g. `hex` or `ipAddress`.
    pub attribute: String,
}

impl OutputReference {
    pub fn new(node: NodeId, attribute: impl Into<String>) -> Self {
        Self {
            node,
            attribute: attribute.into(),
        }
    }
}

#[derive(Debug, Clone)]
enum CellState {
    Empty,
    Ready(Attributes),
    /// The node can never be provisioned; the string names the cause.
    Poisoned(String),
}

/// Single-assignment cell holding a node's provisioned attributes.
///
/// Written exactly once by the executor; read concurrently by anyone
/// resolving references into the node. Readers suspend until the write.
pub struct OutputCell {
    tx: watch::Sender<CellState>,
}

impl OutputCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(CellState::Empty);
        Self { tx }
    }

    /// Publish the attributes. Later fills of an already-set cell are ignored.
    pub fn fill(&self, attributes: Attributes) {
        self.tx.send_if_modified(|state| {
            if matches!(state, CellState::Empty) {
                *state = CellState::Ready(attributes);
                true
            } else {
                false
            }
        });
    }

    /// Mark the cell as never resolvable, waking all waiting readers.
    pub fn poison(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.tx.send_if_modified(|state| {
            if matches!(state, CellState::Empty) {
                *state = CellState::Poisoned(reason);
                true
            } else {
                false
            }
        });
    }

    /// Non-blocking read. `None` while the cell is still empty.
    pub fn try_get(&self) -> Option<Result<Attributes, String>> {
        match &*self.tx.borrow() {
            CellState::Empty => None,
            CellState::Ready(attrs) => Some(Ok(attrs.clone())),
            CellState::Poisoned(reason) => Some(Err(reason.clone())),
        }
    }

    /// Suspend until the cell is filled or poisoned.
    pub async fn wait(&self) -> Result<Attributes, String> {
        let mut rx = self.tx.subscribe();
        let state = rx
            .wait_for(|state| !matches!(state, CellState::Empty))
            .await
            .map_err(|_| "output cell dropped before resolution".to_string())?;
        match &*state {
            CellState::Ready(attrs) => Ok(attrs.clone()),
            CellState::Poisoned(reason) => Err(reason.clone()),
            CellState::Empty => unreachable!("wait_for admits non-empty states only"),
        }
    }
}

impl Default for OutputCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-graph table of output cells, indexed by node id.
///
/// The table is the only structure mutated concurrently during apply:
/// single write per cell, any number of readers.
pub struct ResolutionTable {
    cells: Vec<OutputCell>,
    names: Vec<String>,
}

impl ResolutionTable {
    /// Create a table with one empty cell per node.
    pub fn new(names: Vec<String>) -> Self {
        let cells = (0..names.len()).map(|_| OutputCell::new()).collect();
        Self { cells, names }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn node_name(&self, node: NodeId) -> &str {
        self.names
            .get(node.index())
            .map(String::as_str)
            .unwrap_or("<unknown>")
    }

    fn cell(&self, node: NodeId) -> GraphResult<&OutputCell> {
        self.cells
            .get(node.index())
            .ok_or(GraphError::UnknownNode(node.index()))
    }

    /// Publish a node's attributes.
    pub fn fill(&self, node: NodeId, attributes: Attributes) -> GraphResult<()> {
        self.cell(node)?.fill(attributes);
        Ok(())
    }

    /// Mark a node as never resolvable.
    pub fn poison(&self, node: NodeId, reason: impl Into<String>) -> GraphResult<()> {
        self.cell(node)?.poison(reason);
        Ok(())
    }

    /// Resolve a reference, suspending until the node reaches a terminal
    /// state. Resolution is memoized: repeat calls return the cached value.
    pub async fn resolve(&self, reference: &OutputReference) -> GraphResult<Value> {
        let attrs = self
            .cell(reference.node)?
            .wait()
            .await
            .map_err(|reason| GraphError::UnresolvedReference {
                node: self.node_name(reference.node).to_string(),
                attribute: reference.attribute.clone(),
                reason,
            })?;
        self.pick_attribute(reference, &attrs)
    }

    /// Resolve a reference whose node is already terminal.
    pub fn try_resolve(&self, reference: &OutputReference) -> GraphResult<Value> {
        let state = self.cell(reference.node)?.try_get().ok_or_else(|| {
            GraphError::UnresolvedReference {
                node: self.node_name(reference.node).to_string(),
                attribute: reference.attribute.clone(),
                reason: "resource has not been provisioned yet".to_string(),
            }
        })?;
        let attrs = state.map_err(|reason| GraphError::UnresolvedReference {
            node: self.node_name(reference.node).to_string(),
            attribute: reference.attribute.clone(),
            reason,
        })?;
        self.pick_attribute(reference, &attrs)
    }

    fn pick_attribute(&self, reference: &OutputReference, attrs: &Attributes) -> GraphResult<Value> {
        attrs
            .get(&reference.attribute)
            .cloned()
            .ok_or_else(|| GraphError::UnresolvedReference {
                node: self.node_name(reference.node).to_string(),
                attribute: reference.attribute.clone(),
                reason: "attribute not present on provisioned resource".to_string(),
            })
    }

    /// Resolve a full property value against terminal nodes.
    pub fn try_resolve_value(&self, value: &PropertyValue) -> GraphResult<Value> {
        match value {
            PropertyValue::Literal(v) => Ok(v.clone()),
            PropertyValue::Reference(r) => self.try_resolve(r),
            PropertyValue::Template(parts) => {
                let mut rendered = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Literal(text) => rendered.push_str(text),
                        TemplatePart::Reference(r) => {
                            rendered.push_str(&render_fragment(&self.try_resolve(r)?));
                        }
                    }
                }
                Ok(Value::String(rendered))
            }
            PropertyValue::Object(entries) => {
                let mut map = serde_json::Map::new();
                for (key, nested) in entries {
                    map.insert(key.clone(), self.try_resolve_value(nested)?);
                }
                Ok(Value::Object(map))
            }
            PropertyValue::Array(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for nested in elements {
                    items.push(self.try_resolve_value(nested)?);
                }
                Ok(Value::Array(items))
            }
        }
    }

    /// Resolve a whole property bag into provider-ready properties.
    pub fn try_resolve_bag(&self, bag: &PropertyBag) -> GraphResult<ResolvedProperties> {
        let mut resolved = ResolvedProperties::new();
        for (key, value) in bag.iter() {
            resolved.insert(key.clone(), self.try_resolve_value(value)?);
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn attrs(pairs: &[(&str, Value)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_resolve_suspends_until_fill() {
        let table = Arc::new(ResolutionTable::new(vec!["group".to_string()]));
        let reference = OutputReference::new(NodeId::new(0), "name");

        let waiter = {
            let table = table.clone();
            let reference = reference.clone();
            tokio::spawn(async move { table.resolve(&reference).await })
        };

        // The waiter cannot complete before the fill.
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        table
            .fill(NodeId::new(0), attrs(&[("name", json!("rg-a"))]))
            .unwrap();

        assert_eq!(waiter.await.unwrap().unwrap(), json!("rg-a"));
    }

    #[tokio::test]
    async fn test_resolution_is_memoized() {
        let table = ResolutionTable::new(vec!["group".to_string()]);
        table
            .fill(NodeId::new(0), attrs(&[("id", json!("abc-123"))]))
            .unwrap();

        let reference = OutputReference::new(NodeId::new(0), "id");
        let first = table.resolve(&reference).await.unwrap();
        let second = table.resolve(&reference).await.unwrap();
        assert_eq!(first, second);

        // A second fill does not overwrite the published value.
        table
            .fill(NodeId::new(0), attrs(&[("id", json!("other"))]))
            .unwrap();
        assert_eq!(table.resolve(&reference).await.unwrap(), json!("abc-123"));
    }

    #[tokio::test]
    async fn test_poisoned_cell_fails_resolution() {
        let table = ResolutionTable::new(vec!["vm".to_string()]);
        table.poison(NodeId::new(0), "ancestor failed").unwrap();

        let reference = OutputReference::new(NodeId::new(0), "name");
        let err = table.resolve(&reference).await.unwrap_err();
        match err {
            GraphError::UnresolvedReference { node, reason, .. } => {
                assert_eq!(node, "vm");
                assert_eq!(reason, "ancestor failed");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_try_resolve_missing_attribute() {
        let table = ResolutionTable::new(vec!["group".to_string()]);
        table.fill(NodeId::new(0), Attributes::new()).unwrap();

        let reference = OutputReference::new(NodeId::new(0), "name");
        let err = table.try_resolve(&reference).unwrap_err();
        assert!(matches!(err, GraphError::UnresolvedReference { .. }));
    }

    #[test]
    fn test_try_resolve_template() {
        let table = ResolutionTable::new(vec!["suffix".to_string()]);
        table
            .fill(NodeId::new(0), attrs(&[("hex", json!("c0de"))]))
            .unwrap();

        let value = crate::value::Template::new()
            .text("rg-iot-")
            .output(OutputReference::new(NodeId::new(0), "hex"))
            .text("-dev")
            .build();

        assert_eq!(
            table.try_resolve_value(&value).unwrap(),
            json!("rg-iot-c0de-dev")
        );
    }
}
