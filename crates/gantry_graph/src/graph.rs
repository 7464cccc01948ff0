//! Resource graph builder and frozen form.
//!
//! Building and applying are type-distinct phases: a [`ResourceGraph`] is
//! mutable pure data, and only a validated [`FrozenGraph`] can be handed to
//! the engine. Freezing runs structural validation (unknown references,
//! dependency cycles) so the executor never sees an invalid graph.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{GraphError, GraphResult};
use crate::node::{NodeId, ResourceNode};
use crate::reference::{OutputReference, ResolutionTable};
use crate::value::{PropertyBag, PropertyValue};

/// Lightweight handle to a declared resource, used to reference its outputs.
#[derive(Debug, Clone)]
pub struct ResourceHandle {
    id: NodeId,
    name: String,
}

impl ResourceHandle {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create a deferred reference to one of this resource's attributes.
    pub fn output(&self, attribute: impl Into<String>) -> OutputReference {
        OutputReference::new(self.id, attribute)
    }
}

/// A named output of the whole stack.
#[derive(Debug, Clone)]
pub struct Export {
    pub name: String,
    pub value: PropertyValue,
}

/// Mutable builder for a stack's resource graph.
#[derive(Debug)]
pub struct ResourceGraph {
    stack: String,
    nodes: Vec<ResourceNode>,
    index: HashMap<String, NodeId>,
    exports: Vec<Export>,
}

impl ResourceGraph {
    /// Create an empty graph for the given stack name.
    pub fn new(stack: impl Into<String>) -> Self {
        Self {
            stack: stack.into(),
            nodes: Vec::new(),
            index: HashMap::new(),
            exports: Vec::new(),
        }
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Declare a resource. No provider call happens here; the node is only
    /// appended to the in-memory graph.
    ///
    /// Fails with [`GraphError::DuplicateName`] if the logical name is
    /// already taken within this graph.
    pub fn declare(
        &mut self,
        resource_type: impl Into<String>,
        name: impl Into<String>,
        properties: PropertyBag,
    ) -> GraphResult<ResourceHandle> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(GraphError::DuplicateName(name));
        }

        let id = NodeId::new(self.nodes.len());
        let resource_type = resource_type.into();
        debug!("Declaring resource {} ({})", name, resource_type);

        self.nodes.push(ResourceNode {
            id,
            resource_type,
            name: name.clone(),
            properties,
            explicit_deps: Vec::new(),
        });
        self.index.insert(name.clone(), id);
        Ok(ResourceHandle { id, name })
    }

    /// Add an explicit dependency edge beyond those implied by references,
    /// for resources that must wait on another without consuming its outputs.
    pub fn depends_on(
        &mut self,
        node: &ResourceHandle,
        dependency: &ResourceHandle,
    ) -> GraphResult<()> {
        let entry = self
            .nodes
            .get_mut(node.id.index())
            .ok_or(GraphError::UnknownNode(node.id.index()))?;
        if !entry.explicit_deps.contains(&dependency.id) {
            entry.explicit_deps.push(dependency.id);
        }
        Ok(())
    }

    /// Register a named output of the stack.
    pub fn export(
        &mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> GraphResult<()> {
        let name = name.into();
        if self.exports.iter().any(|e| e.name == name) {
            return Err(GraphError::DuplicateExport(name));
        }
        self.exports.push(Export {
            name,
            value: value.into(),
        });
        Ok(())
    }

    /// Look up a declared node by logical name.
    pub fn get(&self, name: &str) -> Option<&ResourceNode> {
        self.index.get(name).map(|id| &self.nodes[id.index()])
    }

    /// Dependencies of a node: referenced nodes plus explicit edges, deduped.
    fn dependencies_of(&self, node: &ResourceNode) -> Vec<NodeId> {
        let mut deps: Vec<NodeId> = node
            .properties
            .collect_references()
            .into_iter()
            .map(|r| r.node)
            .chain(node.explicit_deps.iter().copied())
            .collect();
        deps.sort();
        deps.dedup();
        deps
    }

    /// Structural validation: every reference targets a declared node and
    /// the dependency edges form no cycle.
    pub fn validate(&self) -> GraphResult<()> {
        let n = self.nodes.len();
        for node in &self.nodes {
            for reference in node.properties.collect_references() {
                if reference.node.index() >= n {
                    return Err(GraphError::UnknownNode(reference.node.index()));
                }
            }
            for dep in &node.explicit_deps {
                if dep.index() >= n {
                    return Err(GraphError::UnknownNode(dep.index()));
                }
            }
        }
        for export in &self.exports {
            let mut refs = Vec::new();
            export.value.collect_references(&mut refs);
            for reference in refs {
                if reference.node.index() >= n {
                    return Err(GraphError::UnknownNode(reference.node.index()));
                }
            }
        }

        let deps: Vec<Vec<NodeId>> = self
            .nodes
            .iter()
            .map(|node| self.dependencies_of(node))
            .collect();
        if let Some(cycle) = find_cycle(&deps) {
            let cycle = cycle
                .into_iter()
                .map(|id| self.nodes[id.index()].name.clone())
                .collect();
            return Err(GraphError::CyclicDependency { cycle });
        }
        Ok(())
    }

    /// Validate and freeze the graph for an apply pass. The frozen graph is
    /// immutable; no declaration can happen once planning starts.
    pub fn freeze(self) -> GraphResult<FrozenGraph> {
        self.validate()?;

        let n = self.nodes.len();
        let dependencies: Vec<Vec<NodeId>> = self
            .nodes
            .iter()
            .map(|node| self.dependencies_of(node))
            .collect();
        let mut dependents: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        for (idx, deps) in dependencies.iter().enumerate() {
            for dep in deps {
                dependents[dep.index()].push(NodeId::new(idx));
            }
        }

        debug!(
            "Froze graph '{}' with {} nodes and {} exports",
            self.stack,
            n,
            self.exports.len()
        );

        Ok(FrozenGraph {
            stack: self.stack,
            nodes: self.nodes,
            dependencies,
            dependents,
            exports: self.exports,
        })
    }
}

/// Immutable, validated resource graph ready for planning and apply.
///
/// Read-only during the parallel execution phase; the only concurrently
/// mutated companion structure is the [`ResolutionTable`].
pub struct FrozenGraph {
    stack: String,
    nodes: Vec<ResourceNode>,
    dependencies: Vec<Vec<NodeId>>,
    dependents: Vec<Vec<NodeId>>,
    exports: Vec<Export>,
}

impl FrozenGraph {
    pub fn stack(&self) -> &str {
        &self.stack
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &ResourceNode {
        &self.nodes[id.index()]
    }

    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    pub fn dependencies(&self, id: NodeId) -> &[NodeId] {
        &self.dependencies[id.index()]
    }

    pub fn dependents(&self, id: NodeId) -> &[NodeId] {
        &self.dependents[id.index()]
    }

    pub fn exports(&self) -> &[Export] {
        &self.exports
    }

    /// A fresh resolution table with one empty cell per node.
    pub fn resolution_table(&self) -> ResolutionTable {
        ResolutionTable::new(self.nodes.iter().map(|n| n.name.clone()).collect())
    }

    /// Parents-first ordering. Valid because freezing rejected cycles.
    pub fn topological_order(&self) -> Vec<NodeId> {
        let n = self.nodes.len();
        let mut remaining: Vec<usize> = self.dependencies.iter().map(Vec::len).collect();
        let mut queue: Vec<NodeId> = (0..n)
            .filter(|i| remaining[*i] == 0)
            .map(NodeId::new)
            .collect();
        let mut order = Vec::with_capacity(n);
        let mut head = 0;
        while head < queue.len() {
            let id = queue[head];
            head += 1;
            order.push(id);
            for dependent in &self.dependents[id.index()] {
                remaining[dependent.index()] -= 1;
                if remaining[dependent.index()] == 0 {
                    queue.push(*dependent);
                }
            }
        }
        order
    }
}

/// Depth-first cycle search over dependency edges. Returns the cycle path
/// (first node repeated at the end) if one exists.
fn find_cycle(deps: &[Vec<NodeId>]) -> Option<Vec<NodeId>> {
    const WHITE: u8 = 0;
    const GRAY: u8 = 1;
    const BLACK: u8 = 2;

    let n = deps.len();
    let mut color = vec![WHITE; n];

    for start in 0..n {
        if color[start] != WHITE {
            continue;
        }
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        color[start] = GRAY;

        while let Some(frame) = stack.last_mut() {
            let (node, next_idx) = (frame.0, frame.1);
            if next_idx < deps[node].len() {
                frame.1 += 1;
                let next = deps[node][next_idx].index();
                match color[next] {
                    WHITE => {
                        color[next] = GRAY;
                        stack.push((next, 0));
                    }
                    GRAY => {
                        let pos = stack
                            .iter()
                            .position(|(id, _)| *id == next)
                            .expect("gray node must be on the stack");
                        let mut cycle: Vec<NodeId> = stack[pos..]
                            .iter()
                            .map(|(id, _)| NodeId::new(*id))
                            .collect();
                        cycle.push(NodeId::new(next));
                        return Some(cycle);
                    }
                    _ => {}
                }
            } else {
                color[node] = BLACK;
                stack.pop();
            }
        }
    }
    None
}
