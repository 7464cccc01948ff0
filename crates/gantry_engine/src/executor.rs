//! Parallel apply of a frozen resource graph.
//!
//! The executor topologically schedules nodes with maximal parallelism:
//! a node starts only once every node it references is terminal, and
//! siblings without a mutual dependency run concurrently. Provider failures
//! do not abort the run; they block the failed node's descendants while
//! independent subtrees continue.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use gantry_graph::{
    Attributes, FrozenGraph, NodeId, ResolutionTable, ResolvedProperties, ResourceState,
};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::planner::{diff_action, Action};
use crate::provider::{Provider, ProvisionRequest};
use crate::state::{OutputValue, ResourceRecord, StackState, StateStore};

/// Cooperative cancellation flag for a run.
///
/// Cancelling stops new provisioning calls from being issued; calls already
/// in flight run to completion so no resource is left half-created.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome for a single node after an apply.
#[derive(Debug, Clone, Serialize)]
pub struct NodeOutcome {
    pub name: String,
    pub resource_type: String,
    pub state: ResourceState,
    /// Action taken, for nodes that were scheduled.
    pub action: Option<Action>,
    /// Failure or blocking message, if any.
    pub error: Option<String>,
}

/// Overall status of an apply run.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApplyStatus {
    /// Every node reached `Provisioned`.
    Succeeded,
    /// At least one node failed while independent subtrees completed.
    PartiallyFailed,
    /// Nodes failed and nothing was provisioned.
    Failed,
    /// The run was cancelled before completion, with no failures.
    Cancelled,
}

/// Result of applying a frozen graph.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyResult {
    pub run_id: Uuid,
    pub stack: String,
    pub status: ApplyStatus,
    /// Per-node outcomes in declaration order.
    pub nodes: Vec<NodeOutcome>,
    /// Stack outputs; unresolvable exports are marked `Unavailable`.
    pub outputs: std::collections::BTreeMap<String, OutputValue>,
}

impl ApplyResult {
    fn count_state(&self, state: ResourceState) -> usize {
        self.nodes.iter().filter(|n| n.state == state).count()
    }

    pub fn provisioned(&self) -> usize {
        self.count_state(ResourceState::Provisioned)
    }

    pub fn failed(&self) -> usize {
        self.count_state(ResourceState::Failed)
    }

    pub fn blocked(&self) -> usize {
        self.count_state(ResourceState::Blocked)
    }

    pub fn unchanged(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.action == Some(Action::Unchanged))
            .count()
    }
}

/// What a provisioning task reports back to the scheduler.
struct TaskOutput {
    node: usize,
    outcome: Result<(Action, ResolvedProperties, Attributes), String>,
}

/// Graph executor: plans each node against prior state and provisions it
/// through the provider collaborator.
pub struct Executor {
    provider: Arc<dyn Provider>,
    store: Arc<dyn StateStore>,
    cancel: CancelFlag,
}

impl Executor {
    pub fn new(provider: Arc<dyn Provider>, store: Arc<dyn StateStore>) -> Self {
        Self {
            provider,
            store,
            cancel: CancelFlag::new(),
        }
    }

    /// Handle for cancelling this executor's runs.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Apply the graph: provision every node or mark it failed/blocked,
    /// persist posterior state, and collect outputs.
    pub async fn apply(&self, graph: &FrozenGraph) -> EngineResult<ApplyResult> {
        let run_id = Uuid::new_v4();
        info!(
            "Applying stack '{}' ({} resources, run {})",
            graph.stack(),
            graph.len(),
            run_id
        );

        let prior = self.store.load_prior_state(graph.stack()).await?;
        let prior_resources: HashMap<String, ResourceRecord> = prior
            .as_ref()
            .map(|s| s.resources.clone())
            .unwrap_or_default();

        let n = graph.len();
        let table = Arc::new(graph.resolution_table());
        let mut states = vec![ResourceState::Pending; n];
        let mut actions: Vec<Option<Action>> = vec![None; n];
        let mut errors: Vec<Option<String>> = vec![None; n];
        let mut new_records: HashMap<String, ResourceRecord> = HashMap::new();

        let mut remaining: Vec<usize> = (0..n)
            .map(|i| graph.dependencies(NodeId::new(i)).len())
            .collect();
        let mut ready: VecDeque<usize> = (0..n).filter(|i| remaining[*i] == 0).collect();
        let mut join: JoinSet<TaskOutput> = JoinSet::new();

        loop {
            if !self.cancel.is_cancelled() {
                while let Some(id) = ready.pop_front() {
                    states[id] = ResourceState::Provisioning;
                    self.spawn_node(&mut join, graph, &table, &prior_resources, id);
                }
            }

            let Some(joined) = join.join_next().await else {
                break;
            };
            let TaskOutput { node, outcome } = joined
                .map_err(|e| EngineError::Internal(format!("provisioning task panicked: {e}")))?;
            let name = graph.node(NodeId::new(node)).name.clone();

            match outcome {
                Ok((action, resolved, attributes)) => {
                    debug!("Resource '{}' provisioned ({})", name, action);
                    states[node] = ResourceState::Provisioned;
                    actions[node] = Some(action);
                    new_records.insert(
                        name,
                        ResourceRecord {
                            resource_type: graph.node(NodeId::new(node)).resource_type.clone(),
                            properties: resolved,
                            attributes: attributes.clone(),
                        },
                    );
                    table.fill(NodeId::new(node), attributes)?;

                    for dependent in graph.dependents(NodeId::new(node)) {
                        let d = dependent.index();
                        if states[d] == ResourceState::Pending {
                            remaining[d] -= 1;
                            if remaining[d] == 0 {
                                ready.push_back(d);
                            }
                        }
                    }
                }
                Err(message) => {
                    error!("Resource '{}' failed: {}", name, message);
                    states[node] = ResourceState::Failed;
                    errors[node] = Some(message.clone());
                    table.poison(
                        NodeId::new(node),
                        format!("resource '{}' failed: {}", name, message),
                    )?;
                    self.block_descendants(
                        graph,
                        &table,
                        &mut states,
                        &mut errors,
                        node,
                        &name,
                    )?;
                }
            }
        }

        let outputs: std::collections::BTreeMap<String, OutputValue> = graph
            .exports()
            .iter()
            .map(|export| {
                let value = match table.try_resolve_value(&export.value) {
                    Ok(v) => OutputValue::Resolved(v),
                    Err(_) => OutputValue::Unavailable,
                };
                (export.name.clone(), value)
            })
            .collect();

        let mut posterior = prior.unwrap_or_else(|| StackState::new(graph.stack()));
        posterior.run_id = run_id;
        posterior.updated_at = Utc::now();
        for (name, record) in new_records {
            posterior.resources.insert(name, record);
        }
        posterior.outputs = outputs.clone();
        self.store.save_posterior_state(&posterior).await?;

        let nodes: Vec<NodeOutcome> = (0..n)
            .map(|i| {
                let node = graph.node(NodeId::new(i));
                NodeOutcome {
                    name: node.name.clone(),
                    resource_type: node.resource_type.clone(),
                    state: states[i],
                    action: actions[i],
                    error: errors[i].clone(),
                }
            })
            .collect();

        let result = ApplyResult {
            run_id,
            stack: graph.stack().to_string(),
            status: overall_status(&states),
            nodes,
            outputs,
        };

        info!(
            "Apply of '{}' finished: {:?} ({} provisioned, {} failed, {} blocked)",
            result.stack,
            result.status,
            result.provisioned(),
            result.failed(),
            result.blocked()
        );
        Ok(result)
    }

    fn spawn_node(
        &self,
        join: &mut JoinSet<TaskOutput>,
        graph: &FrozenGraph,
        table: &Arc<ResolutionTable>,
        prior_resources: &HashMap<String, ResourceRecord>,
        id: usize,
    ) {
        let spec = graph.node(NodeId::new(id)).clone();
        let prior_record = prior_resources.get(&spec.name).cloned();
        let provider = self.provider.clone();
        let table = table.clone();

        join.spawn(async move {
            // Parents are terminal by the scheduling invariant, so bag
            // resolution never suspends here.
            let resolved = match table.try_resolve_bag(&spec.properties) {
                Ok(resolved) => resolved,
                Err(e) => {
                    return TaskOutput {
                        node: id,
                        outcome: Err(e.to_string()),
                    }
                }
            };

            let action = diff_action(prior_record.as_ref(), &spec.resource_type, &resolved);
            if action == Action::Unchanged {
                let attributes = prior_record
                    .map(|r| r.attributes)
                    .unwrap_or_default();
                debug!("Resource '{}' unchanged, skipping provider call", spec.name);
                return TaskOutput {
                    node: id,
                    outcome: Ok((action, resolved, attributes)),
                };
            }

            let request = ProvisionRequest::new(&spec.resource_type, &spec.name, resolved.clone());
            match provider.create_or_update(&request).await {
                Ok(attributes) => TaskOutput {
                    node: id,
                    outcome: Ok((action, resolved, attributes)),
                },
                Err(e) => TaskOutput {
                    node: id,
                    outcome: Err(e.to_string()),
                },
            }
        });
    }

    /// Mark every transitive dependent of a failed node as blocked.
    /// Blocked nodes are never attempted: no provider call is issued.
    fn block_descendants(
        &self,
        graph: &FrozenGraph,
        table: &Arc<ResolutionTable>,
        states: &mut [ResourceState],
        errors: &mut [Option<String>],
        failed: usize,
        failed_name: &str,
    ) -> EngineResult<()> {
        let mut stack: Vec<usize> = graph
            .dependents(NodeId::new(failed))
            .iter()
            .map(NodeId::index)
            .collect();

        while let Some(id) = stack.pop() {
            if states[id] != ResourceState::Pending {
                continue;
            }
            let name = graph.node(NodeId::new(id)).name.clone();
            let reason = EngineError::BlockedDependency {
                node: name.clone(),
                dependency: failed_name.to_string(),
            }
            .to_string();
            debug!("{}", reason);

            states[id] = ResourceState::Blocked;
            errors[id] = Some(reason.clone());
            table.poison(NodeId::new(id), reason)?;
            stack.extend(
                graph
                    .dependents(NodeId::new(id))
                    .iter()
                    .map(NodeId::index),
            );
        }
        Ok(())
    }
}

fn overall_status(states: &[ResourceState]) -> ApplyStatus {
    let provisioned = states
        .iter()
        .filter(|s| **s == ResourceState::Provisioned)
        .count();
    let failed = states.iter().filter(|s| **s == ResourceState::Failed).count();
    let blocked = states.iter().filter(|s| **s == ResourceState::Blocked).count();
    let unfinished = states.len() - provisioned - failed - blocked;

    if failed == 0 && blocked == 0 && unfinished == 0 {
        ApplyStatus::Succeeded
    } else if failed == 0 && blocked == 0 {
        ApplyStatus::Cancelled
    } else if provisioned > 0 {
        ApplyStatus::PartiallyFailed
    } else {
        ApplyStatus::Failed
    }
}
