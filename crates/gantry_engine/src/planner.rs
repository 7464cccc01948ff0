//! Diff-based planning.
//!
//! The planner compares desired resources against the prior snapshot to
//! decide, per node, whether an apply would create, update or skip it.
//! Unchanged nodes issue no provider call at apply time (idempotent apply).

use gantry_graph::{
    FrozenGraph, NodeId, PropertyValue, ResolvedProperties, TemplatePart,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::{ResourceRecord, StackState};

/// Planned action for a single resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Unchanged,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Unchanged => "unchanged",
        };
        write!(f, "{}", s)
    }
}

/// Decide the action for one resource by structural comparison of the
/// resolved property bag against the prior record.
pub fn diff_action(
    prior: Option<&ResourceRecord>,
    resource_type: &str,
    desired: &ResolvedProperties,
) -> Action {
    match prior {
        None => Action::Create,
        Some(record) if record.resource_type != resource_type => Action::Update,
        Some(record) if &record.properties == desired => Action::Unchanged,
        Some(_) => Action::Update,
    }
}

/// One step of a previewed plan, in apply order.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedStep {
    pub name: String,
    pub resource_type: String,
    pub action: Action,
}

/// Preview of what an apply would do.
#[derive(Debug, Clone, Serialize)]
pub struct StackPlan {
    pub stack: String,
    pub steps: Vec<PlannedStep>,
}

impl StackPlan {
    pub fn count(&self, action: Action) -> usize {
        self.steps.iter().filter(|s| s.action == action).count()
    }
}

/// Placeholder for attribute values not known before provisioning.
pub const COMPUTED: &str = "<computed>";

/// Build a plan without touching the provider.
///
/// References are resolved against prior-state attributes where the
/// referenced resource already exists; anything else renders as
/// [`COMPUTED`], which conservatively shows as a change.
pub fn preview(graph: &FrozenGraph, prior: Option<&StackState>) -> StackPlan {
    let lookup = |node: NodeId, attribute: &str| -> Option<Value> {
        let name = &graph.node(node).name;
        prior
            .and_then(|state| state.resources.get(name))
            .and_then(|record| record.attributes.get(attribute))
            .cloned()
    };

    let mut steps = Vec::with_capacity(graph.len());
    for id in graph.topological_order() {
        let node = graph.node(id);
        let mut desired = ResolvedProperties::new();
        for (key, value) in node.properties.iter() {
            desired.insert(key.clone(), resolve_lenient(value, &lookup));
        }

        let record = prior.and_then(|state| state.resources.get(&node.name));
        steps.push(PlannedStep {
            name: node.name.clone(),
            resource_type: node.resource_type.clone(),
            action: diff_action(record, &node.resource_type, &desired),
        });
    }

    StackPlan {
        stack: graph.stack().to_string(),
        steps,
    }
}

fn resolve_lenient(
    value: &PropertyValue,
    lookup: &dyn Fn(NodeId, &str) -> Option<Value>,
) -> Value {
    match value {
        PropertyValue::Literal(v) => v.clone(),
        PropertyValue::Reference(r) => {
            lookup(r.node, &r.attribute).unwrap_or_else(|| Value::String(COMPUTED.to_string()))
        }
        PropertyValue::Template(parts) => {
            let mut rendered = String::new();
            for part in parts {
                match part {
                    TemplatePart::Literal(text) => rendered.push_str(text),
                    TemplatePart::Reference(r) => match lookup(r.node, &r.attribute) {
                        Some(Value::String(s)) => rendered.push_str(&s),
                        Some(other) => rendered.push_str(&other.to_string()),
                        None => rendered.push_str(COMPUTED),
                    },
                }
            }
            Value::String(rendered)
        }
        PropertyValue::Object(entries) => {
            let mut map = serde_json::Map::new();
            for (key, nested) in entries {
                map.insert(key.clone(), resolve_lenient(nested, lookup));
            }
            Value::Object(map)
        }
        PropertyValue::Array(elements) => Value::Array(
            elements
                .iter()
                .map(|nested| resolve_lenient(nested, lookup))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_graph::{PropertyBag, ResourceGraph};
    use serde_json::json;

    fn record(resource_type: &str, properties: &[(&str, Value)]) -> ResourceRecord {
        ResourceRecord {
            resource_type: resource_type.to_string(),
            properties: properties
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            attributes: ResolvedProperties::new(),
        }
    }

    #[test]
    fn test_diff_action_create_update_unchanged() {
        let desired: ResolvedProperties =
            [("location".to_string(), json!("westeurope"))].into_iter().collect();

        assert_eq!(
            diff_action(None, "azure:resources:ResourceGroup", &desired),
            Action::Create
        );

        let same = record(
            "azure:resources:ResourceGroup",
            &[("location", json!("westeurope"))],
        );
        assert_eq!(
            diff_action(Some(&same), "azure:resources:ResourceGroup", &desired),
            Action::Unchanged
        );

        let moved = record(
            "azure:resources:ResourceGroup",
            &[("location", json!("northeurope"))],
        );
        assert_eq!(
            diff_action(Some(&moved), "azure:resources:ResourceGroup", &desired),
            Action::Update
        );

        let retyped = record("azure:storage:StorageAccount", &[("location", json!("westeurope"))]);
        assert_eq!(
            diff_action(Some(&retyped), "azure:resources:ResourceGroup", &desired),
            Action::Update
        );
    }

    #[test]
    fn test_preview_on_fresh_stack_is_all_create() {
        let mut graph = ResourceGraph::new("demo");
        let group = graph
            .declare(
                "azure:resources:ResourceGroup",
                "rg",
                PropertyBag::new().set("location", "westeurope"),
            )
            .unwrap();
        graph
            .declare(
                "azure:storage:StorageAccount",
                "storage",
                PropertyBag::new().set("resourceGroupName", group.output("name")),
            )
            .unwrap();
        let frozen = graph.freeze().unwrap();

        let plan = preview(&frozen, None);
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.count(Action::Create), 2);
        // Apply order: group before the account that references it.
        assert_eq!(plan.steps[0].name, "rg");
    }

    #[test]
    fn test_preview_unchanged_against_prior_state() {
        let mut graph = ResourceGraph::new("demo");
        graph
            .declare(
                "azure:resources:ResourceGroup",
                "rg",
                PropertyBag::new().set("location", "westeurope"),
            )
            .unwrap();
        let frozen = graph.freeze().unwrap();

        let mut state = StackState::new("demo");
        state.resources.insert(
            "rg".to_string(),
            record(
                "azure:resources:ResourceGroup",
                &[("location", json!("westeurope"))],
            ),
        );

        let plan = preview(&frozen, Some(&state));
        assert_eq!(plan.count(Action::Unchanged), 1);
    }

    #[test]
    fn test_preview_unknown_reference_is_computed() {
        let mut graph = ResourceGraph::new("demo");
        let group = graph
            .declare("azure:resources:ResourceGroup", "rg", PropertyBag::new())
            .unwrap();
        graph
            .declare(
                "azure:storage:StorageAccount",
                "storage",
                PropertyBag::new().set("resourceGroupName", group.output("name")),
            )
            .unwrap();
        let frozen = graph.freeze().unwrap();

        let plan = preview(&frozen, None);
        let storage = plan.steps.iter().find(|s| s.name == "storage").unwrap();
        assert_eq!(storage.action, Action::Create);
    }
}
