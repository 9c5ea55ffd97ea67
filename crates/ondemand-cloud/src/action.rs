//! Plan summaries for a resource graph

use crate::error::Result;
use crate::graph::{Lifecycle, RemovalPolicy, ResourceGraph};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One planned step for a node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier for the action
    pub id: String,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Resource type (e.g., "AWS::EFS::FileSystem")
    pub resource_type: String,

    /// Logical ID of the node
    pub resource_id: String,

    /// Description of the action
    pub description: String,

    /// Additional details about the action
    pub details: HashMap<String, serde_json::Value>,
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create (or update) a managed node
    Create,
    /// Resolve an existing resource by identifier
    Lookup,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Lookup => write!(f, "lookup"),
        }
    }
}

/// Plan containing one action per node, in apply order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// List of actions to perform
    pub actions: Vec<Action>,

    /// Whether the plan creates anything
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type == ActionType::Create);
        Self {
            actions,
            has_changes,
        }
    }

    /// Build the plan for a graph
    pub fn from_graph(graph: &ResourceGraph) -> Result<Self> {
        let mut actions = Vec::new();

        for resource in graph.ordered()? {
            let id = resource.logical_id();
            let mut details: HashMap<String, serde_json::Value> = HashMap::new();

            let dependencies = resource.dependencies();
            if !dependencies.is_empty() {
                details.insert("depends_on".to_string(), serde_json::json!(dependencies));
            }

            let (action_type, description) = match resource.lifecycle() {
                Lifecycle::Managed(policy) => {
                    details.insert(
                        "removal_policy".to_string(),
                        serde_json::json!(policy.to_string()),
                    );
                    (ActionType::Create, format!("Create {}", id))
                }
                Lifecycle::Imported => (ActionType::Lookup, format!("Look up existing {}", id)),
            };

            actions.push(Action {
                id: format!("{}-{}", action_type, id),
                action_type,
                resource_type: resource.resource_type().to_string(),
                resource_id: id.to_string(),
                description,
                details,
            });
        }

        Ok(Self::new(actions))
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        let retained = self
            .actions
            .iter()
            .filter(|a| {
                a.details
                    .get("removal_policy")
                    .and_then(|v| v.as_str())
                    .is_some_and(|policy| policy == RemovalPolicy::Retain.to_string())
            })
            .count();

        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            lookup: self.actions_by_type(ActionType::Lookup).len(),
            retained,
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub lookup: usize,
    /// Managed nodes kept when the topology is deleted
    pub retained: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to look up, {} retained on delete",
            self.create, self.lookup, self.retained
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Resource, Token};
    use serde_json::json;

    #[test]
    fn test_plan_from_graph() {
        let mut graph = ResourceGraph::new("test");
        graph
            .add(Resource::imported("Vpc", "AWS::EC2::VPC", json!({"VpcId": "vpc-1"})))
            .unwrap();
        graph
            .add(
                Resource::new(
                    "FileSystem",
                    "AWS::EFS::FileSystem",
                    json!({"VpcId": Token::reference("Vpc")}),
                )
                .with_removal_policy(RemovalPolicy::Retain),
            )
            .unwrap();
        graph
            .add(Resource::new("Cluster", "AWS::ECS::Cluster", json!({})))
            .unwrap();

        let plan = Plan::from_graph(&graph).unwrap();
        assert!(plan.has_changes);
        assert_eq!(plan.actions.len(), 3);
        assert_eq!(plan.actions_by_type(ActionType::Lookup)[0].resource_id, "Vpc");

        let summary = plan.summary();
        assert_eq!(
            summary,
            PlanSummary {
                create: 2,
                lookup: 1,
                retained: 1
            }
        );
        assert_eq!(
            summary.to_string(),
            "2 to create, 1 to look up, 1 retained on delete"
        );
    }

    #[test]
    fn test_empty_plan() {
        let plan = Plan::from_graph(&ResourceGraph::new("empty")).unwrap();
        assert!(!plan.has_changes);
        assert_eq!(plan.summary().create, 0);
    }
}
