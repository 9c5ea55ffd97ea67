//! Declarative resource graph
//!
//! A [`ResourceGraph`] holds the nodes of one topology together with their
//! dependency edges. Edges are either declared explicitly with
//! [`ResourceGraph::add_dependency`] or implied by [`Token`]s embedded in a
//! node's properties. The graph renders to a JSON template for the
//! provisioning engine.

use crate::error::{CloudError, Result};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet, HashMap};

const REF: &str = "Ref";
const GET_ATT: &str = "Fn::GetAtt";
const JOIN: &str = "Fn::Join";
const SELECT: &str = "Fn::Select";
const SPLIT: &str = "Fn::Split";

/// Reference to another node's identity or one of its attributes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// The node's primary identifier (`{"Ref": id}`)
    Ref(String),
    /// A named attribute of the node (`{"Fn::GetAtt": [id, attr]}`)
    GetAtt(String, String),
}

impl Token {
    pub fn reference(logical_id: impl Into<String>) -> Self {
        Token::Ref(logical_id.into())
    }

    pub fn attribute(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Token::GetAtt(logical_id.into(), attribute.into())
    }

    /// Logical ID of the referenced node
    pub fn logical_id(&self) -> &str {
        match self {
            Token::Ref(id) | Token::GetAtt(id, _) => id,
        }
    }

    /// Attribute token on the same node
    pub fn attr(&self, attribute: impl Into<String>) -> Token {
        Token::GetAtt(self.logical_id().to_string(), attribute.into())
    }

    pub fn to_value(&self) -> Value {
        match self {
            Token::Ref(id) => json!({ REF: id }),
            Token::GetAtt(id, attr) => json!({ GET_ATT: [id, attr] }),
        }
    }
}

impl Serialize for Token {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl From<Token> for Value {
    fn from(token: Token) -> Self {
        token.to_value()
    }
}

impl From<&Token> for Value {
    fn from(token: &Token) -> Self {
        token.to_value()
    }
}

/// Concatenate literal strings and tokens (`{"Fn::Join": [sep, parts]}`)
pub fn join(separator: &str, parts: Vec<Value>) -> Value {
    json!({ JOIN: [separator, parts] })
}

/// The part of `source` that follows `delimiter`, resolved at apply time
/// (`{"Fn::Select": [1, {"Fn::Split": [delimiter, source]}]}`)
pub fn select_after(delimiter: &str, source: impl Into<Value>) -> Value {
    json!({ SELECT: [1, { SPLIT: [delimiter, source.into()] }] })
}

/// What happens to a managed node when the topology is torn down
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalPolicy {
    #[default]
    Delete,
    Retain,
}

impl std::fmt::Display for RemovalPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemovalPolicy::Delete => write!(f, "Delete"),
            RemovalPolicy::Retain => write!(f, "Retain"),
        }
    }
}

/// Lifecycle of a node within the topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle {
    /// Created and updated by the topology
    Managed(RemovalPolicy),
    /// Looked up by identifier; never created or destroyed by the topology
    Imported,
}

/// One node of the resource graph
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    logical_id: String,
    resource_type: String,
    properties: Map<String, Value>,
    depends_on: BTreeSet<String>,
    lifecycle: Lifecycle,
}

impl Resource {
    /// A managed node, deleted with the topology
    pub fn new(
        logical_id: impl Into<String>,
        resource_type: impl Into<String>,
        properties: Value,
    ) -> Self {
        Self::with_lifecycle(
            logical_id,
            resource_type,
            properties,
            Lifecycle::Managed(RemovalPolicy::Delete),
        )
    }

    /// A node that references an existing resource
    pub fn imported(
        logical_id: impl Into<String>,
        resource_type: impl Into<String>,
        properties: Value,
    ) -> Self {
        Self::with_lifecycle(logical_id, resource_type, properties, Lifecycle::Imported)
    }

    fn with_lifecycle(
        logical_id: impl Into<String>,
        resource_type: impl Into<String>,
        properties: Value,
        lifecycle: Lifecycle,
    ) -> Self {
        let properties = match properties {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("Value".to_string(), other);
                map
            }
        };
        Self {
            logical_id: logical_id.into(),
            resource_type: resource_type.into(),
            properties,
            depends_on: BTreeSet::new(),
            lifecycle,
        }
    }

    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        if let Lifecycle::Managed(_) = self.lifecycle {
            self.lifecycle = Lifecycle::Managed(policy);
        }
        self
    }

    pub fn with_dependency(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.insert(logical_id.into());
        self
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_imported(&self) -> bool {
        self.lifecycle == Lifecycle::Imported
    }

    /// Removal policy of a managed node; `None` for imported nodes
    pub fn removal_policy(&self) -> Option<RemovalPolicy> {
        match self.lifecycle {
            Lifecycle::Managed(policy) => Some(policy),
            Lifecycle::Imported => None,
        }
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Explicitly declared dependencies
    pub fn explicit_dependencies(&self) -> &BTreeSet<String> {
        &self.depends_on
    }

    /// Dependencies implied by tokens inside the properties
    pub fn implied_dependencies(&self) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        for value in self.properties.values() {
            collect_references(value, &mut found);
        }
        found.remove(&self.logical_id);
        found
    }

    /// All dependencies, explicit and implied
    pub fn dependencies(&self) -> BTreeSet<String> {
        let mut all = self.implied_dependencies();
        all.extend(self.depends_on.iter().cloned());
        all
    }

    fn render(&self) -> Value {
        let mut body = Map::new();
        body.insert("Type".to_string(), json!(self.resource_type));
        body.insert("Properties".to_string(), Value::Object(self.properties.clone()));
        if !self.depends_on.is_empty() {
            body.insert("DependsOn".to_string(), json!(self.depends_on));
        }
        if let Lifecycle::Managed(policy) = self.lifecycle {
            body.insert("DeletionPolicy".to_string(), json!(policy.to_string()));
        }
        Value::Object(body)
    }
}

fn collect_references(value: &Value, found: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(id)) = map.get(REF) {
                    found.insert(id.clone());
                    return;
                }
                if let Some(Value::Array(parts)) = map.get(GET_ATT) {
                    if let Some(Value::String(id)) = parts.first() {
                        found.insert(id.clone());
                        return;
                    }
                }
            }
            for nested in map.values() {
                collect_references(nested, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, found);
            }
        }
        _ => {}
    }
}

/// The full node set of one topology
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    description: String,
    resources: BTreeMap<String, Resource>,
    /// Insertion order, used as the tie-breaker for ordering
    insertion: Vec<String>,
}

impl ResourceGraph {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Add a node and return a reference token to it
    ///
    /// Logical IDs are unique within a graph.
    pub fn add(&mut self, resource: Resource) -> Result<Token> {
        let id = resource.logical_id.clone();
        if self.resources.contains_key(&id) {
            return Err(CloudError::DuplicateResource(id));
        }
        tracing::debug!(
            logical_id = %id,
            resource_type = %resource.resource_type,
            "Adding resource"
        );
        self.resources.insert(id.clone(), resource);
        self.insertion.push(id.clone());
        Ok(Token::Ref(id))
    }

    /// Declare that `logical_id` must be applied after `depends_on`
    pub fn add_dependency(&mut self, logical_id: &str, depends_on: &str) -> Result<()> {
        let resource = self
            .resources
            .get_mut(logical_id)
            .ok_or_else(|| CloudError::ResourceNotFound(logical_id.to_string()))?;
        resource.depends_on.insert(depends_on.to_string());
        Ok(())
    }

    pub fn get(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    pub fn contains(&self, logical_id: &str) -> bool {
        self.resources.contains_key(logical_id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Nodes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.insertion.iter().filter_map(|id| self.resources.get(id))
    }

    pub fn by_type(&self, resource_type: &str) -> Vec<&Resource> {
        self.iter()
            .filter(|r| r.resource_type == resource_type)
            .collect()
    }

    /// Nodes ordered so that every node follows its dependencies
    pub fn ordered(&self) -> Result<Vec<&Resource>> {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut index: HashMap<&str, NodeIndex> = HashMap::new();

        for id in &self.insertion {
            index.insert(id.as_str(), graph.add_node(id.as_str()));
        }

        for resource in self.iter() {
            let to = index[resource.logical_id.as_str()];
            for dependency in resource.dependencies() {
                let from = index.get(dependency.as_str()).copied().ok_or_else(|| {
                    CloudError::UnknownDependency {
                        resource: resource.logical_id.clone(),
                        dependency: dependency.clone(),
                    }
                })?;
                graph.add_edge(from, to, ());
            }
        }

        let sorted = toposort(&graph, None)
            .map_err(|cycle| CloudError::CircularDependency(graph[cycle.node_id()].to_string()))?;

        Ok(sorted
            .into_iter()
            .filter_map(|ix| self.resources.get(graph[ix]))
            .collect())
    }

    /// Render the template consumed by the provisioning engine
    pub fn render(&self) -> Result<Value> {
        let mut resources = Map::new();
        let mut imports = Map::new();

        for resource in self.ordered()? {
            let target = if resource.is_imported() {
                &mut imports
            } else {
                &mut resources
            };
            target.insert(resource.logical_id.clone(), resource.render());
        }

        let mut template = Map::new();
        template.insert("Description".to_string(), json!(self.description));
        template.insert("Resources".to_string(), Value::Object(resources));
        if !imports.is_empty() {
            template.insert("Imports".to_string(), Value::Object(imports));
        }
        Ok(Value::Object(template))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(order: &[&Resource], id: &str) -> usize {
        order.iter().position(|r| r.logical_id() == id).unwrap()
    }

    #[test]
    fn test_token_values() {
        assert_eq!(Token::reference("Bucket").to_value(), json!({"Ref": "Bucket"}));
        assert_eq!(
            Token::reference("Bucket").attr("Arn").to_value(),
            json!({"Fn::GetAtt": ["Bucket", "Arn"]})
        );
    }

    #[test]
    fn test_implied_dependencies() {
        let resource = Resource::new(
            "Policy",
            "AWS::IAM::Policy",
            json!({
                "Roles": [Token::reference("Role")],
                "Resource": join("", vec![json!("arn:"), Token::attribute("Bucket", "Arn").into()]),
                "Plain": {"Ref-like": "not a token"},
            }),
        );

        let deps = resource.implied_dependencies();
        assert_eq!(
            deps,
            BTreeSet::from(["Bucket".to_string(), "Role".to_string()])
        );
    }

    #[test]
    fn test_select_after_keeps_token_reference() {
        let value = select_after(":role/", Token::attribute("Reader", "Parameter.Value"));
        assert_eq!(
            value,
            json!({"Fn::Select": [1, {"Fn::Split": [":role/", {"Fn::GetAtt": ["Reader", "Parameter.Value"]}]}]})
        );

        let resource = Resource::imported("Role", "AWS::IAM::Role", json!({"RoleName": value}));
        assert_eq!(
            resource.implied_dependencies(),
            BTreeSet::from(["Reader".to_string()])
        );
    }

    #[test]
    fn test_duplicate_logical_id() {
        let mut graph = ResourceGraph::new("test");
        graph
            .add(Resource::new("Vpc", "AWS::EC2::VPC", json!({})))
            .unwrap();
        let err = graph
            .add(Resource::new("Vpc", "AWS::EC2::VPC", json!({})))
            .unwrap_err();
        assert!(matches!(err, CloudError::DuplicateResource(id) if id == "Vpc"));
    }

    #[test]
    fn test_ordering_follows_dependencies() {
        let mut graph = ResourceGraph::new("test");
        graph
            .add(Resource::new(
                "Service",
                "AWS::ECS::Service",
                json!({"Cluster": Token::reference("Cluster")}),
            ))
            .unwrap();
        graph
            .add(Resource::new("Upload", "Custom::Upload", json!({})))
            .unwrap();
        graph
            .add(Resource::new("Cluster", "AWS::ECS::Cluster", json!({})))
            .unwrap();
        graph.add_dependency("Service", "Upload").unwrap();

        let order = graph.ordered().unwrap();
        assert!(position(&order, "Cluster") < position(&order, "Service"));
        assert!(position(&order, "Upload") < position(&order, "Service"));
    }

    #[test]
    fn test_unknown_dependency() {
        let mut graph = ResourceGraph::new("test");
        graph
            .add(Resource::new(
                "Service",
                "AWS::ECS::Service",
                json!({"Cluster": Token::reference("Missing")}),
            ))
            .unwrap();

        let err = graph.ordered().unwrap_err();
        assert!(matches!(err, CloudError::UnknownDependency { dependency, .. } if dependency == "Missing"));
        assert!(graph.add_dependency("Nope", "Service").is_err());
    }

    #[test]
    fn test_circular_dependency() {
        let mut graph = ResourceGraph::new("test");
        graph
            .add(Resource::new("A", "T", json!({"x": Token::reference("B")})))
            .unwrap();
        graph
            .add(Resource::new("B", "T", json!({"x": Token::reference("A")})))
            .unwrap();

        assert!(matches!(
            graph.render(),
            Err(CloudError::CircularDependency(_))
        ));
    }

    #[test]
    fn test_render_sections() {
        let mut graph = ResourceGraph::new("test stack");
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

        let template = graph.render().unwrap();
        assert_eq!(template["Description"], "test stack");
        assert_eq!(template["Resources"]["FileSystem"]["DeletionPolicy"], "Retain");
        assert!(template["Resources"].get("Vpc").is_none());
        assert_eq!(template["Imports"]["Vpc"]["Properties"]["VpcId"], "vpc-1");
        assert!(template["Imports"]["Vpc"].get("DeletionPolicy").is_none());
    }
}
