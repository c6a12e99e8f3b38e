use chrono::{DateTime, Utc};
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::entity::{Entity, EntityType};
use crate::relationship::{RelationType, Relationship};

pub const CONFIDENCE_KEY: &str = "confidence";

/// One distinct entity label in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: EntityType,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,
    /// IDs of the documents the label was seen in, one entry per sighting.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

impl Node {
    /// A node with a freshly minted ID.
    #[must_use]
    pub fn new(label: impl Into<String>, node_type: EntityType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            label: label.into(),
            node_type,
            properties: BTreeMap::new(),
            sources: Vec::new(),
        }
    }

    #[must_use]
    pub fn from_entity(entity: &Entity) -> Self {
        let mut node = Self::new(entity.label.clone(), entity.entity_type);
        node.properties.clone_from(&entity.properties);
        node
    }

    #[must_use]
    pub fn with_source(mut self, document_id: impl Into<String>) -> Self {
        self.sources.push(document_id.into());
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

/// A typed, weighted connection between two node IDs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,
    pub weight: f64,
}

impl Edge {
    /// Builds the edge keyed by its (source, type, target) triple. The
    /// weight starts at `confidence`, which is also kept as a property.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relation_type: RelationType,
        confidence: f64,
    ) -> Self {
        let source = source.into();
        let target = target.into();
        let mut properties = BTreeMap::new();
        properties.insert(CONFIDENCE_KEY.to_string(), Value::from(confidence));

        Self {
            id: Self::key(&source, relation_type, &target),
            source,
            target,
            relation_type,
            properties,
            weight: confidence,
        }
    }

    /// Edge between node IDs carried in a relationship's `from`/`to`.
    #[must_use]
    pub fn from_relationship(relationship: &Relationship) -> Self {
        let mut edge = Self::new(
            relationship.from.clone(),
            relationship.to.clone(),
            relationship.relation_type,
            relationship.confidence,
        );
        edge.properties.extend(
            relationship
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        edge
    }

    /// Edge ID for a triple. Unambiguous only for node IDs that cannot absorb
    /// a `-TYPE-` segment, such as the builder's UUIDs; code that dedups
    /// edges keys on the triple itself.
    #[must_use]
    pub fn key(source: &str, relation_type: RelationType, target: &str) -> String {
        format!("{source}-{relation_type}-{target}")
    }

    #[must_use]
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// Serializable snapshot of a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraphData {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub generated_at: DateTime<Utc>,
}

impl KnowledgeGraphData {
    #[must_use]
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            nodes,
            edges,
            generated_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    #[must_use]
    pub fn node_by_label(&self, label: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.label == label)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Export into a petgraph `DiGraph`. Edges whose endpoints are not in
    /// the node list are left out.
    #[must_use]
    pub fn to_petgraph(&self) -> DiGraph<Node, Edge> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.edges.len());
        let mut indices = HashMap::with_capacity(self.nodes.len());

        for node in &self.nodes {
            indices.insert(node.id.as_str(), graph.add_node(node.clone()));
        }
        for edge in &self.edges {
            if let (Some(&a), Some(&b)) = (
                indices.get(edge.source.as_str()),
                indices.get(edge.target.as_str()),
            ) {
                graph.add_edge(a, b, edge.clone());
            }
        }

        graph
    }
}

impl Default for KnowledgeGraphData {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}
