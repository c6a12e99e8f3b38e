use async_trait::async_trait;
use parking_lot::RwLock;

use super::model::{Edge, KnowledgeGraphData, Node};
use super::KnowledgeGraph;
use crate::relationship::RelationType;
use crate::{Error, Result};

#[derive(Default)]
struct MemoryState {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

/// In-process `KnowledgeGraph`. Keeps insertion order.
#[derive(Default)]
pub struct MemoryGraph {
    state: RwLock<MemoryState>,
}

impl MemoryGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the graph from a snapshot, e.g. one produced by the builder.
    #[must_use]
    pub fn from_data(data: KnowledgeGraphData) -> Self {
        Self {
            state: RwLock::new(MemoryState {
                nodes: data.nodes,
                edges: data.edges,
            }),
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.state.read().nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.state.read().edges.len()
    }
}

#[async_trait]
impl KnowledgeGraph for MemoryGraph {
    async fn add_entity(&self, node: Node) -> Result<()> {
        let mut state = self.state.write();
        if let Some(existing) = state.nodes.iter_mut().find(|n| n.id == node.id) {
            *existing = node;
        } else {
            state.nodes.push(node);
        }
        Ok(())
    }

    async fn add_relationship(&self, edge: Edge) -> Result<()> {
        let mut state = self.state.write();

        for endpoint in [&edge.source, &edge.target] {
            if !state.nodes.iter().any(|n| &n.id == endpoint) {
                return Err(Error::NodeNotFound(endpoint.clone()));
            }
        }

        if let Some(existing) = state.edges.iter_mut().find(|e| e.id == edge.id) {
            *existing = edge;
        } else {
            state.edges.push(edge);
        }
        Ok(())
    }

    async fn get_entity(&self, id: &str) -> Result<Node> {
        self.state
            .read()
            .nodes
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))
    }

    async fn get_related_entities(
        &self,
        id: &str,
        relation_type: Option<RelationType>,
    ) -> Result<Vec<Node>> {
        let state = self.state.read();

        let related = state
            .edges
            .iter()
            .filter(|e| e.touches(id))
            .filter(|e| relation_type.map_or(true, |t| e.relation_type == t))
            .filter_map(|e| {
                let other = if e.source == id { &e.target } else { &e.source };
                state.nodes.iter().find(|n| &n.id == other).cloned()
            })
            .collect();

        Ok(related)
    }

    async fn delete_entity(&self, id: &str) -> Result<()> {
        let mut state = self.state.write();

        let position = state
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))?;
        state.nodes.remove(position);
        state.edges.retain(|e| !e.touches(id));

        Ok(())
    }

    async fn delete_relationship(&self, id: &str) -> Result<()> {
        let mut state = self.state.write();

        let position = state
            .edges
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| Error::EdgeNotFound(id.to_string()))?;
        state.edges.remove(position);

        Ok(())
    }

    async fn snapshot(&self) -> Result<KnowledgeGraphData> {
        let state = self.state.read();
        Ok(KnowledgeGraphData::new(
            state.nodes.clone(),
            state.edges.clone(),
        ))
    }
}
