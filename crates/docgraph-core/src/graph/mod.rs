//! Knowledge graph: the document accumulator, the node/edge model, CRUD
//! stores and traversal.

mod builder;
mod memory;
mod model;
mod traversal;

pub use builder::KnowledgeGraphBuilder;
pub use memory::MemoryGraph;
pub use model::{Edge, KnowledgeGraphData, Node, CONFIDENCE_KEY};
pub use traversal::{GraphTraversal, TraversalType};

use async_trait::async_trait;

use crate::relationship::RelationType;
use crate::Result;

/// Point CRUD over a graph store. Unlike the accumulator, nodes and edges
/// are addressed by ID and can be deleted.
#[async_trait]
pub trait KnowledgeGraph: Send + Sync {
    /// Insert a node, replacing any node with the same ID.
    async fn add_entity(&self, node: Node) -> Result<()>;

    /// Insert an edge, replacing any edge with the same ID. Both endpoints
    /// must already exist.
    async fn add_relationship(&self, edge: Edge) -> Result<()>;

    async fn get_entity(&self, id: &str) -> Result<Node>;

    /// Nodes on the other end of every edge touching `id`, optionally
    /// restricted to one relation type.
    async fn get_related_entities(
        &self,
        id: &str,
        relation_type: Option<RelationType>,
    ) -> Result<Vec<Node>>;

    /// Remove a node together with its incident edges.
    async fn delete_entity(&self, id: &str) -> Result<()>;

    async fn delete_relationship(&self, id: &str) -> Result<()>;

    async fn batch_add(&self, nodes: Vec<Node>, edges: Vec<Edge>) -> Result<()> {
        for node in nodes {
            self.add_entity(node).await?;
        }
        for edge in edges {
            self.add_relationship(edge).await?;
        }
        Ok(())
    }

    async fn snapshot(&self) -> Result<KnowledgeGraphData>;
}
