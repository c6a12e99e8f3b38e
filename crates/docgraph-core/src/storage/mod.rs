//! Persistence for finished graphs.

mod json;
mod sqlite;

pub use json::JsonGraphStore;
pub use sqlite::SqliteGraphStore;

use async_trait::async_trait;

use crate::graph::KnowledgeGraphData;
use crate::Result;

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Persist `graph`, replacing whatever the store held before.
    async fn store_graph(&self, graph: &KnowledgeGraphData) -> Result<()>;

    async fn load_graph(&self) -> Result<KnowledgeGraphData>;
}
