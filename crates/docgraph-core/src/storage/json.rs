use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::GraphStore;
use crate::graph::KnowledgeGraphData;
use crate::Result;

/// Stores the graph as one pretty-printed JSON file.
pub struct JsonGraphStore {
    path: PathBuf,
}

impl JsonGraphStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl GraphStore for JsonGraphStore {
    async fn store_graph(&self, graph: &KnowledgeGraphData) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(graph)?;
        tokio::fs::write(&self.path, json).await?;

        tracing::info!(
            path = %self.path.display(),
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "stored graph"
        );
        Ok(())
    }

    async fn load_graph(&self) -> Result<KnowledgeGraphData> {
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
