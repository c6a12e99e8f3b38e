use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use super::model::Node;
use super::KnowledgeGraph;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TraversalType {
    Bfs,
    Dfs,
}

/// Walks a `KnowledgeGraph` outward from a start node, following edges in
/// both directions.
pub struct GraphTraversal<'a, G: KnowledgeGraph + ?Sized> {
    graph: &'a G,
}

impl<'a, G: KnowledgeGraph + ?Sized> GraphTraversal<'a, G> {
    #[must_use]
    pub const fn new(graph: &'a G) -> Self {
        Self { graph }
    }

    /// Nodes reachable within `max_depth` hops of `start_id`, start node
    /// first, each node once.
    pub async fn traverse(
        &self,
        start_id: &str,
        max_depth: usize,
        traversal_type: TraversalType,
    ) -> Result<Vec<Node>> {
        match traversal_type {
            TraversalType::Bfs => self.bfs(start_id, max_depth).await,
            TraversalType::Dfs => self.dfs(start_id, max_depth).await,
        }
    }

    async fn bfs(&self, start_id: &str, max_depth: usize) -> Result<Vec<Node>> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([(start_id.to_string(), 0)]);
        let mut result = Vec::new();

        while let Some((id, depth)) = queue.pop_front() {
            if !visited.insert(id.clone()) {
                continue;
            }
            result.push(self.graph.get_entity(&id).await?);

            if depth == max_depth {
                continue;
            }
            for related in self.graph.get_related_entities(&id, None).await? {
                if !visited.contains(&related.id) {
                    queue.push_back((related.id, depth + 1));
                }
            }
        }

        Ok(result)
    }

    async fn dfs(&self, start_id: &str, max_depth: usize) -> Result<Vec<Node>> {
        let mut visited = HashSet::new();
        let mut stack = vec![(start_id.to_string(), 0)];
        let mut result = Vec::new();

        while let Some((id, depth)) = stack.pop() {
            if !visited.insert(id.clone()) {
                continue;
            }
            result.push(self.graph.get_entity(&id).await?);

            if depth == max_depth {
                continue;
            }
            // Reversed so the first neighbour is explored first.
            let related = self.graph.get_related_entities(&id, None).await?;
            for node in related.into_iter().rev() {
                if !visited.contains(&node.id) {
                    stack.push((node.id, depth + 1));
                }
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityType;
    use crate::graph::{Edge, MemoryGraph};
    use crate::relationship::RelationType;
    use crate::Error;

    // a - b - c - d, plus a - e
    async fn chain() -> (MemoryGraph, Vec<Node>) {
        let graph = MemoryGraph::new();
        let nodes: Vec<Node> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|l| Node::new(*l, EntityType::Component))
            .collect();
        let link = |x: usize, y: usize| {
            Edge::new(&nodes[x].id, &nodes[y].id, RelationType::DependsOn, 0.85)
        };
        let edges = vec![link(0, 1), link(1, 2), link(2, 3), link(0, 4)];

        graph.batch_add(nodes.clone(), edges).await.unwrap();
        (graph, nodes)
    }

    fn labels(nodes: &[Node]) -> Vec<&str> {
        nodes.iter().map(|n| n.label.as_str()).collect()
    }

    #[tokio::test]
    async fn test_bfs_levels() {
        let (graph, nodes) = chain().await;
        let traversal = GraphTraversal::new(&graph);

        let found = traversal
            .traverse(&nodes[0].id, 1, TraversalType::Bfs)
            .await
            .unwrap();
        assert_eq!(labels(&found), vec!["a", "b", "e"]);

        let found = traversal
            .traverse(&nodes[0].id, 0, TraversalType::Bfs)
            .await
            .unwrap();
        assert_eq!(labels(&found), vec!["a"]);
    }

    #[tokio::test]
    async fn test_dfs_goes_deep_first() {
        let (graph, nodes) = chain().await;
        let traversal = GraphTraversal::new(&graph);

        let found = traversal
            .traverse(&nodes[0].id, 10, TraversalType::Dfs)
            .await
            .unwrap();
        assert_eq!(labels(&found), vec!["a", "b", "c", "d", "e"]);

        let found = traversal
            .traverse(&nodes[0].id, 2, TraversalType::Dfs)
            .await
            .unwrap();
        assert_eq!(labels(&found), vec!["a", "b", "c", "e"]);
    }

    #[tokio::test]
    async fn test_follows_incoming_edges() {
        let (graph, nodes) = chain().await;

        let found = GraphTraversal::new(&graph)
            .traverse(&nodes[3].id, 10, TraversalType::Bfs)
            .await
            .unwrap();
        assert_eq!(labels(&found), vec!["d", "c", "b", "a", "e"]);
    }

    #[tokio::test]
    async fn test_unknown_start() {
        let (graph, _) = chain().await;
        let err = GraphTraversal::new(&graph)
            .traverse("nope", 3, TraversalType::Dfs)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NodeNotFound(_)));
    }
}
