use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use super::model::{Edge, KnowledgeGraphData, Node};
use crate::document::Document;
use crate::metrics::{MetricsSink, TracingMetrics};
use crate::relationship::RelationType;
use crate::{Error, Result};

#[derive(Default)]
struct BuilderState {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    /// label -> position in `nodes`
    labels: HashMap<String, usize>,
    /// (source node, type, target node) positions -> position in `edges`
    edge_keys: HashMap<(usize, RelationType, usize), usize>,
    seen_documents: HashSet<String>,
}

#[derive(Default)]
struct FoldCounts {
    nodes_created: u64,
    edges_created: u64,
    relations_dropped: u64,
}

/// Folds processed documents into one shared graph. One node per distinct
/// entity label and one edge per (source, type, target) triple.
pub struct KnowledgeGraphBuilder {
    state: RwLock<BuilderState>,
    metrics: Arc<dyn MetricsSink>,
}

impl KnowledgeGraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(BuilderState::default()),
            metrics: Arc::new(TracingMetrics),
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Merge a document's entities and relations into the graph.
    ///
    /// Adding a document ID that was already folded is a no-op. Relations
    /// naming a label with no node yet are dropped, not deferred.
    pub fn add_document(&self, doc: &Document) -> Result<()> {
        if doc.id.is_empty() {
            return Err(Error::MissingDocumentId);
        }

        let counts = {
            let mut state = self.state.write();
            if !state.seen_documents.insert(doc.id.clone()) {
                debug!(doc_id = %doc.id, "document already in graph");
                return Ok(());
            }
            state.fold(doc)
        };

        for _ in 0..counts.nodes_created {
            self.metrics.increment_counter("graph_nodes_created_total", &[]);
        }
        for _ in 0..counts.edges_created {
            self.metrics.increment_counter("graph_edges_created_total", &[]);
        }
        for _ in 0..counts.relations_dropped {
            self.metrics
                .increment_counter("graph_relations_dropped_total", &[]);
        }

        debug!(
            doc_id = %doc.id,
            nodes_created = counts.nodes_created,
            edges_created = counts.edges_created,
            relations_dropped = counts.relations_dropped,
            "document added to graph"
        );
        Ok(())
    }

    /// Point-in-time copy of the graph.
    #[must_use]
    pub fn generate(&self) -> KnowledgeGraphData {
        let state = self.state.read();
        KnowledgeGraphData::new(state.nodes.clone(), state.edges.clone())
    }

    #[must_use]
    pub fn document_count(&self) -> usize {
        self.state.read().seen_documents.len()
    }
}

impl Default for KnowledgeGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BuilderState {
    fn fold(&mut self, doc: &Document) -> FoldCounts {
        let mut counts = FoldCounts::default();

        for entity in &doc.entities {
            if let Some(&idx) = self.labels.get(&entity.label) {
                self.nodes[idx].sources.push(doc.id.clone());
            } else {
                let node = Node::from_entity(entity).with_source(doc.id.clone());
                self.labels.insert(entity.label.clone(), self.nodes.len());
                self.nodes.push(node);
                counts.nodes_created += 1;
            }
        }

        for relation in &doc.relations {
            let (Some(&from), Some(&to)) = (
                self.labels.get(&relation.from),
                self.labels.get(&relation.to),
            ) else {
                warn!(
                    doc_id = %doc.id,
                    from = %relation.from,
                    to = %relation.to,
                    relation_type = %relation.relation_type,
                    "skipping relation with unknown entities"
                );
                counts.relations_dropped += 1;
                continue;
            };

            let key = (from, relation.relation_type, to);
            if let Some(&idx) = self.edge_keys.get(&key) {
                let edge = &mut self.edges[idx];
                edge.weight = (edge.weight + relation.confidence) / 2.0;
            } else {
                let edge = Edge::new(
                    self.nodes[from].id.clone(),
                    self.nodes[to].id.clone(),
                    relation.relation_type,
                    relation.confidence,
                );
                self.edge_keys.insert(key, self.edges.len());
                self.edges.push(edge);
                counts.edges_created += 1;
            }
        }

        counts
    }
}
