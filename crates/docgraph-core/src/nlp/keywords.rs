//! TextRank keyword ranking over a noun co-occurrence graph.

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

use crate::config::KeywordConfig;
use crate::document::{Keyword, Sentence};

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

const TECHNICAL_TERMS: &[&str] = &[
    "api", "sdk", "rest", "graphql", "cloud", "docker", "kubernetes", "microservices",
    "database", "cache", "server", "client", "authentication", "security", "deployment",
    // architecture
    "microservice", "event-driven", "serverless", "container", "service-mesh", "cloud-native",
    // delivery
    "ci/cd", "pipeline", "git", "testing", "monitoring", "logging", "tracing", "observability",
    "automation",
    // security
    "authorization", "encryption", "compliance", "oauth", "jwt", "certificate", "firewall",
    // data
    "queue", "stream", "persistence", "replication", "sharding", "backup", "recovery",
    "migration",
    // integration
    "grpc", "websocket", "message-queue", "event-bus", "pubsub", "webhook", "protocol",
    "api-gateway",
    // reliability
    "scalability", "availability", "reliability", "performance", "latency", "throughput",
    "failover", "redundancy",
];

const BANKING_TERMS: &[&str] = &[
    "account", "payment", "transfer", "loan", "credit", "mortgage", "investment", "risk",
    "compliance", "regulatory", "banking", "financial", "transaction", "balance", "interest",
    "deposit", "withdrawal", "card", "atm", "branch",
];

pub struct KeywordRanker {
    config: KeywordConfig,
}

impl KeywordRanker {
    #[must_use]
    pub const fn new(config: KeywordConfig) -> Self {
        Self { config }
    }

    /// Rank candidate nouns of `sentences`, best first, at most
    /// `max_keywords` of them. Offsets refer to `text`.
    #[must_use]
    pub fn rank(&self, text: &str, sentences: &[Sentence]) -> Vec<Keyword> {
        let graph = self.cooccurrence_graph(sentences);
        if graph.node_count() == 0 {
            return Vec::new();
        }

        let scores = self.pagerank(&graph);

        let mut keywords: Vec<Keyword> = graph
            .node_indices()
            .filter_map(|node| {
                let word = graph[node].as_str();
                let score = scores[node.index()] * self.boost(word);
                // Candidates come from `text`, so a miss means a caller mixed inputs.
                text.find(word)
                    .map(|start| Keyword::new(word.to_string(), score, start))
            })
            .collect();

        keywords.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.text.cmp(&b.text))
        });
        keywords.truncate(self.config.max_keywords);
        keywords
    }

    /// Nodes are distinct candidate words; an edge's weight counts how often
    /// the two words appeared within `window` tokens of each other.
    fn cooccurrence_graph(&self, sentences: &[Sentence]) -> UnGraph<String, f64> {
        let mut graph = UnGraph::<String, f64>::new_undirected();
        let mut nodes: HashMap<String, NodeIndex> = HashMap::new();

        for sentence in sentences {
            let candidates: Vec<(usize, NodeIndex)> = sentence
                .tokens
                .iter()
                .enumerate()
                .filter(|(_, t)| is_candidate(&t.text, t.tag.is_noun()))
                .map(|(pos, t)| {
                    let node = *nodes
                        .entry(t.text.clone())
                        .or_insert_with(|| graph.add_node(t.text.clone()));
                    (pos, node)
                })
                .collect();

            for (i, &(pos_a, a)) in candidates.iter().enumerate() {
                for &(pos_b, b) in &candidates[i + 1..] {
                    if pos_b - pos_a > self.config.window {
                        break;
                    }
                    if a == b {
                        continue;
                    }
                    match graph.find_edge(a, b) {
                        Some(edge) => graph[edge] += 1.0,
                        None => {
                            graph.add_edge(a, b, 1.0);
                        }
                    }
                }
            }
        }

        graph
    }

    fn pagerank(&self, graph: &UnGraph<String, f64>) -> Vec<f64> {
        let d = self.config.damping;
        let totals: Vec<f64> = graph
            .node_indices()
            .map(|n| graph.edges(n).map(|e| *e.weight()).sum())
            .collect();

        let mut scores = vec![1.0; graph.node_count()];

        for iteration in 0..self.config.max_iterations {
            let mut next = vec![0.0; scores.len()];
            let mut diff = 0.0;

            for node in graph.node_indices() {
                let sum: f64 = graph
                    .edges(node)
                    .map(|e| {
                        let other = if e.source() == node { e.target() } else { e.source() };
                        e.weight() * scores[other.index()] / totals[other.index()]
                    })
                    .sum();
                let score = (1.0 - d) + d * sum;
                diff += (score - scores[node.index()]).abs();
                next[node.index()] = score;
            }

            scores = next;
            if diff < self.config.epsilon {
                tracing::trace!(iteration, "keyword ranking converged");
                break;
            }
        }

        scores
    }

    fn boost(&self, word: &str) -> f64 {
        let lower = word.to_lowercase();
        let mut factor = 1.0;
        if TECHNICAL_TERMS.iter().any(|t| lower.contains(t)) {
            factor *= self.config.technical_boost;
        }
        if BANKING_TERMS.iter().any(|t| lower.contains(t)) {
            factor *= self.config.banking_boost;
        }
        factor
    }
}

impl Default for KeywordRanker {
    fn default() -> Self {
        Self::new(KeywordConfig::default())
    }
}

fn is_candidate(word: &str, is_noun: bool) -> bool {
    is_noun && !STOPWORDS.contains(&word.to_lowercase().as_str())
}
