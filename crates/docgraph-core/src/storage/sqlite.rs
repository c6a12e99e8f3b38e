use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};

use super::GraphStore;
use crate::graph::{Edge, KnowledgeGraph, KnowledgeGraphData, Node};
use crate::relationship::RelationType;
use crate::{Error, Result};

const INIT_SQL: &str = r"
CREATE TABLE IF NOT EXISTS nodes (
    id TEXT PRIMARY KEY,
    label TEXT NOT NULL,
    node_type TEXT NOT NULL,
    properties TEXT NOT NULL,
    sources TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_nodes_label ON nodes(label);

CREATE TABLE IF NOT EXISTS edges (
    id TEXT PRIMARY KEY,
    source_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    target_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
    relation_type TEXT NOT NULL,
    weight REAL NOT NULL,
    properties TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id);
CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id);
CREATE INDEX IF NOT EXISTS idx_edges_type ON edges(relation_type);

CREATE TABLE IF NOT EXISTS graph_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

const GENERATED_AT_KEY: &str = "generated_at";

type NodeRow = (String, String, String, String, String);
type EdgeRow = (String, String, String, String, f64, String);

/// SQLite-backed graph. Serves both as a CRUD `KnowledgeGraph` and as a
/// `GraphStore` for whole snapshots.
pub struct SqliteGraphStore {
    pool: Pool<Sqlite>,
}

impl SqliteGraphStore {
    pub async fn open(path: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite:{path}?mode=rwc"))
            .await?;

        sqlx::query(INIT_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        sqlx::query(INIT_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    async fn node_exists(&self, id: &str) -> Result<bool> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM nodes WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 > 0)
    }

    async fn all_nodes(&self) -> Result<Vec<Node>> {
        let rows: Vec<NodeRow> = sqlx::query_as(
            "SELECT id, label, node_type, properties, sources FROM nodes ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(parse_node_row).collect()
    }

    async fn all_edges(&self) -> Result<Vec<Edge>> {
        let rows: Vec<EdgeRow> = sqlx::query_as(
            r"
            SELECT id, source_id, target_id, relation_type, weight, properties
            FROM edges ORDER BY rowid
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(parse_edge_row).collect()
    }
}

#[async_trait]
impl KnowledgeGraph for SqliteGraphStore {
    async fn add_entity(&self, node: Node) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO nodes (id, label, node_type, properties, sources)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                label = excluded.label,
                node_type = excluded.node_type,
                properties = excluded.properties,
                sources = excluded.sources
            ",
        )
        .bind(&node.id)
        .bind(&node.label)
        .bind(node.node_type.as_str())
        .bind(serde_json::to_string(&node.properties)?)
        .bind(serde_json::to_string(&node.sources)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn add_relationship(&self, edge: Edge) -> Result<()> {
        for endpoint in [&edge.source, &edge.target] {
            if !self.node_exists(endpoint).await? {
                return Err(Error::NodeNotFound(endpoint.clone()));
            }
        }

        sqlx::query(
            r"
            INSERT INTO edges (id, source_id, target_id, relation_type, weight, properties)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                weight = excluded.weight,
                properties = excluded.properties
            ",
        )
        .bind(&edge.id)
        .bind(&edge.source)
        .bind(&edge.target)
        .bind(edge.relation_type.as_str())
        .bind(edge.weight)
        .bind(serde_json::to_string(&edge.properties)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_entity(&self, id: &str) -> Result<Node> {
        let row: NodeRow = sqlx::query_as(
            "SELECT id, label, node_type, properties, sources FROM nodes WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NodeNotFound(id.to_string()))?;

        parse_node_row(row)
    }

    async fn get_related_entities(
        &self,
        id: &str,
        relation_type: Option<RelationType>,
    ) -> Result<Vec<Node>> {
        let relation_type = relation_type.map(|t| t.as_str());

        let rows: Vec<NodeRow> = sqlx::query_as(
            r"
            SELECT n.id, n.label, n.node_type, n.properties, n.sources
            FROM edges e
            JOIN nodes n
              ON n.id = CASE WHEN e.source_id = ? THEN e.target_id ELSE e.source_id END
            WHERE (e.source_id = ? OR e.target_id = ?)
              AND (? IS NULL OR e.relation_type = ?)
            ORDER BY e.rowid
            ",
        )
        .bind(id)
        .bind(id)
        .bind(id)
        .bind(relation_type)
        .bind(relation_type)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(parse_node_row).collect()
    }

    async fn delete_entity(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM nodes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NodeNotFound(id.to_string()));
        }

        Ok(())
    }

    async fn delete_relationship(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM edges WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::EdgeNotFound(id.to_string()));
        }

        Ok(())
    }

    async fn snapshot(&self) -> Result<KnowledgeGraphData> {
        Ok(KnowledgeGraphData::new(
            self.all_nodes().await?,
            self.all_edges().await?,
        ))
    }
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn store_graph(&self, graph: &KnowledgeGraphData) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM edges").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM nodes").execute(&mut *tx).await?;

        for node in &graph.nodes {
            sqlx::query(
                r"
                INSERT INTO nodes (id, label, node_type, properties, sources)
                VALUES (?, ?, ?, ?, ?)
                ",
            )
            .bind(&node.id)
            .bind(&node.label)
            .bind(node.node_type.as_str())
            .bind(serde_json::to_string(&node.properties)?)
            .bind(serde_json::to_string(&node.sources)?)
            .execute(&mut *tx)
            .await?;
        }

        for edge in &graph.edges {
            sqlx::query(
                r"
                INSERT INTO edges (id, source_id, target_id, relation_type, weight, properties)
                VALUES (?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(&edge.id)
            .bind(&edge.source)
            .bind(&edge.target)
            .bind(edge.relation_type.as_str())
            .bind(edge.weight)
            .bind(serde_json::to_string(&edge.properties)?)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("INSERT OR REPLACE INTO graph_meta (key, value) VALUES (?, ?)")
            .bind(GENERATED_AT_KEY)
            .bind(graph.generated_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "stored graph in sqlite"
        );
        Ok(())
    }

    async fn load_graph(&self) -> Result<KnowledgeGraphData> {
        let generated_at: Option<(String,)> =
            sqlx::query_as("SELECT value FROM graph_meta WHERE key = ?")
                .bind(GENERATED_AT_KEY)
                .fetch_optional(&self.pool)
                .await?;

        let mut graph = self.snapshot().await?;
        if let Some((value,)) = generated_at {
            graph.generated_at = DateTime::parse_from_rfc3339(&value)
                .map_err(|e| Error::Config(format!("invalid {GENERATED_AT_KEY}: {e}")))?
                .with_timezone(&Utc);
        }
        Ok(graph)
    }
}

fn parse_node_row(row: NodeRow) -> Result<Node> {
    let (id, label, node_type, properties, sources) = row;

    Ok(Node {
        id,
        label,
        node_type: node_type.parse()?,
        properties: serde_json::from_str(&properties)?,
        sources: serde_json::from_str(&sources)?,
    })
}

fn parse_edge_row(row: EdgeRow) -> Result<Edge> {
    let (id, source, target, relation_type, weight, properties) = row;

    Ok(Edge {
        id,
        source,
        target,
        relation_type: relation_type.parse()?,
        properties: serde_json::from_str(&properties)?,
        weight,
    })
}
