use docgraph_core::{
    Config, GraphStore, GraphTraversal, InMemoryMetrics, JsonGraphStore, KnowledgeGraph,
    KnowledgeGraphBuilder, MemoryGraph, Pipeline, RelationType, SqliteGraphStore, TraversalType,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const SENTENCE: &str = "The Payment processes the Transfer.";

fn write_inputs(dir: &std::path::Path) {
    std::fs::write(dir.join("a.txt"), SENTENCE).unwrap();
    std::fs::write(dir.join("notes.md"), format!("# Notes\n\n{SENTENCE}\n")).unwrap();
    std::fs::create_dir(dir.join("web")).unwrap();
    std::fs::write(
        dir.join("web/page.html"),
        format!("<html><head><title>x</title></head><body><p>{SENTENCE}</p></body></html>"),
    )
    .unwrap();
    std::fs::write(dir.join("ignored.docx"), b"not ingested").unwrap();
}

#[tokio::test]
async fn test_directory_to_graph() {
    let input = tempfile::tempdir().unwrap();
    write_inputs(input.path());

    let metrics = Arc::new(InMemoryMetrics::new());
    let config = Config::default();
    let pipeline = Pipeline::new(&config.pipeline)
        .with_metrics(metrics.clone())
        .with_default_processors(&config);

    let cancel = CancellationToken::new();
    let docs = pipeline
        .ingest_directory(&cancel, input.path())
        .await
        .unwrap();
    assert_eq!(docs.len(), 3);
    assert!(docs.iter().all(|d| d.is_processed()));
    assert_eq!(
        metrics.counter(
            "pipeline_documents_processed_total",
            &[("status", "success")]
        ),
        3
    );

    let builder = KnowledgeGraphBuilder::new().with_metrics(metrics.clone());
    for doc in &docs {
        builder.add_document(doc).unwrap();
    }
    let graph = builder.generate();

    let payment = graph.node_by_label("Payment").unwrap();
    let transfer = graph.node_by_label("Transfer").unwrap();
    assert_eq!(payment.sources.len(), 3);
    assert_eq!(transfer.sources.len(), 3);

    let processes: Vec<_> = graph
        .edges
        .iter()
        .filter(|e| e.relation_type == RelationType::Processes)
        .collect();
    assert_eq!(processes.len(), 1);
    assert_eq!(processes[0].source, payment.id);
    assert_eq!(processes[0].target, transfer.id);
    assert!((processes[0].weight - 0.85).abs() < 1e-9);

    // JSON output loads back unchanged.
    let output = tempfile::tempdir().unwrap();
    let store = JsonGraphStore::new(output.path().join("graph/knowledge_graph.json"));
    store.store_graph(&graph).await.unwrap();
    assert_eq!(store.load_graph().await.unwrap(), graph);
}

#[tokio::test]
async fn test_graph_in_sqlite_and_traversal() {
    let input = tempfile::tempdir().unwrap();
    std::fs::write(input.path().join("a.txt"), SENTENCE).unwrap();

    let config = Config::default();
    let pipeline = Pipeline::from_config(&config);
    let docs = pipeline
        .ingest_directory(&CancellationToken::new(), input.path())
        .await
        .unwrap();

    let builder = KnowledgeGraphBuilder::new();
    builder.add_document(&docs[0]).unwrap();
    let graph = builder.generate();

    let store = SqliteGraphStore::open_memory().await.unwrap();
    store.store_graph(&graph).await.unwrap();

    let payment = graph.node_by_label("Payment").unwrap();
    let related = store.get_related_entities(&payment.id, None).await.unwrap();
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].label, "Transfer");

    let memory = MemoryGraph::from_data(store.load_graph().await.unwrap());
    let reached = GraphTraversal::new(&memory)
        .traverse(&payment.id, 1, TraversalType::Bfs)
        .await
        .unwrap();
    let labels: Vec<_> = reached.iter().map(|n| n.label.as_str()).collect();
    assert_eq!(labels, vec!["Payment", "Transfer"]);

    store.delete_entity(&payment.id).await.unwrap();
    assert!(store.snapshot().await.unwrap().edges.is_empty());
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let input = tempfile::tempdir().unwrap();
    write_inputs(input.path());

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = Pipeline::from_config(&Config::default())
        .ingest_directory(&cancel, input.path())
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}
