use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use docgraph_core::{Config, GraphStore, JsonGraphStore, KnowledgeGraphBuilder, Pipeline};
use tokio_util::sync::CancellationToken;

const CONFIG_FILE: &str = "docgraph.toml";

#[derive(Parser)]
#[command(
    name = "docgraph",
    about = "Build a knowledge graph from a directory of documents",
    version
)]
struct Cli {
    /// Directory of .txt, .md, .html and .pdf files, searched recursively
    input_dir: PathBuf,
    /// Where to write the graph JSON (defaults to storage.output_path)
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(Path::new(CONFIG_FILE))
        .context("failed to load configuration")?
        .with_env_overrides();
    if let Some(output) = cli.output {
        config.storage.output_path = output;
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling");
                cancel.cancel();
            }
        }
    });

    run(&config, &cli.input_dir, &cancel).await
}

async fn run(config: &Config, input_dir: &Path, cancel: &CancellationToken) -> Result<()> {
    let pipeline = Pipeline::from_config(config);

    tracing::info!(input = %input_dir.display(), "processing input directory");
    let docs = pipeline
        .ingest_directory(cancel, input_dir)
        .await
        .with_context(|| format!("failed to process {}", input_dir.display()))?;

    if docs.is_empty() {
        bail!("no input files found in {}", input_dir.display());
    }

    let builder = KnowledgeGraphBuilder::new();
    for doc in &docs {
        if let Err(e) = builder.add_document(doc) {
            tracing::error!(doc_id = %doc.id, error = %e, "failed to add document to graph");
        }
    }
    let graph = builder.generate();

    let store = JsonGraphStore::new(config.storage.output_path.clone());
    store
        .store_graph(&graph)
        .await
        .context("failed to store knowledge graph")?;

    tracing::info!(
        document_count = docs.len(),
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        output = %config.storage.output_path.display(),
        "knowledge graph generated"
    );
    Ok(())
}
