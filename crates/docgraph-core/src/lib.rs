pub mod config;
pub mod document;
pub mod entity;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod nlp;
pub mod pipeline;
pub mod processors;
pub mod relationship;
pub mod storage;

pub use config::{
    Config, CoreferenceConfig, ExtractorConfig, KeywordConfig, PipelineConfig, StorageConfig,
};
pub use document::{Document, Keyword, Metadata, PosTag, RawDocument, Sentence, Token};
pub use entity::{Entity, EntityType};
pub use error::{Error, Result};
pub use graph::{
    Edge, GraphTraversal, KnowledgeGraph, KnowledgeGraphBuilder, KnowledgeGraphData, MemoryGraph,
    Node, TraversalType,
};
pub use metrics::{InMemoryMetrics, MetricsSink, Outcome, TracingMetrics};
pub use nlp::{CoreferenceResolver, EntityExtractor, KeywordRanker};
pub use pipeline::{Pipeline, PipelineError, PipelineResult};
pub use processors::{
    FormatRouter, HtmlProcessor, MimeType, ParseError, PdfProcessor, ProcessError, Processor,
    TextProcessor,
};
pub use relationship::{RelationType, Relationship};
pub use storage::{GraphStore, JsonGraphStore, SqliteGraphStore};
