use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::{MimeType, ParseError, ProcessResult, Processor};
use crate::config::Config;
use crate::document::{Document, Metadata};
use crate::metrics::{MetricsSink, TracingMetrics};
use crate::nlp::{tokenizer, CoreferenceResolver, EntityExtractor, KeywordRanker};

/// Plain-text NLP stage: extraction, coreference resolution and keyword
/// ranking over UTF-8 input.
pub struct TextProcessor {
    extractor: EntityExtractor,
    resolver: CoreferenceResolver,
    ranker: KeywordRanker,
    metrics: Arc<dyn MetricsSink>,
}

impl TextProcessor {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            extractor: EntityExtractor::new(config.extractor.clone()),
            resolver: CoreferenceResolver::new(config.coreference.clone()),
            ranker: KeywordRanker::new(config.keywords.clone()),
            metrics: Arc::new(TracingMetrics),
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: CoreferenceResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Run the full NLP chain over already-decoded text.
    #[must_use]
    pub fn process_text(&self, text: &str, metadata: Metadata) -> Document {
        tracing::debug!(content_length = text.len(), "starting NLP processing");

        let sentences = tokenizer::analyze(text);
        let (entities, relations) = self.extractor.extract(text, &sentences);
        let entities = self.resolver.resolve(&entities, &sentences);
        let keywords = self.ranker.rank(text, &sentences);

        for entity in &entities {
            self.metrics.increment_counter(
                "nlp_entities_extracted_total",
                &[("entity_type", entity.entity_type.as_str())],
            );
        }

        tracing::debug!(
            entities_count = entities.len(),
            relations_count = relations.len(),
            keywords_count = keywords.len(),
            "NLP processing completed"
        );

        Document {
            id: Uuid::now_v7().to_string(),
            content: text.to_string(),
            raw: None,
            sentences,
            entities,
            relations,
            keywords,
            metadata,
            processed_at: Some(Utc::now()),
        }
    }
}

impl Default for TextProcessor {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

#[async_trait::async_trait]
impl Processor for TextProcessor {
    fn supported_types(&self) -> &[MimeType] {
        &[MimeType::PlainText, MimeType::Markdown]
    }

    async fn process(&self, content: &[u8], metadata: &Metadata) -> ProcessResult<Document> {
        let text = std::str::from_utf8(content).map_err(|e| ParseError::Encoding(e.to_string()))?;
        Ok(self.process_text(text, metadata.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityType;
    use crate::metrics::InMemoryMetrics;
    use crate::processors::ProcessError;

    #[tokio::test]
    async fn test_process_plain_text() {
        let processor = TextProcessor::default();
        let text = "The Payment Service processes each Transaction. \
                    Kubernetes hosts the Cluster on AWS.";
        let doc = processor.process(text.as_bytes(), &Metadata::new()).await.unwrap();

        assert_eq!(doc.content, text);
        assert!(doc.is_processed());
        assert!(!doc.id.is_empty());
        assert_eq!(doc.sentences.len(), 2);
        assert!(doc
            .entities
            .iter()
            .any(|e| e.entity_type == EntityType::Transaction && e.label == "Payment"));
        assert!(!doc.relations.is_empty());
        assert!(!doc.keywords.is_empty());
        assert!(doc.keywords.len() <= 10);
    }

    #[tokio::test]
    async fn test_metadata_passes_through() {
        let mut metadata = Metadata::new();
        metadata.insert("filename".into(), serde_json::Value::from("notes.txt"));

        let doc = TextProcessor::default()
            .process(b"Plain notes.", &metadata)
            .await
            .unwrap();
        assert_eq!(doc.metadata, metadata);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_encoding_error() {
        let err = TextProcessor::default()
            .process(&[0xff, 0xfe, 0xfd], &Metadata::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Parse(ParseError::Encoding(_))));
    }

    #[tokio::test]
    async fn test_empty_text() {
        let doc = TextProcessor::default()
            .process(b"", &Metadata::new())
            .await
            .unwrap();
        assert!(doc.entities.is_empty());
        assert!(doc.relations.is_empty());
        assert!(doc.keywords.is_empty());
        assert!(doc.is_processed());
    }

    #[test]
    fn test_counts_entities_by_type() {
        let metrics = Arc::new(InMemoryMetrics::new());
        let processor = TextProcessor::default().with_metrics(metrics.clone());

        let doc = processor.process_text("Redis and Kafka.", Metadata::new());

        assert_eq!(
            metrics.counter_total("nlp_entities_extracted_total"),
            doc.entities.len() as u64
        );
        assert_eq!(
            metrics.counter(
                "nlp_entities_extracted_total",
                &[("entity_type", "DATABASE")]
            ),
            3
        );
    }
}
