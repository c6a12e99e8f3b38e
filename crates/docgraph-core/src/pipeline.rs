use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, PipelineConfig};
use crate::document::{Document, RawDocument};
use crate::metrics::{MetricsSink, Outcome, TracingMetrics};
use crate::processors::{FormatRouter, MimeType, ProcessError, Processor, TextProcessor};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no processors configured")]
    NoProcessors,
    #[error("stage {index} failed: {source}")]
    Stage {
        index: usize,
        #[source]
        source: ProcessError,
    },
    #[error("processing cancelled")]
    Cancelled,
    #[error("{} document(s) failed: {}", .failures.len(), describe_failures(.failures))]
    Batch {
        failures: Vec<(String, PipelineError)>,
    },
    #[error("document task aborted: {0}")]
    Task(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

fn describe_failures(failures: &[(String, PipelineError)]) -> String {
    failures
        .iter()
        .map(|(id, e)| format!("{id}: {e}"))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Extensions picked up by [`Pipeline::ingest_directory`].
pub const INGEST_EXTENSIONS: &[&str] = &["txt", "md", "html", "htm", "pdf"];

/// Runs documents through an ordered list of processors.
///
/// Stages execute sequentially per document. `batch_process` fans documents
/// out in batches of `batch_size` concurrent tasks and never starts a batch
/// before the previous one has fully finished.
pub struct Pipeline {
    processors: Vec<Arc<dyn Processor>>,
    batch_size: usize,
    metrics: Arc<dyn MetricsSink>,
}

impl Pipeline {
    #[must_use]
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            processors: Vec::new(),
            batch_size: config.batch_size.max(1),
            metrics: Arc::new(TracingMetrics),
        }
    }

    /// Pipeline with a single [`FormatRouter`] over the text, HTML and PDF
    /// processors.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.pipeline).with_default_processors(config)
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Appends the default router. Its text processor reports to this
    /// pipeline's metrics sink, so call `with_metrics` first.
    #[must_use]
    pub fn with_default_processors(mut self, config: &Config) -> Self {
        let text = Arc::new(TextProcessor::new(config).with_metrics(self.metrics.clone()));
        self.add_processor(Arc::new(FormatRouter::with_defaults(text)));
        self
    }

    #[must_use]
    pub fn with_processor(mut self, processor: Arc<dyn Processor>) -> Self {
        self.add_processor(processor);
        self
    }

    pub fn add_processor(&mut self, processor: Arc<dyn Processor>) {
        self.processors.push(processor);
    }

    #[must_use]
    pub fn processor_count(&self) -> usize {
        self.processors.len()
    }

    /// Process one document through every stage. `doc` is replaced by the
    /// final stage's output, keeping its id, only if every stage succeeds.
    pub async fn process(
        &self,
        cancel: &CancellationToken,
        doc: &mut Document,
    ) -> PipelineResult<()> {
        let output =
            process_document(&self.processors, self.metrics.as_ref(), cancel, doc).await?;
        *doc = output;
        Ok(())
    }

    pub async fn process_raw(
        &self,
        cancel: &CancellationToken,
        raw: RawDocument,
    ) -> PipelineResult<Document> {
        let mut doc = Document::from(raw);
        self.process(cancel, &mut doc).await?;
        Ok(doc)
    }

    /// Process `docs` in batches. Successful documents are updated in place
    /// even when others in their batch fail; any failure aborts the call
    /// before the next batch starts. Cancellation during a batch surfaces as
    /// [`PipelineError::Cancelled`], never as a batch failure.
    pub async fn batch_process(
        &self,
        cancel: &CancellationToken,
        docs: &mut [Document],
    ) -> PipelineResult<()> {
        let processors: Arc<[Arc<dyn Processor>]> = self.processors.clone().into();
        let total_batches = docs.len().div_ceil(self.batch_size);

        tracing::info!(
            document_count = docs.len(),
            batch_size = self.batch_size,
            "starting batch processing"
        );

        for (batch, chunk) in docs.chunks_mut(self.batch_size).enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!(batch, "batch processing cancelled");
                return Err(PipelineError::Cancelled);
            }

            tracing::debug!(batch, total_batches, document_count = chunk.len(), "starting batch");

            let mut tasks = JoinSet::new();
            for (slot, doc) in chunk.iter().enumerate() {
                let processors = Arc::clone(&processors);
                let metrics = Arc::clone(&self.metrics);
                let cancel = cancel.clone();
                let doc = doc.clone();
                tasks.spawn(async move {
                    let result =
                        process_document(&processors, metrics.as_ref(), &cancel, &doc).await;
                    (slot, result)
                });
            }

            let mut failures = Vec::new();
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((slot, Ok(output))) => chunk[slot] = output,
                    Ok((slot, Err(e))) => failures.push((chunk[slot].id.clone(), e)),
                    Err(e) => failures.push((
                        String::from("<unknown>"),
                        PipelineError::Task(e.to_string()),
                    )),
                }
            }

            if cancel.is_cancelled() || failures.iter().any(|(_, e)| e.is_cancelled()) {
                tracing::warn!(batch, "batch processing cancelled");
                return Err(PipelineError::Cancelled);
            }
            if !failures.is_empty() {
                tracing::error!(batch, failed = failures.len(), "batch failed");
                return Err(PipelineError::Batch { failures });
            }
        }

        tracing::info!(document_count = docs.len(), "batch processing completed");
        Ok(())
    }

    /// Read every supported file below `dir` and batch-process the lot.
    /// Files that cannot be read are logged and skipped.
    pub async fn ingest_directory(
        &self,
        cancel: &CancellationToken,
        dir: &Path,
    ) -> PipelineResult<Vec<Document>> {
        let files = collect_input_files(dir).await?;
        let mut docs = Vec::with_capacity(files.len());

        for (path, mime_type) in files {
            let content = match tokio::fs::read(&path).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "failed to read input file");
                    continue;
                }
            };

            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let raw = RawDocument::new(uuid::Uuid::new_v4().to_string(), content, mime_type.as_str())
                .with_metadata("filename", Value::from(filename))
                .with_metadata("filepath", Value::from(path.to_string_lossy().to_string()));
            docs.push(Document::from(raw));
        }

        self.batch_process(cancel, &mut docs).await?;
        Ok(docs)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

async fn process_document(
    processors: &[Arc<dyn Processor>],
    metrics: &dyn MetricsSink,
    cancel: &CancellationToken,
    doc: &Document,
) -> PipelineResult<Document> {
    let start = Instant::now();
    let result = run_stages(processors, cancel, doc).await;

    let outcome = match &result {
        Ok(_) => Outcome::Success,
        Err(PipelineError::Cancelled) => Outcome::Cancelled,
        Err(_) => Outcome::Error,
    };
    metrics.record_duration("pipeline_document", outcome, start.elapsed().as_secs_f64());
    metrics.increment_counter(
        "pipeline_documents_processed_total",
        &[("status", outcome.as_str())],
    );

    result
}

async fn run_stages(
    processors: &[Arc<dyn Processor>],
    cancel: &CancellationToken,
    doc: &Document,
) -> PipelineResult<Document> {
    if processors.is_empty() {
        return Err(PipelineError::NoProcessors);
    }

    let mut current: Option<Document> = None;
    for (index, processor) in processors.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let input = current.as_ref().unwrap_or(doc);
        let output = processor
            .process(input.input_bytes(), &input.metadata)
            .await
            .map_err(|source| {
                tracing::error!(doc_id = %doc.id, stage = index, error = %source, "stage failed");
                PipelineError::Stage { index, source }
            })?;
        current = Some(output);
    }

    let mut output = current.ok_or(PipelineError::NoProcessors)?;
    output.id.clone_from(&doc.id);
    tracing::debug!(doc_id = %output.id, stages = processors.len(), "document processed");
    Ok(output)
}

async fn collect_input_files(dir: &Path) -> std::io::Result<Vec<(PathBuf, MimeType)>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                pending.push(path);
                continue;
            }

            let mime_type = path
                .extension()
                .and_then(|e| e.to_str())
                .filter(|e| INGEST_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                .and_then(MimeType::from_extension);
            if let Some(mime_type) = mime_type {
                files.push((path, mime_type));
            }
        }
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Metadata;
    use crate::metrics::InMemoryMetrics;
    use crate::processors::ProcessResult;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Appends a marker to the content and records concurrency.
    struct Marker {
        marker: &'static str,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        events: Mutex<Vec<(bool, String)>>,
    }

    impl Marker {
        fn new(marker: &'static str) -> Self {
            Self {
                marker,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                events: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl Processor for Marker {
        fn supported_types(&self) -> &[MimeType] {
            &[MimeType::PlainText]
        }

        async fn process(&self, content: &[u8], metadata: &Metadata) -> ProcessResult<Document> {
            let text = String::from_utf8_lossy(content).to_string();
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.events.lock().push((true, text.clone()));

            tokio::time::sleep(Duration::from_millis(20)).await;

            self.events.lock().push((false, text.clone()));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let mut doc = Document::new("stage-output", format!("{text}{}", self.marker));
            doc.metadata = metadata.clone();
            Ok(doc)
        }
    }

    struct Failing;

    #[async_trait::async_trait]
    impl Processor for Failing {
        fn supported_types(&self) -> &[MimeType] {
            &[MimeType::PlainText]
        }

        async fn process(&self, content: &[u8], _: &Metadata) -> ProcessResult<Document> {
            if content.starts_with(b"bad") {
                return Err(ProcessError::Failed("rejected".into()));
            }
            Ok(Document::new("x", format!("{}!", String::from_utf8_lossy(content))))
        }
    }

    fn docs(n: usize) -> Vec<Document> {
        (0..n)
            .map(|i| Document::new(format!("doc-{i}"), format!("doc-{i}")))
            .collect()
    }

    #[tokio::test]
    async fn test_process_threads_stages_and_keeps_id() {
        let pipeline = Pipeline::default()
            .with_processor(Arc::new(Marker::new("+a")))
            .with_processor(Arc::new(Marker::new("+b")));
        let mut doc = Document::new("original", "text");

        pipeline.process(&CancellationToken::new(), &mut doc).await.unwrap();

        assert_eq!(doc.id, "original");
        assert_eq!(doc.content, "text+a+b");
    }

    #[tokio::test]
    async fn test_no_processors() {
        let pipeline = Pipeline::default();
        let mut doc = Document::new("d", "text");
        let err = pipeline
            .process(&CancellationToken::new(), &mut doc)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoProcessors));
        assert_eq!(err.to_string(), "no processors configured");
    }

    #[tokio::test]
    async fn test_stage_failure_names_index_and_leaves_doc() {
        let pipeline = Pipeline::default()
            .with_processor(Arc::new(Marker::new("")))
            .with_processor(Arc::new(Failing))
            .with_processor(Arc::new(Marker::new("+never")));

        let mut doc = Document::new("d", "bad input");
        let err = pipeline
            .process(&CancellationToken::new(), &mut doc)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Stage { index: 1, .. }));
        assert!(err.to_string().contains("stage 1"));
        assert!(err.to_string().contains("rejected"));
        assert_eq!(doc.content, "bad input");
        assert!(doc.processed_at.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let metrics = Arc::new(InMemoryMetrics::new());
        let pipeline = Pipeline::default()
            .with_metrics(metrics.clone())
            .with_processor(Arc::new(Marker::new("+a")));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut doc = Document::new("d", "text");
        let err = pipeline.process(&cancel, &mut doc).await.unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(doc.content, "text");
        assert_eq!(
            metrics.counter(
                "pipeline_documents_processed_total",
                &[("status", "cancelled")]
            ),
            1
        );

        let mut batch = docs(3);
        let err = pipeline.batch_process(&cancel, &mut batch).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_batch_without_processors_fails() {
        let pipeline = Pipeline::default();
        let mut batch = docs(15);

        let err = pipeline
            .batch_process(&CancellationToken::new(), &mut batch)
            .await
            .unwrap_err();

        match &err {
            PipelineError::Batch { failures } => {
                assert_eq!(failures.len(), 10);
                assert!(failures
                    .iter()
                    .all(|(_, e)| matches!(e, PipelineError::NoProcessors)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("no processors configured"));
        assert!(batch.iter().all(|d| !d.is_processed()));
    }

    #[tokio::test]
    async fn test_batches_are_bounded_and_sequential() {
        let marker = Arc::new(Marker::new("!"));
        let metrics = Arc::new(InMemoryMetrics::new());
        let pipeline = Pipeline::default()
            .with_metrics(metrics.clone())
            .with_processor(marker.clone());
        let mut batch = docs(15);

        pipeline
            .batch_process(&CancellationToken::new(), &mut batch)
            .await
            .unwrap();

        assert_eq!(marker.peak.load(Ordering::SeqCst), 10);
        assert!(batch.iter().all(|d| d.content.ends_with('!')));
        assert_eq!(batch[12].id, "doc-12");

        let events = marker.events.lock();
        let first_batch = |text: &str| {
            text.trim_start_matches("doc-")
                .parse::<usize>()
                .is_ok_and(|i| i < 10)
        };
        let last_first_batch_end = events
            .iter()
            .rposition(|(start, text)| !start && first_batch(text))
            .unwrap();
        let first_second_batch_start = events
            .iter()
            .position(|(start, text)| *start && !first_batch(text))
            .unwrap();
        assert!(last_first_batch_end < first_second_batch_start);

        assert_eq!(
            metrics.counter(
                "pipeline_documents_processed_total",
                &[("status", "success")]
            ),
            15
        );
        assert_eq!(metrics.durations("pipeline_document").len(), 15);
    }

    #[tokio::test]
    async fn test_batch_failure_keeps_successes_and_stops() {
        let pipeline = Pipeline::new(&PipelineConfig { batch_size: 2 })
            .with_processor(Arc::new(Failing));
        let mut batch = vec![
            Document::new("ok-1", "fine"),
            Document::new("bad-1", "bad"),
            Document::new("ok-2", "fine"),
        ];

        let err = pipeline
            .batch_process(&CancellationToken::new(), &mut batch)
            .await
            .unwrap_err();

        match err {
            PipelineError::Batch { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].0, "bad-1");
            }
            other => panic!("unexpected error: {other}"),
        }
        // "ok-1" shared the failing batch and was still updated; the third
        // document's batch never started.
        assert_eq!(batch[0].id, "ok-1");
        assert_eq!(batch[0].content, "fine!");
        assert_eq!(batch[1].content, "bad");
        assert_eq!(batch[2].content, "fine");
    }

    /// Cancels the shared token while a document is mid-pipeline.
    struct CancelsToken(CancellationToken);

    #[async_trait::async_trait]
    impl Processor for CancelsToken {
        fn supported_types(&self) -> &[MimeType] {
            &[MimeType::PlainText]
        }

        async fn process(&self, content: &[u8], _: &Metadata) -> ProcessResult<Document> {
            self.0.cancel();
            Ok(Document::new("x", String::from_utf8_lossy(content)))
        }
    }

    #[tokio::test]
    async fn test_cancelled_mid_batch() {
        let metrics = Arc::new(InMemoryMetrics::new());
        let cancel = CancellationToken::new();
        let pipeline = Pipeline::new(&PipelineConfig { batch_size: 2 })
            .with_metrics(metrics.clone())
            .with_processor(Arc::new(CancelsToken(cancel.clone())))
            .with_processor(Arc::new(Marker::new("+b")));
        let mut batch = docs(3);

        let err = pipeline.batch_process(&cancel, &mut batch).await.unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(err.to_string(), "processing cancelled");
        assert!(batch.iter().all(|d| !d.content.ends_with("+b")));
        assert_eq!(
            metrics.counter(
                "pipeline_documents_processed_total",
                &[("status", "cancelled")]
            ),
            2
        );
    }

    #[tokio::test]
    async fn test_process_raw_routes_html() {
        let pipeline = Pipeline::from_config(&Config::default());
        let raw = RawDocument::new(
            "page",
            b"<html><body>The Server hosts the Database.</body></html>".to_vec(),
            "text/html",
        );

        let doc = pipeline
            .process_raw(&CancellationToken::new(), raw)
            .await
            .unwrap();

        assert_eq!(doc.id, "page");
        assert_eq!(doc.content, "The Server hosts the Database.");
        assert_eq!(doc.relations.len(), 1);
    }

    #[tokio::test]
    async fn test_process_raw_rejects_unknown_type() {
        let pipeline = Pipeline::from_config(&Config::default());
        let raw = RawDocument::new("img", vec![0x89, 0x50], "image/png");

        let err = pipeline
            .process_raw(&CancellationToken::new(), raw)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Stage { index: 0, .. }));
        assert!(err.to_string().contains("Unsupported type"));
    }

    #[tokio::test]
    async fn test_ingest_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "The Bank approves the Loan.").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(
            dir.path().join("nested").join("b.html"),
            "<body>Kafka queues events.</body>",
        )
        .unwrap();
        std::fs::write(dir.path().join("ignored.png"), [0u8, 1, 2]).unwrap();

        let pipeline = Pipeline::from_config(&Config::default());
        let docs = pipeline
            .ingest_directory(&CancellationToken::new(), dir.path())
            .await
            .unwrap();

        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(Document::is_processed));
        let names: Vec<&str> = docs
            .iter()
            .filter_map(|d| d.metadata.get("filename").and_then(Value::as_str))
            .collect();
        assert_eq!(names, vec!["a.txt", "b.html"]);
    }
}
