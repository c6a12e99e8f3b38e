//! Processing stages: the plain-text NLP processor, format adapters and the
//! MIME-type router that fronts them.

mod html;
mod pdf;
mod text;

pub use html::HtmlProcessor;
pub use pdf::PdfProcessor;
pub use text::TextProcessor;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::document::{Document, Metadata, MIME_TYPE_KEY, SOURCE_MIME_TYPE_KEY};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),
    #[error("Encoding error: {0}")]
    Encoding(String),
    #[error("HTML parse failed: {0}")]
    Html(String),
    #[error("PDF parse failed: {0}")]
    Pdf(String),
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Processing failed: {0}")]
    Failed(String),
}

pub type ProcessResult<T> = Result<T, ProcessError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MimeType {
    #[serde(rename = "text/plain")]
    PlainText,
    #[serde(rename = "text/markdown")]
    Markdown,
    #[serde(rename = "text/html")]
    Html,
    #[serde(rename = "application/pdf")]
    Pdf,
}

impl MimeType {
    pub const ALL: [Self; 4] = [Self::PlainText, Self::Markdown, Self::Html, Self::Pdf];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "text/plain",
            Self::Markdown => "text/markdown",
            Self::Html => "text/html",
            Self::Pdf => "application/pdf",
        }
    }

    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "txt" => Some(Self::PlainText),
            "md" | "markdown" => Some(Self::Markdown),
            "html" | "htm" => Some(Self::Html),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

impl std::fmt::Display for MimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MimeType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Parameters such as "; charset=utf-8" do not affect routing.
        let essence = s.split(';').next().unwrap_or_default().trim();
        Self::ALL
            .iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(essence))
            .copied()
            .ok_or_else(|| ParseError::UnsupportedType(s.to_string()))
    }
}

/// One stage of the pipeline. Receives the previous stage's bytes and
/// metadata and returns a new document.
#[async_trait::async_trait]
pub trait Processor: Send + Sync {
    fn supported_types(&self) -> &[MimeType];

    fn can_process(&self, mime_type: MimeType) -> bool {
        self.supported_types().contains(&mime_type)
    }

    async fn process(&self, content: &[u8], metadata: &Metadata) -> ProcessResult<Document>;
}

/// Metadata handed from a format adapter to the plain-text processor.
pub(crate) fn converted_metadata(metadata: &Metadata, from: MimeType) -> Metadata {
    let mut metadata = metadata.clone();
    metadata.insert(SOURCE_MIME_TYPE_KEY.into(), Value::from(from.as_str()));
    metadata.insert(
        MIME_TYPE_KEY.into(),
        Value::from(MimeType::PlainText.as_str()),
    );
    metadata
}

/// Dispatches on the `mime_type` metadata key to the first registered
/// processor that supports it. Documents without the key are plain text.
pub struct FormatRouter {
    processors: Vec<Arc<dyn Processor>>,
}

impl FormatRouter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            processors: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_processor(mut self, processor: Arc<dyn Processor>) -> Self {
        self.processors.push(processor);
        self
    }

    pub fn add_processor(&mut self, processor: Arc<dyn Processor>) {
        self.processors.push(processor);
    }

    /// Text, HTML and PDF adapters sharing one plain-text processor.
    #[must_use]
    pub fn with_defaults(text: Arc<TextProcessor>) -> Self {
        Self::new()
            .with_processor(text.clone())
            .with_processor(Arc::new(HtmlProcessor::new(text.clone())))
            .with_processor(Arc::new(PdfProcessor::new(text)))
    }

    fn find_processor(&self, mime_type: MimeType) -> Option<&dyn Processor> {
        self.processors
            .iter()
            .find(|p| p.can_process(mime_type))
            .map(Arc::as_ref)
    }

    fn mime_type(metadata: &Metadata) -> Result<MimeType, ParseError> {
        match metadata.get(MIME_TYPE_KEY) {
            None | Some(Value::Null) => Ok(MimeType::PlainText),
            Some(Value::String(s)) => s.parse(),
            Some(other) => Err(ParseError::UnsupportedType(other.to_string())),
        }
    }
}

impl Default for FormatRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Processor for FormatRouter {
    fn supported_types(&self) -> &[MimeType] {
        &MimeType::ALL
    }

    fn can_process(&self, mime_type: MimeType) -> bool {
        self.find_processor(mime_type).is_some()
    }

    async fn process(&self, content: &[u8], metadata: &Metadata) -> ProcessResult<Document> {
        let mime_type = Self::mime_type(metadata)?;
        let processor = self
            .find_processor(mime_type)
            .ok_or_else(|| ParseError::UnsupportedType(mime_type.to_string()))?;

        tracing::debug!(%mime_type, bytes = content.len(), "routing document");
        processor.process(content, metadata).await
    }
}
