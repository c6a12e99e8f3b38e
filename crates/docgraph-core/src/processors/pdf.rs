use lopdf::Document as PdfDocument;
use std::sync::Arc;

use super::{converted_metadata, MimeType, ParseError, ProcessResult, Processor, TextProcessor};
use crate::document::{Document, Metadata};

/// Extracts PDF text page by page and hands it to the plain-text processor.
/// A page whose text cannot be extracted is skipped.
pub struct PdfProcessor {
    text: Arc<TextProcessor>,
}

impl PdfProcessor {
    #[must_use]
    pub const fn new(text: Arc<TextProcessor>) -> Self {
        Self { text }
    }

    pub fn extract_text(bytes: &[u8]) -> Result<String, ParseError> {
        let pdf = PdfDocument::load_mem(bytes).map_err(|e| ParseError::Pdf(e.to_string()))?;

        let mut pages = Vec::new();
        for page_number in pdf.get_pages().keys() {
            match pdf.extract_text(&[*page_number]) {
                Ok(text) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        pages.push(text.to_string());
                    }
                }
                Err(e) => tracing::debug!(page = page_number, error = %e, "skipping unreadable page"),
            }
        }

        Ok(pages.join("\n\n"))
    }
}

#[async_trait::async_trait]
impl Processor for PdfProcessor {
    fn supported_types(&self) -> &[MimeType] {
        &[MimeType::Pdf]
    }

    async fn process(&self, content: &[u8], metadata: &Metadata) -> ProcessResult<Document> {
        let text = Self::extract_text(content)?;

        tracing::debug!(pdf_bytes = content.len(), text_bytes = text.len(), "extracted PDF text");
        Ok(self
            .text
            .process_text(&text, converted_metadata(metadata, MimeType::Pdf)))
    }
}
