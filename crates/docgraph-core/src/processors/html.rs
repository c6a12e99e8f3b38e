use scraper::{Html, Selector};
use std::sync::Arc;

use super::{converted_metadata, MimeType, ParseError, ProcessResult, Processor, TextProcessor};
use crate::document::{Document, Metadata};

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Reduces an HTML page to the text of its `<body>` and hands it to the
/// plain-text processor.
pub struct HtmlProcessor {
    text: Arc<TextProcessor>,
}

impl HtmlProcessor {
    #[must_use]
    pub const fn new(text: Arc<TextProcessor>) -> Self {
        Self { text }
    }

    /// Body text nodes concatenated as they appear, with runs of whitespace
    /// then collapsed to single spaces. Inline markup never splits a word.
    pub fn body_text(html: &str) -> Result<String, ParseError> {
        let selector = Selector::parse("body").map_err(|e| ParseError::Html(e.to_string()))?;
        let document = Html::parse_document(html);

        let Some(body) = document.select(&selector).next() else {
            return Ok(String::new());
        };

        let mut text = String::new();
        for node in body.descendants() {
            let Some(chunk) = node.value().as_text() else {
                continue;
            };
            let skipped = node
                .parent()
                .and_then(|p| p.value().as_element())
                .is_some_and(|e| SKIPPED_ELEMENTS.contains(&e.name()));
            if !skipped {
                text.push_str(chunk);
            }
        }

        Ok(text.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

#[async_trait::async_trait]
impl Processor for HtmlProcessor {
    fn supported_types(&self) -> &[MimeType] {
        &[MimeType::Html]
    }

    async fn process(&self, content: &[u8], metadata: &Metadata) -> ProcessResult<Document> {
        let html = std::str::from_utf8(content).map_err(|e| ParseError::Html(e.to_string()))?;
        let text = Self::body_text(html)?;

        tracing::debug!(html_bytes = content.len(), text_bytes = text.len(), "extracted HTML body");
        Ok(self
            .text
            .process_text(&text, converted_metadata(metadata, MimeType::Html)))
    }
}
