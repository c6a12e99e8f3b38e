use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::entity::Entity;
use crate::relationship::Relationship;

/// Free-form document metadata.
pub type Metadata = BTreeMap<String, Value>;

/// Metadata key naming the MIME type of a document's raw bytes.
pub const MIME_TYPE_KEY: &str = "mime_type";
/// Metadata key recording the MIME type a format adapter converted from.
pub const SOURCE_MIME_TYPE_KEY: &str = "source_mime_type";

/// Penn Treebank part-of-speech tags produced by the tagger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PosTag {
    #[serde(rename = "NN")]
    Noun,
    #[serde(rename = "NNS")]
    PluralNoun,
    #[serde(rename = "NNP")]
    ProperNoun,
    #[serde(rename = "NNPS")]
    PluralProperNoun,
    #[serde(rename = "VB")]
    VerbBase,
    #[serde(rename = "VBZ")]
    VerbThirdPerson,
    #[serde(rename = "VBP")]
    VerbPresent,
    #[serde(rename = "VBD")]
    VerbPast,
    #[serde(rename = "VBG")]
    VerbGerund,
    #[serde(rename = "VBN")]
    VerbParticiple,
    #[serde(rename = "MD")]
    Modal,
    #[serde(rename = "DT")]
    Determiner,
    #[serde(rename = "IN")]
    Preposition,
    #[serde(rename = "PRP")]
    Pronoun,
    #[serde(rename = "PRP$")]
    PossessivePronoun,
    #[serde(rename = "CC")]
    Conjunction,
    #[serde(rename = "JJ")]
    Adjective,
    #[serde(rename = "RB")]
    Adverb,
    #[serde(rename = "CD")]
    Number,
    #[serde(rename = "TO")]
    To,
    #[serde(rename = "SYM")]
    Symbol,
    #[serde(rename = ".")]
    Punctuation,
}

impl PosTag {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Noun => "NN",
            Self::PluralNoun => "NNS",
            Self::ProperNoun => "NNP",
            Self::PluralProperNoun => "NNPS",
            Self::VerbBase => "VB",
            Self::VerbThirdPerson => "VBZ",
            Self::VerbPresent => "VBP",
            Self::VerbPast => "VBD",
            Self::VerbGerund => "VBG",
            Self::VerbParticiple => "VBN",
            Self::Modal => "MD",
            Self::Determiner => "DT",
            Self::Preposition => "IN",
            Self::Pronoun => "PRP",
            Self::PossessivePronoun => "PRP$",
            Self::Conjunction => "CC",
            Self::Adjective => "JJ",
            Self::Adverb => "RB",
            Self::Number => "CD",
            Self::To => "TO",
            Self::Symbol => "SYM",
            Self::Punctuation => ".",
        }
    }

    #[must_use]
    pub const fn is_noun(&self) -> bool {
        matches!(
            self,
            Self::Noun | Self::PluralNoun | Self::ProperNoun | Self::PluralProperNoun
        )
    }

    /// Base, third-person singular or non-third-person present verb.
    #[must_use]
    pub const fn is_present_verb(&self) -> bool {
        matches!(
            self,
            Self::VerbBase | Self::VerbThirdPerson | Self::VerbPresent
        )
    }
}

impl std::fmt::Display for PosTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub tag: PosTag,
    pub start: usize,
    pub end: usize,
    pub lemma: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub tokens: Vec<Token>,
}

impl Sentence {
    /// Whether the byte offset falls inside this sentence.
    #[must_use]
    pub const fn contains_offset(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub text: String,
    pub score: f64,
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub keyword_type: String,
}

impl Keyword {
    #[must_use]
    pub fn new(text: String, score: f64, start: usize) -> Self {
        let end = start + text.len();
        Self {
            text,
            score,
            start,
            end,
            keyword_type: "keyword".into(),
        }
    }
}

/// A document as it moves through the pipeline.
///
/// `raw` holds the undecoded input bytes until the first stage consumes them;
/// every stage output carries extracted text in `content` instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    #[serde(skip)]
    pub raw: Option<Vec<u8>>,
    #[serde(default)]
    pub sentences: Vec<Sentence>,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relations: Vec<Relationship>,
    #[serde(default)]
    pub keywords: Vec<Keyword>,
    #[serde(default)]
    pub metadata: Metadata,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Document {
    #[must_use]
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Bytes the first pipeline stage should consume.
    #[must_use]
    pub fn input_bytes(&self) -> &[u8] {
        self.raw.as_deref().unwrap_or(self.content.as_bytes())
    }

    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        self.metadata.get(MIME_TYPE_KEY).and_then(Value::as_str)
    }

    #[must_use]
    pub const fn is_processed(&self) -> bool {
        self.processed_at.is_some()
    }
}

/// Caller-supplied input: id, bytes, declared MIME type and metadata.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub id: String,
    pub content: Vec<u8>,
    pub mime_type: String,
    pub metadata: Metadata,
}

impl RawDocument {
    #[must_use]
    pub fn new(id: impl Into<String>, content: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content,
            mime_type: mime_type.into(),
            metadata: Metadata::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

impl From<RawDocument> for Document {
    fn from(raw: RawDocument) -> Self {
        let mut metadata = raw.metadata;
        metadata.insert(MIME_TYPE_KEY.into(), Value::String(raw.mime_type));

        let content = std::str::from_utf8(&raw.content)
            .map(str::to_string)
            .unwrap_or_default();

        Self {
            id: raw.id,
            content,
            raw: Some(raw.content),
            metadata,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_document_conversion() {
        let raw = RawDocument::new("doc-1", b"Hello".to_vec(), "text/plain")
            .with_metadata("filename", Value::from("hello.txt"));
        let doc = Document::from(raw);

        assert_eq!(doc.id, "doc-1");
        assert_eq!(doc.content, "Hello");
        assert_eq!(doc.mime_type(), Some("text/plain"));
        assert_eq!(doc.input_bytes(), b"Hello");
        assert!(!doc.is_processed());
    }

    #[test]
    fn test_binary_raw_document_keeps_bytes() {
        let bytes = vec![0x25, 0x50, 0xff, 0xfe];
        let doc = Document::from(RawDocument::new("pdf", bytes.clone(), "application/pdf"));

        assert!(doc.content.is_empty());
        assert_eq!(doc.input_bytes(), bytes.as_slice());
    }

    #[test]
    fn test_pos_tag_classes() {
        assert!(PosTag::ProperNoun.is_noun());
        assert!(!PosTag::VerbThirdPerson.is_noun());
        assert!(PosTag::VerbPresent.is_present_verb());
        assert!(!PosTag::VerbPast.is_present_verb());
        assert_eq!(PosTag::PossessivePronoun.as_str(), "PRP$");
    }

    #[test]
    fn test_keyword_end_offset() {
        let kw = Keyword::new("database".into(), 1.2, 10);
        assert_eq!(kw.end, 18);
        assert_eq!(kw.keyword_type, "keyword");
    }
}
