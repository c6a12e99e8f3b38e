use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Pipeline configuration, deserialized from TOML.
///
/// Every section falls back to its defaults, so an empty file is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub extractor: ExtractorConfig,
    pub coreference: CoreferenceConfig,
    pub keywords: KeywordConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Documents processed concurrently per batch.
    pub batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { batch_size: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub entity_confidence: f64,
    pub relation_confidence: f64,
    /// Tokens searched on each side of a verb for a subject/object.
    pub search_distance: usize,
    /// Emit at most one relationship per verb occurrence instead of one per
    /// matching verb table.
    pub single_relation_per_verb: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            entity_confidence: 0.9,
            relation_confidence: 0.85,
            search_distance: 5,
            single_relation_per_verb: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreferenceConfig {
    pub max_sentence_lookback: usize,
    pub sentence_distance_weight: usize,
}

impl Default for CoreferenceConfig {
    fn default() -> Self {
        Self {
            max_sentence_lookback: 3,
            sentence_distance_weight: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub window: usize,
    pub damping: f64,
    pub epsilon: f64,
    pub max_iterations: usize,
    pub max_keywords: usize,
    pub technical_boost: f64,
    pub banking_boost: f64,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            window: 4,
            damping: 0.85,
            epsilon: 0.0001,
            max_iterations: 50,
            max_keywords: 10,
            technical_boost: 1.5,
            banking_boost: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub output_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("knowledge_graph.json"),
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Apply `DOCGRAPH_*` environment overrides on top of the current values.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(size) = std::env::var("DOCGRAPH_BATCH_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|size| *size > 0)
        {
            self.pipeline.batch_size = size;
        }

        if let Ok(path) = std::env::var("DOCGRAPH_OUTPUT_PATH") {
            self.storage.output_path = PathBuf::from(path);
        }

        if let Ok(v) = std::env::var("DOCGRAPH_SINGLE_RELATION_PER_VERB") {
            self.extractor.single_relation_per_verb = v == "1" || v.eq_ignore_ascii_case("true");
        }

        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.batch_size == 0 {
            return Err(Error::Config("pipeline.batch_size must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.extractor.entity_confidence)
            || !(0.0..=1.0).contains(&self.extractor.relation_confidence)
        {
            return Err(Error::Config("extractor confidences must be within 0..=1".into()));
        }
        if !(0.0..1.0).contains(&self.keywords.damping) {
            return Err(Error::Config("keywords.damping must be within 0..1".into()));
        }
        Ok(())
    }
}
