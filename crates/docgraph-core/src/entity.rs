use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    // General technology
    Technology,
    Framework,
    Language,
    Api,
    Database,
    ArchPattern,

    // Banking and finance
    FinancialProduct,
    Transaction,
    Currency,
    Account,
    Regulation,
    Risk,

    // Software engineering
    Component,
    Service,
    Library,
    Protocol,
    Cloud,
    Devops,
    DesignPattern,
    Security,
    Infrastructure,
    MachineLearning,
    Testing,
    Monitoring,
}

impl EntityType {
    pub const ALL: [Self; 24] = [
        Self::Technology,
        Self::Framework,
        Self::Language,
        Self::Api,
        Self::Database,
        Self::ArchPattern,
        Self::FinancialProduct,
        Self::Transaction,
        Self::Currency,
        Self::Account,
        Self::Regulation,
        Self::Risk,
        Self::Component,
        Self::Service,
        Self::Library,
        Self::Protocol,
        Self::Cloud,
        Self::Devops,
        Self::DesignPattern,
        Self::Security,
        Self::Infrastructure,
        Self::MachineLearning,
        Self::Testing,
        Self::Monitoring,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Technology => "TECHNOLOGY",
            Self::Framework => "FRAMEWORK",
            Self::Language => "LANGUAGE",
            Self::Api => "API",
            Self::Database => "DATABASE",
            Self::ArchPattern => "ARCH_PATTERN",
            Self::FinancialProduct => "FINANCIAL_PRODUCT",
            Self::Transaction => "TRANSACTION",
            Self::Currency => "CURRENCY",
            Self::Account => "ACCOUNT",
            Self::Regulation => "REGULATION",
            Self::Risk => "RISK",
            Self::Component => "COMPONENT",
            Self::Service => "SERVICE",
            Self::Library => "LIBRARY",
            Self::Protocol => "PROTOCOL",
            Self::Cloud => "CLOUD",
            Self::Devops => "DEVOPS",
            Self::DesignPattern => "DESIGN_PATTERN",
            Self::Security => "SECURITY",
            Self::Infrastructure => "INFRASTRUCTURE",
            Self::MachineLearning => "MACHINE_LEARNING",
            Self::Testing => "TESTING",
            Self::Monitoring => "MONITORING",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| crate::Error::InvalidEntityType(s.to_string()))
    }
}

/// Property key holding the byte offset where a mention starts.
pub const START_POS: &str = "start_pos";
/// Property key holding the byte offset where a mention ends.
pub const END_POS: &str = "end_pos";

/// A typed mention found in a single document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub label: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,
    pub confidence: f64,
}

impl Entity {
    #[must_use]
    pub fn new(label: impl Into<String>, entity_type: EntityType, confidence: f64) -> Self {
        Self {
            label: label.into(),
            entity_type,
            properties: BTreeMap::new(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    #[must_use]
    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.properties.insert(START_POS.into(), Value::from(start));
        self.properties.insert(END_POS.into(), Value::from(end));
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Byte span of the mention, when the producing stage recorded one.
    pub fn span(&self) -> Option<(usize, usize)> {
        let start = self.properties.get(START_POS)?.as_u64()?;
        let end = self.properties.get(END_POS)?.as_u64()?;
        Some((usize::try_from(start).ok()?, usize::try_from(end).ok()?))
    }
}
