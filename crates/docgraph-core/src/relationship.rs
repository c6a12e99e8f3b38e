use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    // Software engineering
    DependsOn,
    Implements,
    CommunicatesWith,
    Extends,
    Configures,
    Deploys,
    Monitors,
    Tests,
    Integrates,
    Orchestrates,

    // Technical verbs
    DeploysTo,
    IntegratesWith,
    ConnectsTo,
    Hosts,
    Serves,
    Queries,
    Executes,
    Compiles,
    Builds,

    // Transactions
    TransfersTo,
    DepositsInto,
    WithdrawsFrom,
    PaysTo,
    InvestsIn,
    LendsTo,
    BorrowsFrom,
    Processes,
    Approves,
    Declines,
    Validates,
    Authorizes,

    // Generic
    RelatedTo,
}

impl RelationType {
    pub const ALL: [Self; 32] = [
        Self::DependsOn,
        Self::Implements,
        Self::CommunicatesWith,
        Self::Extends,
        Self::Configures,
        Self::Deploys,
        Self::Monitors,
        Self::Tests,
        Self::Integrates,
        Self::Orchestrates,
        Self::DeploysTo,
        Self::IntegratesWith,
        Self::ConnectsTo,
        Self::Hosts,
        Self::Serves,
        Self::Queries,
        Self::Executes,
        Self::Compiles,
        Self::Builds,
        Self::TransfersTo,
        Self::DepositsInto,
        Self::WithdrawsFrom,
        Self::PaysTo,
        Self::InvestsIn,
        Self::LendsTo,
        Self::BorrowsFrom,
        Self::Processes,
        Self::Approves,
        Self::Declines,
        Self::Validates,
        Self::Authorizes,
        Self::RelatedTo,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DependsOn => "DEPENDS_ON",
            Self::Implements => "IMPLEMENTS",
            Self::CommunicatesWith => "COMMUNICATES_WITH",
            Self::Extends => "EXTENDS",
            Self::Configures => "CONFIGURES",
            Self::Deploys => "DEPLOYS",
            Self::Monitors => "MONITORS",
            Self::Tests => "TESTS",
            Self::Integrates => "INTEGRATES",
            Self::Orchestrates => "ORCHESTRATES",
            Self::DeploysTo => "DEPLOYS_TO",
            Self::IntegratesWith => "INTEGRATES_WITH",
            Self::ConnectsTo => "CONNECTS_TO",
            Self::Hosts => "HOSTS",
            Self::Serves => "SERVES",
            Self::Queries => "QUERIES",
            Self::Executes => "EXECUTES",
            Self::Compiles => "COMPILES",
            Self::Builds => "BUILDS",
            Self::TransfersTo => "TRANSFERS_TO",
            Self::DepositsInto => "DEPOSITS_INTO",
            Self::WithdrawsFrom => "WITHDRAWS_FROM",
            Self::PaysTo => "PAYS_TO",
            Self::InvestsIn => "INVESTS_IN",
            Self::LendsTo => "LENDS_TO",
            Self::BorrowsFrom => "BORROWS_FROM",
            Self::Processes => "PROCESSES",
            Self::Approves => "APPROVES",
            Self::Declines => "DECLINES",
            Self::Validates => "VALIDATES",
            Self::Authorizes => "AUTHORIZES",
            Self::RelatedTo => "RELATED_TO",
        }
    }

    #[must_use]
    pub const fn is_transactional(&self) -> bool {
        matches!(
            self,
            Self::TransfersTo
                | Self::DepositsInto
                | Self::WithdrawsFrom
                | Self::PaysTo
                | Self::InvestsIn
                | Self::LendsTo
                | Self::BorrowsFrom
                | Self::Processes
                | Self::Approves
                | Self::Declines
                | Self::Validates
                | Self::Authorizes
        )
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| crate::Error::InvalidRelationType(s.to_string()))
    }
}

/// A typed link between two entity labels within one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,
    pub confidence: f64,
}

impl Relationship {
    #[must_use]
    pub fn new(
        relation_type: RelationType,
        from: impl Into<String>,
        to: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            relation_type,
            from: from.into(),
            to: to.into(),
            properties: BTreeMap::new(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_type_parse() {
        assert_eq!(
            "DEPENDS_ON".parse::<RelationType>().unwrap(),
            RelationType::DependsOn
        );
        assert_eq!(
            "WITHDRAWS_FROM".parse::<RelationType>().unwrap(),
            RelationType::WithdrawsFrom
        );
        assert!("owns".parse::<RelationType>().is_err());
    }

    #[test]
    fn test_relation_type_names_unique() {
        let mut names: Vec<&str> = RelationType::ALL.iter().map(RelationType::as_str).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), RelationType::ALL.len());
    }

    #[test]
    fn test_transactional_relations() {
        assert!(RelationType::PaysTo.is_transactional());
        assert!(!RelationType::DependsOn.is_transactional());
    }

    #[test]
    fn test_relationship_serializes_type_field() {
        let rel = Relationship::new(RelationType::Hosts, "Cluster", "Pod", 0.85);
        let json = serde_json::to_value(&rel).unwrap();
        assert_eq!(json["type"], "HOSTS");
        assert_eq!(json["from"], "Cluster");
    }
}
