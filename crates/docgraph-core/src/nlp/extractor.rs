use regex::Regex;

use crate::config::ExtractorConfig;
use crate::document::{Sentence, Token};
use crate::entity::{Entity, EntityType};
use crate::relationship::{RelationType, Relationship};

use super::tokenizer;

/// Vocabulary table, scanned in order. Overlapping alternatives are
/// intentional: one span may yield several entities of different types.
const ENTITY_PATTERNS: &[(&str, EntityType)] = &[
    (r"kubernetes|docker|jenkins|git|terraform|aws|azure", EntityType::Technology),
    (r"spring|react|angular|vue|django|flask", EntityType::Framework),
    (r"java|python|golang|javascript|typescript", EntityType::Language),
    (r"rest|graphql|grpc|soap|websocket", EntityType::Api),
    (r"mysql|postgresql|mongodb|redis|elasticsearch", EntityType::Database),
    (r"microservices|mvc|mvvm|cqrs|event-sourcing", EntityType::ArchPattern),
    (
        r"loan|mortgage|deposit|credit card|debit card|savings account",
        EntityType::FinancialProduct,
    ),
    (r"payment|transfer|withdrawal|deposit|transaction", EntityType::Transaction),
    (r"usd|eur|gbp|jpy|thb|sgd|\$|€|£|¥", EntityType::Currency),
    (r"checking|savings|current|investment|retirement", EntityType::Account),
    (r"basel|kyc|aml|fatca|gdpr|psd2", EntityType::Regulation),
    (
        r"credit risk|market risk|operational risk|liquidity risk",
        EntityType::Risk,
    ),
    (r"microservice|api gateway|load balancer|cache|queue", EntityType::Component),
    (r"rest api|graphql|grpc|webhook|service mesh", EntityType::Service),
    (r"spring|react|angular|vue|django|flask|express", EntityType::Framework),
    (r"numpy|pandas|tensorflow|pytorch|kubernetes|docker", EntityType::Library),
    (r"https?|tcp|udp|mqtt|amqp|websocket", EntityType::Protocol),
    (r"oauth|jwt|saml|openid|x509", EntityType::Security),
    (
        r"mysql|postgresql|mongodb|redis|elasticsearch|kafka",
        EntityType::Database,
    ),
    (r"aws|azure|gcp|cloud|kubernetes|docker", EntityType::Cloud),
    (r"jenkins|gitlab|github|circleci|argocd", EntityType::Devops),
    (
        r"microservices|event-driven|cqrs|saga|circuit breaker",
        EntityType::ArchPattern,
    ),
    (r"singleton|factory|observer|strategy|decorator", EntityType::DesignPattern),
    (
        r"tensorflow|pytorch|scikit-learn|bert|gpt|transformers",
        EntityType::MachineLearning,
    ),
    (r"java|python|golang|javascript|typescript|rust", EntityType::Language),
    (r"junit|pytest|jest|selenium|cypress", EntityType::Testing),
    (r"prometheus|grafana|datadog|newrelic|splunk", EntityType::Monitoring),
];

/// Lowercased fragments that mark a token as a subject/object candidate.
const DOMAIN_NOUNS: &[&str] = &[
    "api", "sdk", "cli", "gui", "rest", "http", "database", "server", "client", "service",
    "container", "cloud", "cluster", "pod", "account", "payment", "transfer", "loan", "card",
    "balance", "transaction", "investment", "risk", "compliance", "bank", "branch",
];

const TECHNICAL_VERBS: &[(&str, RelationType)] = &[
    ("deploys", RelationType::DeploysTo),
    ("implements", RelationType::Implements),
    ("integrates", RelationType::IntegratesWith),
    ("connects", RelationType::ConnectsTo),
    ("hosts", RelationType::Hosts),
    ("serves", RelationType::Serves),
    ("queries", RelationType::Queries),
    ("processes", RelationType::Processes),
    ("executes", RelationType::Executes),
    ("compiles", RelationType::Compiles),
    ("builds", RelationType::Builds),
    ("tests", RelationType::Tests),
];

const BANKING_VERBS: &[(&str, RelationType)] = &[
    ("transfers", RelationType::TransfersTo),
    ("deposits", RelationType::DepositsInto),
    ("withdraws", RelationType::WithdrawsFrom),
    ("pays", RelationType::PaysTo),
    ("invests", RelationType::InvestsIn),
    ("lends", RelationType::LendsTo),
    ("borrows", RelationType::BorrowsFrom),
    ("processes", RelationType::Processes),
    ("approves", RelationType::Approves),
    ("declines", RelationType::Declines),
    ("validates", RelationType::Validates),
    ("authorizes", RelationType::Authorizes),
];

const SOFTWARE_VERBS: &[(&str, RelationType)] = &[
    ("depends", RelationType::DependsOn),
    ("implements", RelationType::Implements),
    ("calls", RelationType::CommunicatesWith),
    ("extends", RelationType::Extends),
    ("configures", RelationType::Configures),
    ("deploys", RelationType::Deploys),
    ("monitors", RelationType::Monitors),
    ("tests", RelationType::Tests),
    ("integrates", RelationType::Integrates),
    ("orchestrates", RelationType::Orchestrates),
];

pub struct EntityPattern {
    pub entity_type: EntityType,
    pub regex: Regex,
}

impl EntityPattern {
    /// Compile `pattern` case-insensitively.
    pub fn new(entity_type: EntityType, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            entity_type,
            regex: Regex::new(&format!("(?i)(?:{pattern})"))?,
        })
    }
}

/// Pattern-based entity and verb-anchored relationship extraction.
pub struct EntityExtractor {
    patterns: Vec<EntityPattern>,
    config: ExtractorConfig,
}

impl EntityExtractor {
    #[must_use]
    pub fn new(config: ExtractorConfig) -> Self {
        let mut patterns = Vec::with_capacity(ENTITY_PATTERNS.len());
        for (pattern, entity_type) in ENTITY_PATTERNS {
            match EntityPattern::new(*entity_type, pattern) {
                Ok(p) => patterns.push(p),
                Err(e) => tracing::warn!(pattern, error = %e, "skipping invalid entity pattern"),
            }
        }

        Self { patterns, config }
    }

    /// Tokenize `text` and run both extraction passes over it.
    #[must_use]
    pub fn extract_text(&self, text: &str) -> (Vec<Entity>, Vec<Relationship>) {
        let sentences = tokenizer::analyze(text);
        self.extract(text, &sentences)
    }

    /// Extract entities from `text` and relationships from its tagged
    /// `sentences`.
    #[must_use]
    pub fn extract(&self, text: &str, sentences: &[Sentence]) -> (Vec<Entity>, Vec<Relationship>) {
        let tokens: Vec<&Token> = tokenizer::tokens(sentences).collect();
        (self.entities(text), self.relationships(&tokens))
    }

    #[must_use]
    pub fn entities(&self, text: &str) -> Vec<Entity> {
        let mut entities = Vec::new();
        for pattern in &self.patterns {
            for m in pattern.regex.find_iter(text) {
                entities.push(
                    Entity::new(m.as_str(), pattern.entity_type, self.config.entity_confidence)
                        .with_span(m.start(), m.end()),
                );
            }
        }
        entities
    }

    /// Relationships anchored on present-tense verbs. The first pass uses the
    /// technical and banking verb tables, the second the software verb table.
    #[must_use]
    pub fn relationships(&self, tokens: &[&Token]) -> Vec<Relationship> {
        let mut relations = Vec::new();
        let mut anchored = vec![false; tokens.len()];

        for (i, token) in tokens.iter().enumerate() {
            if !token.tag.is_present_verb() {
                continue;
            }
            let verb = token.text.to_lowercase();
            let Some(relation_type) =
                lookup(TECHNICAL_VERBS, &verb).or_else(|| lookup(BANKING_VERBS, &verb))
            else {
                continue;
            };

            if let Some(rel) = self.relate(tokens, i, relation_type) {
                anchored[i] = true;
                relations.push(rel);
            }
        }

        for (i, token) in tokens.iter().enumerate() {
            if !token.tag.is_present_verb() {
                continue;
            }
            if self.config.single_relation_per_verb && anchored[i] {
                continue;
            }
            let verb = token.text.to_lowercase();
            let Some(relation_type) = lookup(SOFTWARE_VERBS, &verb) else {
                continue;
            };

            if let Some(rel) = self.relate(tokens, i, relation_type) {
                relations.push(rel);
            }
        }

        relations
    }

    fn relate(
        &self,
        tokens: &[&Token],
        verb_index: usize,
        relation_type: RelationType,
    ) -> Option<Relationship> {
        let distance = self.config.search_distance;

        let subject = (verb_index.saturating_sub(distance)..verb_index)
            .rev()
            .find(|&j| is_domain_noun(tokens[j]))?;
        let object = (verb_index + 1..tokens.len().min(verb_index + 1 + distance))
            .find(|&j| is_domain_noun(tokens[j]))?;

        Some(Relationship::new(
            relation_type,
            tokens[subject].text.clone(),
            tokens[object].text.clone(),
            self.config.relation_confidence,
        ))
    }
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

fn lookup(table: &[(&str, RelationType)], verb: &str) -> Option<RelationType> {
    table.iter().find(|(v, _)| *v == verb).map(|(_, t)| *t)
}

fn is_domain_noun(token: &Token) -> bool {
    let lower = token.text.to_lowercase();
    DOMAIN_NOUNS.iter().any(|noun| lower.contains(noun))
}
