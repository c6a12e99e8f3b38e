use crate::config::CoreferenceConfig;
use crate::document::Sentence;
use crate::entity::Entity;

const PRONOUNS: &[&str] = &[
    "he", "him", "his", "she", "her", "hers", "it", "its", "they", "them", "their", "this",
    "that", "these", "those",
];

const MALE_PRONOUNS: &[&str] = &["he", "him", "his"];
const FEMALE_PRONOUNS: &[&str] = &["she", "her", "hers"];
const PLURAL_PRONOUNS: &[&str] = &["they", "them", "their", "theirs"];

const MALE_INDICATORS: &[&str] = &["Mr.", "Mr", "he", "him", "his", "father", "brother", "son"];
const FEMALE_INDICATORS: &[&str] = &[
    "Mrs.", "Mrs", "Ms.", "Ms", "she", "her", "mother", "sister", "daughter",
];

#[must_use]
pub fn is_pronoun(label: &str) -> bool {
    let lower = label.to_lowercase();
    PRONOUNS.contains(&lower.as_str())
}

/// Decides whether a pronoun may refer to a candidate antecedent label.
pub trait AgreementClassifier: Send + Sync {
    fn agrees(&self, pronoun: &str, candidate: &str) -> bool;
}

/// Gender and number agreement from indicator substrings. Low precision;
/// pronouns without a gender or number signal agree with anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicAgreement;

impl HeuristicAgreement {
    fn is_male(candidate: &str) -> bool {
        MALE_INDICATORS.iter().any(|i| candidate.contains(i))
    }

    fn is_female(candidate: &str) -> bool {
        FEMALE_INDICATORS.iter().any(|i| candidate.contains(i))
    }

    fn is_plural(candidate: &str) -> bool {
        candidate.ends_with('s')
            || candidate.ends_with("ren")
            || candidate.ends_with("ple")
            || candidate.contains(" and ")
    }
}

impl AgreementClassifier for HeuristicAgreement {
    fn agrees(&self, pronoun: &str, candidate: &str) -> bool {
        let pronoun = pronoun.to_lowercase();
        let pronoun = pronoun.as_str();

        if MALE_PRONOUNS.contains(&pronoun) {
            return Self::is_male(candidate);
        }
        if FEMALE_PRONOUNS.contains(&pronoun) {
            return Self::is_female(candidate);
        }
        if PLURAL_PRONOUNS.contains(&pronoun) {
            return Self::is_plural(candidate);
        }
        true
    }
}

/// Replaces pronoun entities with their nearest agreeing antecedent.
pub struct CoreferenceResolver {
    config: CoreferenceConfig,
    classifier: Box<dyn AgreementClassifier>,
}

impl CoreferenceResolver {
    #[must_use]
    pub fn new(config: CoreferenceConfig) -> Self {
        Self {
            config,
            classifier: Box::new(HeuristicAgreement),
        }
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: Box<dyn AgreementClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Returns a list of the same length as `entities`. Each resolved pronoun
    /// is substituted by a copy of its antecedent; unresolved pronouns and
    /// named entities pass through unchanged.
    #[must_use]
    pub fn resolve(&self, entities: &[Entity], sentences: &[Sentence]) -> Vec<Entity> {
        let mut resolved = entities.to_vec();

        for (slot, pronoun) in entities.iter().enumerate() {
            if !is_pronoun(&pronoun.label) {
                continue;
            }

            let Some((sentence_index, offset)) = locate(pronoun, sentences) else {
                tracing::trace!(pronoun = %pronoun.label, "pronoun not found in any sentence");
                continue;
            };

            if let Some(antecedent) =
                self.antecedent(pronoun, sentence_index, offset, entities, sentences)
            {
                tracing::trace!(
                    pronoun = %pronoun.label,
                    antecedent = %antecedent.label,
                    "resolved coreference"
                );
                resolved[slot] = antecedent.clone();
            }
        }

        resolved
    }

    fn antecedent<'a>(
        &self,
        pronoun: &Entity,
        sentence_index: usize,
        offset: usize,
        entities: &'a [Entity],
        sentences: &[Sentence],
    ) -> Option<&'a Entity> {
        let earliest = sentence_index.saturating_sub(self.config.max_sentence_lookback);
        let mut best: Option<(usize, &Entity)> = None;

        for i in (earliest..=sentence_index).rev() {
            let distance = offset + (sentence_index - i) * self.config.sentence_distance_weight;
            for candidate in entities {
                if is_pronoun(&candidate.label)
                    || !appears_in(candidate, &sentences[i])
                    || !self.classifier.agrees(&pronoun.label, &candidate.label)
                {
                    continue;
                }
                if best.map_or(true, |(d, _)| distance < d) {
                    best = Some((distance, candidate));
                }
            }
        }

        best.map(|(_, entity)| entity)
    }
}

impl Default for CoreferenceResolver {
    fn default() -> Self {
        Self::new(CoreferenceConfig::default())
    }
}

/// Sentence index and in-sentence offset of an entity mention. Uses the
/// recorded span when present, otherwise the first textual match.
fn locate(entity: &Entity, sentences: &[Sentence]) -> Option<(usize, usize)> {
    if let Some((start, _)) = entity.span() {
        if let Some(i) = sentences.iter().position(|s| s.contains_offset(start)) {
            return Some((i, start - sentences[i].start));
        }
    }

    sentences
        .iter()
        .enumerate()
        .find_map(|(i, s)| s.text.find(&entity.label).map(|pos| (i, pos)))
}

fn appears_in(entity: &Entity, sentence: &Sentence) -> bool {
    match entity.span() {
        Some((start, _)) => sentence.contains_offset(start),
        None => sentence.text.contains(&entity.label),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityType;
    use crate::nlp::tokenizer;

    fn mention(text: &str, label: &str, entity_type: EntityType) -> Entity {
        let start = text.find(label).unwrap();
        Entity::new(label, entity_type, 0.9).with_span(start, start + label.len())
    }

    #[test]
    fn test_pronoun_set() {
        assert!(is_pronoun("It"));
        assert!(is_pronoun("those"));
        assert!(!is_pronoun("theirs"));
        assert!(!is_pronoun("Docker"));
    }

    #[test]
    fn test_heuristic_agreement() {
        let h = HeuristicAgreement;
        assert!(h.agrees("he", "Mr. Smith"));
        assert!(!h.agrees("he", "Kafka"));
        assert!(h.agrees("She", "Mrs. Jones"));
        assert!(h.agrees("they", "microservices"));
        assert!(h.agrees("them", "Alice and Bob"));
        assert!(!h.agrees("they", "Kafka"));
        assert!(h.agrees("it", "Redis"));
    }

    #[test]
    fn test_resolves_to_nearest_antecedent() {
        let text = "Redis stores sessions. It is fast.";
        let sentences = tokenizer::analyze(text);
        let entities = vec![
            mention(text, "Redis", EntityType::Database),
            mention(text, "It", EntityType::Technology),
        ];

        let resolved = CoreferenceResolver::default().resolve(&entities, &sentences);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[1], entities[0]);
    }

    #[test]
    fn test_same_sentence_beats_previous_sentence() {
        let text = "Kafka queues events. Then Redis caches it.";
        let sentences = tokenizer::analyze(text);
        let entities = vec![
            mention(text, "Kafka", EntityType::Database),
            mention(text, "Redis", EntityType::Database),
            mention(text, "it", EntityType::Technology),
        ];

        let resolved = CoreferenceResolver::default().resolve(&entities, &sentences);
        assert_eq!(resolved[2].label, "Redis");
    }

    #[test]
    fn test_first_found_wins_on_tie() {
        let text = "Docker and Kubernetes run. This matters.";
        let sentences = tokenizer::analyze(text);
        let entities = vec![
            mention(text, "Docker", EntityType::Technology),
            mention(text, "Kubernetes", EntityType::Technology),
            mention(text, "This", EntityType::Technology),
        ];

        let resolved = CoreferenceResolver::default().resolve(&entities, &sentences);
        assert_eq!(resolved[2].label, "Docker");
    }

    #[test]
    fn test_agreement_filters_candidates() {
        let text = "The workers restart. Kafka recovers. They retry.";
        let sentences = tokenizer::analyze(text);
        let entities = vec![
            mention(text, "workers", EntityType::Component),
            mention(text, "Kafka", EntityType::Database),
            mention(text, "They", EntityType::Technology),
        ];

        let resolved = CoreferenceResolver::default().resolve(&entities, &sentences);
        // "Kafka" is closer but not plural.
        assert_eq!(resolved[2].label, "workers");
    }

    #[test]
    fn test_unresolved_pronoun_passes_through() {
        let text = "One. Two. Three. Four. Kafka streams. Five. Six. Seven. It helps.";
        let sentences = tokenizer::analyze(text);
        let entities = vec![
            mention(text, "Kafka", EntityType::Database),
            mention(text, "It", EntityType::Technology),
        ];

        let resolved = CoreferenceResolver::default().resolve(&entities, &sentences);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[1].label, "It");
        assert_eq!(resolved[1], entities[1]);
    }

    #[test]
    fn test_gendered_pronoun_without_match() {
        let text = "Kafka streams events. He approves.";
        let sentences = tokenizer::analyze(text);
        let entities = vec![
            mention(text, "Kafka", EntityType::Database),
            mention(text, "He", EntityType::Technology),
        ];

        let resolved = CoreferenceResolver::default().resolve(&entities, &sentences);
        assert_eq!(resolved[1].label, "He");
    }

    #[test]
    fn test_custom_classifier() {
        struct Never;
        impl AgreementClassifier for Never {
            fn agrees(&self, _: &str, _: &str) -> bool {
                false
            }
        }

        let text = "Redis stores sessions. It is fast.";
        let sentences = tokenizer::analyze(text);
        let entities = vec![
            mention(text, "Redis", EntityType::Database),
            mention(text, "It", EntityType::Technology),
        ];

        let resolver = CoreferenceResolver::default().with_classifier(Box::new(Never));
        let resolved = resolver.resolve(&entities, &sentences);
        assert_eq!(resolved[1].label, "It");
    }

    #[test]
    fn test_unlocated_pronoun_without_span() {
        let sentences = tokenizer::analyze("Redis stores sessions.");
        let entities = vec![
            Entity::new("Redis", EntityType::Database, 0.9),
            Entity::new("those", EntityType::Technology, 0.9),
        ];

        let resolved = CoreferenceResolver::default().resolve(&entities, &sentences);
        assert_eq!(resolved[1].label, "those");
    }
}
