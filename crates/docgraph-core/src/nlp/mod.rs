pub mod coreference;
pub mod extractor;
pub mod keywords;
pub mod tokenizer;

pub use coreference::{AgreementClassifier, CoreferenceResolver, HeuristicAgreement};
pub use extractor::{EntityExtractor, EntityPattern};
pub use keywords::KeywordRanker;
