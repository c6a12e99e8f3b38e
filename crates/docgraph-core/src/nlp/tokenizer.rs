//! Rule-based tokenizer, sentence splitter and part-of-speech tagger.
//!
//! Tagging is deterministic: a closed-class lexicon, a verb lexicon for the
//! domain vocabulary, one token of left context and suffix heuristics.

use crate::document::{PosTag, Sentence, Token};

const ABBREVIATIONS: &[&str] = &["mr", "mrs", "ms", "dr", "e.g", "i.e", "etc", "vs", "inc", "ltd"];

const DETERMINERS: &[&str] = &[
    "the", "a", "an", "this", "that", "these", "those", "each", "every", "some", "any", "no",
    "all", "both", "either", "neither", "another",
];

const PREPOSITIONS: &[&str] = &[
    "in", "on", "at", "for", "of", "with", "by", "from", "into", "onto", "over", "under",
    "about", "across", "after", "before", "between", "through", "during", "without", "within",
    "via", "upon", "against", "among", "around", "behind", "beyond", "toward", "towards",
    "than", "as", "if", "because", "while", "whereas", "although", "though", "since", "until",
    "unless", "per",
];

const CONJUNCTIONS: &[&str] = &["and", "or", "but", "nor", "yet", "so"];

const PERSONAL_PRONOUNS: &[&str] = &[
    "i", "you", "he", "she", "it", "we", "they", "me", "him", "us", "them", "hers", "theirs",
    "mine", "yours", "ours",
];

const POSSESSIVE_PRONOUNS: &[&str] = &["my", "your", "his", "her", "its", "our", "their"];

const MODALS: &[&str] = &["can", "could", "will", "would", "shall", "should", "may", "might", "must"];

const ADVERBS: &[&str] = &[
    "not", "also", "very", "often", "always", "never", "then", "only", "just", "now", "here",
    "there", "still", "already", "again", "too", "usually",
];

const AUXILIARIES: &[(&str, PosTag)] = &[
    ("is", PosTag::VerbThirdPerson),
    ("are", PosTag::VerbPresent),
    ("am", PosTag::VerbPresent),
    ("was", PosTag::VerbPast),
    ("were", PosTag::VerbPast),
    ("be", PosTag::VerbBase),
    ("been", PosTag::VerbParticiple),
    ("being", PosTag::VerbGerund),
    ("has", PosTag::VerbThirdPerson),
    ("have", PosTag::VerbPresent),
    ("had", PosTag::VerbPast),
    ("does", PosTag::VerbThirdPerson),
    ("do", PosTag::VerbPresent),
    ("did", PosTag::VerbPast),
];

/// Base forms of verbs the tagger recognises in any present-tense inflection.
const VERBS: &[&str] = &[
    // technical
    "deploy", "implement", "integrate", "connect", "host", "serve", "query", "process",
    "execute", "compile", "build", "test",
    // banking
    "transfer", "deposit", "withdraw", "pay", "invest", "lend", "borrow", "approve",
    "decline", "validate", "authorize",
    // software engineering
    "depend", "call", "extend", "configure", "monitor", "orchestrate",
    // common
    "use", "run", "provide", "support", "store", "send", "receive", "handle", "manage",
    "create", "return", "require", "allow", "enable", "contain", "read", "write", "update",
    "delete", "fetch", "publish", "consume", "expose", "communicate", "scale", "cache",
    "route", "load", "save", "start", "stop", "schedule", "trigger", "generate", "check",
    "verify", "encrypt", "log", "trace", "replicate", "migrate", "own", "make", "need",
];

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥'];
const WORD_CONNECTORS: &[char] = &['-', '.', '/', '\'', '+', '#', '_'];

#[derive(Debug, Clone)]
struct Span {
    start: usize,
    end: usize,
    kind: SpanKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpanKind {
    Word,
    Number,
    Symbol,
    Punctuation,
}

/// Split `text` into sentences with tagged tokens. Offsets are byte offsets
/// into `text`.
#[must_use]
pub fn analyze(text: &str) -> Vec<Sentence> {
    let spans = scan(text);
    let mut sentences = Vec::new();
    let mut current: Vec<Span> = Vec::new();

    for (i, span) in spans.iter().enumerate() {
        if let Some(prev) = current.last() {
            if is_paragraph_break(&text[prev.end..span.start]) {
                sentences.push(build_sentence(text, std::mem::take(&mut current)));
            }
        }

        current.push(span.clone());

        if ends_sentence(text, &spans, i) {
            sentences.push(build_sentence(text, std::mem::take(&mut current)));
        }
    }

    if !current.is_empty() {
        sentences.push(build_sentence(text, current));
    }

    sentences
}

/// All tokens of `sentences` in document order.
pub fn tokens(sentences: &[Sentence]) -> impl Iterator<Item = &Token> {
    sentences.iter().flat_map(|s| s.tokens.iter())
}

fn scan(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if c.is_whitespace() {
            continue;
        }

        if c.is_alphanumeric() {
            let mut end = start + c.len_utf8();
            let mut numeric = c.is_ascii_digit();

            while let Some(&(idx, next)) = chars.peek() {
                if next.is_alphanumeric() {
                    numeric &= next.is_ascii_digit();
                    end = idx + next.len_utf8();
                    chars.next();
                    continue;
                }

                // Connectors stay inside a word only when another word char follows.
                let joins = WORD_CONNECTORS.contains(&next)
                    && text[idx + next.len_utf8()..]
                        .chars()
                        .next()
                        .is_some_and(char::is_alphanumeric);
                if !joins {
                    break;
                }
                numeric &= next == '.';
                end = idx + next.len_utf8();
                chars.next();
            }

            let kind = if numeric {
                SpanKind::Number
            } else {
                SpanKind::Word
            };
            spans.push(Span { start, end, kind });
            continue;
        }

        let kind = if CURRENCY_SYMBOLS.contains(&c) {
            SpanKind::Symbol
        } else {
            SpanKind::Punctuation
        };
        spans.push(Span {
            start,
            end: start + c.len_utf8(),
            kind,
        });
    }

    spans
}

fn is_paragraph_break(gap: &str) -> bool {
    gap.matches('\n').count() >= 2
}

fn ends_sentence(text: &str, spans: &[Span], i: usize) -> bool {
    let span = &spans[i];
    let token = &text[span.start..span.end];
    if !matches!(token, "." | "!" | "?") {
        return false;
    }

    if token == "." && i > 0 {
        let prev = &spans[i - 1];
        let prev_text = text[prev.start..prev.end].to_lowercase();
        // "Mr." only counts as an abbreviation when the dot is attached.
        if prev.end == span.start && ABBREVIATIONS.contains(&prev_text.as_str()) {
            return false;
        }
    }

    match spans.get(i + 1) {
        None => true,
        Some(next) => text[next.start..next.end]
            .chars()
            .next()
            .is_some_and(|c| c.is_uppercase() || c.is_ascii_digit() || c == '"'),
    }
}

fn build_sentence(text: &str, spans: Vec<Span>) -> Sentence {
    let start = spans.first().map_or(0, |s| s.start);
    let end = spans.last().map_or(start, |s| s.end);

    let mut tokens: Vec<Token> = Vec::with_capacity(spans.len());
    for (i, span) in spans.iter().enumerate() {
        let word = &text[span.start..span.end];
        let prev = tokens.last().map(|t| t.tag);
        let tag = tag_token(word, span.kind, prev, i == 0);
        tokens.push(Token {
            text: word.to_string(),
            tag,
            start: span.start,
            end: span.end,
            lemma: lemma(word, tag),
        });
    }

    Sentence {
        text: text[start..end].to_string(),
        start,
        end,
        tokens,
    }
}

fn tag_token(word: &str, kind: SpanKind, prev: Option<PosTag>, sentence_start: bool) -> PosTag {
    match kind {
        SpanKind::Number => return PosTag::Number,
        SpanKind::Symbol => return PosTag::Symbol,
        SpanKind::Punctuation => return PosTag::Punctuation,
        SpanKind::Word => {}
    }

    let lower = word.to_lowercase();
    let w = lower.as_str();

    if let Some(tag) = closed_class(w) {
        return tag;
    }

    let noun_context = matches!(
        prev,
        Some(
            PosTag::Determiner
                | PosTag::PossessivePronoun
                | PosTag::Adjective
                | PosTag::Preposition
                | PosTag::Number
        )
    );

    if third_person_base(w).is_some() {
        return if noun_context {
            PosTag::PluralNoun
        } else {
            PosTag::VerbThirdPerson
        };
    }

    if VERBS.contains(&w) {
        return match prev {
            Some(PosTag::To | PosTag::Modal) => PosTag::VerbBase,
            Some(PosTag::Pronoun | PosTag::PluralNoun | PosTag::PluralProperNoun) => {
                PosTag::VerbPresent
            }
            None => PosTag::VerbBase,
            _ => PosTag::Noun,
        };
    }

    if let Some(tag) = suffix_class(w) {
        return tag;
    }

    let proper = is_proper(word, sentence_start);
    let plural = looks_plural(w);
    match (proper, plural) {
        (true, true) => PosTag::PluralProperNoun,
        (true, false) => PosTag::ProperNoun,
        (false, true) => PosTag::PluralNoun,
        (false, false) => PosTag::Noun,
    }
}

fn closed_class(w: &str) -> Option<PosTag> {
    if w == "to" {
        return Some(PosTag::To);
    }
    if DETERMINERS.contains(&w) {
        return Some(PosTag::Determiner);
    }
    if PREPOSITIONS.contains(&w) {
        return Some(PosTag::Preposition);
    }
    if CONJUNCTIONS.contains(&w) {
        return Some(PosTag::Conjunction);
    }
    if POSSESSIVE_PRONOUNS.contains(&w) {
        return Some(PosTag::PossessivePronoun);
    }
    if PERSONAL_PRONOUNS.contains(&w) {
        return Some(PosTag::Pronoun);
    }
    if MODALS.contains(&w) {
        return Some(PosTag::Modal);
    }
    if ADVERBS.contains(&w) {
        return Some(PosTag::Adverb);
    }
    AUXILIARIES
        .iter()
        .find(|(aux, _)| *aux == w)
        .map(|(_, tag)| *tag)
}

fn suffix_class(w: &str) -> Option<PosTag> {
    let len = w.chars().count();
    if len > 4 && w.ends_with("ing") {
        return Some(PosTag::VerbGerund);
    }
    if len > 3 && w.ends_with("ed") {
        return Some(PosTag::VerbPast);
    }
    if len > 3 && w.ends_with("ly") {
        return Some(PosTag::Adverb);
    }
    const ADJECTIVE_SUFFIXES: &[&str] = &["ous", "ful", "able", "ible", "ive", "less", "ical"];
    if len > 4 && ADJECTIVE_SUFFIXES.iter().any(|s| w.ends_with(s)) {
        return Some(PosTag::Adjective);
    }
    None
}

/// Base form when `w` is the third-person singular of a lexicon verb.
fn third_person_base(w: &str) -> Option<&'static str> {
    VERBS.iter().copied().find(|base| {
        if let Some(stem) = base.strip_suffix('y') {
            if !stem.ends_with(['a', 'e', 'o', 'u']) {
                return w.strip_suffix("ies") == Some(stem);
            }
        }
        w.strip_suffix('s') == Some(base)
            || (w.strip_suffix("es") == Some(base)
                && base.ends_with(['s', 'x', 'z', 'h', 'o']))
    })
}

fn is_proper(word: &str, sentence_start: bool) -> bool {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let inner_upper = chars.any(char::is_uppercase);
    if inner_upper {
        return true;
    }
    first.is_uppercase() && !sentence_start
}

fn looks_plural(w: &str) -> bool {
    w.chars().count() > 3
        && w.ends_with('s')
        && !w.ends_with("ss")
        && !w.ends_with("us")
        && !w.ends_with("is")
}

fn lemma(word: &str, tag: PosTag) -> String {
    let lower = word.to_lowercase();
    match tag {
        PosTag::VerbThirdPerson => third_person_base(&lower).map_or(lower, str::to_string),
        PosTag::PluralNoun | PosTag::PluralProperNoun => {
            if let Some(base) = third_person_base(&lower) {
                return base.to_string();
            }
            if let Some(stem) = lower.strip_suffix("ies") {
                return format!("{stem}y");
            }
            lower.strip_suffix('s').map_or_else(|| lower.clone(), str::to_string)
        }
        _ => lower,
    }
}
