//! Entity extraction for graph indexing and graph-mode queries
//!
//! Deterministic, pattern-based extraction: capitalized phrases for Latin
//! scripts, Arabic tokens with harakat stripping and stopword filtering.
//! The same functions run at index time and query time, and both go through
//! the one shared [`hyrag_core::normalize_key`] for identity.

use hyrag_core::Entity;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Language hint for extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Latin,
    Arabic,
}

/// Common Arabic stopwords (particles, pronouns, question words).
/// Kept small: the occurrence threshold in the graph builder does the
/// heavy lifting against noise.
const ARABIC_STOPWORDS: [&str; 48] = [
    "في", "من", "إلى", "على", "عن", "مع", "ثم", "لكن", "أن", "إن", "هذا", "هذه", "ذلك", "تلك",
    "هؤلاء", "أولئك", "هو", "هي", "هم", "هن", "أنت", "أنتم", "أنا", "نحن", "كان", "يكون", "ليس",
    "قد", "لم", "لن", "لا", "ما", "التي", "الذي", "كل", "بعض", "كيف", "لماذا", "متى", "أين", "هل",
    "نعم", "غير", "سوى", "إلا", "حتى", "منذ", "بين",
];

/// English determiners, pronouns, and question words excluded from
/// capitalized-phrase hits (they get capitalized at sentence starts).
const LATIN_STOPWORDS: [&str; 20] = [
    "the", "a", "an", "this", "that", "these", "those", "it", "he", "she", "they", "we", "what",
    "when", "where", "who", "why", "how", "which", "was",
];

fn capitalized_phrase_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b").expect("valid regex"))
}

fn arabic_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\u{0600}-\u{06FF}]{2,}").expect("valid regex"))
}

/// Drop sentence-start stopwords from the front of a capitalized phrase,
/// so "The Treaty" and "Treaty" collapse to the same entity.
fn trim_leading_stopwords(phrase: &str) -> &str {
    let mut rest = phrase;
    loop {
        let Some(word) = rest.split_whitespace().next() else {
            return rest;
        };
        if LATIN_STOPWORDS.contains(&word.to_lowercase().as_str()) {
            rest = rest[word.len()..].trim_start();
        } else {
            return rest;
        }
    }
}

/// Detect the dominant script of a text.
///
/// Any Arabic-block codepoint routes to Arabic extraction; everything else
/// takes the Latin path.
pub fn detect_language(text: &str) -> Language {
    if arabic_word_re().is_match(text) {
        Language::Arabic
    } else {
        Language::Latin
    }
}

/// Extract entities from a text.
///
/// Returns entities deduplicated by normalized key, keeping the first-seen
/// surface form for display, in first-occurrence order.
pub fn extract_entities(text: &str, language: Language) -> Vec<Entity> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    // Keyed by normalized form; first-occurrence order preserved in the Vec
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut entities = Vec::new();

    let mut push = |surface: &str| {
        let entity = Entity::new(surface);
        if entity.normalized_key.is_empty() {
            return;
        }
        if seen.insert(entity.normalized_key.clone()) {
            entities.push(entity);
        }
    };

    match language {
        Language::Latin => {
            for m in capitalized_phrase_re().find_iter(text) {
                let surface = trim_leading_stopwords(m.as_str());
                if surface.len() < 2 || surface.len() > 80 {
                    continue;
                }
                push(surface);
            }
        }
        Language::Arabic => {
            for m in arabic_word_re().find_iter(text) {
                let surface = m.as_str();
                let key = hyrag_core::normalize_key(surface);
                if key.chars().count() < 3 || key.chars().count() > 60 {
                    continue;
                }
                if ARABIC_STOPWORDS.contains(&key.as_str()) {
                    continue;
                }
                push(surface);
            }
        }
    }

    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_arabic() {
        assert_eq!(detect_language("المعاهدة وقعت في باريس"), Language::Arabic);
        assert_eq!(detect_language("The treaty was signed"), Language::Latin);
    }

    #[test]
    fn test_latin_extraction() {
        let entities = extract_entities(
            "The Treaty of Versailles was signed near Paris in June.",
            Language::Latin,
        );
        let keys: Vec<&str> = entities.iter().map(|e| e.normalized_key.as_str()).collect();

        assert!(keys.contains(&"treaty"));
        assert!(keys.contains(&"paris"));
        assert!(keys.contains(&"june"));
        // Sentence-start determiner filtered out
        assert!(!keys.contains(&"the"));
    }

    #[test]
    fn test_latin_dedup_keeps_first_surface() {
        let entities = extract_entities("Paris is large. Paris is old.", Language::Latin);
        let paris: Vec<_> = entities
            .iter()
            .filter(|e| e.normalized_key == "paris")
            .collect();
        assert_eq!(paris.len(), 1);
        assert_eq!(paris[0].display_form, "Paris");
    }

    #[test]
    fn test_arabic_extraction_strips_harakat() {
        let entities = extract_entities("وقّعت المعاهدة في باريس", Language::Arabic);
        let keys: Vec<&str> = entities.iter().map(|e| e.normalized_key.as_str()).collect();

        assert!(keys.contains(&"المعاهدة"));
        assert!(keys.contains(&"باريس"));
        // Stopword particle dropped
        assert!(!keys.contains(&"في"));
    }

    #[test]
    fn test_empty_text() {
        assert!(extract_entities("", Language::Latin).is_empty());
        assert!(extract_entities("   ", Language::Arabic).is_empty());
    }
}
