//! Entity types and the shared normalization used at index and query time

use serde::{Deserialize, Serialize};

/// Arabic diacritics (harakat/tashkeel) removed during normalization.
/// Surface text keeps its diacritics; only the identity key is stripped.
const ARABIC_DIACRITICS: [char; 15] = [
    '\u{064B}', '\u{064C}', '\u{064D}', '\u{064E}', '\u{064F}', '\u{0650}', '\u{0651}', '\u{0652}',
    '\u{0653}', '\u{0654}', '\u{0655}', '\u{0656}', '\u{0657}', '\u{0658}', '\u{0670}',
];

/// An entity mentioned in a chunk.
///
/// Identity is the normalized key; the display form keeps the first-seen
/// surface text for presentation only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    /// Canonical key: case-folded, whitespace-collapsed, diacritic-stripped
    pub normalized_key: String,

    /// Original surface form, kept for display
    pub display_form: String,
}

impl Entity {
    /// Create an entity from a surface form, deriving its normalized key
    pub fn new(surface: impl Into<String>) -> Self {
        let surface = surface.into();
        let key = normalize_key(&surface);
        Self {
            normalized_key: key,
            display_form: surface,
        }
    }
}

/// Normalize a surface form into an identity key.
///
/// Lowercases, collapses internal whitespace, and strips Arabic harakat so
/// that diacritic-variant forms collapse to one key. This is the ONE
/// normalization function: the graph builder and the query router must both
/// go through it, or graph-mode retrieval silently degrades.
pub fn normalize_key(surface: &str) -> String {
    surface
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|c| !ARABIC_DIACRITICS.contains(c))
        .collect()
}
