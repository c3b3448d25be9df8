//! Canonical category and difficulty vocabularies.
//!
//! Free-text input is matched against the canonical spellings after an
//! accent- and case-insensitive fold. A near miss is an error, never a
//! guess.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TaxonomyError {
    #[error(
        "unknown category '{0}'; accepted values: Tecnología, Historia, Ciencia, Geografía, Literatura, Deporte"
    )]
    UnknownCategory(String),

    #[error("unknown difficulty '{0}'; accepted values: fácil, medio, difícil")]
    UnknownDifficulty(String),
}

//
// ─── NORMALIZATION ─────────────────────────────────────────────────────────────
//

/// Folds input for lookup: trim, lowercase, decompose accents and drop
/// the combining marks.
fn fold(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .collect()
}

//
// ─── CATEGORY ──────────────────────────────────────────────────────────────────
//

/// Question category, restricted to a fixed six-value vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Tecnología")]
    Tecnologia,
    #[serde(rename = "Historia")]
    Historia,
    #[serde(rename = "Ciencia")]
    Ciencia,
    #[serde(rename = "Geografía")]
    Geografia,
    #[serde(rename = "Literatura")]
    Literatura,
    #[serde(rename = "Deporte")]
    Deporte,
}

static CATEGORY_LOOKUP: LazyLock<HashMap<String, Category>> = LazyLock::new(|| {
    Category::ALL
        .iter()
        .map(|category| (fold(category.as_str()), *category))
        .collect()
});

impl Category {
    /// Every category, in the fixed order used for deterministic
    /// iteration in rankings.
    pub const ALL: [Category; 6] = [
        Category::Tecnologia,
        Category::Historia,
        Category::Ciencia,
        Category::Geografia,
        Category::Literatura,
        Category::Deporte,
    ];

    /// Canonical display spelling.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tecnologia => "Tecnología",
            Category::Historia => "Historia",
            Category::Ciencia => "Ciencia",
            Category::Geografia => "Geografía",
            Category::Literatura => "Literatura",
            Category::Deporte => "Deporte",
        }
    }

    /// Maps free-text input to a canonical category, ignoring case,
    /// accents, and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `TaxonomyError::UnknownCategory` when the folded input
    /// matches no canonical entry.
    pub fn canonicalize(input: &str) -> Result<Self, TaxonomyError> {
        CATEGORY_LOOKUP
            .get(&fold(input))
            .copied()
            .ok_or_else(|| TaxonomyError::UnknownCategory(input.trim().to_owned()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Question difficulty level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(rename = "fácil")]
    Facil,
    #[serde(rename = "medio")]
    Medio,
    #[serde(rename = "difícil")]
    Dificil,
}

static DIFFICULTY_LOOKUP: LazyLock<HashMap<String, Difficulty>> = LazyLock::new(|| {
    Difficulty::ALL
        .iter()
        .map(|difficulty| (fold(difficulty.as_str()), *difficulty))
        .collect()
});

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Facil, Difficulty::Medio, Difficulty::Dificil];

    /// Canonical display spelling.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Facil => "fácil",
            Difficulty::Medio => "medio",
            Difficulty::Dificil => "difícil",
        }
    }

    /// Maps free-text input to a canonical difficulty, ignoring case,
    /// accents, and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `TaxonomyError::UnknownDifficulty` when the folded input
    /// matches no canonical entry.
    pub fn canonicalize(input: &str) -> Result<Self, TaxonomyError> {
        DIFFICULTY_LOOKUP
            .get(&fold(input))
            .copied()
            .ok_or_else(|| TaxonomyError::UnknownDifficulty(input.trim().to_owned()))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_accepts_unaccented_lowercase() {
        assert_eq!(
            Category::canonicalize("tecnologia").unwrap(),
            Category::Tecnologia
        );
    }

    #[test]
    fn category_accepts_accented_uppercase() {
        assert_eq!(
            Category::canonicalize("TECNOLOGÍA").unwrap(),
            Category::Tecnologia
        );
    }

    #[test]
    fn category_trims_whitespace() {
        assert_eq!(
            Category::canonicalize(" Tecnología ").unwrap(),
            Category::Tecnologia
        );
    }

    #[test]
    fn category_canonical_display_keeps_accents() {
        let category = Category::canonicalize("geografia").unwrap();
        assert_eq!(category.as_str(), "Geografía");
    }

    #[test]
    fn category_rejects_near_misses() {
        let err = Category::canonicalize("xyz").unwrap_err();
        assert_eq!(err, TaxonomyError::UnknownCategory("xyz".into()));
        assert!(err.to_string().contains("Tecnología"));

        // partial matches are not guessed at
        assert!(Category::canonicalize("tecno").is_err());
    }

    #[test]
    fn difficulty_folds_case_and_accents() {
        assert_eq!(
            Difficulty::canonicalize("FÁCIL").unwrap(),
            Difficulty::Facil
        );
        assert_eq!(
            Difficulty::canonicalize("dificil").unwrap(),
            Difficulty::Dificil
        );
        assert_eq!(Difficulty::canonicalize("medio").unwrap().as_str(), "medio");
    }

    #[test]
    fn difficulty_rejects_unknown_levels() {
        let err = Difficulty::canonicalize("imposible").unwrap_err();
        assert_eq!(err, TaxonomyError::UnknownDifficulty("imposible".into()));
    }

    #[test]
    fn every_canonical_spelling_maps_to_itself() {
        for category in Category::ALL {
            assert_eq!(Category::canonicalize(category.as_str()).unwrap(), category);
        }
        for difficulty in Difficulty::ALL {
            assert_eq!(
                Difficulty::canonicalize(difficulty.as_str()).unwrap(),
                difficulty
            );
        }
    }
}
