use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::taxonomy::{Category, Difficulty};

/// Smallest allowed number of options on a question.
pub const MIN_OPTIONS: usize = 3;
/// Largest allowed number of options on a question.
pub const MAX_OPTIONS: usize = 5;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("a question must have between 3 and 5 options, got {0}")]
    InvalidOptionCount(usize),

    #[error("correct option index must be between 0 and {max}, got {index}")]
    CorrectIndexOutOfRange { index: u32, max: usize },

    #[error("selected option index must be between 0 and {max}, got {index}")]
    SelectionOutOfRange { index: u32, max: usize },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A quiz question with its option list and grading key.
///
/// Questions are never physically removed once answers reference them;
/// retiring one flips `is_active` instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    correct_index: u32,
    explanation: Option<String>,
    category: Category,
    difficulty: Difficulty,
    created_at: DateTime<Utc>,
    is_active: bool,
}

fn validate(options: &[String], correct_index: u32) -> Result<(), QuestionError> {
    if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&options.len()) {
        return Err(QuestionError::InvalidOptionCount(options.len()));
    }
    if correct_index as usize >= options.len() {
        return Err(QuestionError::CorrectIndexOutOfRange {
            index: correct_index,
            max: options.len() - 1,
        });
    }
    Ok(())
}

impl Question {
    /// Creates a new active question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::InvalidOptionCount` when the option list
    /// is not 3 to 5 entries long, or
    /// `QuestionError::CorrectIndexOutOfRange` when the grading key does
    /// not point at one of them.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_index: u32,
        explanation: Option<String>,
        category: Category,
        difficulty: Difficulty,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuestionError> {
        validate(&options, correct_index)?;

        let explanation = explanation
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty());

        Ok(Self {
            id,
            prompt: prompt.into(),
            options,
            correct_index,
            explanation,
            category,
            difficulty,
            created_at,
            is_active: true,
        })
    }

    /// Rehydrates a question from persisted storage, re-running the
    /// option and grading-key checks.
    ///
    /// # Errors
    ///
    /// Same as [`Question::new`].
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: QuestionId,
        prompt: String,
        options: Vec<String>,
        correct_index: u32,
        explanation: Option<String>,
        category: Category,
        difficulty: Difficulty,
        created_at: DateTime<Utc>,
        is_active: bool,
    ) -> Result<Self, QuestionError> {
        validate(&options, correct_index)?;
        Ok(Self {
            id,
            prompt,
            options,
            correct_index,
            explanation,
            category,
            difficulty,
            created_at,
            is_active,
        })
    }

    /// Replaces every user-editable field at once, keeping the identity,
    /// creation timestamp, and active flag.
    ///
    /// # Errors
    ///
    /// Same as [`Question::new`].
    pub fn revise(
        &self,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_index: u32,
        explanation: Option<String>,
        category: Category,
        difficulty: Difficulty,
    ) -> Result<Self, QuestionError> {
        let mut revised = Question::new(
            self.id,
            prompt,
            options,
            correct_index,
            explanation,
            category,
            difficulty,
            self.created_at,
        )?;
        revised.is_active = self.is_active;
        Ok(revised)
    }

    /// Soft delete: the question stays on record for existing answers
    /// but drops out of listings and statistics.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Checks a selected option against the grading key.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::SelectionOutOfRange` when the index does
    /// not point at one of this question's options.
    pub fn grade(&self, selected_index: u32) -> Result<bool, QuestionError> {
        if selected_index as usize >= self.options.len() {
            return Err(QuestionError::SelectionOutOfRange {
                index: selected_index,
                max: self.options.len() - 1,
            });
        }
        Ok(selected_index == self.correct_index)
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_index(&self) -> u32 {
        self.correct_index
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn options(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("option {i}")).collect()
    }

    fn build_question(option_count: usize, correct_index: u32) -> Result<Question, QuestionError> {
        Question::new(
            QuestionId::new(1),
            "¿Qué es FastAPI?",
            options(option_count),
            correct_index,
            None,
            Category::Tecnologia,
            Difficulty::Facil,
            fixed_now(),
        )
    }

    #[test]
    fn new_rejects_too_few_options() {
        let err = build_question(2, 0).unwrap_err();
        assert_eq!(err, QuestionError::InvalidOptionCount(2));
    }

    #[test]
    fn new_rejects_too_many_options() {
        let err = build_question(6, 0).unwrap_err();
        assert_eq!(err, QuestionError::InvalidOptionCount(6));
    }

    #[test]
    fn new_rejects_correct_index_out_of_range() {
        let err = build_question(3, 3).unwrap_err();
        assert_eq!(err, QuestionError::CorrectIndexOutOfRange { index: 3, max: 2 });
        assert!(err.to_string().contains("between 0 and 2"));
    }

    #[test]
    fn new_accepts_boundary_sizes() {
        assert!(build_question(3, 2).is_ok());
        assert!(build_question(5, 4).is_ok());
    }

    #[test]
    fn new_filters_blank_explanation() {
        let question = Question::new(
            QuestionId::new(1),
            "Q",
            options(3),
            0,
            Some("   ".into()),
            Category::Ciencia,
            Difficulty::Medio,
            fixed_now(),
        )
        .unwrap();
        assert_eq!(question.explanation(), None);
    }

    #[test]
    fn grade_compares_against_correct_index() {
        let question = build_question(4, 2).unwrap();
        assert!(question.grade(2).unwrap());
        assert!(!question.grade(0).unwrap());
    }

    #[test]
    fn grade_rejects_out_of_range_selection() {
        let question = build_question(3, 1).unwrap();
        let err = question.grade(3).unwrap_err();
        assert_eq!(err, QuestionError::SelectionOutOfRange { index: 3, max: 2 });
    }

    #[test]
    fn revise_replaces_fields_and_keeps_identity() {
        let question = build_question(3, 0).unwrap();
        let revised = question
            .revise(
                "¿Qué es SQLAlchemy?",
                options(4),
                3,
                Some("un ORM".into()),
                Category::Historia,
                Difficulty::Dificil,
            )
            .unwrap();

        assert_eq!(revised.id(), question.id());
        assert_eq!(revised.created_at(), question.created_at());
        assert_eq!(revised.prompt(), "¿Qué es SQLAlchemy?");
        assert_eq!(revised.correct_index(), 3);
        assert_eq!(revised.category(), Category::Historia);
        assert!(revised.is_active());
    }

    #[test]
    fn revise_keeps_inactive_flag() {
        let mut question = build_question(3, 0).unwrap();
        question.deactivate();
        let revised = question
            .revise(
                "Q",
                options(3),
                1,
                None,
                Category::Deporte,
                Difficulty::Medio,
            )
            .unwrap();
        assert!(!revised.is_active());
    }

    #[test]
    fn revise_validates_like_new() {
        let question = build_question(3, 0).unwrap();
        let err = question
            .revise("Q", options(2), 0, None, Category::Deporte, Difficulty::Medio)
            .unwrap_err();
        assert_eq!(err, QuestionError::InvalidOptionCount(2));
    }
}
