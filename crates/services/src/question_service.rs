use std::sync::Arc;

use rand::rng;
use rand::seq::SliceRandom;

use quiz_core::model::{Category, Difficulty, Question, QuestionId};
use storage::repository::{NewQuestionRecord, QuestionFilter, QuestionRepository};

use crate::Clock;
use crate::error::QuestionServiceError;

/// Incoming question data with free-text category and difficulty.
///
/// Both vocabulary fields are canonicalized before anything is stored;
/// a near miss is rejected with the list of accepted values.
#[derive(Debug, Clone)]
pub struct QuestionDraft {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: u32,
    pub explanation: Option<String>,
    pub category: String,
    pub difficulty: String,
}

/// Orchestrates question creation, revision, and retirement.
#[derive(Clone)]
pub struct QuestionService {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
}

impl QuestionService {
    #[must_use]
    pub fn new(clock: Clock, questions: Arc<dyn QuestionRepository>) -> Self {
        Self { clock, questions }
    }

    fn build(&self, draft: QuestionDraft) -> Result<Question, QuestionServiceError> {
        let category = Category::canonicalize(&draft.category)?;
        let difficulty = Difficulty::canonicalize(&draft.difficulty)?;
        let question = Question::new(
            QuestionId::new(1),
            draft.prompt,
            draft.options,
            draft.correct_index,
            draft.explanation,
            category,
            difficulty,
            self.clock.now(),
        )?;
        Ok(question)
    }

    /// Validate a draft and persist it as a new active question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionServiceError::Taxonomy` for an unknown category
    /// or difficulty, `QuestionServiceError::Question` for option or
    /// grading-key violations, and `QuestionServiceError::Storage` if
    /// persistence fails.
    pub async fn create_question(
        &self,
        draft: QuestionDraft,
    ) -> Result<Question, QuestionServiceError> {
        let question = self.build(draft)?;
        let id = self
            .questions
            .insert_question(NewQuestionRecord::from_question(&question))
            .await?;

        tracing::info!(question = %id, category = %question.category(), "question created");
        self.stored(id, question)
    }

    /// Validate a whole batch, then persist it in one transaction.
    ///
    /// Validation runs over every draft before any row is written, so a
    /// bad item means nothing is persisted.
    ///
    /// # Errors
    ///
    /// Same as [`QuestionService::create_question`]; the first invalid
    /// draft aborts the batch.
    pub async fn create_questions(
        &self,
        drafts: Vec<QuestionDraft>,
    ) -> Result<Vec<Question>, QuestionServiceError> {
        let mut staged = Vec::with_capacity(drafts.len());
        for draft in drafts {
            staged.push(self.build(draft)?);
        }

        let records = staged.iter().map(NewQuestionRecord::from_question).collect();
        let ids = self.questions.insert_questions(records).await?;

        tracing::info!(count = ids.len(), "question batch created");
        ids.into_iter()
            .zip(staged)
            .map(|(id, question)| self.stored(id, question))
            .collect()
    }

    /// Fetch a question by id.
    ///
    /// # Errors
    ///
    /// Returns `QuestionServiceError::NotFound` when it does not exist.
    pub async fn get_question(&self, id: QuestionId) -> Result<Question, QuestionServiceError> {
        self.questions
            .get_question(id)
            .await?
            .ok_or(QuestionServiceError::NotFound(id))
    }

    /// List questions matching the filter, ordered by id.
    ///
    /// Pagination bounds are enforced by the caller.
    ///
    /// # Errors
    ///
    /// Returns `QuestionServiceError::Storage` if repository access
    /// fails.
    pub async fn list_questions(
        &self,
        filter: &QuestionFilter,
    ) -> Result<Vec<Question>, QuestionServiceError> {
        let questions = self.questions.list_questions(filter).await?;
        Ok(questions)
    }

    /// Pick up to `limit` active questions at random.
    ///
    /// The caller is expected to keep `limit` within 1..=50.
    ///
    /// # Errors
    ///
    /// Returns `QuestionServiceError::NoneAvailable` when there is no
    /// active question to pick from.
    pub async fn random_questions(
        &self,
        limit: usize,
    ) -> Result<Vec<Question>, QuestionServiceError> {
        let mut pool = self
            .questions
            .list_questions(&QuestionFilter::active_only())
            .await?;
        if pool.is_empty() {
            return Err(QuestionServiceError::NoneAvailable);
        }

        let mut rng = rng();
        pool.as_mut_slice().shuffle(&mut rng);
        pool.truncate(limit);
        Ok(pool)
    }

    /// Replace every user-editable field of an existing question.
    ///
    /// The identity, creation timestamp, and active flag survive the
    /// update.
    ///
    /// # Errors
    ///
    /// Returns `QuestionServiceError::NotFound` when the question does
    /// not exist, plus the same validation errors as creation.
    pub async fn update_question(
        &self,
        id: QuestionId,
        draft: QuestionDraft,
    ) -> Result<Question, QuestionServiceError> {
        let existing = self.get_question(id).await?;

        let category = Category::canonicalize(&draft.category)?;
        let difficulty = Difficulty::canonicalize(&draft.difficulty)?;
        let revised = existing.revise(
            draft.prompt,
            draft.options,
            draft.correct_index,
            draft.explanation,
            category,
            difficulty,
        )?;

        self.questions.update_question(&revised).await?;
        tracing::info!(question = %id, "question updated");
        Ok(revised)
    }

    /// Soft-delete a question.
    ///
    /// Existing answers keep referencing it; it only drops out of
    /// listings, random selection, and statistics.
    ///
    /// # Errors
    ///
    /// Returns `QuestionServiceError::NotFound` when the question does
    /// not exist.
    pub async fn deactivate_question(&self, id: QuestionId) -> Result<(), QuestionServiceError> {
        let mut question = self.get_question(id).await?;
        question.deactivate();
        self.questions.update_question(&question).await?;
        tracing::info!(question = %id, "question deactivated");
        Ok(())
    }

    fn stored(
        &self,
        id: QuestionId,
        question: Question,
    ) -> Result<Question, QuestionServiceError> {
        let question = Question::from_persisted(
            id,
            question.prompt().to_owned(),
            question.options().to_vec(),
            question.correct_index(),
            question.explanation().map(str::to_owned),
            question.category(),
            question.difficulty(),
            question.created_at(),
            question.is_active(),
        )?;
        Ok(question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use quiz_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    fn service(repo: InMemoryRepository) -> QuestionService {
        QuestionService::new(fixed_clock(), Arc::new(repo))
    }

    fn draft(category: &str, difficulty: &str) -> QuestionDraft {
        QuestionDraft {
            prompt: "¿Qué es un ORM?".into(),
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_index: 1,
            explanation: None,
            category: category.into(),
            difficulty: difficulty.into(),
        }
    }

    #[tokio::test]
    async fn create_canonicalizes_category_and_difficulty() {
        let service = service(InMemoryRepository::new());

        let question = service
            .create_question(draft("tecnologia", "FÁCIL"))
            .await
            .unwrap();

        assert_eq!(question.id(), QuestionId::new(1));
        assert_eq!(question.category(), Category::Tecnologia);
        assert_eq!(question.difficulty(), Difficulty::Facil);
        assert!(question.is_active());
    }

    #[tokio::test]
    async fn create_rejects_unknown_category() {
        let service = service(InMemoryRepository::new());
        let err = service
            .create_question(draft("xyz", "medio"))
            .await
            .unwrap_err();
        assert!(matches!(err, QuestionServiceError::Taxonomy(_)));
    }

    #[tokio::test]
    async fn create_rejects_bad_option_count_before_storing() {
        let repo = InMemoryRepository::new();
        let service = service(repo.clone());

        let mut bad = draft("ciencia", "medio");
        bad.options.truncate(2);
        let err = service.create_question(bad).await.unwrap_err();
        assert!(matches!(err, QuestionServiceError::Question(_)));

        assert_eq!(repo.count_questions(true).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn bulk_create_is_all_or_nothing() {
        let repo = InMemoryRepository::new();
        let service = service(repo.clone());

        let err = service
            .create_questions(vec![draft("historia", "medio"), draft("nope", "medio")])
            .await
            .unwrap_err();
        assert!(matches!(err, QuestionServiceError::Taxonomy(_)));

        assert_eq!(repo.count_questions(true).await.unwrap(), 0);

        let created = service
            .create_questions(vec![draft("historia", "medio"), draft("deporte", "fácil")])
            .await
            .unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(created[1].id(), QuestionId::new(2));
    }

    #[tokio::test]
    async fn update_preserves_identity_and_created_at() {
        let service = service(InMemoryRepository::new());
        let question = service
            .create_question(draft("ciencia", "medio"))
            .await
            .unwrap();

        let mut revised_draft = draft("literatura", "difícil");
        revised_draft.prompt = "¿Quién escribió 'Cien años de soledad'?".into();
        let revised = service
            .update_question(question.id(), revised_draft)
            .await
            .unwrap();

        assert_eq!(revised.id(), question.id());
        assert_eq!(revised.created_at(), question.created_at());
        assert_eq!(revised.category(), Category::Literatura);

        let fetched = service.get_question(question.id()).await.unwrap();
        assert_eq!(fetched.prompt(), "¿Quién escribió 'Cien años de soledad'?");
    }

    #[tokio::test]
    async fn update_of_missing_question_is_not_found() {
        let service = service(InMemoryRepository::new());
        let err = service
            .update_question(QuestionId::new(9), draft("ciencia", "medio"))
            .await
            .unwrap_err();
        assert!(matches!(err, QuestionServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn deactivate_hides_question_from_listing_and_random() {
        let service = service(InMemoryRepository::new());
        let question = service
            .create_question(draft("deporte", "fácil"))
            .await
            .unwrap();

        service.deactivate_question(question.id()).await.unwrap();

        let listed = service
            .list_questions(&QuestionFilter::active_only())
            .await
            .unwrap();
        assert!(listed.is_empty());

        let err = service.random_questions(10).await.unwrap_err();
        assert!(matches!(err, QuestionServiceError::NoneAvailable));

        // still fetchable directly
        let fetched = service.get_question(question.id()).await.unwrap();
        assert!(!fetched.is_active());
    }

    #[tokio::test]
    async fn random_questions_caps_at_available_and_only_returns_active() {
        let service = service(InMemoryRepository::new());
        for category in ["historia", "ciencia", "deporte"] {
            service
                .create_question(draft(category, "medio"))
                .await
                .unwrap();
        }

        let picked = service.random_questions(10).await.unwrap();
        assert_eq!(picked.len(), 3);
        assert!(picked.iter().all(Question::is_active));

        let pair = service.random_questions(2).await.unwrap();
        assert_eq!(pair.len(), 2);
    }
}
