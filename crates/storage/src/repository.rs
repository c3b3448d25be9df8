use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    Answer, AnswerId, Category, Difficulty, Question, QuestionId, QuizSession, SessionId,
    SessionStatus,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── PERSISTED SHAPES ──────────────────────────────────────────────────────────
//

/// Insert shape for a question; the repository allocates the id.
#[derive(Debug, Clone)]
pub struct NewQuestionRecord {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: u32,
    pub explanation: Option<String>,
    pub category: Category,
    pub difficulty: Difficulty,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

impl NewQuestionRecord {
    #[must_use]
    pub fn from_question(question: &Question) -> Self {
        Self {
            prompt: question.prompt().to_owned(),
            options: question.options().to_vec(),
            correct_index: question.correct_index(),
            explanation: question.explanation().map(str::to_owned),
            category: question.category(),
            difficulty: question.difficulty(),
            created_at: question.created_at(),
            is_active: question.is_active(),
        }
    }

    fn into_question(self, id: QuestionId) -> Result<Question, StorageError> {
        Question::from_persisted(
            id,
            self.prompt,
            self.options,
            self.correct_index,
            self.explanation,
            self.category,
            self.difficulty,
            self.created_at,
            self.is_active,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Insert shape for a quiz session; the repository allocates the id.
#[derive(Debug, Clone)]
pub struct NewSessionRecord {
    pub player: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub score: u32,
    pub answered: u32,
    pub correct: u32,
    pub status: SessionStatus,
    pub elapsed_secs: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl NewSessionRecord {
    #[must_use]
    pub fn from_session(session: &QuizSession) -> Self {
        Self {
            player: session.player().map(str::to_owned),
            started_at: session.started_at(),
            finished_at: session.finished_at(),
            score: session.score(),
            answered: session.answered(),
            correct: session.correct(),
            status: session.status(),
            elapsed_secs: session.elapsed_secs(),
            created_at: session.created_at(),
        }
    }

    fn into_session(self, id: SessionId) -> Result<QuizSession, StorageError> {
        QuizSession::from_persisted(
            id,
            self.player,
            self.started_at,
            self.finished_at,
            self.score,
            self.answered,
            self.correct,
            self.status,
            self.elapsed_secs,
            self.created_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Insert shape for an answer; the repository allocates the id and
/// enforces the one-answer-per-question-per-session constraint.
#[derive(Debug, Clone)]
pub struct NewAnswerRecord {
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub selected_index: u32,
    pub is_correct: bool,
    pub response_secs: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl NewAnswerRecord {
    fn into_answer(self, id: AnswerId) -> Answer {
        Answer::new(
            id,
            self.session_id,
            self.question_id,
            self.selected_index,
            self.is_correct,
            self.response_secs,
            self.created_at,
        )
    }
}

/// Filter for question listings. Pagination bounds are the caller's
/// responsibility.
#[derive(Debug, Clone)]
pub struct QuestionFilter {
    pub active: Option<bool>,
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
    pub skip: u32,
    pub limit: u32,
}

impl Default for QuestionFilter {
    fn default() -> Self {
        Self {
            active: Some(true),
            category: None,
            difficulty: None,
            skip: 0,
            limit: u32::MAX,
        }
    }
}

impl QuestionFilter {
    /// Every active question, no pagination. What the statistics and
    /// random-selection paths iterate over.
    #[must_use]
    pub fn active_only() -> Self {
        Self::default()
    }
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

/// Repository contract for questions.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persist a new question and return its allocated id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn insert_question(&self, record: NewQuestionRecord)
    -> Result<QuestionId, StorageError>;

    /// Persist a batch of questions in a single transaction. Either
    /// every record is stored or none is.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any insert fails; nothing is persisted
    /// in that case.
    async fn insert_questions(
        &self,
        records: Vec<NewQuestionRecord>,
    ) -> Result<Vec<QuestionId>, StorageError>;

    /// Fetch a question by id. `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError>;

    /// Overwrite an existing question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no row with this id exists.
    async fn update_question(&self, question: &Question) -> Result<(), StorageError>;

    /// List questions matching the filter, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_questions(&self, filter: &QuestionFilter)
    -> Result<Vec<Question>, StorageError>;

    /// Count questions by active flag.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn count_questions(&self, active: bool) -> Result<u64, StorageError>;
}

/// Repository contract for quiz sessions.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a new session and return its allocated id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be stored.
    async fn insert_session(&self, record: NewSessionRecord) -> Result<SessionId, StorageError>;

    /// Fetch a session by id. `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_session(&self, id: SessionId) -> Result<Option<QuizSession>, StorageError>;

    /// Overwrite an existing session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no row with this id exists.
    async fn update_session(&self, session: &QuizSession) -> Result<(), StorageError>;

    /// List sessions in id order with pagination.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_sessions(&self, skip: u32, limit: u32)
    -> Result<Vec<QuizSession>, StorageError>;

    /// List every session with the given status, in id order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_sessions_by_status(
        &self,
        status: SessionStatus,
    ) -> Result<Vec<QuizSession>, StorageError>;

    /// Count sessions with the given status.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn count_sessions_by_status(&self, status: SessionStatus) -> Result<u64, StorageError>;

    /// Hard-delete a session and every answer it owns.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no row with this id exists.
    async fn delete_session(&self, id: SessionId) -> Result<(), StorageError>;
}

/// Repository contract for answers.
#[async_trait]
pub trait AnswerRepository: Send + Sync {
    /// Persist a new answer and return its allocated id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when an answer for the same
    /// (session, question) pair already exists; races between concurrent
    /// writers resolve here.
    async fn insert_answer(&self, record: NewAnswerRecord) -> Result<AnswerId, StorageError>;

    /// Fetch an answer by id. `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_answer(&self, id: AnswerId) -> Result<Option<Answer>, StorageError>;

    /// Fetch the answer for a (session, question) pair, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn find_answer(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
    ) -> Result<Option<Answer>, StorageError>;

    /// Overwrite an existing answer.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no row with this id exists.
    async fn update_answer(&self, answer: &Answer) -> Result<(), StorageError>;

    /// List a session's answers in the order they were recorded.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn answers_for_session(
        &self,
        session_id: SessionId,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<Answer>, StorageError>;

    /// List every answer given to a question, across all sessions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn answers_for_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Vec<Answer>, StorageError>;
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

#[derive(Default)]
struct Inner {
    questions: BTreeMap<u64, Question>,
    sessions: BTreeMap<u64, QuizSession>,
    answers: BTreeMap<u64, Answer>,
    last_question_id: u64,
    last_session_id: u64,
    last_answer_id: u64,
}

/// Simple in-memory repository for testing and prototyping.
///
/// Mirrors the SQLite adapter's semantics: ids are allocated in
/// insertion order, the (session, question) answer constraint is
/// enforced, and deleting a session cascades to its answers.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StorageError> {
        self.inner
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn insert_question(
        &self,
        record: NewQuestionRecord,
    ) -> Result<QuestionId, StorageError> {
        let mut guard = self.lock()?;
        guard.last_question_id += 1;
        let id = QuestionId::new(guard.last_question_id);
        let question = record.into_question(id)?;
        guard.questions.insert(id.value(), question);
        Ok(id)
    }

    async fn insert_questions(
        &self,
        records: Vec<NewQuestionRecord>,
    ) -> Result<Vec<QuestionId>, StorageError> {
        let mut guard = self.lock()?;

        // Build everything before touching the maps so a bad record
        // leaves the store unchanged.
        let first_id = guard.last_question_id + 1;
        let mut staged = Vec::with_capacity(records.len());
        for (offset, record) in records.into_iter().enumerate() {
            let id = QuestionId::new(first_id + offset as u64);
            staged.push((id, record.into_question(id)?));
        }

        let mut ids = Vec::with_capacity(staged.len());
        for (id, question) in staged {
            guard.questions.insert(id.value(), question);
            guard.last_question_id = id.value();
            ids.push(id);
        }
        Ok(ids)
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.questions.get(&id.value()).cloned())
    }

    async fn update_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let slot = guard
            .questions
            .get_mut(&question.id().value())
            .ok_or(StorageError::NotFound)?;
        *slot = question.clone();
        Ok(())
    }

    async fn list_questions(
        &self,
        filter: &QuestionFilter,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self.lock()?;
        let listed = guard
            .questions
            .values()
            .filter(|q| filter.active.is_none_or(|active| q.is_active() == active))
            .filter(|q| filter.category.is_none_or(|c| q.category() == c))
            .filter(|q| filter.difficulty.is_none_or(|d| q.difficulty() == d))
            .skip(filter.skip as usize)
            .take(filter.limit as usize)
            .cloned()
            .collect();
        Ok(listed)
    }

    async fn count_questions(&self, active: bool) -> Result<u64, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .questions
            .values()
            .filter(|q| q.is_active() == active)
            .count() as u64)
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn insert_session(&self, record: NewSessionRecord) -> Result<SessionId, StorageError> {
        let mut guard = self.lock()?;
        guard.last_session_id += 1;
        let id = SessionId::new(guard.last_session_id);
        let session = record.into_session(id)?;
        guard.sessions.insert(id.value(), session);
        Ok(id)
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<QuizSession>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.sessions.get(&id.value()).cloned())
    }

    async fn update_session(&self, session: &QuizSession) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let slot = guard
            .sessions
            .get_mut(&session.id().value())
            .ok_or(StorageError::NotFound)?;
        *slot = session.clone();
        Ok(())
    }

    async fn list_sessions(
        &self,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<QuizSession>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .sessions
            .values()
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_sessions_by_status(
        &self,
        status: SessionStatus,
    ) -> Result<Vec<QuizSession>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .sessions
            .values()
            .filter(|s| s.status() == status)
            .cloned()
            .collect())
    }

    async fn count_sessions_by_status(&self, status: SessionStatus) -> Result<u64, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .sessions
            .values()
            .filter(|s| s.status() == status)
            .count() as u64)
    }

    async fn delete_session(&self, id: SessionId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard
            .sessions
            .remove(&id.value())
            .ok_or(StorageError::NotFound)?;
        guard.answers.retain(|_, answer| answer.session_id != id);
        Ok(())
    }
}

#[async_trait]
impl AnswerRepository for InMemoryRepository {
    async fn insert_answer(&self, record: NewAnswerRecord) -> Result<AnswerId, StorageError> {
        let mut guard = self.lock()?;
        let duplicate = guard.answers.values().any(|a| {
            a.session_id == record.session_id && a.question_id == record.question_id
        });
        if duplicate {
            return Err(StorageError::Conflict);
        }

        guard.last_answer_id += 1;
        let id = AnswerId::new(guard.last_answer_id);
        guard.answers.insert(id.value(), record.into_answer(id));
        Ok(id)
    }

    async fn get_answer(&self, id: AnswerId) -> Result<Option<Answer>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.answers.get(&id.value()).cloned())
    }

    async fn find_answer(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
    ) -> Result<Option<Answer>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .answers
            .values()
            .find(|a| a.session_id == session_id && a.question_id == question_id)
            .cloned())
    }

    async fn update_answer(&self, answer: &Answer) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let slot = guard
            .answers
            .get_mut(&answer.id.value())
            .ok_or(StorageError::NotFound)?;
        *slot = answer.clone();
        Ok(())
    }

    async fn answers_for_session(
        &self,
        session_id: SessionId,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<Answer>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .answers
            .values()
            .filter(|a| a.session_id == session_id)
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn answers_for_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Vec<Answer>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .answers
            .values()
            .filter(|a| a.question_id == question_id)
            .cloned()
            .collect())
    }
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates the three stores behind trait objects so backends can be
/// swapped without touching the services.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub answers: Arc<dyn AnswerRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let sessions: Arc<dyn SessionRepository> = Arc::new(repo.clone());
        let answers: Arc<dyn AnswerRepository> = Arc::new(repo);
        Self {
            questions,
            sessions,
            answers,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
