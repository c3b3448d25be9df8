use std::sync::Arc;

use quiz_core::model::{Answer, AnswerId, Question, QuestionId, SessionId};
use storage::repository::{
    AnswerRepository, NewAnswerRecord, QuestionRepository, SessionRepository, StorageError,
};

use crate::Clock;
use crate::error::AnswerServiceError;

/// Records and corrects answers inside quiz sessions.
#[derive(Clone)]
pub struct AnswerService {
    clock: Clock,
    sessions: Arc<dyn SessionRepository>,
    questions: Arc<dyn QuestionRepository>,
    answers: Arc<dyn AnswerRepository>,
}

impl AnswerService {
    #[must_use]
    pub fn new(
        clock: Clock,
        sessions: Arc<dyn SessionRepository>,
        questions: Arc<dyn QuestionRepository>,
        answers: Arc<dyn AnswerRepository>,
    ) -> Self {
        Self {
            clock,
            sessions,
            questions,
            answers,
        }
    }

    async fn require_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Question, AnswerServiceError> {
        self.questions
            .get_question(question_id)
            .await?
            .ok_or(AnswerServiceError::QuestionNotFound(question_id))
    }

    /// Record an answer for a (session, question) pair.
    ///
    /// Preconditions are checked in order, first failure wins: the
    /// session exists, the question exists, the selected index is in
    /// range, and the pair has not been answered yet. Correctness is
    /// derived from the question's grading key; the response time is
    /// stored verbatim, zero and negative values included.
    ///
    /// # Errors
    ///
    /// Returns `AnswerServiceError::SessionNotFound`,
    /// `AnswerServiceError::QuestionNotFound`,
    /// `AnswerServiceError::Question` for an out-of-range selection, or
    /// `AnswerServiceError::AlreadyAnswered` for a duplicate, including
    /// the case where a concurrent writer inserted the duplicate first.
    pub async fn record_answer(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
        selected_index: u32,
        response_secs: Option<i64>,
    ) -> Result<Answer, AnswerServiceError> {
        self.sessions
            .get_session(session_id)
            .await?
            .ok_or(AnswerServiceError::SessionNotFound(session_id))?;
        let question = self.require_question(question_id).await?;

        let is_correct = question.grade(selected_index)?;

        if self
            .answers
            .find_answer(session_id, question_id)
            .await?
            .is_some()
        {
            return Err(AnswerServiceError::AlreadyAnswered {
                session: session_id,
                question: question_id,
            });
        }

        let record = NewAnswerRecord {
            session_id,
            question_id,
            selected_index,
            is_correct,
            response_secs,
            created_at: self.clock.now(),
        };
        let id = match self.answers.insert_answer(record).await {
            Ok(id) => id,
            // lost a race against another writer for the same pair
            Err(StorageError::Conflict) => {
                return Err(AnswerServiceError::AlreadyAnswered {
                    session: session_id,
                    question: question_id,
                });
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            session = %session_id,
            question = %question_id,
            correct = is_correct,
            "answer recorded"
        );

        let answer = self
            .answers
            .get_answer(id)
            .await?
            .ok_or(StorageError::NotFound)?;
        Ok(answer)
    }

    /// Correct a recorded answer.
    ///
    /// The answer is addressed by its own id; the selected index is
    /// validated against the given question and correctness recomputed.
    /// The response time is overwritten with whatever the caller sends,
    /// absent included.
    ///
    /// # Errors
    ///
    /// Returns `AnswerServiceError::NotFound` when the answer does not
    /// exist, `AnswerServiceError::QuestionNotFound` when the question
    /// does not, or `AnswerServiceError::Question` for an out-of-range
    /// selection.
    pub async fn correct_answer(
        &self,
        answer_id: AnswerId,
        question_id: QuestionId,
        selected_index: u32,
        response_secs: Option<i64>,
    ) -> Result<Answer, AnswerServiceError> {
        let mut answer = self
            .answers
            .get_answer(answer_id)
            .await?
            .ok_or(AnswerServiceError::NotFound(answer_id))?;
        let question = self.require_question(question_id).await?;

        answer.selected_index = selected_index;
        answer.is_correct = question.grade(selected_index)?;
        answer.response_secs = response_secs;

        self.answers.update_answer(&answer).await?;
        tracing::info!(answer = %answer_id, correct = answer.is_correct, "answer corrected");
        Ok(answer)
    }

    /// Fetch an answer by id.
    ///
    /// # Errors
    ///
    /// Returns `AnswerServiceError::NotFound` when it does not exist.
    pub async fn get_answer(&self, id: AnswerId) -> Result<Answer, AnswerServiceError> {
        self.answers
            .get_answer(id)
            .await?
            .ok_or(AnswerServiceError::NotFound(id))
    }

    /// List a session's answers in recording order.
    ///
    /// Pagination bounds are enforced by the caller.
    ///
    /// # Errors
    ///
    /// Returns `AnswerServiceError::SessionNotFound` when the session
    /// does not exist.
    pub async fn answers_for_session(
        &self,
        session_id: SessionId,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<Answer>, AnswerServiceError> {
        self.sessions
            .get_session(session_id)
            .await?
            .ok_or(AnswerServiceError::SessionNotFound(session_id))?;
        let answers = self
            .answers
            .answers_for_session(session_id, skip, limit)
            .await?;
        Ok(answers)
    }
}
