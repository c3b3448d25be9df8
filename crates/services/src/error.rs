//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{AnswerId, QuestionError, QuestionId, SessionError, SessionId, TaxonomyError};
use storage::repository::StorageError;

/// Errors emitted by `QuestionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionServiceError {
    #[error("question {0} not found")]
    NotFound(QuestionId),
    #[error("no active questions available")]
    NoneAvailable,
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Taxonomy(#[from] TaxonomyError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AnswerService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnswerServiceError {
    #[error("quiz session {0} not found")]
    SessionNotFound(SessionId),
    #[error("question {0} not found")]
    QuestionNotFound(QuestionId),
    #[error("answer {0} not found")]
    NotFound(AnswerId),
    #[error("an answer for question {question} already exists in session {session}")]
    AlreadyAnswered {
        session: SessionId,
        question: QuestionId,
    },
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SessionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionServiceError {
    #[error("quiz session {0} not found")]
    NotFound(SessionId),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `StatsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StatsError {
    #[error("quiz session {0} not found")]
    SessionNotFound(SessionId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
