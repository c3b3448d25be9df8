use std::sync::Arc;

use quiz_core::model::{QuizSession, ScoreTally, SessionId};
use storage::repository::{
    AnswerRepository, NewSessionRecord, SessionRepository, StorageError,
};

use crate::Clock;
use crate::error::SessionServiceError;

/// Quiz session lifecycle: start, finalize, delete.
#[derive(Clone)]
pub struct SessionService {
    clock: Clock,
    sessions: Arc<dyn SessionRepository>,
    answers: Arc<dyn AnswerRepository>,
}

impl SessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        sessions: Arc<dyn SessionRepository>,
        answers: Arc<dyn AnswerRepository>,
    ) -> Self {
        Self {
            clock,
            sessions,
            answers,
        }
    }

    /// Start a new in-progress session.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError::Storage` if persistence fails.
    pub async fn start_session(
        &self,
        player: Option<String>,
    ) -> Result<QuizSession, SessionServiceError> {
        let draft = QuizSession::start(SessionId::new(1), player, self.clock.now());
        let id = self
            .sessions
            .insert_session(NewSessionRecord::from_session(&draft))
            .await?;

        tracing::info!(session = %id, "quiz session started");
        let session = self
            .sessions
            .get_session(id)
            .await?
            .ok_or(StorageError::NotFound)?;
        Ok(session)
    }

    /// Fetch a session by id.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError::NotFound` when it does not exist.
    pub async fn get_session(&self, id: SessionId) -> Result<QuizSession, SessionServiceError> {
        self.sessions
            .get_session(id)
            .await?
            .ok_or(SessionServiceError::NotFound(id))
    }

    /// List sessions in id order with pagination.
    ///
    /// Pagination bounds are enforced by the caller.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError::Storage` if repository access
    /// fails.
    pub async fn list_sessions(
        &self,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<QuizSession>, SessionServiceError> {
        let sessions = self.sessions.list_sessions(skip, limit).await?;
        Ok(sessions)
    }

    /// Close a session and write its final score, counts, and elapsed
    /// time from the answers recorded so far.
    ///
    /// Finalizing is a recomputation: calling it again re-aggregates
    /// from the current answers and overwrites the previous figures.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError::NotFound` when the session does not
    /// exist.
    pub async fn finalize_session(
        &self,
        id: SessionId,
    ) -> Result<QuizSession, SessionServiceError> {
        let mut session = self.get_session(id).await?;

        let answers = self.answers.answers_for_session(id, 0, u32::MAX).await?;
        let tally = ScoreTally::from_answers(&answers)?;
        session.complete(&tally, self.clock.now());
        self.sessions.update_session(&session).await?;

        tracing::info!(
            session = %id,
            score = session.score(),
            answered = session.answered(),
            "quiz session finalized"
        );
        Ok(session)
    }

    /// Hard-delete a session together with every answer it owns.
    ///
    /// # Errors
    ///
    /// Returns `SessionServiceError::NotFound` when the session does not
    /// exist.
    pub async fn delete_session(&self, id: SessionId) -> Result<(), SessionServiceError> {
        match self.sessions.delete_session(id).await {
            Ok(()) => {
                tracing::info!(session = %id, "quiz session deleted");
                Ok(())
            }
            Err(StorageError::NotFound) => Err(SessionServiceError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use quiz_core::model::{QuestionId, SessionStatus};
    use quiz_core::time::{fixed_clock, fixed_now};
    use storage::repository::{InMemoryRepository, NewAnswerRecord};

    fn service(repo: &InMemoryRepository) -> SessionService {
        SessionService::new(fixed_clock(), Arc::new(repo.clone()), Arc::new(repo.clone()))
    }

    async fn record_answer(
        repo: &InMemoryRepository,
        session: SessionId,
        question: u64,
        is_correct: bool,
        response_secs: Option<i64>,
    ) {
        repo.insert_answer(NewAnswerRecord {
            session_id: session,
            question_id: QuestionId::new(question),
            selected_index: 0,
            is_correct,
            response_secs,
            created_at: fixed_now(),
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn start_session_begins_in_progress() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);

        let session = service.start_session(Some("Juan".into())).await.unwrap();
        assert_eq!(session.id(), SessionId::new(1));
        assert_eq!(session.player(), Some("Juan"));
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert_eq!(session.score(), 0);
        assert_eq!(session.finished_at(), None);
    }

    #[tokio::test]
    async fn finalize_truncates_the_percentage() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let session = service.start_session(None).await.unwrap();

        record_answer(&repo, session.id(), 1, true, Some(10)).await;
        record_answer(&repo, session.id(), 2, true, Some(12)).await;
        record_answer(&repo, session.id(), 3, false, Some(8)).await;

        // finalize through a later clock so the finish timestamp moves
        let finished_at = fixed_now() + Duration::minutes(5);
        let late_service = SessionService::new(
            Clock::fixed(finished_at),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );

        let finalized = late_service.finalize_session(session.id()).await.unwrap();
        assert_eq!(finalized.status(), SessionStatus::Completed);
        assert_eq!(finalized.score(), 66);
        assert_eq!(finalized.answered(), 3);
        assert_eq!(finalized.correct(), 2);
        assert_eq!(finalized.elapsed_secs(), Some(30));
        assert_eq!(finalized.finished_at(), Some(finished_at));
    }

    #[tokio::test]
    async fn finalize_with_no_answers_scores_zero() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let session = service.start_session(None).await.unwrap();

        let finalized = service.finalize_session(session.id()).await.unwrap();
        assert_eq!(finalized.score(), 0);
        assert_eq!(finalized.answered(), 0);
        assert_eq!(finalized.elapsed_secs(), None);
        assert_eq!(finalized.status(), SessionStatus::Completed);
    }

    #[tokio::test]
    async fn finalize_again_recomputes_from_current_answers() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let session = service.start_session(None).await.unwrap();

        record_answer(&repo, session.id(), 1, false, None).await;
        let first = service.finalize_session(session.id()).await.unwrap();
        assert_eq!(first.score(), 0);

        record_answer(&repo, session.id(), 2, true, Some(4)).await;
        let second = service.finalize_session(session.id()).await.unwrap();
        assert_eq!(second.score(), 50);
        assert_eq!(second.answered(), 2);
        assert_eq!(second.elapsed_secs(), Some(4));
    }

    #[tokio::test]
    async fn finalize_of_missing_session_is_not_found() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let err = service
            .finalize_session(SessionId::new(7))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_session_removes_it_and_its_answers() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let session = service.start_session(None).await.unwrap();
        record_answer(&repo, session.id(), 1, true, None).await;

        service.delete_session(session.id()).await.unwrap();

        let err = service.get_session(session.id()).await.unwrap_err();
        assert!(matches!(err, SessionServiceError::NotFound(_)));
        assert!(
            repo.find_answer(session.id(), QuestionId::new(1))
                .await
                .unwrap()
                .is_none()
        );

        let err = service.delete_session(session.id()).await.unwrap_err();
        assert!(matches!(err, SessionServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_sessions_paginates() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        for player in ["a", "b", "c"] {
            service.start_session(Some(player.into())).await.unwrap();
        }

        let page = service.list_sessions(1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].player(), Some("b"));
    }
}
