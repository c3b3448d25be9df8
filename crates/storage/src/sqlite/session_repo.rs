use quiz_core::model::{QuizSession, SessionId, SessionStatus};
use sqlx::Row;

use super::{
    SqliteRepository,
    mapping::{id_to_i64, map_session_row, ser},
};
use crate::repository::{NewSessionRecord, SessionRepository, StorageError};

const SESSION_COLUMNS: &str = "id, player, started_at, finished_at, score, answered, \
                               correct, status, elapsed_secs, created_at";

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn insert_session(&self, record: NewSessionRecord) -> Result<SessionId, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO quiz_sessions (
                    player, started_at, finished_at, score, answered,
                    correct, status, elapsed_secs, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(&record.player)
        .bind(record.started_at)
        .bind(record.finished_at)
        .bind(i64::from(record.score))
        .bind(i64::from(record.answered))
        .bind(i64::from(record.correct))
        .bind(record.status.as_str())
        .bind(record.elapsed_secs)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let id = u64::try_from(res.last_insert_rowid())
            .map_err(|_| StorageError::Serialization("negative rowid".into()))?;
        Ok(SessionId::new(id))
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<QuizSession>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM quiz_sessions WHERE id = ?1"
        ))
        .bind(id_to_i64("session_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_session_row).transpose()
    }

    async fn update_session(&self, session: &QuizSession) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
                UPDATE quiz_sessions SET
                    player = ?2,
                    started_at = ?3,
                    finished_at = ?4,
                    score = ?5,
                    answered = ?6,
                    correct = ?7,
                    status = ?8,
                    elapsed_secs = ?9,
                    created_at = ?10
                WHERE id = ?1
            ",
        )
        .bind(id_to_i64("session_id", session.id().value())?)
        .bind(session.player())
        .bind(session.started_at())
        .bind(session.finished_at())
        .bind(i64::from(session.score()))
        .bind(i64::from(session.answered()))
        .bind(i64::from(session.correct()))
        .bind(session.status().as_str())
        .bind(session.elapsed_secs())
        .bind(session.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_sessions(
        &self,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<QuizSession>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM quiz_sessions ORDER BY id ASC LIMIT ?1 OFFSET ?2"
        ))
        .bind(i64::from(limit))
        .bind(i64::from(skip))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            sessions.push(map_session_row(&row)?);
        }
        Ok(sessions)
    }

    async fn list_sessions_by_status(
        &self,
        status: SessionStatus,
    ) -> Result<Vec<QuizSession>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM quiz_sessions WHERE status = ?1 ORDER BY id ASC"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            sessions.push(map_session_row(&row)?);
        }
        Ok(sessions)
    }

    async fn count_sessions_by_status(&self, status: SessionStatus) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM quiz_sessions WHERE status = ?1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let n: i64 = row.try_get("n").map_err(ser)?;
        u64::try_from(n).map_err(|_| StorageError::Serialization("negative count".into()))
    }

    async fn delete_session(&self, id: SessionId) -> Result<(), StorageError> {
        // answers go with it via ON DELETE CASCADE
        let res = sqlx::query("DELETE FROM quiz_sessions WHERE id = ?1")
            .bind(id_to_i64("session_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
