use quiz_core::model::{Answer, AnswerId, QuestionId, SessionId};

use super::{
    SqliteRepository,
    mapping::{id_to_i64, map_answer_row},
};
use crate::repository::{AnswerRepository, NewAnswerRecord, StorageError};

const ANSWER_COLUMNS: &str =
    "id, session_id, question_id, selected_index, is_correct, response_secs, created_at";

fn insert_error(e: sqlx::Error) -> StorageError {
    // a violated UNIQUE (session_id, question_id) means this question was
    // already answered in this session
    if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
        StorageError::Conflict
    } else {
        StorageError::Connection(e.to_string())
    }
}

#[async_trait::async_trait]
impl AnswerRepository for SqliteRepository {
    async fn insert_answer(&self, record: NewAnswerRecord) -> Result<AnswerId, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO answers (
                    session_id, question_id, selected_index,
                    is_correct, response_secs, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(id_to_i64("session_id", record.session_id.value())?)
        .bind(id_to_i64("question_id", record.question_id.value())?)
        .bind(i64::from(record.selected_index))
        .bind(record.is_correct)
        .bind(record.response_secs)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        let id = u64::try_from(res.last_insert_rowid())
            .map_err(|_| StorageError::Serialization("negative rowid".into()))?;
        Ok(AnswerId::new(id))
    }

    async fn get_answer(&self, id: AnswerId) -> Result<Option<Answer>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {ANSWER_COLUMNS} FROM answers WHERE id = ?1"
        ))
        .bind(id_to_i64("answer_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_answer_row).transpose()
    }

    async fn find_answer(
        &self,
        session_id: SessionId,
        question_id: QuestionId,
    ) -> Result<Option<Answer>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {ANSWER_COLUMNS} FROM answers WHERE session_id = ?1 AND question_id = ?2"
        ))
        .bind(id_to_i64("session_id", session_id.value())?)
        .bind(id_to_i64("question_id", question_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_answer_row).transpose()
    }

    async fn update_answer(&self, answer: &Answer) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
                UPDATE answers SET
                    selected_index = ?2,
                    is_correct = ?3,
                    response_secs = ?4
                WHERE id = ?1
            ",
        )
        .bind(id_to_i64("answer_id", answer.id.value())?)
        .bind(i64::from(answer.selected_index))
        .bind(answer.is_correct)
        .bind(answer.response_secs)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn answers_for_session(
        &self,
        session_id: SessionId,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<Answer>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {ANSWER_COLUMNS} FROM answers \
             WHERE session_id = ?1 ORDER BY id ASC LIMIT ?2 OFFSET ?3"
        ))
        .bind(id_to_i64("session_id", session_id.value())?)
        .bind(i64::from(limit))
        .bind(i64::from(skip))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut answers = Vec::with_capacity(rows.len());
        for row in rows {
            answers.push(map_answer_row(&row)?);
        }
        Ok(answers)
    }

    async fn answers_for_question(
        &self,
        question_id: QuestionId,
    ) -> Result<Vec<Answer>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {ANSWER_COLUMNS} FROM answers WHERE question_id = ?1 ORDER BY id ASC"
        ))
        .bind(id_to_i64("question_id", question_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut answers = Vec::with_capacity(rows.len());
        for row in rows {
            answers.push(map_answer_row(&row)?);
        }
        Ok(answers)
    }
}
