use quiz_core::model::{Question, QuestionId};
use sqlx::{Row, Sqlite, Transaction};

use super::{
    SqliteRepository,
    mapping::{id_to_i64, map_question_row, options_to_json, ser},
};
use crate::repository::{NewQuestionRecord, QuestionFilter, QuestionRepository, StorageError};

const QUESTION_COLUMNS: &str = "id, prompt, options, correct_index, explanation, \
                                category, difficulty, created_at, is_active";

async fn insert_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    record: &NewQuestionRecord,
) -> Result<QuestionId, StorageError> {
    let res = sqlx::query(
        r"
            INSERT INTO questions (
                prompt, options, correct_index, explanation,
                category, difficulty, created_at, is_active
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ",
    )
    .bind(&record.prompt)
    .bind(options_to_json(&record.options)?)
    .bind(i64::from(record.correct_index))
    .bind(&record.explanation)
    .bind(record.category.as_str())
    .bind(record.difficulty.as_str())
    .bind(record.created_at)
    .bind(record.is_active)
    .execute(&mut **tx)
    .await
    .map_err(|e| StorageError::Connection(e.to_string()))?;

    let id = u64::try_from(res.last_insert_rowid())
        .map_err(|_| StorageError::Serialization("negative rowid".into()))?;
    Ok(QuestionId::new(id))
}

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn insert_question(
        &self,
        record: NewQuestionRecord,
    ) -> Result<QuestionId, StorageError> {
        let ids = self.insert_questions(vec![record]).await?;
        ids.into_iter()
            .next()
            .ok_or_else(|| StorageError::Serialization("insert returned no id".into()))
    }

    async fn insert_questions(
        &self,
        records: Vec<NewQuestionRecord>,
    ) -> Result<Vec<QuestionId>, StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut ids = Vec::with_capacity(records.len());
        for record in &records {
            ids.push(insert_in_tx(&mut tx, record).await?);
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(ids)
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?1"
        ))
        .bind(id_to_i64("question_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_question_row).transpose()
    }

    async fn update_question(&self, question: &Question) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
                UPDATE questions SET
                    prompt = ?2,
                    options = ?3,
                    correct_index = ?4,
                    explanation = ?5,
                    category = ?6,
                    difficulty = ?7,
                    created_at = ?8,
                    is_active = ?9
                WHERE id = ?1
            ",
        )
        .bind(id_to_i64("question_id", question.id().value())?)
        .bind(question.prompt())
        .bind(options_to_json(question.options())?)
        .bind(i64::from(question.correct_index()))
        .bind(question.explanation())
        .bind(question.category().as_str())
        .bind(question.difficulty().as_str())
        .bind(question.created_at())
        .bind(question.is_active())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_questions(
        &self,
        filter: &QuestionFilter,
    ) -> Result<Vec<Question>, StorageError> {
        let mut sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE 1 = 1");

        let mut bind_index = 1;
        if filter.active.is_some() {
            sql.push_str(&format!(" AND is_active = ?{bind_index}"));
            bind_index += 1;
        }
        if filter.category.is_some() {
            sql.push_str(&format!(" AND category = ?{bind_index}"));
            bind_index += 1;
        }
        if filter.difficulty.is_some() {
            sql.push_str(&format!(" AND difficulty = ?{bind_index}"));
            bind_index += 1;
        }
        sql.push_str(&format!(
            " ORDER BY id ASC LIMIT ?{} OFFSET ?{}",
            bind_index,
            bind_index + 1
        ));

        let mut query = sqlx::query(&sql);
        if let Some(active) = filter.active {
            query = query.bind(active);
        }
        if let Some(category) = filter.category {
            query = query.bind(category.as_str());
        }
        if let Some(difficulty) = filter.difficulty {
            query = query.bind(difficulty.as_str());
        }
        query = query.bind(i64::from(filter.limit)).bind(i64::from(filter.skip));

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut questions = Vec::with_capacity(rows.len());
        for row in rows {
            questions.push(map_question_row(&row)?);
        }
        Ok(questions)
    }

    async fn count_questions(&self, active: bool) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM questions WHERE is_active = ?1")
            .bind(active)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let n: i64 = row.try_get("n").map_err(ser)?;
        u64::try_from(n).map_err(|_| StorageError::Serialization("negative count".into()))
    }
}
