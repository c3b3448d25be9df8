use quiz_core::model::{
    Answer, AnswerId, Category, Difficulty, Question, QuestionId, QuizSession, SessionId,
    SessionStatus,
};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn session_id_from_i64(v: i64) -> Result<SessionId, StorageError> {
    Ok(SessionId::new(i64_to_u64("session_id", v)?))
}

pub(crate) fn answer_id_from_i64(v: i64) -> Result<AnswerId, StorageError> {
    Ok(AnswerId::new(i64_to_u64("answer_id", v)?))
}

pub(crate) fn parse_category(s: &str) -> Result<Category, StorageError> {
    match s {
        "Tecnología" => Ok(Category::Tecnologia),
        "Historia" => Ok(Category::Historia),
        "Ciencia" => Ok(Category::Ciencia),
        "Geografía" => Ok(Category::Geografia),
        "Literatura" => Ok(Category::Literatura),
        "Deporte" => Ok(Category::Deporte),
        _ => Err(StorageError::Serialization(format!(
            "invalid category: {s}"
        ))),
    }
}

pub(crate) fn parse_difficulty(s: &str) -> Result<Difficulty, StorageError> {
    match s {
        "fácil" => Ok(Difficulty::Facil),
        "medio" => Ok(Difficulty::Medio),
        "difícil" => Ok(Difficulty::Dificil),
        _ => Err(StorageError::Serialization(format!(
            "invalid difficulty: {s}"
        ))),
    }
}

pub(crate) fn parse_session_status(s: &str) -> Result<SessionStatus, StorageError> {
    match s {
        "en_progreso" => Ok(SessionStatus::InProgress),
        "completado" => Ok(SessionStatus::Completed),
        "abandonado" => Ok(SessionStatus::Abandoned),
        _ => Err(StorageError::Serialization(format!("invalid status: {s}"))),
    }
}

pub(crate) fn options_to_json(options: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(options).map_err(ser)
}

fn options_from_json(raw: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let options = options_from_json(&row.try_get::<String, _>("options").map_err(ser)?)?;
    let category = parse_category(&row.try_get::<String, _>("category").map_err(ser)?)?;
    let difficulty = parse_difficulty(&row.try_get::<String, _>("difficulty").map_err(ser)?)?;

    Question::from_persisted(
        question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get("prompt").map_err(ser)?,
        options,
        u32_from_i64(
            "correct_index",
            row.try_get::<i64, _>("correct_index").map_err(ser)?,
        )?,
        row.try_get("explanation").map_err(ser)?,
        category,
        difficulty,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("is_active").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_session_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<QuizSession, StorageError> {
    let status = parse_session_status(&row.try_get::<String, _>("status").map_err(ser)?)?;

    QuizSession::from_persisted(
        session_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get("player").map_err(ser)?,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("finished_at").map_err(ser)?,
        u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        u32_from_i64("answered", row.try_get::<i64, _>("answered").map_err(ser)?)?,
        u32_from_i64("correct", row.try_get::<i64, _>("correct").map_err(ser)?)?,
        status,
        row.try_get("elapsed_secs").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_answer_row(row: &sqlx::sqlite::SqliteRow) -> Result<Answer, StorageError> {
    Ok(Answer::new(
        answer_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        session_id_from_i64(row.try_get::<i64, _>("session_id").map_err(ser)?)?,
        question_id_from_i64(row.try_get::<i64, _>("question_id").map_err(ser)?)?,
        u32_from_i64(
            "selected_index",
            row.try_get::<i64, _>("selected_index").map_err(ser)?,
        )?,
        row.try_get("is_correct").map_err(ser)?,
        row.try_get("response_secs").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    ))
}
