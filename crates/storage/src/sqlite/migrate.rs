use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

// Version 1: the whole schema. The unique (session_id, question_id)
// index is what turns a duplicate answer into a constraint error, and
// the cascading foreign keys take a session's answers with it.
const SCHEMA_V1: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS questions (
        id INTEGER PRIMARY KEY,
        prompt TEXT NOT NULL,
        options TEXT NOT NULL,
        correct_index INTEGER NOT NULL CHECK (correct_index >= 0),
        explanation TEXT,
        category TEXT NOT NULL,
        difficulty TEXT NOT NULL,
        created_at TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS quiz_sessions (
        id INTEGER PRIMARY KEY,
        player TEXT,
        started_at TEXT NOT NULL,
        finished_at TEXT,
        score INTEGER NOT NULL DEFAULT 0 CHECK (score BETWEEN 0 AND 100),
        answered INTEGER NOT NULL DEFAULT 0 CHECK (answered >= 0),
        correct INTEGER NOT NULL DEFAULT 0 CHECK (correct >= 0),
        status TEXT NOT NULL,
        elapsed_secs INTEGER,
        created_at TEXT NOT NULL
    );
    ",
    r"
    CREATE TABLE IF NOT EXISTS answers (
        id INTEGER PRIMARY KEY,
        session_id INTEGER NOT NULL,
        question_id INTEGER NOT NULL,
        selected_index INTEGER NOT NULL CHECK (selected_index >= 0),
        is_correct INTEGER NOT NULL,
        response_secs INTEGER,
        created_at TEXT NOT NULL,
        UNIQUE (session_id, question_id),
        FOREIGN KEY (session_id) REFERENCES quiz_sessions(id) ON DELETE CASCADE,
        FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
    );
    ",
    r"
    CREATE INDEX IF NOT EXISTS idx_questions_active_category
        ON questions (is_active, category);
    ",
    r"
    CREATE INDEX IF NOT EXISTS idx_sessions_status
        ON quiz_sessions (status);
    ",
    r"
    CREATE INDEX IF NOT EXISTS idx_answers_question
        ON answers (question_id);
    ",
];

async fn version_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
        .bind(version)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// Runs the consolidated migration for the current schema.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );
        ",
    )
    .execute(pool)
    .await?;

    if version_applied(pool, 1).await? {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for statement in SCHEMA_V1 {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    sqlx::query(
        r"
        INSERT INTO schema_migrations (version, applied_at)
        VALUES (?1, ?2)
        ON CONFLICT(version) DO NOTHING
        ",
    )
    .bind(1_i64)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(())
}
