use std::sync::Arc;
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{AnswerRepository, QuestionRepository, SessionRepository, Storage};

mod answer_repo;
mod mapping;
mod migrate;
mod question_repo;
mod session_repo;

// Applied to every pooled connection. The answers table relies on
// enforced foreign keys for its cascade deletes.
const CONNECTION_PRAGMAS: &[&str] = &[
    "PRAGMA foreign_keys = ON;",
    "PRAGMA journal_mode = WAL;",
    "PRAGMA busy_timeout = 5000;",
];

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// `SQLite`-backed implementation of the three repository contracts.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Open a pool against the given `SQLite` URL and prepare each
    /// connection with the pragmas above.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` when the pool cannot be opened or a
    /// pragma fails.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    for pragma in CONNECTION_PRAGMAS {
                        sqlx::query(pragma).execute(&mut *conn).await?;
                    }
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Bring the schema up to date, creating tables on first use.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` when a migration statement fails.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Connect, migrate, and expose the repository as a `Storage`
    /// aggregate.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` when connecting or migrating fails.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        Ok(Self {
            questions: Arc::new(repo.clone()) as Arc<dyn QuestionRepository>,
            sessions: Arc::new(repo.clone()) as Arc<dyn SessionRepository>,
            answers: Arc::new(repo) as Arc<dyn AnswerRepository>,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_handle_is_shareable_across_tasks() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<SqliteRepository>();
    }
}
