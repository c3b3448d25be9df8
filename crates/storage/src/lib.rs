#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    AnswerRepository, NewAnswerRecord, NewQuestionRecord, NewSessionRecord, QuestionFilter,
    QuestionRepository, SessionRepository, Storage, StorageError,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
