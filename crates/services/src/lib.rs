#![forbid(unsafe_code)]

pub mod answer_service;
pub mod error;
pub mod question_service;
pub mod session_service;
pub mod stats_service;

pub use quiz_core::Clock;

pub use answer_service::AnswerService;
pub use error::{AnswerServiceError, QuestionServiceError, SessionServiceError, StatsError};
pub use question_service::{QuestionDraft, QuestionService};
pub use session_service::SessionService;
pub use stats_service::{
    AnswerBreakdown, CategoryErrorRate, CategoryPerformance, GlobalStatistics,
    QuestionDifficulty, SessionStatistics, StatsService,
};
