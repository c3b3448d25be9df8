mod answer;
mod ids;
mod question;
mod session;
pub mod taxonomy;

pub use answer::Answer;
pub use ids::{AnswerId, QuestionId, SessionId};
pub use question::{MAX_OPTIONS, MIN_OPTIONS, Question, QuestionError};
pub use session::{QuizSession, ScoreTally, SessionError, SessionStatus};
pub use taxonomy::{Category, Difficulty, TaxonomyError};
