use chrono::{DateTime, Utc};

use crate::model::ids::{AnswerId, QuestionId, SessionId};

/// Record of one submitted answer inside a quiz session.
///
/// `is_correct` is derived from the question's grading key when the
/// answer is recorded, never supplied by the caller. The response time
/// is stored verbatim, including zero or negative values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub id: AnswerId,
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub selected_index: u32,
    pub is_correct: bool,
    pub response_secs: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Answer {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: AnswerId,
        session_id: SessionId,
        question_id: QuestionId,
        selected_index: u32,
        is_correct: bool,
        response_secs: Option<i64>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            session_id,
            question_id,
            selected_index,
            is_correct,
            response_secs,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn answer_keeps_response_time_verbatim() {
        let answer = Answer::new(
            AnswerId::new(1),
            SessionId::new(2),
            QuestionId::new(3),
            0,
            true,
            Some(-4),
            fixed_now(),
        );
        assert_eq!(answer.response_secs, Some(-4));
        assert!(answer.is_correct);
    }
}
