use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::answer::Answer;
use crate::model::ids::SessionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("finished_at is before started_at")]
    InvalidTimeRange,

    #[error("correct count ({correct}) exceeds answered count ({answered})")]
    CountMismatch { answered: u32, correct: u32 },

    #[error("score must be a percentage between 0 and 100, got {0}")]
    InvalidScore(u32),

    #[error("too many answers for a single session: {len}")]
    TooManyAnswers { len: usize },
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle state of a quiz session.
///
/// Sessions start in progress and are moved to completed by finalizing
/// them; nothing re-opens a completed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SessionStatus {
    #[serde(rename = "en_progreso")]
    InProgress,
    #[serde(rename = "completado")]
    Completed,
    #[serde(rename = "abandonado")]
    Abandoned,
}

impl SessionStatus {
    /// Canonical wire spelling.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "en_progreso",
            SessionStatus::Completed => "completado",
            SessionStatus::Abandoned => "abandonado",
        }
    }
}

//
// ─── SCORE TALLY ───────────────────────────────────────────────────────────────
//

/// Aggregates a session's answers into its final figures.
///
/// The score is an integer percentage using truncating division, so two
/// correct answers out of three yield 66, not 67. The elapsed time is
/// the sum of the recorded response times and is absent when that sum is
/// not positive (no timed answers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreTally {
    answered: u32,
    correct: u32,
    score: u32,
    elapsed_secs: Option<i64>,
}

impl ScoreTally {
    /// Aggregates the given answers.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::TooManyAnswers` if the answer count cannot
    /// fit in `u32`.
    pub fn from_answers(answers: &[Answer]) -> Result<Self, SessionError> {
        let answered = u32::try_from(answers.len())
            .map_err(|_| SessionError::TooManyAnswers { len: answers.len() })?;

        let mut correct = 0_u32;
        let mut elapsed = 0_i64;
        for answer in answers {
            if answer.is_correct {
                correct = correct.saturating_add(1);
            }
            if let Some(secs) = answer.response_secs {
                elapsed = elapsed.saturating_add(secs);
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        let score = if answered > 0 {
            (u64::from(correct) * 100 / u64::from(answered)) as u32
        } else {
            0
        };

        Ok(Self {
            answered,
            correct,
            score,
            elapsed_secs: (elapsed > 0).then_some(elapsed),
        })
    }

    #[must_use]
    pub fn answered(&self) -> u32 {
        self.answered
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    /// Integer percentage of correct answers, 0 when nothing was
    /// answered.
    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> Option<i64> {
        self.elapsed_secs
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One quiz attempt, bounded by start and finalize.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSession {
    id: SessionId,
    player: Option<String>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    score: u32,
    answered: u32,
    correct: u32,
    status: SessionStatus,
    elapsed_secs: Option<i64>,
    created_at: DateTime<Utc>,
}

impl QuizSession {
    /// Starts a fresh in-progress session with zeroed aggregates.
    #[must_use]
    pub fn start(id: SessionId, player: Option<String>, now: DateTime<Utc>) -> Self {
        let player = player
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty());

        Self {
            id,
            player,
            started_at: now,
            finished_at: None,
            score: 0,
            answered: 0,
            correct: 0,
            status: SessionStatus::InProgress,
            elapsed_secs: None,
            created_at: now,
        }
    }

    /// Rehydrates a session from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTimeRange` if the finish timestamp
    /// precedes the start, `SessionError::CountMismatch` if more answers
    /// are marked correct than were given, or
    /// `SessionError::InvalidScore` if the score is not a percentage.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: SessionId,
        player: Option<String>,
        started_at: DateTime<Utc>,
        finished_at: Option<DateTime<Utc>>,
        score: u32,
        answered: u32,
        correct: u32,
        status: SessionStatus,
        elapsed_secs: Option<i64>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if let Some(finished) = finished_at {
            if finished < started_at {
                return Err(SessionError::InvalidTimeRange);
            }
        }
        if correct > answered {
            return Err(SessionError::CountMismatch { answered, correct });
        }
        if score > 100 {
            return Err(SessionError::InvalidScore(score));
        }

        Ok(Self {
            id,
            player,
            started_at,
            finished_at,
            score,
            answered,
            correct,
            status,
            elapsed_secs,
            created_at,
        })
    }

    /// Writes the final aggregates and closes the session.
    ///
    /// Calling this again overwrites the previous figures; finalizing is
    /// a recomputation, not a one-shot transition.
    pub fn complete(&mut self, tally: &ScoreTally, now: DateTime<Utc>) {
        self.answered = tally.answered();
        self.correct = tally.correct();
        self.score = tally.score();
        self.elapsed_secs = tally.elapsed_secs();
        self.finished_at = Some(now);
        self.status = SessionStatus::Completed;
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn player(&self) -> Option<&str> {
        self.player.as_deref()
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn answered(&self) -> u32 {
        self.answered
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> Option<i64> {
        self.elapsed_secs
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
