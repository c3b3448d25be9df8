use std::sync::Arc;

use serde::Serialize;

use quiz_core::model::{
    Answer, Category, Difficulty, QuestionId, SessionId, SessionStatus,
};
use storage::repository::{
    AnswerRepository, QuestionFilter, QuestionRepository, SessionRepository,
};

use crate::error::StatsError;

//
// ─── REPORT TYPES ──────────────────────────────────────────────────────────────
//

/// One category's error rate in the global ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryErrorRate {
    pub category: Category,
    pub error_rate: f64,
}

/// System-wide aggregates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalStatistics {
    pub active_questions: u64,
    pub completed_sessions: u64,
    pub mean_score: f64,
    pub hardest_categories: Vec<CategoryErrorRate>,
}

/// One recorded answer inside a session report.
///
/// The prompt is looked up per answer and may be absent if the question
/// has vanished; soft delete normally rules that out, but the lookup
/// stays defensive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerBreakdown {
    pub question_id: QuestionId,
    pub prompt: Option<String>,
    pub selected_index: u32,
    pub is_correct: bool,
    pub response_secs: Option<i64>,
}

/// Detailed report for a single session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatistics {
    pub session_id: SessionId,
    pub player: Option<String>,
    pub final_score: u32,
    pub accuracy: f64,
    pub answered: u32,
    pub correct: u32,
    pub mean_response_secs: Option<f64>,
    pub elapsed_secs: Option<i64>,
    pub breakdown: Vec<AnswerBreakdown>,
}

/// One question in the hardest-questions ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionDifficulty {
    pub question_id: QuestionId,
    pub prompt: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub times_answered: u64,
    pub times_incorrect: u64,
    pub error_rate: f64,
}

/// Per-category performance entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryPerformance {
    pub category: Category,
    pub active_questions: u64,
    pub total_answers: u64,
    pub correct_answers: u64,
    pub mean_accuracy: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percentage(part: u64, total: u64) -> f64 {
    round2(part as f64 / total as f64 * 100.0)
}

fn count_correct(answers: &[Answer]) -> u64 {
    answers.iter().filter(|a| a.is_correct).count() as u64
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Read-only aggregation over the three stores.
///
/// Rates are percentages rounded to two decimals. Rankings sort
/// descending with a stable sort, so equal rates keep a deterministic
/// order: the fixed category order for category rankings, question id
/// order for question rankings.
#[derive(Clone)]
pub struct StatsService {
    questions: Arc<dyn QuestionRepository>,
    sessions: Arc<dyn SessionRepository>,
    answers: Arc<dyn AnswerRepository>,
}

impl StatsService {
    #[must_use]
    pub fn new(
        questions: Arc<dyn QuestionRepository>,
        sessions: Arc<dyn SessionRepository>,
        answers: Arc<dyn AnswerRepository>,
    ) -> Self {
        Self {
            questions,
            sessions,
            answers,
        }
    }

    /// System-wide aggregates: active question count, completed session
    /// count, mean session score, and the five categories with the
    /// highest error rate.
    ///
    /// Categories whose active questions have no answers at all are left
    /// out of the ranking rather than reported as zero.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Storage` if repository access fails.
    pub async fn global_statistics(&self) -> Result<GlobalStatistics, StatsError> {
        let active_questions = self.questions.count_questions(true).await?;

        let completed = self
            .sessions
            .list_sessions_by_status(SessionStatus::Completed)
            .await?;
        let completed_sessions = completed.len() as u64;
        let mean_score = if completed.is_empty() {
            0.0
        } else {
            let total: f64 = completed.iter().map(|s| f64::from(s.score())).sum();
            round2(total / completed.len() as f64)
        };

        let questions = self
            .questions
            .list_questions(&QuestionFilter::active_only())
            .await?;

        let mut hardest_categories = Vec::new();
        for category in Category::ALL {
            let mut total = 0_u64;
            let mut correct = 0_u64;
            for question in questions.iter().filter(|q| q.category() == category) {
                let answers = self.answers.answers_for_question(question.id()).await?;
                total += answers.len() as u64;
                correct += count_correct(&answers);
            }
            if total == 0 {
                continue;
            }
            hardest_categories.push(CategoryErrorRate {
                category,
                error_rate: percentage(total - correct, total),
            });
        }
        hardest_categories.sort_by(|a, b| b.error_rate.total_cmp(&a.error_rate));
        hardest_categories.truncate(5);

        Ok(GlobalStatistics {
            active_questions,
            completed_sessions,
            mean_score,
            hardest_categories,
        })
    }

    /// Detailed report for one session, including the per-answer
    /// breakdown in recording order.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::SessionNotFound` when the session does not
    /// exist.
    pub async fn session_statistics(
        &self,
        session_id: SessionId,
    ) -> Result<SessionStatistics, StatsError> {
        let session = self
            .sessions
            .get_session(session_id)
            .await?
            .ok_or(StatsError::SessionNotFound(session_id))?;

        let answers = self
            .answers
            .answers_for_session(session_id, 0, u32::MAX)
            .await?;

        let answered = answers.len() as u64;
        let correct = count_correct(&answers);
        let accuracy = if answered > 0 {
            percentage(correct, answered)
        } else {
            0.0
        };

        let timed: Vec<i64> = answers.iter().filter_map(|a| a.response_secs).collect();
        let mean_response_secs = (!timed.is_empty())
            .then(|| round2(timed.iter().sum::<i64>() as f64 / timed.len() as f64));

        let mut breakdown = Vec::with_capacity(answers.len());
        for answer in &answers {
            let prompt = self
                .questions
                .get_question(answer.question_id)
                .await?
                .map(|q| q.prompt().to_owned());
            breakdown.push(AnswerBreakdown {
                question_id: answer.question_id,
                prompt,
                selected_index: answer.selected_index,
                is_correct: answer.is_correct,
                response_secs: answer.response_secs,
            });
        }

        Ok(SessionStatistics {
            session_id,
            player: session.player().map(str::to_owned),
            final_score: session.score(),
            accuracy,
            answered: answered as u32,
            correct: correct as u32,
            mean_response_secs,
            elapsed_secs: session.elapsed_secs(),
            breakdown,
        })
    }

    /// Active questions ranked by error rate, highest first.
    ///
    /// Questions nobody has answered are absent regardless of `limit`.
    /// The caller is expected to keep `limit` within 1..=50.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Storage` if repository access fails.
    pub async fn difficult_questions(
        &self,
        limit: usize,
    ) -> Result<Vec<QuestionDifficulty>, StatsError> {
        let questions = self
            .questions
            .list_questions(&QuestionFilter::active_only())
            .await?;

        let mut ranked = Vec::new();
        for question in &questions {
            let answers = self.answers.answers_for_question(question.id()).await?;
            if answers.is_empty() {
                continue;
            }
            let total = answers.len() as u64;
            let incorrect = total - count_correct(&answers);
            ranked.push(QuestionDifficulty {
                question_id: question.id(),
                prompt: question.prompt().to_owned(),
                category: question.category(),
                difficulty: question.difficulty(),
                times_answered: total,
                times_incorrect: incorrect,
                error_rate: percentage(incorrect, total),
            });
        }

        ranked.sort_by(|a, b| b.error_rate.total_cmp(&a.error_rate));
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Performance per category, best mean accuracy first.
    ///
    /// Every category with at least one active question is present;
    /// a category without answers reports a mean accuracy of zero
    /// instead of being dropped.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::Storage` if repository access fails.
    pub async fn category_performance(&self) -> Result<Vec<CategoryPerformance>, StatsError> {
        let questions = self
            .questions
            .list_questions(&QuestionFilter::active_only())
            .await?;

        let mut performance = Vec::new();
        for category in Category::ALL {
            let in_category: Vec<_> = questions
                .iter()
                .filter(|q| q.category() == category)
                .collect();
            if in_category.is_empty() {
                continue;
            }

            let mut total = 0_u64;
            let mut correct = 0_u64;
            for question in &in_category {
                let answers = self.answers.answers_for_question(question.id()).await?;
                total += answers.len() as u64;
                correct += count_correct(&answers);
            }

            performance.push(CategoryPerformance {
                category,
                active_questions: in_category.len() as u64,
                total_answers: total,
                correct_answers: correct,
                mean_accuracy: if total > 0 {
                    percentage(correct, total)
                } else {
                    0.0
                },
            });
        }

        performance.sort_by(|a, b| b.mean_accuracy.total_cmp(&a.mean_accuracy));
        Ok(performance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use quiz_core::model::{QuizSession, ScoreTally};
    use quiz_core::time::fixed_now;
    use storage::repository::{
        InMemoryRepository, NewAnswerRecord, NewQuestionRecord, NewSessionRecord,
    };

    fn service(repo: &InMemoryRepository) -> StatsService {
        StatsService::new(
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    async fn seed_question(
        repo: &InMemoryRepository,
        category: Category,
        is_active: bool,
    ) -> QuestionId {
        repo.insert_question(NewQuestionRecord {
            prompt: format!("pregunta de {category}"),
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_index: 0,
            explanation: None,
            category,
            difficulty: Difficulty::Medio,
            created_at: fixed_now(),
            is_active,
        })
        .await
        .unwrap()
    }

    async fn seed_session(repo: &InMemoryRepository, player: Option<&str>) -> SessionId {
        repo.insert_session(NewSessionRecord {
            player: player.map(str::to_owned),
            started_at: fixed_now(),
            finished_at: None,
            score: 0,
            answered: 0,
            correct: 0,
            status: SessionStatus::InProgress,
            elapsed_secs: None,
            created_at: fixed_now(),
        })
        .await
        .unwrap()
    }

    async fn seed_answer(
        repo: &InMemoryRepository,
        session: SessionId,
        question: QuestionId,
        is_correct: bool,
        response_secs: Option<i64>,
    ) {
        repo.insert_answer(NewAnswerRecord {
            session_id: session,
            question_id: question,
            selected_index: u32::from(!is_correct),
            is_correct,
            response_secs,
            created_at: fixed_now(),
        })
        .await
        .unwrap();
    }

    async fn finalize(repo: &InMemoryRepository, session_id: SessionId) -> QuizSession {
        let answers = repo
            .answers_for_session(session_id, 0, u32::MAX)
            .await
            .unwrap();
        let mut session = repo.get_session(session_id).await.unwrap().unwrap();
        let tally = ScoreTally::from_answers(&answers).unwrap();
        session.complete(&tally, fixed_now());
        repo.update_session(&session).await.unwrap();
        session
    }

    #[tokio::test]
    async fn global_statistics_on_an_empty_store() {
        let repo = InMemoryRepository::new();
        let stats = service(&repo).global_statistics().await.unwrap();

        assert_eq!(stats.active_questions, 0);
        assert_eq!(stats.completed_sessions, 0);
        assert_eq!(stats.mean_score, 0.0);
        assert!(stats.hardest_categories.is_empty());
    }

    #[tokio::test]
    async fn global_statistics_averages_completed_sessions_only() {
        let repo = InMemoryRepository::new();
        let question = seed_question(&repo, Category::Ciencia, true).await;

        // one completed session at 100, one at 0, one left in progress
        let s1 = seed_session(&repo, None).await;
        seed_answer(&repo, s1, question, true, None).await;
        finalize(&repo, s1).await;

        let s2 = seed_session(&repo, None).await;
        finalize(&repo, s2).await;

        seed_session(&repo, None).await;

        let stats = service(&repo).global_statistics().await.unwrap();
        assert_eq!(stats.completed_sessions, 2);
        assert_eq!(stats.mean_score, 50.0);
        assert_eq!(stats.active_questions, 1);
    }

    #[tokio::test]
    async fn hardest_categories_exclude_unanswered_and_sort_descending() {
        let repo = InMemoryRepository::new();
        let tech = seed_question(&repo, Category::Tecnologia, true).await;
        let history = seed_question(&repo, Category::Historia, true).await;
        // a category with questions but no answers at all
        seed_question(&repo, Category::Deporte, true).await;

        let session = seed_session(&repo, None).await;
        // Tecnología: 1 of 2 wrong, 50% error rate
        seed_answer(&repo, session, tech, true, None).await;
        let other = seed_session(&repo, None).await;
        seed_answer(&repo, other, tech, false, None).await;
        // Historia: 1 of 1 wrong, 100% error rate
        seed_answer(&repo, session, history, false, None).await;

        let stats = service(&repo).global_statistics().await.unwrap();
        let rates: Vec<(Category, f64)> = stats
            .hardest_categories
            .iter()
            .map(|c| (c.category, c.error_rate))
            .collect();
        assert_eq!(
            rates,
            vec![(Category::Historia, 100.0), (Category::Tecnologia, 50.0)]
        );
    }

    #[tokio::test]
    async fn session_statistics_reports_breakdown_in_recording_order() {
        let repo = InMemoryRepository::new();
        let q1 = seed_question(&repo, Category::Ciencia, true).await;
        let q2 = seed_question(&repo, Category::Historia, true).await;
        let session = seed_session(&repo, Some("María")).await;

        seed_answer(&repo, session, q2, false, Some(20)).await;
        seed_answer(&repo, session, q1, true, None).await;
        finalize(&repo, session).await;

        let stats = service(&repo)
            .session_statistics(session)
            .await
            .unwrap();

        assert_eq!(stats.player.as_deref(), Some("María"));
        assert_eq!(stats.final_score, 50);
        assert_eq!(stats.accuracy, 50.0);
        assert_eq!(stats.answered, 2);
        assert_eq!(stats.correct, 1);
        // only the timed answer counts toward the mean
        assert_eq!(stats.mean_response_secs, Some(20.0));
        assert_eq!(stats.elapsed_secs, Some(20));

        let order: Vec<QuestionId> = stats.breakdown.iter().map(|b| b.question_id).collect();
        assert_eq!(order, vec![q2, q1]);
        assert_eq!(
            stats.breakdown[0].prompt.as_deref(),
            Some("pregunta de Historia")
        );
        assert!(!stats.breakdown[0].is_correct);
    }

    #[tokio::test]
    async fn session_statistics_with_no_answers_reports_zeroes() {
        let repo = InMemoryRepository::new();
        let session = seed_session(&repo, None).await;

        let stats = service(&repo)
            .session_statistics(session)
            .await
            .unwrap();
        assert_eq!(stats.accuracy, 0.0);
        assert_eq!(stats.mean_response_secs, None);
        assert!(stats.breakdown.is_empty());
    }

    #[tokio::test]
    async fn session_statistics_of_missing_session_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = service(&repo)
            .session_statistics(SessionId::new(5))
            .await
            .unwrap_err();
        assert!(matches!(err, StatsError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn difficult_questions_ranks_by_error_rate() {
        let repo = InMemoryRepository::new();
        let hard = seed_question(&repo, Category::Ciencia, true).await;
        let easy = seed_question(&repo, Category::Ciencia, true).await;
        // never answered, must not appear
        seed_question(&repo, Category::Ciencia, true).await;

        // hard: 3 of 4 wrong
        for i in 0..4 {
            let session = seed_session(&repo, None).await;
            seed_answer(&repo, session, hard, i == 0, None).await;
            seed_answer(&repo, session, easy, i != 0, None).await;
        }

        let ranked = service(&repo).difficult_questions(10).await.unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].question_id, hard);
        assert_eq!(ranked[0].times_answered, 4);
        assert_eq!(ranked[0].times_incorrect, 3);
        assert_eq!(ranked[0].error_rate, 75.0);
        assert_eq!(ranked[1].question_id, easy);
        assert_eq!(ranked[1].error_rate, 25.0);

        let top_one = service(&repo).difficult_questions(1).await.unwrap();
        assert_eq!(top_one.len(), 1);
        assert_eq!(top_one[0].question_id, hard);
    }

    #[tokio::test]
    async fn difficult_questions_ignore_inactive_questions() {
        let repo = InMemoryRepository::new();
        let retired = seed_question(&repo, Category::Ciencia, false).await;
        let session = seed_session(&repo, None).await;
        seed_answer(&repo, session, retired, false, None).await;

        let ranked = service(&repo).difficult_questions(10).await.unwrap();
        assert!(ranked.is_empty());
    }

    #[tokio::test]
    async fn category_performance_includes_zero_answer_categories() {
        let repo = InMemoryRepository::new();
        let science = seed_question(&repo, Category::Ciencia, true).await;
        // active questions, zero answers: still reported, at 0
        seed_question(&repo, Category::Literatura, true).await;
        // inactive question must not create an entry
        seed_question(&repo, Category::Deporte, false).await;

        let session = seed_session(&repo, None).await;
        seed_answer(&repo, session, science, true, None).await;
        let other = seed_session(&repo, None).await;
        seed_answer(&repo, other, science, false, None).await;

        let performance = service(&repo).category_performance().await.unwrap();
        let summary: Vec<(Category, u64, u64, f64)> = performance
            .iter()
            .map(|p| {
                (
                    p.category,
                    p.active_questions,
                    p.total_answers,
                    p.mean_accuracy,
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                (Category::Ciencia, 1, 2, 50.0),
                (Category::Literatura, 1, 0, 0.0),
            ]
        );
        assert_eq!(performance[0].correct_answers, 1);
    }

    #[tokio::test]
    async fn soft_deleted_question_drops_out_of_category_statistics() {
        let repo = InMemoryRepository::new();
        let question = seed_question(&repo, Category::Ciencia, true).await;
        let session = seed_session(&repo, None).await;
        seed_answer(&repo, session, question, false, None).await;

        let mut q = repo.get_question(question).await.unwrap().unwrap();
        q.deactivate();
        repo.update_question(&q).await.unwrap();

        let stats_service = service(&repo);
        let performance = stats_service.category_performance().await.unwrap();
        assert!(performance.is_empty());

        let global = stats_service.global_statistics().await.unwrap();
        assert!(global.hardest_categories.is_empty());

        // the recorded answer itself survives and stays readable
        let kept = repo
            .find_answer(session, question)
            .await
            .unwrap()
            .unwrap();
        assert!(!kept.is_correct);

        // and the defensive prompt lookup in session reports still works
        let report = stats_service.session_statistics(session).await.unwrap();
        assert_eq!(report.breakdown.len(), 1);
        assert!(report.breakdown[0].prompt.is_some());
    }

    #[tokio::test]
    async fn rounding_is_to_two_decimals() {
        let repo = InMemoryRepository::new();
        let question = seed_question(&repo, Category::Ciencia, true).await;

        // 1 of 3 correct: 33.333... accuracy, 66.666... error rate
        for i in 0..3 {
            let session = seed_session(&repo, None).await;
            seed_answer(&repo, session, question, i == 0, None).await;
        }

        let ranked = service(&repo).difficult_questions(10).await.unwrap();
        assert_eq!(ranked[0].error_rate, 66.67);

        let performance = service(&repo).category_performance().await.unwrap();
        assert_eq!(performance[0].mean_accuracy, 33.33);
    }
}
