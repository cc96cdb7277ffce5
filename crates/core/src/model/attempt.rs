use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::model::ids::{AnswerId, AttemptId, QuestionId, QuizId, UserId};
use crate::model::scoring::QuizScore;

/// A scored, submitted quiz attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizAttempt {
    pub id: AttemptId,
    pub user_id: UserId,
    pub quiz_id: QuizId,
    pub earned_points: u32,
    pub total_points: u32,
    pub percentage: f64,
    pub passed: bool,
    pub answers: HashMap<QuestionId, AnswerId>,
    pub submitted_at: DateTime<Utc>,
}

/// An attempt ready to be persisted; storage assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuizAttempt {
    pub user_id: UserId,
    pub quiz_id: QuizId,
    pub earned_points: u32,
    pub total_points: u32,
    pub percentage: f64,
    pub passed: bool,
    pub answers: HashMap<QuestionId, AnswerId>,
    pub submitted_at: DateTime<Utc>,
}

impl NewQuizAttempt {
    #[must_use]
    pub fn from_score(
        user_id: UserId,
        quiz_id: QuizId,
        score: &QuizScore,
        answers: HashMap<QuestionId, AnswerId>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            quiz_id,
            earned_points: score.earned_points,
            total_points: score.total_points,
            percentage: score.percentage,
            passed: score.passed,
            answers,
            submitted_at,
        }
    }

    #[must_use]
    pub fn assign_id(self, id: AttemptId) -> QuizAttempt {
        QuizAttempt {
            id,
            user_id: self.user_id,
            quiz_id: self.quiz_id,
            earned_points: self.earned_points,
            total_points: self.total_points,
            percentage: self.percentage,
            passed: self.passed,
            answers: self.answers,
            submitted_at: self.submitted_at,
        }
    }
}
