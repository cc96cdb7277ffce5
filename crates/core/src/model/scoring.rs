//! Quiz submission scoring.
//!
//! Correctness comes only from the persisted `is_correct` flags of the
//! question bank; a submission names answers, it never claims which are right.

use std::collections::HashMap;

use thiserror::Error;

use crate::model::ids::{AnswerId, QuestionId};
use crate::model::quiz::Question;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoringError {
    #[error("quiz has no questions to score")]
    EmptyQuiz,
}

/// Outcome for one question of a scored submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub selected: Option<AnswerId>,
    pub correct_answers: Vec<AnswerId>,
    pub is_correct: bool,
    pub points_awarded: u32,
    pub points_possible: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuizScore {
    pub earned_points: u32,
    pub total_points: u32,
    pub percentage: f64,
    pub passed: bool,
    pub results: Vec<QuestionResult>,
}

impl QuizScore {
    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_correct).count()
    }
}

/// Score `submission` (question id to chosen answer id) against `questions`.
///
/// Unanswered questions count toward the total. Answers that do not belong
/// to the question they are submitted for earn nothing. Entries for
/// questions outside `questions` are ignored.
///
/// # Errors
///
/// Returns `ScoringError::EmptyQuiz` when the questions carry no points.
pub fn score_submission(
    questions: &[Question],
    submission: &HashMap<QuestionId, AnswerId>,
    passing_score: u8,
) -> Result<QuizScore, ScoringError> {
    let total_points = questions
        .iter()
        .fold(0_u32, |acc, q| acc.saturating_add(q.points));
    if total_points == 0 {
        return Err(ScoringError::EmptyQuiz);
    }

    let mut earned_points = 0_u32;
    let mut results = Vec::with_capacity(questions.len());
    for question in questions {
        let selected = submission.get(&question.id).copied();
        let is_correct = selected
            .and_then(|answer_id| question.answer(answer_id))
            .is_some_and(|answer| answer.is_correct);
        let points_awarded = if is_correct { question.points } else { 0 };
        earned_points = earned_points.saturating_add(points_awarded);
        results.push(QuestionResult {
            question_id: question.id,
            selected,
            correct_answers: question.correct_answer_ids().collect(),
            is_correct,
            points_awarded,
            points_possible: question.points,
        });
    }

    let percentage = 100.0 * f64::from(earned_points) / f64::from(total_points);
    Ok(QuizScore {
        earned_points,
        total_points,
        percentage,
        passed: percentage >= f64::from(passing_score),
        results,
    })
}
