use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use services::{PaperQuestion, QuizDetail, QuizPaper, SubmissionOutcome};
use study_core::model::{
    AnswerDraft, AnswerId, AttemptId, CourseId, DEFAULT_PASSING_SCORE, Question, QuestionDraft,
    QuestionId, QuestionResult, Quiz, QuizAttempt, QuizDraft, QuizId, StreakChange, UserId,
};

use super::PageParams;

fn default_passing_score() -> u8 {
    DEFAULT_PASSING_SCORE
}

fn default_points() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub text: String,
    #[serde(default = "default_points")]
    pub points: u32,
    pub answers: Vec<AnswerRequest>,
}

impl From<QuestionRequest> for QuestionDraft {
    fn from(req: QuestionRequest) -> Self {
        QuestionDraft {
            text: req.text,
            points: req.points,
            answers: req
                .answers
                .into_iter()
                .map(|a| AnswerDraft {
                    text: a.text,
                    is_correct: a.is_correct,
                })
                .collect(),
        }
    }
}

/// Body for both creating and updating a quiz. On update, omitting
/// `questions` keeps the current bank and omitting `published` keeps the
/// current visibility.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_passing_score")]
    pub passing_score: u8,
    pub time_limit_minutes: Option<u32>,
    pub published: Option<bool>,
    pub questions: Option<Vec<QuestionRequest>>,
}

impl QuizRequest {
    pub fn split(self) -> (QuizDraft, Option<Vec<QuestionDraft>>, Option<bool>) {
        let draft = QuizDraft {
            title: self.title,
            description: self.description,
            passing_score: self.passing_score,
            time_limit_minutes: self.time_limit_minutes,
        };
        let questions = self
            .questions
            .map(|qs| qs.into_iter().map(QuestionDraft::from).collect());
        (draft, questions, self.published)
    }
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub published: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResponse {
    pub id: QuizId,
    pub course_id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub passing_score: u8,
    pub time_limit_minutes: Option<u32>,
    pub is_published: bool,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl From<&Quiz> for QuizResponse {
    fn from(quiz: &Quiz) -> Self {
        Self {
            id: quiz.id(),
            course_id: quiz.course_id(),
            title: quiz.title().to_string(),
            description: quiz.description().map(str::to_string),
            passing_score: quiz.passing_score(),
            time_limit_minutes: quiz.time_limit_minutes(),
            is_published: quiz.is_published(),
            created_by: quiz.created_by(),
            created_at: quiz.created_at(),
        }
    }
}

//
// ─── QUIZ BODIES ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
pub struct OptionResponse {
    pub id: AnswerId,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct PaperQuestionResponse {
    pub id: QuestionId,
    pub text: String,
    pub points: u32,
    pub position: u32,
    pub options: Vec<OptionResponse>,
}

impl From<PaperQuestion> for PaperQuestionResponse {
    fn from(q: PaperQuestion) -> Self {
        Self {
            id: q.id,
            text: q.text,
            points: q.points,
            position: q.position,
            options: q
                .options
                .into_iter()
                .map(|o| OptionResponse {
                    id: o.id,
                    text: o.text,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyedAnswerResponse {
    pub id: AnswerId,
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Serialize)]
pub struct KeyedQuestionResponse {
    pub id: QuestionId,
    pub text: String,
    pub points: u32,
    pub position: u32,
    pub answers: Vec<KeyedAnswerResponse>,
}

impl From<Question> for KeyedQuestionResponse {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            text: q.text,
            points: q.points,
            position: q.position,
            answers: q
                .answers
                .into_iter()
                .map(|a| KeyedAnswerResponse {
                    id: a.id,
                    text: a.text,
                    is_correct: a.is_correct,
                })
                .collect(),
        }
    }
}

/// Students get the paper, admins get the answer key.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum QuizView {
    Paper {
        quiz: QuizResponse,
        questions: Vec<PaperQuestionResponse>,
    },
    Detail {
        quiz: QuizResponse,
        questions: Vec<KeyedQuestionResponse>,
    },
}

impl From<QuizPaper> for QuizView {
    fn from(paper: QuizPaper) -> Self {
        QuizView::Paper {
            quiz: QuizResponse::from(&paper.quiz),
            questions: paper.questions.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<QuizDetail> for QuizView {
    fn from(detail: QuizDetail) -> Self {
        QuizView::Detail {
            quiz: QuizResponse::from(&detail.quiz),
            questions: detail.questions.into_iter().map(Into::into).collect(),
        }
    }
}

//
// ─── SUBMISSIONS ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    /// Question id to chosen answer id.
    #[serde(default)]
    pub answers: HashMap<QuestionId, AnswerId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResultResponse {
    pub question_id: QuestionId,
    pub selected: Option<AnswerId>,
    pub correct_answers: Vec<AnswerId>,
    pub is_correct: bool,
    pub points_awarded: u32,
    pub points_possible: u32,
}

impl From<QuestionResult> for QuestionResultResponse {
    fn from(r: QuestionResult) -> Self {
        Self {
            question_id: r.question_id,
            selected: r.selected,
            correct_answers: r.correct_answers,
            is_correct: r.is_correct,
            points_awarded: r.points_awarded,
            points_possible: r.points_possible,
        }
    }
}

pub fn streak_change_label(change: StreakChange) -> &'static str {
    match change {
        StreakChange::Started => "started",
        StreakChange::Unchanged => "unchanged",
        StreakChange::Extended => "extended",
        StreakChange::Reset => "reset",
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub attempt_id: AttemptId,
    pub quiz_id: QuizId,
    pub earned_points: u32,
    pub total_points: u32,
    pub percentage: f64,
    pub passed: bool,
    pub correct_count: usize,
    pub results: Vec<QuestionResultResponse>,
    pub total_user_points: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_study_date: Option<NaiveDate>,
    pub streak_change: &'static str,
    pub submitted_at: DateTime<Utc>,
}

impl From<SubmissionOutcome> for SubmissionResponse {
    fn from(outcome: SubmissionOutcome) -> Self {
        let correct_count = outcome.score.correct_count();
        Self {
            attempt_id: outcome.attempt.id,
            quiz_id: outcome.attempt.quiz_id,
            earned_points: outcome.score.earned_points,
            total_points: outcome.score.total_points,
            percentage: outcome.score.percentage,
            passed: outcome.score.passed,
            correct_count,
            results: outcome.score.results.into_iter().map(Into::into).collect(),
            total_user_points: outcome.total_user_points,
            current_streak: outcome.streak.current(),
            longest_streak: outcome.streak.longest(),
            last_study_date: outcome.streak.last_study_date(),
            streak_change: streak_change_label(outcome.streak_change),
            submitted_at: outcome.attempt.submitted_at,
        }
    }
}

//
// ─── ATTEMPTS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptQuery {
    pub quiz_id: Option<QuizId>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl AttemptQuery {
    pub fn page(&self) -> PageParams {
        PageParams {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResponse {
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

impl From<QuizAttempt> for AttemptResponse {
    fn from(a: QuizAttempt) -> Self {
        Self {
            id: a.id,
            user_id: a.user_id,
            quiz_id: a.quiz_id,
            earned_points: a.earned_points,
            total_points: a.total_points,
            percentage: a.percentage,
            passed: a.passed,
            answers: a.answers,
            submitted_at: a.submitted_at,
        }
    }
}
