use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{AnswerId, CourseId, QuestionId, QuizId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Validation failures for quizzes and their question bank.
///
/// Question-level variants carry the 1-based position of the offending question.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("passing score must be between 0 and 100 (got {0})")]
    InvalidPassingScore(u8),

    #[error("time limit must be at least one minute")]
    InvalidTimeLimit,

    #[error("a quiz needs at least one question")]
    NoQuestions,

    #[error("question {position}: text cannot be empty")]
    EmptyQuestion { position: usize },

    #[error("question {position}: points must be > 0")]
    InvalidPoints { position: usize },

    #[error("question {position}: at least two answers are required")]
    TooFewAnswers { position: usize },

    #[error("question {position}: at least one answer must be correct")]
    NoCorrectAnswer { position: usize },

    #[error("question {position}: answer text cannot be empty")]
    EmptyAnswer { position: usize },
}

pub const DEFAULT_PASSING_SCORE: u8 = 50;

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// Editable quiz metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizDraft {
    pub title: String,
    pub description: Option<String>,
    pub passing_score: u8,
    pub time_limit_minutes: Option<u32>,
}

impl QuizDraft {
    /// # Errors
    ///
    /// Returns `QuizError` for an empty title, a passing score above 100 or a zero time limit.
    pub fn validate(self) -> Result<Self, QuizError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        if self.passing_score > 100 {
            return Err(QuizError::InvalidPassingScore(self.passing_score));
        }
        if self.time_limit_minutes == Some(0) {
            return Err(QuizError::InvalidTimeLimit);
        }
        Ok(Self {
            title,
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            passing_score: self.passing_score,
            time_limit_minutes: self.time_limit_minutes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    id: QuizId,
    course_id: CourseId,
    title: String,
    description: Option<String>,
    passing_score: u8,
    time_limit_minutes: Option<u32>,
    published: bool,
    created_by: UserId,
    created_at: DateTime<Utc>,
}

impl Quiz {
    /// # Errors
    ///
    /// Returns `QuizError` if the draft fails validation.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: QuizId,
        course_id: CourseId,
        draft: QuizDraft,
        published: bool,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuizError> {
        let draft = draft.validate()?;
        Ok(Self {
            id,
            course_id,
            title: draft.title,
            description: draft.description,
            passing_score: draft.passing_score,
            time_limit_minutes: draft.time_limit_minutes,
            published,
            created_by,
            created_at,
        })
    }

    /// # Errors
    ///
    /// Returns `QuizError` if the draft fails validation.
    pub fn apply(&mut self, draft: QuizDraft) -> Result<(), QuizError> {
        *self = Self::new(
            self.id,
            self.course_id,
            draft,
            self.published,
            self.created_by,
            self.created_at,
        )?;
        Ok(())
    }

    pub fn set_published(&mut self, published: bool) {
        self.published = published;
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn passing_score(&self) -> u8 {
        self.passing_score
    }

    #[must_use]
    pub fn time_limit_minutes(&self) -> Option<u32> {
        self.time_limit_minutes
    }

    #[must_use]
    pub fn is_published(&self) -> bool {
        self.published
    }

    #[must_use]
    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── QUESTION BANK ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerDraft {
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub text: String,
    pub points: u32,
    pub answers: Vec<AnswerDraft>,
}

/// Validate a full question bank. Positions in errors are 1-based.
///
/// # Errors
///
/// Returns the first `QuizError` found.
pub fn validate_questions(drafts: Vec<QuestionDraft>) -> Result<Vec<QuestionDraft>, QuizError> {
    if drafts.is_empty() {
        return Err(QuizError::NoQuestions);
    }
    drafts
        .into_iter()
        .enumerate()
        .map(|(idx, draft)| validate_question(idx + 1, draft))
        .collect()
}

fn validate_question(position: usize, draft: QuestionDraft) -> Result<QuestionDraft, QuizError> {
    let text = draft.text.trim().to_string();
    if text.is_empty() {
        return Err(QuizError::EmptyQuestion { position });
    }
    if draft.points == 0 {
        return Err(QuizError::InvalidPoints { position });
    }
    if draft.answers.len() < 2 {
        return Err(QuizError::TooFewAnswers { position });
    }
    let mut answers = Vec::with_capacity(draft.answers.len());
    for answer in draft.answers {
        let answer_text = answer.text.trim().to_string();
        if answer_text.is_empty() {
            return Err(QuizError::EmptyAnswer { position });
        }
        answers.push(AnswerDraft {
            text: answer_text,
            is_correct: answer.is_correct,
        });
    }
    if !answers.iter().any(|a| a.is_correct) {
        return Err(QuizError::NoCorrectAnswer { position });
    }
    Ok(QuestionDraft {
        text,
        points: draft.points,
        answers,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub id: AnswerId,
    pub question_id: QuestionId,
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: QuestionId,
    pub quiz_id: QuizId,
    pub text: String,
    pub points: u32,
    pub position: u32,
    pub answers: Vec<Answer>,
}

impl Question {
    /// The persisted answer with this id, if it belongs to the question.
    #[must_use]
    pub fn answer(&self, id: AnswerId) -> Option<&Answer> {
        self.answers.iter().find(|a| a.id == id)
    }

    pub fn correct_answer_ids(&self) -> impl Iterator<Item = AnswerId> + '_ {
        self.answers.iter().filter(|a| a.is_correct).map(|a| a.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn answer(text: &str, is_correct: bool) -> AnswerDraft {
        AnswerDraft {
            text: text.into(),
            is_correct,
        }
    }

    fn question(text: &str, answers: Vec<AnswerDraft>) -> QuestionDraft {
        QuestionDraft {
            text: text.into(),
            points: 1,
            answers,
        }
    }

    #[test]
    fn draft_validation_rules() {
        let base = QuizDraft {
            title: "Week 1".into(),
            description: None,
            passing_score: DEFAULT_PASSING_SCORE,
            time_limit_minutes: Some(10),
        };
        assert!(base.clone().validate().is_ok());

        let mut bad = base.clone();
        bad.passing_score = 101;
        assert_eq!(bad.validate(), Err(QuizError::InvalidPassingScore(101)));

        let mut bad = base.clone();
        bad.time_limit_minutes = Some(0);
        assert_eq!(bad.validate(), Err(QuizError::InvalidTimeLimit));

        let mut bad = base;
        bad.title = "   ".into();
        assert_eq!(bad.validate(), Err(QuizError::EmptyTitle));
    }

    #[test]
    fn question_bank_requires_a_correct_answer() {
        let err = validate_questions(vec![
            question("2 + 2?", vec![answer("4", true), answer("5", false)]),
            question("Capital of Nigeria?", vec![answer("Lagos", false), answer("Kano", false)]),
        ])
        .unwrap_err();
        assert_eq!(err, QuizError::NoCorrectAnswer { position: 2 });
    }

    #[test]
    fn question_bank_shape_errors() {
        assert_eq!(validate_questions(vec![]), Err(QuizError::NoQuestions));
        assert_eq!(
            validate_questions(vec![question("Only one?", vec![answer("yes", true)])]),
            Err(QuizError::TooFewAnswers { position: 1 })
        );
        let mut zero = question("Q", vec![answer("a", true), answer("b", false)]);
        zero.points = 0;
        assert_eq!(
            validate_questions(vec![zero]),
            Err(QuizError::InvalidPoints { position: 1 })
        );
        assert_eq!(
            validate_questions(vec![question("Q", vec![answer(" ", true), answer("b", false)])]),
            Err(QuizError::EmptyAnswer { position: 1 })
        );
    }

    #[test]
    fn apply_preserves_publication() {
        let mut quiz = Quiz::new(
            QuizId::new(1),
            CourseId::new(1),
            QuizDraft {
                title: "A".into(),
                description: None,
                passing_score: 40,
                time_limit_minutes: None,
            },
            true,
            UserId::new(1),
            fixed_now(),
        )
        .unwrap();
        quiz.apply(QuizDraft {
            title: "B".into(),
            description: Some("  more ".into()),
            passing_score: 70,
            time_limit_minutes: Some(30),
        })
        .unwrap();
        assert!(quiz.is_published());
        assert_eq!(quiz.title(), "B");
        assert_eq!(quiz.description(), Some("more"));
        assert_eq!(quiz.passing_score(), 70);
    }
}
