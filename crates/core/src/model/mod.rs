mod attempt;
mod course;
mod ids;
mod material;
mod page;
mod quiz;
mod scoring;
mod streak;
mod user;

pub use ids::{AnswerId, AttemptId, CourseId, MaterialId, ParseIdError, QuestionId, QuizId, UserId};

pub use attempt::{NewQuizAttempt, QuizAttempt};
pub use course::{Course, CourseDraft, CourseError, CourseProgress, Mastery, Semester};
pub use material::{Material, MaterialDraft, MaterialError, MaterialKind};
pub use page::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Page, PageError, PageRequest};
pub use quiz::{
    Answer, AnswerDraft, DEFAULT_PASSING_SCORE, Question, QuestionDraft, Quiz, QuizDraft,
    QuizError, validate_questions,
};
pub use scoring::{QuestionResult, QuizScore, ScoringError, score_submission};
pub use streak::{StreakChange, StudyStreak};
pub use user::{Email, Level, NewUser, Role, StudentProfile, User, UserError};
