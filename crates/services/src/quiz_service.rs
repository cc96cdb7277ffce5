use std::collections::HashMap;
use std::sync::Arc;

use storage::repository::{
    AttemptRepository, CourseRepository, QuizRepository, StorageError, StudyCredit,
};
use study_core::model::{
    AnswerId, AttemptId, CourseId, NewQuizAttempt, Page, PageRequest, Question, QuestionDraft,
    QuestionId, Quiz, QuizAttempt, QuizDraft, QuizId, QuizScore, StreakChange, StudyStreak,
    UserId, score_submission, validate_questions,
};

use crate::Clock;
use crate::auth::Principal;
use crate::error::QuizServiceError;

/// A quiz with its full question bank, correctness included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizDetail {
    pub quiz: Quiz,
    pub questions: Vec<Question>,
}

/// An answer option as shown to a quiz taker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperOption {
    pub id: AnswerId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperQuestion {
    pub id: QuestionId,
    pub text: String,
    pub points: u32,
    pub position: u32,
    pub options: Vec<PaperOption>,
}

/// A quiz as served to students: no answer key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizPaper {
    pub quiz: Quiz,
    pub questions: Vec<PaperQuestion>,
}

impl From<QuizDetail> for QuizPaper {
    fn from(detail: QuizDetail) -> Self {
        let questions = detail
            .questions
            .into_iter()
            .map(|q| PaperQuestion {
                id: q.id,
                text: q.text,
                points: q.points,
                position: q.position,
                options: q
                    .answers
                    .into_iter()
                    .map(|a| PaperOption {
                        id: a.id,
                        text: a.text,
                    })
                    .collect(),
            })
            .collect();
        Self {
            quiz: detail.quiz,
            questions,
        }
    }
}

/// What a submission produced: the stored attempt, the per-question breakdown
/// and the user's updated standing.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    pub attempt: QuizAttempt,
    pub score: QuizScore,
    pub total_user_points: u32,
    pub streak: StudyStreak,
    pub streak_change: StreakChange,
}

/// Quiz authoring, delivery and scoring.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            clock,
            courses,
            quizzes,
            attempts,
        }
    }

    /// Students only see published quizzes; admins see drafts too.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::CourseNotFound` if the course does not exist.
    pub async fn list_quizzes(
        &self,
        course_id: CourseId,
        viewer: &Principal,
        page: PageRequest,
    ) -> Result<Page<Quiz>, QuizServiceError> {
        if self.courses.get_course(course_id).await?.is_none() {
            return Err(QuizServiceError::CourseNotFound);
        }
        Ok(self
            .quizzes
            .list_quizzes(course_id, !viewer.is_admin(), page)
            .await?)
    }

    /// Fetch a quiz for taking. Unpublished quizzes are hidden from non-admins.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::NotFound` if missing or not visible.
    pub async fn get_for_taking(
        &self,
        id: QuizId,
        viewer: &Principal,
    ) -> Result<QuizPaper, QuizServiceError> {
        let quiz = self.visible_quiz(id, viewer).await?;
        let questions = self.quizzes.get_questions(id).await?;
        Ok(QuizDetail { quiz, questions }.into())
    }

    /// Fetch a quiz with its answer key.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::NotFound` if the quiz does not exist.
    pub async fn get_full(&self, id: QuizId) -> Result<QuizDetail, QuizServiceError> {
        let quiz = self.load_quiz(id).await?;
        let questions = self.quizzes.get_questions(id).await?;
        Ok(QuizDetail { quiz, questions })
    }

    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` for invalid metadata or questions and
    /// `QuizServiceError::CourseNotFound` for an unknown course.
    pub async fn create_quiz(
        &self,
        course_id: CourseId,
        draft: QuizDraft,
        questions: Vec<QuestionDraft>,
        publish: bool,
        created_by: UserId,
    ) -> Result<QuizDetail, QuizServiceError> {
        let quiz = Quiz::new(
            QuizId::new(0),
            course_id,
            draft,
            publish,
            created_by,
            self.clock.now(),
        )?;
        let questions = validate_questions(questions)?;
        let id = match self.quizzes.insert_quiz(&quiz, &questions).await {
            Ok(id) => id,
            Err(StorageError::NotFound) => return Err(QuizServiceError::CourseNotFound),
            Err(e) => return Err(e.into()),
        };
        tracing::info!(
            quiz_id = %id,
            course_id = %course_id,
            questions = questions.len(),
            "created quiz"
        );
        self.get_full(id).await
    }

    /// Update metadata and, when given, replace the whole question bank.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::NotFound` or `QuizServiceError::Quiz`.
    pub async fn update_quiz(
        &self,
        id: QuizId,
        draft: QuizDraft,
        questions: Option<Vec<QuestionDraft>>,
    ) -> Result<QuizDetail, QuizServiceError> {
        let mut quiz = self.load_quiz(id).await?;
        quiz.apply(draft)?;
        let questions = questions.map(validate_questions).transpose()?;

        self.quizzes.update_quiz(&quiz).await.map_err(not_found)?;
        if let Some(questions) = questions {
            self.quizzes
                .replace_questions(id, &questions)
                .await
                .map_err(not_found)?;
        }
        self.get_full(id).await
    }

    /// # Errors
    ///
    /// Returns `QuizServiceError::NotFound` if the quiz does not exist.
    pub async fn set_published(
        &self,
        id: QuizId,
        published: bool,
    ) -> Result<Quiz, QuizServiceError> {
        let mut quiz = self.load_quiz(id).await?;
        quiz.set_published(published);
        self.quizzes.update_quiz(&quiz).await.map_err(not_found)?;
        tracing::info!(quiz_id = %id, published, "changed quiz visibility");
        Ok(quiz)
    }

    /// Delete a quiz; its questions and attempts go with it.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::NotFound` if the quiz does not exist.
    pub async fn delete_quiz(&self, id: QuizId) -> Result<(), QuizServiceError> {
        self.quizzes.delete_quiz(id).await.map_err(not_found)
    }

    /// Score a submission and persist the attempt.
    ///
    /// Earned points are added to the user's total and the submission counts
    /// as study activity for the day; both are written with the attempt.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::NotFound` for missing or hidden quizzes and
    /// `QuizServiceError::Scoring` when the quiz carries no points.
    pub async fn submit(
        &self,
        submitter: &Principal,
        quiz_id: QuizId,
        answers: HashMap<QuestionId, AnswerId>,
    ) -> Result<SubmissionOutcome, QuizServiceError> {
        let quiz = self.visible_quiz(quiz_id, submitter).await?;
        let questions = self.quizzes.get_questions(quiz_id).await?;
        let score = score_submission(&questions, &answers, quiz.passing_score())?;

        let new_attempt = NewQuizAttempt::from_score(
            submitter.user_id,
            quiz_id,
            &score,
            answers,
            self.clock.now(),
        );
        let credit = StudyCredit {
            today: self.clock.today(),
            points: score.earned_points,
            daily_bonus: 0,
        };
        let (attempt_id, update) = self.attempts.record_attempt(&new_attempt, credit).await?;
        tracing::info!(
            attempt_id = %attempt_id,
            quiz_id = %quiz_id,
            user_id = %submitter.user_id,
            percentage = score.percentage,
            passed = score.passed,
            "recorded quiz attempt"
        );

        Ok(SubmissionOutcome {
            attempt: new_attempt.assign_id(attempt_id),
            score,
            total_user_points: update.user.points(),
            streak: *update.user.streak(),
            streak_change: update.change,
        })
    }

    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn list_attempts(
        &self,
        user_id: UserId,
        quiz_id: Option<QuizId>,
        page: PageRequest,
    ) -> Result<Page<QuizAttempt>, QuizServiceError> {
        Ok(self.attempts.list_attempts(user_id, quiz_id, page).await?)
    }

    /// Attempts are visible to their owner and to admins.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::AttemptNotFound` or `QuizServiceError::Forbidden`.
    pub async fn get_attempt(
        &self,
        id: AttemptId,
        viewer: &Principal,
    ) -> Result<QuizAttempt, QuizServiceError> {
        let attempt = self
            .attempts
            .get_attempt(id)
            .await?
            .ok_or(QuizServiceError::AttemptNotFound)?;
        if attempt.user_id != viewer.user_id && !viewer.is_admin() {
            return Err(QuizServiceError::Forbidden);
        }
        Ok(attempt)
    }

    async fn load_quiz(&self, id: QuizId) -> Result<Quiz, QuizServiceError> {
        self.quizzes
            .get_quiz(id)
            .await?
            .ok_or(QuizServiceError::NotFound)
    }

    async fn visible_quiz(&self, id: QuizId, viewer: &Principal) -> Result<Quiz, QuizServiceError> {
        let quiz = self.load_quiz(id).await?;
        if !quiz.is_published() && !viewer.is_admin() {
            return Err(QuizServiceError::NotFound);
        }
        Ok(quiz)
    }
}

fn not_found(err: StorageError) -> QuizServiceError {
    match err {
        StorageError::NotFound => QuizServiceError::NotFound,
        other => QuizServiceError::Storage(other),
    }
}
