use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use study_core::model::{
    AttemptId, Course, CourseId, CourseProgress, Email, Level, Material, MaterialId, MaterialKind,
    NewQuizAttempt, NewUser, Page, PageRequest, Question, QuestionDraft, Quiz, QuizAttempt, QuizId,
    Role, Semester, StreakChange, User, UserId,
};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── USERS ─────────────────────────────────────────────────────────────────────
//

/// A user together with the stored bcrypt hash, for credential checks only.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// Optional narrowing for admin user listings.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Case-insensitive substring of email or full name.
    pub search: Option<String>,
    pub role: Option<Role>,
}

/// Points and a study day credited to a user in a single write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudyCredit {
    pub today: NaiveDate,
    /// Added unconditionally.
    pub points: u32,
    /// Added only when `today` starts or extends the streak.
    pub daily_bonus: u32,
}

/// The user row as it stands after a `StudyCredit` was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyUpdate {
    pub user: User,
    pub change: StreakChange,
    pub bonus_awarded: u32,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the email is already registered.
    async fn insert_user(&self, user: &NewUser, password_hash: &str)
    -> Result<UserId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn find_credentials(&self, email: &Email)
    -> Result<Option<UserCredentials>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn get_credentials(&self, id: UserId) -> Result<Option<UserCredentials>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    async fn update_password(&self, id: UserId, password_hash: &str) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    async fn set_role(&self, id: UserId, role: Role) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    async fn set_active(&self, id: UserId, active: bool) -> Result<(), StorageError>;

    /// Add to the stored point total and return the updated user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    async fn add_points(&self, id: UserId, points: u32) -> Result<User, StorageError>;

    /// Record a study day against the streak as currently stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    async fn apply_study_credit(
        &self,
        id: UserId,
        credit: StudyCredit,
    ) -> Result<StudyUpdate, StorageError>;

    /// Delete a user; enrolments, attempts and tokens cascade.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    async fn delete_user(&self, id: UserId) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn list_users(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<Page<User>, StorageError>;
}

//
// ─── REFRESH TOKENS ────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub user_id: UserId,
    pub token_hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub id: i64,
    pub user_id: UserId,
    pub token_hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the hash already exists.
    async fn insert_token(&self, token: &NewRefreshToken) -> Result<i64, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn find_by_hash(&self, token_hash: &str)
    -> Result<Option<RefreshTokenRecord>, StorageError>;

    /// Revoke a single token. Returns `false` if it was already revoked.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection failures.
    async fn revoke(&self, id: i64, at: DateTime<Utc>) -> Result<bool, StorageError>;

    /// Revoke every live token of a user, returning how many were revoked.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection failures.
    async fn revoke_all_for_user(
        &self,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<u64, StorageError>;
}

//
// ─── COURSES ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub department: Option<String>,
    pub level: Option<Level>,
    pub semester: Option<Semester>,
    /// Case-insensitive substring of code or title.
    pub search: Option<String>,
}

/// A course the user is enrolled in, with their progress.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrolledCourse {
    pub course: Course,
    pub progress: CourseProgress,
}

#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Insert a course; the id carried by `course` is ignored and a new one assigned.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the course code already exists.
    async fn insert_course(&self, course: &Course) -> Result<CourseId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, `Conflict` on a duplicate code.
    async fn update_course(&self, course: &Course) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist.
    async fn delete_course(&self, id: CourseId) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn list_courses(
        &self,
        filter: &CourseFilter,
        page: PageRequest,
    ) -> Result<Page<Course>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on connection failures.
    async fn upsert_progress(&self, progress: &CourseProgress) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn get_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<CourseProgress>, StorageError>;

    /// Enrolled courses ordered by most recent access.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn list_enrolled(&self, user_id: UserId) -> Result<Vec<EnrolledCourse>, StorageError>;
}

//
// ─── MATERIALS ─────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait MaterialRepository: Send + Sync {
    /// Insert a material; the id carried by `material` is ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist.
    async fn insert_material(&self, material: &Material) -> Result<MaterialId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn get_material(&self, id: MaterialId) -> Result<Option<Material>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the material does not exist.
    async fn update_material(&self, material: &Material) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the material does not exist.
    async fn delete_material(&self, id: MaterialId) -> Result<(), StorageError>;

    /// Newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn list_materials(
        &self,
        course_id: CourseId,
        kind: Option<MaterialKind>,
        page: PageRequest,
    ) -> Result<Page<Material>, StorageError>;
}

//
// ─── QUIZZES ───────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Insert a quiz and its question bank in one transaction.
    ///
    /// `questions` must already be validated; the quiz id is assigned by storage.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist.
    async fn insert_quiz(
        &self,
        quiz: &Quiz,
        questions: &[QuestionDraft],
    ) -> Result<QuizId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError>;

    /// Questions ordered by position, each with its answers in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn get_questions(&self, quiz_id: QuizId) -> Result<Vec<Question>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the quiz does not exist.
    async fn update_quiz(&self, quiz: &Quiz) -> Result<(), StorageError>;

    /// Drop the current question bank and insert `questions` in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the quiz does not exist.
    async fn replace_questions(
        &self,
        quiz_id: QuizId,
        questions: &[QuestionDraft],
    ) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the quiz does not exist.
    async fn delete_quiz(&self, id: QuizId) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn list_quizzes(
        &self,
        course_id: CourseId,
        published_only: bool,
        page: PageRequest,
    ) -> Result<Page<Quiz>, StorageError>;
}

//
// ─── ATTEMPTS ──────────────────────────────────────────────────────────────────
//

/// Aggregates over one user's attempts.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AttemptSummary {
    pub attempts: u64,
    pub passed: u64,
    pub average_percentage: Option<f64>,
    pub best_percentage: Option<f64>,
}

#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Store a scored attempt and credit the submitter in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user or quiz no longer exists.
    async fn record_attempt(
        &self,
        attempt: &NewQuizAttempt,
        credit: StudyCredit,
    ) -> Result<(AttemptId, StudyUpdate), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn get_attempt(&self, id: AttemptId) -> Result<Option<QuizAttempt>, StorageError>;

    /// Newest first, optionally narrowed to one quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn list_attempts(
        &self,
        user_id: UserId,
        quiz_id: Option<QuizId>,
        page: PageRequest,
    ) -> Result<Page<QuizAttempt>, StorageError>;

    /// Latest attempts across all users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn list_recent(&self, limit: u32) -> Result<Vec<QuizAttempt>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on connection failures.
    async fn summary_for_user(&self, user_id: UserId) -> Result<AttemptSummary, StorageError>;
}

//
// ─── ADMIN STATS ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlatformStats {
    pub users: u64,
    pub active_users: u64,
    pub students: u64,
    pub admins: u64,
    pub courses: u64,
    pub materials: u64,
    pub quizzes: u64,
    pub published_quizzes: u64,
    pub attempts: u64,
    pub passed_attempts: u64,
    pub average_percentage: Option<f64>,
    /// Users whose last study day is `today`.
    pub studied_today: u64,
}

#[async_trait]
pub trait StatsRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on connection failures.
    async fn platform_stats(&self, today: chrono::NaiveDate) -> Result<PlatformStats, StorageError>;
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
    pub courses: Arc<dyn CourseRepository>,
    pub materials: Arc<dyn MaterialRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub stats: Arc<dyn StatsRepository>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use study_core::time::fixed_now;

    #[test]
    fn token_expiry_is_inclusive() {
        let now = fixed_now();
        let record = RefreshTokenRecord {
            id: 1,
            user_id: UserId::new(1),
            token_hash: "h".into(),
            issued_at: now - Duration::days(7),
            expires_at: now,
            revoked_at: None,
        };
        assert!(record.is_expired(now));
        assert!(!record.is_expired(now - Duration::seconds(1)));
        assert!(!record.is_revoked());
    }

    #[test]
    fn storage_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Storage>();
    }
}
