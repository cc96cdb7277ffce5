//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use study_core::model::{
    CourseError, MaterialError, QuizError, ScoringError, UserError,
};

/// Errors emitted by `AuthService` and its token and password helpers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account is disabled")]
    AccountDisabled,
    #[error("email is already registered")]
    EmailTaken,
    #[error("password must be between {min} and {max} characters")]
    PasswordLength { min: usize, max: usize },
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
    /// A revoked refresh token was presented again; every session of the user was revoked.
    #[error("refresh token reuse detected")]
    TokenReused,
    #[error("jwt secret must be at least {min} bytes")]
    WeakSecret { min: usize },
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CourseService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseServiceError {
    #[error("course not found")]
    NotFound,
    #[error("course code is already in use")]
    DuplicateCode,
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `MaterialService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MaterialServiceError {
    #[error("material not found")]
    NotFound,
    #[error("course not found")]
    CourseNotFound,
    #[error(transparent)]
    Material(#[from] MaterialError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuizService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("quiz not found")]
    NotFound,
    #[error("course not found")]
    CourseNotFound,
    #[error("attempt not found")]
    AttemptNotFound,
    #[error("not allowed to view this attempt")]
    Forbidden,
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AdminService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdminServiceError {
    #[error("user not found")]
    UserNotFound,
    #[error("admins cannot demote, deactivate or delete themselves")]
    SelfModification,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `TutorService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TutorError {
    #[error("tutor is not configured")]
    Disabled,
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("course not found")]
    CourseNotFound,
    #[error("tutor returned an empty response")]
    EmptyResponse,
    #[error("tutor request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

