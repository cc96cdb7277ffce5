//! HTTP error mapping. Every handler error ends up as `{ "error": message }`.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use services::{
    AdminServiceError, AuthError, CourseServiceError, MaterialServiceError,
    ProgressServiceError, QuizServiceError, TutorError,
};
use storage::repository::StorageError;
use study_core::model::{CourseError, MaterialError, PageError, QuizError, UserError};
use thiserror::Error;

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    /// Logged in full, reported to the client as a generic message.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    pub(crate) fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    fn internal(err: impl std::fmt::Display) -> Self {
        ApiError::Internal(err.to_string())
    }

    fn bad_request(err: impl std::fmt::Display) -> Self {
        ApiError::BadRequest(err.to_string())
    }

    fn not_found(err: impl std::fmt::Display) -> Self {
        ApiError::NotFound(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

//
// ─── DOMAIN ────────────────────────────────────────────────────────────────────
//

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => ApiError::not_found("resource not found"),
            StorageError::Conflict => ApiError::Conflict("resource already exists".into()),
            other => ApiError::internal(other),
        }
    }
}

macro_rules! bad_request_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ApiError {
                fn from(err: $ty) -> Self {
                    ApiError::bad_request(err)
                }
            }
        )*
    };
}

bad_request_from!(UserError, CourseError, MaterialError, QuizError, PageError);

//
// ─── SERVICES ──────────────────────────────────────────────────────────────────
//

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::TokenReused => ApiError::unauthorized(err.to_string()),
            AuthError::AccountDisabled => ApiError::forbidden(err.to_string()),
            AuthError::EmailTaken => ApiError::Conflict(err.to_string()),
            AuthError::PasswordLength { .. } | AuthError::User(_) => ApiError::bad_request(err),
            AuthError::Storage(e) => e.into(),
            other => ApiError::internal(other),
        }
    }
}

impl From<CourseServiceError> for ApiError {
    fn from(err: CourseServiceError) -> Self {
        match err {
            CourseServiceError::NotFound => ApiError::not_found(err),
            CourseServiceError::DuplicateCode => ApiError::Conflict(err.to_string()),
            CourseServiceError::Course(e) => e.into(),
            CourseServiceError::Storage(e) => e.into(),
            other => ApiError::internal(other),
        }
    }
}

impl From<MaterialServiceError> for ApiError {
    fn from(err: MaterialServiceError) -> Self {
        match err {
            MaterialServiceError::NotFound | MaterialServiceError::CourseNotFound => {
                ApiError::not_found(err)
            }
            MaterialServiceError::Material(e) => e.into(),
            MaterialServiceError::Storage(e) => e.into(),
            other => ApiError::internal(other),
        }
    }
}

impl From<QuizServiceError> for ApiError {
    fn from(err: QuizServiceError) -> Self {
        match err {
            QuizServiceError::NotFound
            | QuizServiceError::CourseNotFound
            | QuizServiceError::AttemptNotFound => ApiError::not_found(err),
            QuizServiceError::Forbidden => ApiError::forbidden(err.to_string()),
            QuizServiceError::Quiz(e) => e.into(),
            QuizServiceError::Scoring(e) => ApiError::bad_request(e),
            QuizServiceError::Storage(e) => e.into(),
            other => ApiError::internal(other),
        }
    }
}

impl From<ProgressServiceError> for ApiError {
    fn from(err: ProgressServiceError) -> Self {
        match err {
            ProgressServiceError::UserNotFound => ApiError::not_found(err),
            ProgressServiceError::Storage(e) => e.into(),
            other => ApiError::internal(other),
        }
    }
}

impl From<AdminServiceError> for ApiError {
    fn from(err: AdminServiceError) -> Self {
        match err {
            AdminServiceError::UserNotFound => ApiError::not_found(err),
            AdminServiceError::SelfModification => ApiError::bad_request(err),
            AdminServiceError::Storage(e) => e.into(),
            other => ApiError::internal(other),
        }
    }
}

impl From<TutorError> for ApiError {
    fn from(err: TutorError) -> Self {
        match err {
            TutorError::EmptyMessage => ApiError::bad_request(err),
            TutorError::CourseNotFound => ApiError::not_found(err),
            TutorError::Disabled => ApiError::ServiceUnavailable(err.to_string()),
            TutorError::EmptyResponse | TutorError::HttpStatus(_) | TutorError::Http(_) => {
                tracing::warn!(error = %err, "tutor upstream failed");
                ApiError::ServiceUnavailable("tutor is temporarily unavailable".into())
            }
            TutorError::Storage(e) => e.into(),
            other => ApiError::internal(other),
        }
    }
}

//
// ─── EXTRACTORS ────────────────────────────────────────────────────────────────
//

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_map_to_expected_statuses() {
        assert_eq!(
            ApiError::from(AuthError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::AccountDisabled).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(AuthError::EmailTaken).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(AuthError::WeakSecret { min: 32 }).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn storage_conflicts_and_missing_rows_keep_their_meaning() {
        assert_eq!(
            ApiError::from(StorageError::Conflict).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(QuizServiceError::Storage(StorageError::NotFound)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(StorageError::Connection("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn tutor_failures_are_unavailable() {
        assert_eq!(
            ApiError::from(TutorError::Disabled).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(TutorError::EmptyMessage).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
