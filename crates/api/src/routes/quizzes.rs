//! Quiz authoring, taking and submission.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use study_core::model::{AttemptId, CourseId, QuizId};

use crate::error::Result;
use crate::extract::{AdminUser, ApiJson, ApiPath, ApiQuery, AuthUser};
use crate::models::{
    AttemptResponse, PageParams, PageResponse, PublishRequest, QuizRequest, QuizResponse,
    QuizView, SubmissionResponse, SubmitRequest,
};
use crate::state::AppState;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/courses/:id/quizzes", get(list_quizzes).post(create_quiz))
        .route(
            "/quizzes/:id",
            get(get_quiz).put(update_quiz).delete(delete_quiz),
        )
        .route("/quizzes/:id/publish", post(publish_quiz))
        .route("/quizzes/:id/submit", post(submit_quiz))
        .route("/attempts/:id", get(get_attempt))
}

/// GET /api/courses/:id/quizzes
async fn list_quizzes(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(course_id): ApiPath<CourseId>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> Result<Json<PageResponse<QuizResponse>>> {
    let page = state
        .services
        .quizzes()
        .list_quizzes(course_id, &principal, page.to_request()?)
        .await?;
    Ok(Json(PageResponse::from_page(page, |q| QuizResponse::from(&q))))
}

/// POST /api/courses/:id/quizzes
async fn create_quiz(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(course_id): ApiPath<CourseId>,
    ApiJson(body): ApiJson<QuizRequest>,
) -> Result<(StatusCode, Json<QuizView>)> {
    let (draft, questions, published) = body.split();
    let detail = state
        .services
        .quizzes()
        .create_quiz(
            course_id,
            draft,
            questions.unwrap_or_default(),
            published.unwrap_or(false),
            admin.user_id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(detail.into())))
}

/// GET /api/quizzes/:id
///
/// Admins receive the answer key; everyone else gets the paper.
async fn get_quiz(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<QuizId>,
) -> Result<Json<QuizView>> {
    let quizzes = state.services.quizzes();
    let view: QuizView = if principal.is_admin() {
        quizzes.get_full(id).await?.into()
    } else {
        quizzes.get_for_taking(id, &principal).await?.into()
    };
    Ok(Json(view))
}

/// PUT /api/quizzes/:id
async fn update_quiz(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(id): ApiPath<QuizId>,
    ApiJson(body): ApiJson<QuizRequest>,
) -> Result<Json<QuizView>> {
    let (draft, questions, published) = body.split();
    let quizzes = state.services.quizzes();
    let detail = quizzes.update_quiz(id, draft, questions).await?;
    let detail = match published {
        Some(published) if published != detail.quiz.is_published() => {
            quizzes.set_published(id, published).await?;
            quizzes.get_full(id).await?
        }
        _ => detail,
    };
    Ok(Json(detail.into()))
}

/// DELETE /api/quizzes/:id
async fn delete_quiz(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(id): ApiPath<QuizId>,
) -> Result<StatusCode> {
    state.services.quizzes().delete_quiz(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/quizzes/:id/publish
async fn publish_quiz(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(id): ApiPath<QuizId>,
    ApiJson(body): ApiJson<PublishRequest>,
) -> Result<Json<QuizResponse>> {
    let quiz = state
        .services
        .quizzes()
        .set_published(id, body.published)
        .await?;
    Ok(Json(QuizResponse::from(&quiz)))
}

/// POST /api/quizzes/:id/submit
async fn submit_quiz(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<QuizId>,
    ApiJson(body): ApiJson<SubmitRequest>,
) -> Result<Json<SubmissionResponse>> {
    let outcome = state
        .services
        .quizzes()
        .submit(&principal, id, body.answers)
        .await?;
    Ok(Json(outcome.into()))
}

/// GET /api/attempts/:id
async fn get_attempt(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<AttemptId>,
) -> Result<Json<AttemptResponse>> {
    let attempt = state
        .services
        .quizzes()
        .get_attempt(id, &principal)
        .await?;
    Ok(Json(attempt.into()))
}
