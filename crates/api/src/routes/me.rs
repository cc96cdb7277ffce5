//! The signed-in student's own view: enrolments, dashboard, attempt history.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::error::Result;
use crate::extract::{ApiQuery, AuthUser};
use crate::models::{
    ActivityResponse, AttemptQuery, AttemptResponse, DashboardResponse, EnrolledCourseResponse,
    PageResponse,
};
use crate::state::AppState;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/me/courses", get(my_courses))
        .route("/me/dashboard", get(dashboard))
        .route("/me/attempts", get(my_attempts))
        .route("/me/activity", post(record_activity))
}

/// GET /api/me/courses
async fn my_courses(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<Json<Vec<EnrolledCourseResponse>>> {
    let enrolled = state
        .services
        .courses()
        .enrolled_courses(principal.user_id)
        .await?;
    Ok(Json(enrolled.iter().map(Into::into).collect()))
}

/// GET /api/me/dashboard
async fn dashboard(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<Json<DashboardResponse>> {
    let dashboard = state.services.progress().dashboard(principal.user_id).await?;
    Ok(Json(dashboard.into()))
}

/// GET /api/me/attempts
async fn my_attempts(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiQuery(query): ApiQuery<AttemptQuery>,
) -> Result<Json<PageResponse<AttemptResponse>>> {
    let page = state
        .services
        .quizzes()
        .list_attempts(principal.user_id, query.quiz_id, query.page().to_request()?)
        .await?;
    Ok(Json(PageResponse::from_page(page, AttemptResponse::from)))
}

/// POST /api/me/activity
async fn record_activity(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<Json<ActivityResponse>> {
    let activity = state
        .services
        .progress()
        .record_study_activity(principal.user_id)
        .await?;
    Ok(Json(activity.into()))
}
