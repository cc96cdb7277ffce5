//! Course catalogue and per-student course progress.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use study_core::model::CourseId;

use crate::error::Result;
use crate::extract::{AdminUser, ApiJson, ApiPath, ApiQuery, AuthUser};
use crate::models::{
    CourseQuery, CourseRequest, CourseResponse, PageResponse, ProgressRequest, ProgressResponse,
};
use crate::state::AppState;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/courses", get(list_courses).post(create_course))
        .route(
            "/courses/:id",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/courses/:id/enroll", post(enroll))
        .route("/courses/:id/progress", put(set_progress))
}

/// GET /api/courses
async fn list_courses(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiQuery(query): ApiQuery<CourseQuery>,
) -> Result<Json<PageResponse<CourseResponse>>> {
    let filter = query.filter()?;
    let page = state
        .services
        .courses()
        .list_courses(&filter, query.page().to_request()?)
        .await?;
    Ok(Json(PageResponse::from_page(page, |c| CourseResponse::from(&c))))
}

/// GET /api/courses/:id
async fn get_course(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiPath(id): ApiPath<CourseId>,
) -> Result<Json<CourseResponse>> {
    let course = state.services.courses().get_course(id).await?;
    Ok(Json(CourseResponse::from(&course)))
}

/// POST /api/courses
async fn create_course(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(body): ApiJson<CourseRequest>,
) -> Result<(StatusCode, Json<CourseResponse>)> {
    let course = state
        .services
        .courses()
        .create_course(body.into_draft()?, admin.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(CourseResponse::from(&course))))
}

/// PUT /api/courses/:id
async fn update_course(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(id): ApiPath<CourseId>,
    ApiJson(body): ApiJson<CourseRequest>,
) -> Result<Json<CourseResponse>> {
    let course = state
        .services
        .courses()
        .update_course(id, body.into_draft()?)
        .await?;
    Ok(Json(CourseResponse::from(&course)))
}

/// DELETE /api/courses/:id
async fn delete_course(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(id): ApiPath<CourseId>,
) -> Result<StatusCode> {
    state.services.courses().delete_course(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/courses/:id/enroll
async fn enroll(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<CourseId>,
) -> Result<Json<ProgressResponse>> {
    let progress = state
        .services
        .courses()
        .enroll(principal.user_id, id)
        .await?;
    Ok(Json(ProgressResponse::from(&progress)))
}

/// PUT /api/courses/:id/progress
async fn set_progress(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiPath(id): ApiPath<CourseId>,
    ApiJson(body): ApiJson<ProgressRequest>,
) -> Result<Json<ProgressResponse>> {
    let progress = state
        .services
        .courses()
        .set_mastery(principal.user_id, id, body.mastery)
        .await?;
    Ok(Json(ProgressResponse::from(&progress)))
}
