use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use study_core::model::{CourseId, MaterialId};

use crate::error::Result;
use crate::extract::{AdminUser, ApiJson, ApiPath, ApiQuery, AuthUser};
use crate::models::{MaterialQuery, MaterialRequest, MaterialResponse, PageResponse};
use crate::state::AppState;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/courses/:id/materials",
            get(list_materials).post(create_material),
        )
        .route(
            "/materials/:id",
            get(get_material).put(update_material).delete(delete_material),
        )
}

/// GET /api/courses/:id/materials
async fn list_materials(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiPath(course_id): ApiPath<CourseId>,
    ApiQuery(query): ApiQuery<MaterialQuery>,
) -> Result<Json<PageResponse<MaterialResponse>>> {
    let page = state
        .services
        .materials()
        .list_materials(course_id, query.kind()?, query.page().to_request()?)
        .await?;
    Ok(Json(PageResponse::from_page(page, |m| {
        MaterialResponse::from(&m)
    })))
}

/// POST /api/courses/:id/materials
async fn create_material(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(course_id): ApiPath<CourseId>,
    ApiJson(body): ApiJson<MaterialRequest>,
) -> Result<(StatusCode, Json<MaterialResponse>)> {
    let material = state
        .services
        .materials()
        .create_material(course_id, body.into_draft()?, admin.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(MaterialResponse::from(&material))))
}

/// GET /api/materials/:id
async fn get_material(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiPath(id): ApiPath<MaterialId>,
) -> Result<Json<MaterialResponse>> {
    let material = state.services.materials().get_material(id).await?;
    Ok(Json(MaterialResponse::from(&material)))
}

/// PUT /api/materials/:id
async fn update_material(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(id): ApiPath<MaterialId>,
    ApiJson(body): ApiJson<MaterialRequest>,
) -> Result<Json<MaterialResponse>> {
    let material = state
        .services
        .materials()
        .update_material(id, body.into_draft()?)
        .await?;
    Ok(Json(MaterialResponse::from(&material)))
}

/// DELETE /api/materials/:id
async fn delete_material(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(id): ApiPath<MaterialId>,
) -> Result<StatusCode> {
    state.services.materials().delete_material(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
