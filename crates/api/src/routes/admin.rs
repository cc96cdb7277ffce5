//! Admin-only user management and platform statistics.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use study_core::model::{Role, UserId};

use crate::error::Result;
use crate::extract::{AdminUser, ApiJson, ApiPath, ApiQuery};
use crate::models::{
    ActiveRequest, AttemptResponse, PageResponse, PointsRequest, RecentQuery, RoleRequest,
    StatsResponse, UserQuery, UserResponse,
};
use crate::state::AppState;

const DEFAULT_RECENT: u32 = 20;
const MAX_RECENT: u32 = 100;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(stats))
        .route("/admin/attempts", get(recent_attempts))
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id", delete(delete_user))
        .route("/admin/users/:id/role", put(set_role))
        .route("/admin/users/:id/active", put(set_active))
        .route("/admin/users/:id/points", post(award_points))
}

/// GET /api/admin/stats
async fn stats(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> Result<Json<StatsResponse>> {
    let stats = state.services.admin().stats().await?;
    Ok(Json(stats.into()))
}

/// GET /api/admin/attempts
async fn recent_attempts(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiQuery(query): ApiQuery<RecentQuery>,
) -> Result<Json<Vec<AttemptResponse>>> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT).clamp(1, MAX_RECENT);
    let attempts = state.services.admin().recent_attempts(limit).await?;
    Ok(Json(attempts.into_iter().map(Into::into).collect()))
}

/// GET /api/admin/users
async fn list_users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> Result<Json<PageResponse<UserResponse>>> {
    let filter = query.filter()?;
    let page = state
        .services
        .admin()
        .list_users(&filter, query.page().to_request()?)
        .await?;
    Ok(Json(PageResponse::from_page(page, |u| UserResponse::from(&u))))
}

/// PUT /api/admin/users/:id/role
async fn set_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(body): ApiJson<RoleRequest>,
) -> Result<Json<UserResponse>> {
    let role = Role::parse(&body.role)?;
    let user = state.services.admin().set_role(&admin, id, role).await?;
    Ok(Json(UserResponse::from(&user)))
}

/// PUT /api/admin/users/:id/active
async fn set_active(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(body): ApiJson<ActiveRequest>,
) -> Result<Json<UserResponse>> {
    let user = state
        .services
        .admin()
        .set_active(&admin, id, body.is_active)
        .await?;
    Ok(Json(UserResponse::from(&user)))
}

/// POST /api/admin/users/:id/points
async fn award_points(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(id): ApiPath<UserId>,
    ApiJson(body): ApiJson<PointsRequest>,
) -> Result<Json<UserResponse>> {
    let user = state
        .services
        .progress()
        .award_points(id, body.points)
        .await?;
    Ok(Json(UserResponse::from(&user)))
}

/// DELETE /api/admin/users/:id
async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<UserId>,
) -> Result<StatusCode> {
    state.services.admin().delete_user(&admin, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
