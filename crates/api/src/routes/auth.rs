//! Registration, login and token rotation.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use services::Registration;

use crate::error::Result;
use crate::extract::{ApiJson, AuthUser};
use crate::models::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RefreshRequest, RegisterRequest,
    UserResponse,
};
use crate::state::AppState;

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/change-password", post(change_password))
}

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let profile = body.profile()?;
    let session = state
        .services
        .auth()
        .register(Registration {
            email: body.email,
            password: body.password,
            full_name: body.full_name,
            profile,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let session = state
        .services
        .auth()
        .login(&body.email, &body.password)
        .await?;
    Ok(Json(session.into()))
}

/// POST /api/auth/refresh
async fn refresh(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshRequest>,
) -> Result<Json<AuthResponse>> {
    let session = state.services.auth().refresh(&body.refresh_token).await?;
    Ok(Json(session.into()))
}

/// POST /api/auth/logout
async fn logout(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshRequest>,
) -> Result<StatusCode> {
    state.services.auth().logout(&body.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/auth/me
async fn me(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<Json<UserResponse>> {
    let user = state.services.auth().current_user(principal.user_id).await?;
    Ok(Json(UserResponse::from(&user)))
}

/// POST /api/auth/change-password
async fn change_password(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> Result<StatusCode> {
    state
        .services
        .auth()
        .change_password(principal.user_id, &body.current_password, &body.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
