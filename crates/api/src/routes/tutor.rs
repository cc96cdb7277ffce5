use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use crate::error::Result;
use crate::extract::{ApiJson, AuthUser};
use crate::models::{TutorRequest, TutorResponse};
use crate::state::AppState;

pub(crate) fn routes() -> Router<AppState> {
    Router::new().route("/tutor/chat", post(chat))
}

/// POST /api/tutor/chat
async fn chat(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    ApiJson(body): ApiJson<TutorRequest>,
) -> Result<Json<TutorResponse>> {
    tracing::debug!(user_id = %principal.user_id, course_id = ?body.course_id, "tutor chat");
    let reply = state
        .services
        .tutor()
        .chat(body.course_id, &body.message, &body.history)
        .await?;
    Ok(Json(reply.into()))
}
