//! Route table. Everything here is nested under `/api` by `build_router`.

pub mod admin;
pub mod auth;
pub mod courses;
pub mod health;
pub mod materials;
pub mod me;
pub mod quizzes;
pub mod tutor;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(courses::routes())
        .merge(materials::routes())
        .merge(quizzes::routes())
        .merge(me::routes())
        .merge(admin::routes())
        .merge(tutor::routes())
}
