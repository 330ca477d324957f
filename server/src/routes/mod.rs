use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::extract::AppState;

mod admin;
mod auth;
mod feedback;
mod notifications;
mod swaps;
mod users;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route(
            "/api/profile",
            get(users::get_profile).patch(users::patch_profile),
        )
        .route("/api/users", get(users::directory))
        .route(
            "/api/swaps",
            post(swaps::create).get(swaps::list).patch(swaps::transition),
        )
        .route(
            "/api/feedback",
            post(feedback::submit).get(feedback::list),
        )
        .route(
            "/api/notifications/token",
            post(notifications::save_token).delete(notifications::remove_token),
        )
        .route("/api/admin/users", get(admin::list_users))
        .route(
            "/api/admin/users/{id}",
            get(admin::user_detail).patch(admin::moderate_user),
        )
        .route(
            "/api/admin/swaps",
            get(admin::list_swaps).patch(admin::override_swap),
        )
        .route("/api/admin/skills", get(admin::skill_counts))
        .route("/api/admin/skills/remove", post(admin::remove_skill))
        .route(
            "/api/admin/messages",
            get(admin::list_notices).post(admin::broadcast),
        )
        .route("/api/admin/notifications/send", post(admin::send_push))
        .route("/api/admin/reports", get(admin::report))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
