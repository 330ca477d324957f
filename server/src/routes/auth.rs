use api::accounts::{self, RegisterInput};
use api::auth::{sign_token, SESSION_USER_ID_KEY};
use api::{ApiError, ApiResult};
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_sessions::Session;

use crate::extract::{AppState, AuthUser};

#[derive(Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Register, sign the new user in, and return a bearer token alongside the
/// session cookie so non-browser clients can authenticate too.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<RegisterInput>,
) -> ApiResult<Json<Value>> {
    let user = accounts::register(state.store.as_ref(), input).await?;
    session
        .insert(SESSION_USER_ID_KEY, user.id)
        .await
        .map_err(|e| ApiError::Unexpected(e.to_string()))?;
    let token = sign_token(&user, &state.settings.auth.secret, state.settings.auth.ttl)?;
    Ok(Json(json!({ "user": user, "token": token })))
}

pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<LoginInput>,
) -> ApiResult<Json<Value>> {
    let user = accounts::authenticate(state.store.as_ref(), &input.email, &input.password).await?;
    session
        .insert(SESSION_USER_ID_KEY, user.id)
        .await
        .map_err(|e| ApiError::Unexpected(e.to_string()))?;
    let token = sign_token(&user, &state.settings.auth.secret, state.settings.auth.ttl)?;
    Ok(Json(json!({ "user": user, "token": token })))
}

pub async fn logout(session: Session) -> ApiResult<Json<Value>> {
    session
        .flush()
        .await
        .map_err(|e| ApiError::Unexpected(e.to_string()))?;
    Ok(Json(json!({ "message": "Logged out" })))
}

pub async fn me(AuthUser(user): AuthUser) -> Json<Value> {
    Json(json!({ "user": user }))
}
