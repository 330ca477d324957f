use api::accounts;
use api::ApiResult;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::extract::{AppState, AuthUser};

#[derive(Deserialize)]
pub struct TokenInput {
    pub token: String,
}

pub async fn save_token(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(input): Json<TokenInput>,
) -> ApiResult<Json<Value>> {
    accounts::set_push_token(state.store.as_ref(), &user, input.token).await?;
    Ok(Json(json!({ "message": "Push token saved" })))
}

pub async fn remove_token(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Value>> {
    accounts::clear_push_token(state.store.as_ref(), &user).await?;
    Ok(Json(json!({ "message": "Push token removed" })))
}
