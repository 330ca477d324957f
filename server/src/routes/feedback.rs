use api::feedback::{self, SubmitFeedback};
use api::ApiResult;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::extract::{AppState, AuthUser};

pub async fn submit(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(input): Json<SubmitFeedback>,
) -> ApiResult<Json<Value>> {
    let feedback = feedback::submit(state.store.as_ref(), &user, input).await?;
    Ok(Json(json!({ "feedback": feedback })))
}

#[derive(Deserialize)]
pub struct FeedbackQuery {
    /// Recipient to list feedback for; defaults to the caller.
    pub user: Option<Uuid>,
}

pub async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<FeedbackQuery>,
) -> ApiResult<Json<Value>> {
    let recipient = query.user.unwrap_or(user.id);
    let entries = feedback::received_by(state.store.as_ref(), recipient).await?;
    Ok(Json(json!({ "feedback": entries })))
}
