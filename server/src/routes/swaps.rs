use api::swaps::{self, CreateSwap};
use api::{ApiError, ApiResult};
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use store::SwapStatus;
use uuid::Uuid;

use crate::extract::{AppState, AuthUser};

pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(input): Json<CreateSwap>,
) -> ApiResult<Json<Value>> {
    let swap = swaps::create(state.store.as_ref(), &user, input).await?;
    Ok(Json(json!({ "swap": swap })))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub status: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Value>> {
    let status = match query.status.as_deref() {
        Some(s) => Some(
            s.parse::<SwapStatus>()
                .map_err(|e: String| ApiError::validation(e))?,
        ),
        None => None,
    };
    let swaps = swaps::list_for(state.store.as_ref(), &user, status).await?;
    Ok(Json(json!({ "swaps": swaps })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionInput {
    pub swap_id: Uuid,
    pub status: String,
}

pub async fn transition(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(input): Json<TransitionInput>,
) -> ApiResult<Json<Value>> {
    let status: SwapStatus = input
        .status
        .parse()
        .map_err(|e: String| ApiError::validation(e))?;
    let swap = swaps::transition(
        state.store.as_ref(),
        &state.dispatcher,
        input.swap_id,
        &user,
        status,
    )
    .await?;
    Ok(Json(json!({ "swap": swap })))
}
