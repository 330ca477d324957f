use api::accounts::{self, ProfileUpdate};
use api::ApiResult;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::extract::{AppState, AuthUser};

pub async fn get_profile(AuthUser(user): AuthUser) -> Json<Value> {
    Json(json!({ "user": user }))
}

pub async fn patch_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<Value>> {
    let user = accounts::update_profile(state.store.as_ref(), &user, update).await?;
    Ok(Json(json!({ "user": user })))
}

#[derive(Deserialize)]
pub struct DirectoryQuery {
    pub search: Option<String>,
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub limit: u64,
}

/// Public directory: published profiles only, searchable and paginated.
pub async fn directory(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<DirectoryQuery>,
) -> ApiResult<Json<Value>> {
    let page =
        accounts::public_directory(state.store.as_ref(), query.search, query.page, query.limit)
            .await?;
    Ok(Json(json!({
        "users": page.items,
        "page": page.page,
        "limit": page.limit,
        "total": page.total,
        "pages": page.pages(),
    })))
}
