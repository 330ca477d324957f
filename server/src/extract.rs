//! Shared state and request-identity extractors.
//!
//! Identity resolution order: cookie session first, then `Authorization:
//! Bearer` token. Both resolve to the freshly loaded user record so ban state
//! and role are always current, never what the credential was minted with.

use std::sync::Arc;

use api::auth::{verify_token, SESSION_USER_ID_KEY};
use api::{ApiError, Dispatcher};
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use store::{Store, User};
use tower_sessions::Session;
use uuid::Uuid;

use crate::settings::Settings;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub dispatcher: Dispatcher,
    pub settings: Arc<Settings>,
}

/// Any signed-in, loadable user. Ban enforcement is per-operation, so a
/// banned user can still read their own state.
pub struct AuthUser(pub User);

/// A signed-in user whose current role is admin.
pub struct AdminUser(pub User);

async fn session_user_id(parts: &mut Parts, state: &AppState) -> Option<Uuid> {
    let session = Session::from_request_parts(parts, state).await.ok()?;
    session.get::<Uuid>(SESSION_USER_ID_KEY).await.ok().flatten()
}

fn bearer_user_id(parts: &Parts, state: &AppState) -> Option<Uuid> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?;
    let claims = verify_token(token, &state.settings.auth.secret)?;
    claims.sub.parse().ok()
}

async fn resolve_user(parts: &mut Parts, state: &AppState) -> Result<User, ApiError> {
    let user_id = match session_user_id(parts, state).await {
        Some(id) => id,
        None => bearer_user_id(parts, state)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?,
    };
    state
        .store
        .user_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        resolve_user(parts, state).await.map(AuthUser)
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let user = resolve_user(parts, state).await?;
        if !user.is_admin() {
            return Err(ApiError::forbidden("Admin access required"));
        }
        Ok(AdminUser(user))
    }
}
