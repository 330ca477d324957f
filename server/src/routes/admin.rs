use api::moderation::{self, BroadcastInput, DirectMessage};
use api::reports::{self, ReportFormat, ReportKind};
use api::swaps;
use api::{ApiError, ApiResult};
use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use store::{NoticeQuery, SwapQuery, UserQuery};
use uuid::Uuid;

use crate::extract::{AdminUser, AppState};

#[derive(Deserialize)]
pub struct AdminUserQuery {
    pub search: Option<String>,
    pub role: Option<String>,
    pub banned: Option<bool>,
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub limit: u64,
}

pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<AdminUserQuery>,
) -> ApiResult<Json<Value>> {
    let role = match query.role.as_deref() {
        Some(raw) => Some(raw.parse().map_err(|e: String| ApiError::validation(e))?),
        None => None,
    };
    let page = state
        .store
        .list_users(&UserQuery {
            search: query.search,
            role,
            is_banned: query.banned,
            public_only: false,
            page: query.page,
            limit: query.limit,
        })
        .await?;
    Ok(Json(json!({
        "users": page.items,
        "page": page.page,
        "limit": page.limit,
        "total": page.total,
        "pages": page.pages(),
    })))
}

pub async fn user_detail(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let Some(user) = state.store.user_by_id(id).await? else {
        return Err(ApiError::not_found("User not found"));
    };
    let feedback = state.store.feedback_for(id).await?;
    Ok(Json(json!({ "user": user, "feedback": feedback })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerateUserInput {
    /// `true` bans, `false` lifts the ban.
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub ban_until: Option<DateTime<Utc>>,
}

pub async fn moderate_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ModerateUserInput>,
) -> ApiResult<Json<Value>> {
    let store = state.store.as_ref();
    let user = if input.is_banned {
        moderation::ban_user(
            store,
            &state.dispatcher,
            &admin,
            id,
            input.ban_reason,
            input.ban_until,
        )
        .await?
    } else {
        moderation::unban_user(store, &state.dispatcher, &admin, id).await?
    };
    Ok(Json(json!({ "user": user })))
}

#[derive(Deserialize)]
pub struct AdminSwapQuery {
    pub status: Option<String>,
    pub skill: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub limit: u64,
}

pub async fn list_swaps(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<AdminSwapQuery>,
) -> ApiResult<Json<Value>> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(raw.parse().map_err(|e: String| ApiError::validation(e))?),
        None => None,
    };
    let (page, summary) = swaps::admin_list(
        state.store.as_ref(),
        &SwapQuery {
            status,
            skill: query.skill,
            created_after: query.from,
            created_before: query.to,
            page: query.page,
            limit: query.limit,
        },
    )
    .await?;
    let summary: Vec<Value> = summary
        .iter()
        .map(|(status, count)| json!({ "status": status.as_str(), "count": count }))
        .collect();
    Ok(Json(json!({
        "swaps": page.items,
        "summary": summary,
        "page": page.page,
        "limit": page.limit,
        "total": page.total,
        "pages": page.pages(),
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideInput {
    pub swap_id: Uuid,
    pub status: String,
    pub reason: Option<String>,
}

pub async fn override_swap(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(input): Json<OverrideInput>,
) -> ApiResult<Json<Value>> {
    let status = input
        .status
        .parse()
        .map_err(|e: String| ApiError::validation(e))?;
    let swap = swaps::admin_override(
        state.store.as_ref(),
        &state.dispatcher,
        &admin,
        input.swap_id,
        status,
        input.reason,
    )
    .await?;
    Ok(Json(json!({ "swap": swap })))
}

#[derive(Deserialize)]
pub struct SkillQuery {
    pub search: Option<String>,
}

pub async fn skill_counts(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<SkillQuery>,
) -> ApiResult<Json<Value>> {
    let counts = state.store.skill_counts(query.search.as_deref()).await?;
    let skills: Vec<Value> = counts
        .iter()
        .map(|c| {
            json!({
                "skill": c.skill,
                "offeredCount": c.offered_count,
                "wantedCount": c.wanted_count,
                "totalCount": c.total(),
            })
        })
        .collect();
    Ok(Json(json!({ "skills": skills })))
}

#[derive(Deserialize)]
pub struct RemoveSkillInput {
    pub skill: String,
}

pub async fn remove_skill(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(input): Json<RemoveSkillInput>,
) -> ApiResult<Json<Value>> {
    let affected = moderation::remove_skill(state.store.as_ref(), &admin, &input.skill).await?;
    Ok(Json(json!({
        "message": "Skill removed",
        "affectedUsers": affected,
    })))
}

#[derive(Deserialize)]
pub struct AdminNoticeQuery {
    pub active: Option<bool>,
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub limit: u64,
}

pub async fn list_notices(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<AdminNoticeQuery>,
) -> ApiResult<Json<Value>> {
    let (page, active) = moderation::list_notices(
        state.store.as_ref(),
        &NoticeQuery {
            is_active: query.active,
            page: query.page,
            limit: query.limit,
        },
    )
    .await?;
    Ok(Json(json!({
        "messages": page.items,
        "activeCount": active,
        "page": page.page,
        "limit": page.limit,
        "total": page.total,
        "pages": page.pages(),
    })))
}

pub async fn broadcast(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(input): Json<BroadcastInput>,
) -> ApiResult<Json<Value>> {
    let outcome =
        moderation::send_broadcast(state.store.as_ref(), &state.dispatcher, &admin, input).await?;
    Ok(Json(json!({
        "message": outcome.notice,
        "pushSent": outcome.push_sent,
    })))
}

pub async fn send_push(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(input): Json<DirectMessage>,
) -> ApiResult<Json<Value>> {
    let counts = moderation::send_direct(state.store.as_ref(), &state.dispatcher, input).await?;
    Ok(Json(json!({
        "delivered": counts.delivered,
        "failed": counts.failed,
    })))
}

#[derive(Deserialize)]
pub struct ReportQuery {
    #[serde(rename = "type")]
    pub kind: String,
    pub format: Option<String>,
}

pub async fn report(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Response> {
    let kind: ReportKind = query
        .kind
        .parse()
        .map_err(|e: String| ApiError::validation(e))?;
    let format = match query.format.as_deref() {
        Some(raw) => raw.parse().map_err(|e: String| ApiError::validation(e))?,
        None => ReportFormat::default(),
    };
    let report = reports::generate(state.store.as_ref(), kind).await?;
    let response = match format {
        ReportFormat::Json => Json(report.to_json()).into_response(),
        ReportFormat::Csv => ([(CONTENT_TYPE, "text/csv")], report.to_csv()).into_response(),
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moderation_body_uses_ban_prefixed_field_names() {
        let input: ModerateUserInput = serde_json::from_str(
            r#"{"isBanned": true, "banReason": "spam", "banUntil": "2026-09-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(input.is_banned);
        assert_eq!(input.ban_reason.as_deref(), Some("spam"));
        assert!(input.ban_until.is_some());

        let lift: ModerateUserInput = serde_json::from_str(r#"{"isBanned": false}"#).unwrap();
        assert!(!lift.is_banned);
        assert!(lift.ban_reason.is_none());
    }
}
