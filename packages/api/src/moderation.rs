//! Admin moderation: banning, skill removal, and platform-wide notices.
//!
//! Callers are expected to have already verified the actor is an admin (the
//! HTTP layer does this with an extractor); these functions only guard against
//! the cases routing cannot, such as an admin banning themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use store::{GlobalNotice, NoticeQuery, Page, Priority, Store, User};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::notify::Dispatcher;

const DEFAULT_BAN_REASON: &str = "Violation of platform policies";
const MAX_NOTICE_LEN: usize = 500;

/// Ban a user, optionally until a given time. Idempotent: banning an
/// already-banned user succeeds.
pub async fn ban_user(
    store: &dyn Store,
    dispatcher: &Dispatcher,
    admin: &User,
    target: Uuid,
    reason: Option<String>,
    until: Option<DateTime<Utc>>,
) -> ApiResult<User> {
    if target == admin.id {
        return Err(ApiError::forbidden("Admins cannot ban themselves"));
    }
    let Some(mut user) = store.user_by_id(target).await? else {
        return Err(ApiError::not_found("User not found"));
    };
    // Re-banning without a new reason or expiry leaves the existing fields
    // alone, so the call is a true no-op on an already-banned user.
    let reason = reason
        .filter(|r| !r.trim().is_empty())
        .or_else(|| user.ban_reason.clone())
        .unwrap_or_else(|| DEFAULT_BAN_REASON.to_string());

    let already = user.is_banned;
    user.is_banned = true;
    user.ban_reason = Some(reason.clone());
    user.ban_until = until.or(user.ban_until);
    store.update_user(&user).await?;

    info!(user = %user.id, actor = %admin.id, %reason, "user banned");
    if !already {
        dispatcher.notify_detached(
            user.clone(),
            "Account Suspended".to_string(),
            format!("Your account has been suspended. Reason: {reason}"),
            json!({ "type": "account_status" }),
        );
    }
    Ok(user)
}

/// Lift a ban. Idempotent as well.
pub async fn unban_user(
    store: &dyn Store,
    dispatcher: &Dispatcher,
    admin: &User,
    target: Uuid,
) -> ApiResult<User> {
    let Some(mut user) = store.user_by_id(target).await? else {
        return Err(ApiError::not_found("User not found"));
    };
    let was_banned = user.is_banned;
    user.is_banned = false;
    user.ban_reason = None;
    user.ban_until = None;
    store.update_user(&user).await?;

    info!(user = %user.id, actor = %admin.id, "user unbanned");
    if was_banned {
        dispatcher.notify_detached(
            user.clone(),
            "Account Restored".to_string(),
            "Your account has been restored. Welcome back!".to_string(),
            json!({ "type": "account_status" }),
        );
    }
    Ok(user)
}

/// Strip a skill from every user's offered and wanted lists.
/// Returns the number of users touched.
pub async fn remove_skill(store: &dyn Store, admin: &User, skill: &str) -> ApiResult<u64> {
    let skill = skill.trim();
    if skill.is_empty() {
        return Err(ApiError::validation("Skill name is required"));
    }
    let affected = store.remove_skill_everywhere(skill).await?;
    info!(%skill, actor = %admin.id, affected, "skill removed platform-wide");
    Ok(affected)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastInput {
    pub message: String,
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Optional display window; outside it clients hide the notice.
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub send_push: bool,
}

/// Outcome of a broadcast: the stored notice plus whether push went out.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastOutcome {
    pub notice: GlobalNotice,
    pub push_sent: bool,
}

/// Publish a platform-wide notice, optionally pushing it to the broadcast
/// topic. Push failure does not fail the broadcast; the notice records
/// whether delivery was handed off.
pub async fn send_broadcast(
    store: &dyn Store,
    dispatcher: &Dispatcher,
    admin: &User,
    input: BroadcastInput,
) -> ApiResult<BroadcastOutcome> {
    let message = input.message.trim().to_string();
    if message.is_empty() {
        return Err(ApiError::validation("Message is required"));
    }
    if message.len() > MAX_NOTICE_LEN {
        return Err(ApiError::validation(format!(
            "Message must be at most {MAX_NOTICE_LEN} characters"
        )));
    }
    let priority = input.priority.unwrap_or(Priority::Info);

    let mut notice = GlobalNotice {
        id: Uuid::new_v4(),
        message: message.clone(),
        priority,
        is_active: true,
        starts_at: input.starts_at,
        ends_at: input.ends_at,
        sent_by: admin.id,
        push_sent: false,
        push_sent_at: None,
        created_at: Utc::now(),
    };
    notice = store.insert_notice(notice).await?;

    let mut pushed = false;
    if input.send_push {
        pushed = dispatcher
            .broadcast(
                &format!("SkillMate {}", priority.label()),
                &message,
                json!({ "type": "global_notice", "noticeId": notice.id.to_string() }),
            )
            .await;
        if pushed {
            notice.push_sent = true;
            notice.push_sent_at = Some(Utc::now());
            store.update_notice(&notice).await?;
        }
    }

    info!(notice = %notice.id, actor = %admin.id, priority = priority.as_str(), pushed, "notice broadcast");
    Ok(BroadcastOutcome {
        notice,
        push_sent: pushed,
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    /// Specific recipient; when absent the message fans out to every user
    /// with a registered push token.
    pub user_id: Option<Uuid>,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryCounts {
    pub delivered: u64,
    pub failed: u64,
}

/// Push a message to one user or to everyone with a token.
pub async fn send_direct(
    store: &dyn Store,
    dispatcher: &Dispatcher,
    input: DirectMessage,
) -> ApiResult<DeliveryCounts> {
    let title = input.title.trim();
    let body = input.body.trim();
    if title.is_empty() || body.is_empty() {
        return Err(ApiError::validation("Title and body are required"));
    }
    let data = json!({ "type": "admin_message" });

    let recipients = match input.user_id {
        Some(id) => match store.user_by_id(id).await? {
            Some(user) => vec![user],
            None => return Err(ApiError::not_found("User not found")),
        },
        None => store.users_with_push_tokens().await?,
    };

    let mut counts = DeliveryCounts {
        delivered: 0,
        failed: 0,
    };
    for user in &recipients {
        if dispatcher.notify(user, title, body, data.clone()).await {
            counts.delivered += 1;
        } else {
            counts.failed += 1;
        }
    }
    Ok(counts)
}

/// Notice listing with the active count alongside.
pub async fn list_notices(
    store: &dyn Store,
    query: &NoticeQuery,
) -> ApiResult<(Page<GlobalNotice>, u64)> {
    let page = store.list_notices(query).await?;
    let active = store.active_notice_count().await?;
    Ok((page, active))
}
