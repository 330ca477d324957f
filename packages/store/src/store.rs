//! # The `Store` trait — async interface over the persisted collections
//!
//! Every domain operation talks to storage through this trait, so the same
//! logic runs against [`crate::MemoryStore`] in tests and [`crate::PgStore`]
//! in production.
//!
//! All mutations are single-record writes; the trait deliberately offers no
//! multi-record transaction. Two concurrent updates to the same record race
//! and the last writer wins — callers that need stronger guarantees do not
//! exist in this system.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Feedback, GlobalNotice, Role, SkillCount, Swap, SwapStatus, User,
};

/// Storage failure. Backend detail is preserved for logging; callers map this
/// to a generic "unexpected" response and never expose it.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One page of a listing, with enough to render pagination.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn pages(&self) -> u64 {
        self.total.div_ceil(self.limit.max(1))
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total: self.total,
        }
    }
}

/// Filters for user listings. `search` matches name/email (and, for the
/// public directory, skills and location) case-insensitively.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserQuery {
    pub search: Option<String>,
    pub role: Option<Role>,
    pub is_banned: Option<bool>,
    /// Restrict to `profile_public = true` records (public directory).
    pub public_only: bool,
    pub page: u64,
    pub limit: u64,
}

/// Filters for swap listings.
#[derive(Debug, Clone, Default)]
pub struct SwapQuery {
    pub status: Option<SwapStatus>,
    /// Case-insensitive substring over offered/requested skill.
    pub skill: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub page: u64,
    pub limit: u64,
}

/// Filters for notice listings.
#[derive(Debug, Clone, Default)]
pub struct NoticeQuery {
    pub is_active: Option<bool>,
    pub page: u64,
    pub limit: u64,
}

pub(crate) fn page_bounds(page: u64, limit: u64) -> (u64, u64) {
    let limit = if limit == 0 { 20 } else { limit.min(100) };
    let page = page.max(1);
    ((page - 1) * limit, limit)
}

/// Async storage interface over users, swaps, feedback, and notices.
#[async_trait]
pub trait Store: Send + Sync {
    // --- users ---
    async fn insert_user(&self, user: User) -> StoreResult<User>;
    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    /// Lookup by email; the caller lowercases, the store compares exactly.
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Whole-record write; the record must already exist.
    async fn update_user(&self, user: &User) -> StoreResult<()>;
    async fn list_users(&self, query: &UserQuery) -> StoreResult<Page<User>>;
    async fn all_users(&self) -> StoreResult<Vec<User>>;
    /// Users currently holding a push delivery token.
    async fn users_with_push_tokens(&self) -> StoreResult<Vec<User>>;
    /// Pull the exact skill string from every user's offered and wanted
    /// lists. Returns the number of users affected. Irreversible.
    async fn remove_skill_everywhere(&self, skill: &str) -> StoreResult<u64>;
    /// Per-skill offered/wanted counts, optionally filtered by a
    /// case-insensitive substring, sorted by total desc then name.
    async fn skill_counts(&self, search: Option<&str>) -> StoreResult<Vec<SkillCount>>;

    // --- swaps ---
    async fn insert_swap(&self, swap: Swap) -> StoreResult<Swap>;
    async fn swap_by_id(&self, id: Uuid) -> StoreResult<Option<Swap>>;
    async fn update_swap(&self, swap: &Swap) -> StoreResult<()>;
    /// Swaps where the user is either party, newest first.
    async fn swaps_for_user(&self, user: Uuid) -> StoreResult<Vec<Swap>>;
    async fn list_swaps(&self, query: &SwapQuery) -> StoreResult<Page<Swap>>;
    async fn all_swaps(&self) -> StoreResult<Vec<Swap>>;
    /// Whether a pending swap already exists for the ordered (from, to) pair.
    async fn pending_swap_exists(&self, from: Uuid, to: Uuid) -> StoreResult<bool>;
    async fn swap_status_counts(&self) -> StoreResult<Vec<(SwapStatus, u64)>>;

    // --- feedback ---
    async fn insert_feedback(&self, feedback: Feedback) -> StoreResult<Feedback>;
    /// Feedback received by a user, newest first.
    async fn feedback_for(&self, recipient: Uuid) -> StoreResult<Vec<Feedback>>;
    async fn feedback_exists(&self, swap_id: Uuid, author: Uuid) -> StoreResult<bool>;

    // --- notices ---
    async fn insert_notice(&self, notice: GlobalNotice) -> StoreResult<GlobalNotice>;
    async fn update_notice(&self, notice: &GlobalNotice) -> StoreResult<()>;
    async fn list_notices(&self, query: &NoticeQuery) -> StoreResult<Page<GlobalNotice>>;
    async fn active_notice_count(&self) -> StoreResult<u64>;

    // --- maintenance (seed tool only) ---
    /// Destructive: drops every record in every collection.
    async fn clear_all(&self) -> StoreResult<()>;
}
