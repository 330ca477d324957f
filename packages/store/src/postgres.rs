//! PostgreSQL [`Store`] backed by sqlx.
//!
//! Rows are mapped by hand so the models stay free of database derives.
//! Skills and availability are `TEXT[]` columns; swap status, role, and
//! priority are stored as text and parsed on read.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::models::{
    Feedback, GlobalNotice, Priority, Role, SkillCount, Swap, SwapStatus, User,
};
use crate::store::{
    page_bounds, NoticeQuery, Page, Store, StoreError, StoreResult, SwapQuery, UserQuery,
};

/// PostgreSQL store. Cloning shares the underlying pool.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the four tables and their secondary indexes if absent.
    pub async fn init_schema(&self) -> StoreResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                location TEXT,
                photo_url TEXT,
                photo_id TEXT,
                skills_offered TEXT[] NOT NULL DEFAULT '{}',
                skills_wanted TEXT[] NOT NULL DEFAULT '{}',
                availability TEXT[] NOT NULL DEFAULT '{}',
                profile_public BOOLEAN NOT NULL DEFAULT FALSE,
                role TEXT NOT NULL DEFAULT 'user',
                is_banned BOOLEAN NOT NULL DEFAULT FALSE,
                ban_reason TEXT,
                ban_until TIMESTAMPTZ,
                push_token TEXT,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            );",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS users_email_lower_idx
                 ON users (lower(email));",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS users_public_idx ON users (profile_public);",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS swaps (
                id UUID PRIMARY KEY,
                from_user UUID NOT NULL REFERENCES users(id),
                to_user UUID NOT NULL REFERENCES users(id),
                offered_skill TEXT NOT NULL,
                requested_skill TEXT NOT NULL,
                message TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TIMESTAMPTZ NOT NULL,
                accepted_at TIMESTAMPTZ,
                rejected_at TIMESTAMPTZ,
                cancelled_at TIMESTAMPTZ
            );",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS swaps_status_idx ON swaps (status);")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS feedback (
                id UUID PRIMARY KEY,
                swap_id UUID NOT NULL REFERENCES swaps(id),
                from_user UUID NOT NULL REFERENCES users(id),
                to_user UUID NOT NULL REFERENCES users(id),
                rating INTEGER NOT NULL,
                comment TEXT,
                created_at TIMESTAMPTZ NOT NULL
            );",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS notices (
                id UUID PRIMARY KEY,
                message TEXT NOT NULL,
                priority TEXT NOT NULL DEFAULT 'info',
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                starts_at TIMESTAMPTZ,
                ends_at TIMESTAMPTZ,
                sent_by UUID NOT NULL REFERENCES users(id),
                push_sent BOOLEAN NOT NULL DEFAULT FALSE,
                push_sent_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL
            );",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn parse<T: std::str::FromStr<Err = String>>(raw: String) -> Result<T, StoreError> {
    raw.parse().map_err(StoreError::Backend)
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        location: row.try_get("location")?,
        photo_url: row.try_get("photo_url")?,
        photo_id: row.try_get("photo_id")?,
        skills_offered: row.try_get("skills_offered")?,
        skills_wanted: row.try_get("skills_wanted")?,
        availability: row.try_get("availability")?,
        profile_public: row.try_get("profile_public")?,
        role: parse::<Role>(row.try_get("role")?)?,
        is_banned: row.try_get("is_banned")?,
        ban_reason: row.try_get("ban_reason")?,
        ban_until: row.try_get("ban_until")?,
        push_token: row.try_get("push_token")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn swap_from_row(row: &PgRow) -> StoreResult<Swap> {
    Ok(Swap {
        id: row.try_get("id")?,
        from_user: row.try_get("from_user")?,
        to_user: row.try_get("to_user")?,
        offered_skill: row.try_get("offered_skill")?,
        requested_skill: row.try_get("requested_skill")?,
        message: row.try_get("message")?,
        status: parse::<SwapStatus>(row.try_get("status")?)?,
        created_at: row.try_get("created_at")?,
        accepted_at: row.try_get("accepted_at")?,
        rejected_at: row.try_get("rejected_at")?,
        cancelled_at: row.try_get("cancelled_at")?,
    })
}

fn feedback_from_row(row: &PgRow) -> StoreResult<Feedback> {
    Ok(Feedback {
        id: row.try_get("id")?,
        swap_id: row.try_get("swap_id")?,
        from_user: row.try_get("from_user")?,
        to_user: row.try_get("to_user")?,
        rating: row.try_get("rating")?,
        comment: row.try_get("comment")?,
        created_at: row.try_get("created_at")?,
    })
}

fn notice_from_row(row: &PgRow) -> StoreResult<GlobalNotice> {
    Ok(GlobalNotice {
        id: row.try_get("id")?,
        message: row.try_get("message")?,
        priority: parse::<Priority>(row.try_get("priority")?)?,
        is_active: row.try_get("is_active")?,
        starts_at: row.try_get("starts_at")?,
        ends_at: row.try_get("ends_at")?,
        sent_by: row.try_get("sent_by")?,
        push_sent: row.try_get("push_sent")?,
        push_sent_at: row.try_get("push_sent_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn push_user_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &UserQuery) {
    if query.public_only {
        builder.push(" AND profile_public = TRUE");
    }
    if let Some(role) = query.role {
        builder.push(" AND role = ").push_bind(role.as_str());
    }
    if let Some(banned) = query.is_banned {
        builder.push(" AND is_banned = ").push_bind(banned);
    }
    if let Some(ref term) = query.search {
        let pattern = format!("%{term}%");
        builder.push(" AND (name ILIKE ").push_bind(pattern.clone());
        if !query.public_only {
            builder.push(" OR email ILIKE ").push_bind(pattern.clone());
        }
        builder
            .push(" OR location ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR EXISTS (SELECT 1 FROM unnest(skills_offered || skills_wanted) AS s WHERE s ILIKE ")
            .push_bind(pattern)
            .push("))");
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: User) -> StoreResult<User> {
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, location, photo_url,
                photo_id, skills_offered, skills_wanted, availability, profile_public,
                role, is_banned, ban_reason, ban_until, push_token, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.location)
        .bind(&user.photo_url)
        .bind(&user.photo_id)
        .bind(&user.skills_offered)
        .bind(&user.skills_wanted)
        .bind(&user.availability)
        .bind(user.profile_public)
        .bind(user.role.as_str())
        .bind(user.is_banned)
        .bind(&user.ban_reason)
        .bind(user.ban_until)
        .bind(&user.push_token)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(user)
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "UPDATE users SET name = $2, email = $3, password_hash = $4, location = $5,
                photo_url = $6, photo_id = $7, skills_offered = $8, skills_wanted = $9,
                availability = $10, profile_public = $11, role = $12, is_banned = $13,
                ban_reason = $14, ban_until = $15, push_token = $16, updated_at = $17
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.location)
        .bind(&user.photo_url)
        .bind(&user.photo_id)
        .bind(&user.skills_offered)
        .bind(&user.skills_wanted)
        .bind(&user.availability)
        .bind(user.profile_public)
        .bind(user.role.as_str())
        .bind(user.is_banned)
        .bind(&user.ban_reason)
        .bind(user.ban_until)
        .bind(&user.push_token)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_users(&self, query: &UserQuery) -> StoreResult<Page<User>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE TRUE");
        push_user_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM users WHERE TRUE");
        push_user_filters(&mut select, query);
        let (skip, limit) = page_bounds(query.page, query.limit);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(skip as i64);
        let rows = select.build().fetch_all(&self.pool).await?;
        let items = rows
            .iter()
            .map(user_from_row)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Page {
            items,
            page: query.page.max(1),
            limit,
            total: total as u64,
        })
    }

    async fn all_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn users_with_push_tokens(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users WHERE push_token IS NOT NULL")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn remove_skill_everywhere(&self, skill: &str) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE users
                SET skills_offered = array_remove(skills_offered, $1),
                    skills_wanted = array_remove(skills_wanted, $1)
              WHERE $1 = ANY(skills_offered) OR $1 = ANY(skills_wanted)",
        )
        .bind(skill)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn skill_counts(&self, search: Option<&str>) -> StoreResult<Vec<SkillCount>> {
        let rows = sqlx::query(
            "WITH offered AS (
                 SELECT unnest(skills_offered) AS skill FROM users
             ), wanted AS (
                 SELECT unnest(skills_wanted) AS skill FROM users
             ), combined AS (
                 SELECT skill, 1 AS offered, 0 AS wanted FROM offered
                 UNION ALL
                 SELECT skill, 0 AS offered, 1 AS wanted FROM wanted
             )
             SELECT skill,
                    SUM(offered)::BIGINT AS offered_count,
                    SUM(wanted)::BIGINT AS wanted_count
               FROM combined
              WHERE ($1::TEXT IS NULL OR skill ILIKE $1)
              GROUP BY skill
              ORDER BY SUM(offered) + SUM(wanted) DESC, skill ASC",
        )
        .bind(search.map(|s| format!("%{s}%")))
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                Ok(SkillCount {
                    skill: row.try_get("skill")?,
                    offered_count: row.try_get::<i64, _>("offered_count")? as u64,
                    wanted_count: row.try_get::<i64, _>("wanted_count")? as u64,
                })
            })
            .collect()
    }

    async fn insert_swap(&self, swap: Swap) -> StoreResult<Swap> {
        sqlx::query(
            "INSERT INTO swaps (id, from_user, to_user, offered_skill, requested_skill,
                message, status, created_at, accepted_at, rejected_at, cancelled_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(swap.id)
        .bind(swap.from_user)
        .bind(swap.to_user)
        .bind(&swap.offered_skill)
        .bind(&swap.requested_skill)
        .bind(&swap.message)
        .bind(swap.status.as_str())
        .bind(swap.created_at)
        .bind(swap.accepted_at)
        .bind(swap.rejected_at)
        .bind(swap.cancelled_at)
        .execute(&self.pool)
        .await?;
        Ok(swap)
    }

    async fn swap_by_id(&self, id: Uuid) -> StoreResult<Option<Swap>> {
        let row = sqlx::query("SELECT * FROM swaps WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(swap_from_row).transpose()
    }

    async fn update_swap(&self, swap: &Swap) -> StoreResult<()> {
        sqlx::query(
            "UPDATE swaps SET status = $2, accepted_at = $3, rejected_at = $4,
                cancelled_at = $5, message = $6
             WHERE id = $1",
        )
        .bind(swap.id)
        .bind(swap.status.as_str())
        .bind(swap.accepted_at)
        .bind(swap.rejected_at)
        .bind(swap.cancelled_at)
        .bind(&swap.message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn swaps_for_user(&self, user: Uuid) -> StoreResult<Vec<Swap>> {
        let rows = sqlx::query(
            "SELECT * FROM swaps WHERE from_user = $1 OR to_user = $1
             ORDER BY created_at DESC",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(swap_from_row).collect()
    }

    async fn list_swaps(&self, query: &SwapQuery) -> StoreResult<Page<Swap>> {
        let mut filter = QueryBuilder::<Postgres>::new("SELECT * FROM swaps WHERE TRUE");
        if let Some(status) = query.status {
            filter.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(ref skill) = query.skill {
            let pattern = format!("%{skill}%");
            filter
                .push(" AND (offered_skill ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR requested_skill ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(after) = query.created_after {
            filter.push(" AND created_at >= ").push_bind(after);
        }
        if let Some(before) = query.created_before {
            filter.push(" AND created_at <= ").push_bind(before);
        }

        let total = self.count_swaps(query).await?;
        let (skip, limit) = page_bounds(query.page, query.limit);
        filter
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(skip as i64);
        let rows = filter.build().fetch_all(&self.pool).await?;
        let items = rows
            .iter()
            .map(swap_from_row)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Page {
            items,
            page: query.page.max(1),
            limit,
            total,
        })
    }

    async fn all_swaps(&self) -> StoreResult<Vec<Swap>> {
        let rows = sqlx::query("SELECT * FROM swaps ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(swap_from_row).collect()
    }

    async fn pending_swap_exists(&self, from: Uuid, to: Uuid) -> StoreResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM swaps
              WHERE from_user = $1 AND to_user = $2 AND status = 'pending'
              LIMIT 1",
        )
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn swap_status_counts(&self) -> StoreResult<Vec<(SwapStatus, u64)>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM swaps GROUP BY status")
                .fetch_all(&self.pool)
                .await?;
        let mut by_status = HashMap::with_capacity(rows.len());
        for (status, count) in rows {
            by_status.insert(parse::<SwapStatus>(status)?, count as u64);
        }
        // GROUP BY drops statuses with no rows; callers expect all four.
        Ok(SwapStatus::ALL
            .iter()
            .map(|&status| (status, by_status.get(&status).copied().unwrap_or(0)))
            .collect())
    }

    async fn insert_feedback(&self, feedback: Feedback) -> StoreResult<Feedback> {
        sqlx::query(
            "INSERT INTO feedback (id, swap_id, from_user, to_user, rating, comment, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(feedback.id)
        .bind(feedback.swap_id)
        .bind(feedback.from_user)
        .bind(feedback.to_user)
        .bind(feedback.rating)
        .bind(&feedback.comment)
        .bind(feedback.created_at)
        .execute(&self.pool)
        .await?;
        Ok(feedback)
    }

    async fn feedback_for(&self, recipient: Uuid) -> StoreResult<Vec<Feedback>> {
        let rows = sqlx::query(
            "SELECT * FROM feedback WHERE to_user = $1 ORDER BY created_at DESC",
        )
        .bind(recipient)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(feedback_from_row).collect()
    }

    async fn feedback_exists(&self, swap_id: Uuid, author: Uuid) -> StoreResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM feedback WHERE swap_id = $1 AND from_user = $2 LIMIT 1",
        )
        .bind(swap_id)
        .bind(author)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn insert_notice(&self, notice: GlobalNotice) -> StoreResult<GlobalNotice> {
        sqlx::query(
            "INSERT INTO notices (id, message, priority, is_active, starts_at, ends_at,
                sent_by, push_sent, push_sent_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(notice.id)
        .bind(&notice.message)
        .bind(notice.priority.as_str())
        .bind(notice.is_active)
        .bind(notice.starts_at)
        .bind(notice.ends_at)
        .bind(notice.sent_by)
        .bind(notice.push_sent)
        .bind(notice.push_sent_at)
        .bind(notice.created_at)
        .execute(&self.pool)
        .await?;
        Ok(notice)
    }

    async fn update_notice(&self, notice: &GlobalNotice) -> StoreResult<()> {
        sqlx::query(
            "UPDATE notices SET is_active = $2, push_sent = $3, push_sent_at = $4
             WHERE id = $1",
        )
        .bind(notice.id)
        .bind(notice.is_active)
        .bind(notice.push_sent)
        .bind(notice.push_sent_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_notices(&self, query: &NoticeQuery) -> StoreResult<Page<GlobalNotice>> {
        let mut filter = QueryBuilder::<Postgres>::new("SELECT * FROM notices WHERE TRUE");
        if let Some(active) = query.is_active {
            filter.push(" AND is_active = ").push_bind(active);
        }
        let total: i64 = match query.is_active {
            Some(active) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM notices WHERE is_active = $1")
                    .bind(active)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM notices")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        let (skip, limit) = page_bounds(query.page, query.limit);
        filter
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(skip as i64);
        let rows = filter.build().fetch_all(&self.pool).await?;
        let items = rows
            .iter()
            .map(notice_from_row)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Page {
            items,
            page: query.page.max(1),
            limit,
            total: total as u64,
        })
    }

    async fn active_notice_count(&self) -> StoreResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notices WHERE is_active = TRUE")
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }

    async fn clear_all(&self) -> StoreResult<()> {
        sqlx::query("DELETE FROM feedback").execute(&self.pool).await?;
        sqlx::query("DELETE FROM notices").execute(&self.pool).await?;
        sqlx::query("DELETE FROM swaps").execute(&self.pool).await?;
        sqlx::query("DELETE FROM users").execute(&self.pool).await?;
        Ok(())
    }
}

impl PgStore {
    async fn count_swaps(&self, query: &SwapQuery) -> StoreResult<u64> {
        let mut builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM swaps WHERE TRUE");
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(ref skill) = query.skill {
            let pattern = format!("%{skill}%");
            builder
                .push(" AND (offered_skill ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR requested_skill ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(after) = query.created_after {
            builder.push(" AND created_at >= ").push_bind(after);
        }
        if let Some(before) = query.created_before {
            builder.push(" AND created_at <= ").push_bind(before);
        }
        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
