//! # Domain models
//!
//! Canonical shapes for the four persisted collections. Field names serialize
//! as camelCase to match the platform's JSON wire contract. These are plain
//! serde types with no database coupling; row mapping lives with each
//! [`crate::Store`] implementation.
//!
//! Earlier revisions of the platform stored `availability` and the two skill
//! lists inconsistently (sometimes a comma-joined string, sometimes an array).
//! The canonical shape here is always a list; [`normalize_terms`] enforces it
//! at every write boundary and is reused by the one-shot migration.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platform role. Admins pass the authorization gate for moderation routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Swap lifecycle status.
///
/// `Pending` is the only non-terminal state. Self-service transitions move
/// `Pending` to one of the three terminal states; admin overrides may move a
/// swap between any two states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

impl SwapStatus {
    pub const ALL: [SwapStatus; 4] = [
        SwapStatus::Pending,
        SwapStatus::Accepted,
        SwapStatus::Rejected,
        SwapStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SwapStatus::Pending => "pending",
            SwapStatus::Accepted => "accepted",
            SwapStatus::Rejected => "rejected",
            SwapStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SwapStatus::Pending)
    }
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SwapStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SwapStatus::Pending),
            "accepted" => Ok(SwapStatus::Accepted),
            "rejected" => Ok(SwapStatus::Rejected),
            "cancelled" => Ok(SwapStatus::Cancelled),
            other => Err(format!("unknown swap status: {other}")),
        }
    }
}

/// Broadcast priority level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Info,
    Warning,
    Error,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Info => "info",
            Priority::Warning => "warning",
            Priority::Error => "error",
        }
    }

    /// Capitalized label used in push notification titles.
    pub fn label(&self) -> &'static str {
        match self {
            Priority::Info => "Info",
            Priority::Warning => "Warning",
            Priority::Error => "Error",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Priority::Info),
            "warning" => Ok(Priority::Warning),
            "error" => Ok(Priority::Error),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// Full user record. `password_hash` and `push_token` never serialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub location: Option<String>,
    pub photo_url: Option<String>,
    #[serde(skip_serializing)]
    pub photo_id: Option<String>,
    pub skills_offered: Vec<String>,
    pub skills_wanted: Vec<String>,
    pub availability: Vec<String>,
    pub profile_public: bool,
    pub role: Role,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub ban_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub push_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn skills_count(&self) -> usize {
        self.skills_offered.len() + self.skills_wanted.len()
    }

    /// Public directory projection: profile fields only, no email, no
    /// moderation state.
    pub fn to_public(&self) -> PublicProfile {
        PublicProfile {
            id: self.id,
            name: self.name.clone(),
            location: self.location.clone(),
            photo_url: self.photo_url.clone(),
            skills_offered: self.skills_offered.clone(),
            skills_wanted: self.skills_wanted.clone(),
            availability: self.availability.clone(),
            skills_count: self.skills_count(),
            created_at: self.created_at,
        }
    }
}

/// Projection of a [`User`] safe to show in the public directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub photo_url: Option<String>,
    pub skills_offered: Vec<String>,
    pub skills_wanted: Vec<String>,
    pub availability: Vec<String>,
    pub skills_count: usize,
    pub created_at: DateTime<Utc>,
}

/// A directional skill-exchange proposal between two users.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Swap {
    pub id: Uuid,
    pub from_user: Uuid,
    pub to_user: Uuid,
    pub offered_skill: String,
    pub requested_skill: String,
    pub message: Option<String>,
    pub status: SwapStatus,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Swap {
    pub fn is_participant(&self, user: Uuid) -> bool {
        self.from_user == user || self.to_user == user
    }

    /// The other party of the swap, from `user`'s point of view.
    pub fn counterparty(&self, user: Uuid) -> Uuid {
        if self.from_user == user {
            self.to_user
        } else {
            self.from_user
        }
    }

    /// Set the status and stamp the matching terminal timestamp. Timestamps
    /// from earlier transitions are kept, so an admin-reopened swap retains
    /// its history.
    pub fn enter_status(&mut self, status: SwapStatus, at: DateTime<Utc>) {
        self.status = status;
        match status {
            SwapStatus::Accepted => self.accepted_at = Some(at),
            SwapStatus::Rejected => self.rejected_at = Some(at),
            SwapStatus::Cancelled => self.cancelled_at = Some(at),
            SwapStatus::Pending => {}
        }
    }
}

/// Post-swap rating left by one participant for the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: Uuid,
    pub swap_id: Uuid,
    pub from_user: Uuid,
    pub to_user: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Platform-wide admin broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalNotice {
    pub id: Uuid,
    pub message: String,
    pub priority: Priority,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub sent_by: Uuid,
    pub push_sent: bool,
    pub push_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Per-skill usage counts across all users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillCount {
    pub skill: String,
    pub offered_count: u64,
    pub wanted_count: u64,
}

impl SkillCount {
    pub fn total(&self) -> u64 {
        self.offered_count + self.wanted_count
    }
}

/// Normalize a skills/availability list to the canonical shape: entries are
/// split on commas (legacy records joined terms into one string), trimmed,
/// and empties dropped.
pub fn normalize_terms<I, S>(terms: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    terms
        .into_iter()
        .flat_map(|t| {
            t.as_ref()
                .split(',')
                .map(|s| s.trim().to_string())
                .collect::<Vec<_>>()
        })
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_splits_legacy_comma_joined_entries() {
        let terms = normalize_terms(["Guitar, Piano", " Python ", "", "  "]);
        assert_eq!(terms, vec!["Guitar", "Piano", "Python"]);
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in SwapStatus::ALL {
            assert_eq!(status.as_str().parse::<SwapStatus>(), Ok(status));
        }
        assert!("deleted".parse::<SwapStatus>().is_err());
    }

    #[test]
    fn pending_is_the_only_non_terminal_status() {
        assert!(!SwapStatus::Pending.is_terminal());
        assert!(SwapStatus::Accepted.is_terminal());
        assert!(SwapStatus::Rejected.is_terminal());
        assert!(SwapStatus::Cancelled.is_terminal());
    }

    #[test]
    fn entering_a_terminal_status_stamps_its_timestamp() {
        let now = Utc::now();
        let mut swap = Swap {
            id: Uuid::new_v4(),
            from_user: Uuid::new_v4(),
            to_user: Uuid::new_v4(),
            offered_skill: "Guitar".into(),
            requested_skill: "Python".into(),
            message: None,
            status: SwapStatus::Pending,
            created_at: now,
            accepted_at: None,
            rejected_at: None,
            cancelled_at: None,
        };

        swap.enter_status(SwapStatus::Accepted, now);
        assert_eq!(swap.status, SwapStatus::Accepted);
        assert_eq!(swap.accepted_at, Some(now));
        assert_eq!(swap.rejected_at, None);

        // Admin reopening keeps the old stamp.
        swap.enter_status(SwapStatus::Pending, now);
        assert_eq!(swap.status, SwapStatus::Pending);
        assert_eq!(swap.accepted_at, Some(now));
    }
}
