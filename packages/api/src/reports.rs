//! Admin report generation.
//!
//! Reports are assembled as a header row plus string rows, then rendered as
//! JSON (array of objects keyed by the headers) or CSV. Keeping the tabular
//! form in the middle means both formats come from the same data.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use store::Store;
use uuid::Uuid;

use crate::error::ApiResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Users,
    Swaps,
    Skills,
    Summary,
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "users" => Ok(ReportKind::Users),
            "swaps" => Ok(ReportKind::Swaps),
            "skills" => Ok(ReportKind::Skills),
            "summary" => Ok(ReportKind::Summary),
            other => Err(format!("unknown report type: {other}")),
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReportKind::Users => "users",
            ReportKind::Swaps => "swaps",
            ReportKind::Skills => "skills",
            ReportKind::Summary => "summary",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Json,
    Csv,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ReportFormat::Json),
            "csv" => Ok(ReportFormat::Csv),
            other => Err(format!("unknown report format: {other}")),
        }
    }
}

/// A rendered-format-agnostic report table.
#[derive(Debug, Clone)]
pub struct Report {
    pub kind: ReportKind,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

impl Report {
    /// Array of objects, one per row, keyed by the headers.
    pub fn to_json(&self) -> Value {
        let rows: Vec<Value> = self
            .rows
            .iter()
            .map(|row| {
                let mut obj = serde_json::Map::new();
                for (header, cell) in self.headers.iter().zip(row) {
                    obj.insert((*header).to_string(), Value::String(cell.clone()));
                }
                Value::Object(obj)
            })
            .collect();
        json!({
            "report": self.kind.to_string(),
            "count": self.rows.len(),
            "rows": rows,
        })
    }

    /// CSV with a header row. Every field is quoted, embedded quotes doubled.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        write_csv_row(&mut out, self.headers.iter().map(|h| (*h).to_string()));
        for row in &self.rows {
            write_csv_row(&mut out, row.iter().cloned());
        }
        out
    }
}

fn write_csv_row(out: &mut String, fields: impl Iterator<Item = String>) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        first = false;
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    }
    out.push('\n');
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn list(values: &[String]) -> String {
    values.join(", ")
}

fn stamp(value: &Option<DateTime<Utc>>) -> String {
    value.map(|t| t.to_rfc3339()).unwrap_or_default()
}

/// Build the requested report from live data.
pub async fn generate(store: &dyn Store, kind: ReportKind) -> ApiResult<Report> {
    let report = match kind {
        ReportKind::Users => {
            let users = store.all_users().await?;
            Report {
                kind,
                headers: vec![
                    "id",
                    "name",
                    "email",
                    "location",
                    "skillsOffered",
                    "skillsWanted",
                    "skillsCount",
                    "role",
                    "isBanned",
                    "banReason",
                    "createdAt",
                ],
                rows: users
                    .iter()
                    .map(|u| {
                        vec![
                            u.id.to_string(),
                            u.name.clone(),
                            u.email.clone(),
                            opt(&u.location),
                            list(&u.skills_offered),
                            list(&u.skills_wanted),
                            u.skills_count().to_string(),
                            u.role.as_str().to_string(),
                            u.is_banned.to_string(),
                            opt(&u.ban_reason),
                            u.created_at.to_rfc3339(),
                        ]
                    })
                    .collect(),
            }
        }
        ReportKind::Swaps => {
            let swaps = store.all_swaps().await?;
            let users: HashMap<Uuid, store::User> = store
                .all_users()
                .await?
                .into_iter()
                .map(|u| (u.id, u))
                .collect();
            let name_of = |id: Uuid| users.get(&id).map(|u| u.name.clone()).unwrap_or_default();
            let email_of = |id: Uuid| users.get(&id).map(|u| u.email.clone()).unwrap_or_default();
            Report {
                kind,
                headers: vec![
                    "id",
                    "fromUserName",
                    "fromUserEmail",
                    "toUserName",
                    "toUserEmail",
                    "offeredSkill",
                    "requestedSkill",
                    "status",
                    "createdAt",
                    "acceptedAt",
                    "rejectedAt",
                    "cancelledAt",
                ],
                rows: swaps
                    .iter()
                    .map(|s| {
                        vec![
                            s.id.to_string(),
                            name_of(s.from_user),
                            email_of(s.from_user),
                            name_of(s.to_user),
                            email_of(s.to_user),
                            s.offered_skill.clone(),
                            s.requested_skill.clone(),
                            s.status.to_string(),
                            s.created_at.to_rfc3339(),
                            stamp(&s.accepted_at),
                            stamp(&s.rejected_at),
                            stamp(&s.cancelled_at),
                        ]
                    })
                    .collect(),
            }
        }
        ReportKind::Skills => {
            let counts = store.skill_counts(None).await?;
            Report {
                kind,
                headers: vec!["skill", "offeredCount", "wantedCount", "totalCount"],
                rows: counts
                    .iter()
                    .map(|c| {
                        vec![
                            c.skill.clone(),
                            c.offered_count.to_string(),
                            c.wanted_count.to_string(),
                            c.total().to_string(),
                        ]
                    })
                    .collect(),
            }
        }
        ReportKind::Summary => summary(store).await?,
    };
    Ok(report)
}

async fn summary(store: &dyn Store) -> ApiResult<Report> {
    let users = store.all_users().await?;
    let total_users = users.len();
    let banned = users.iter().filter(|u| u.is_banned).count();
    let public = users.iter().filter(|u| u.profile_public).count();

    let status_counts = store.swap_status_counts().await?;
    let total_swaps: u64 = status_counts.iter().map(|(_, n)| n).sum();
    let skills = store.skill_counts(None).await?;
    let notices = store.active_notice_count().await?;

    let mut rows = vec![
        row("totalUsers", total_users, "Registered accounts"),
        row("activeUsers", total_users - banned, "Accounts not suspended"),
        row("bannedUsers", banned, "Accounts currently suspended"),
        row("publicProfiles", public, "Profiles visible in the directory"),
        row("totalSwaps", total_swaps as usize, "Swap requests ever created"),
    ];
    for (status, count) in &status_counts {
        rows.push(vec![
            format!("swaps{}", capitalize(status.as_str())),
            count.to_string(),
            format!("Swap requests currently {status}"),
        ]);
    }
    rows.push(row(
        "distinctSkills",
        skills.len(),
        "Distinct skills offered or wanted",
    ));
    // skill_counts is sorted by total desc, so the first entry is the top skill.
    rows.push(vec![
        "topSkill".to_string(),
        skills.first().map(|c| c.skill.clone()).unwrap_or_default(),
        "Most listed skill across offered and wanted".to_string(),
    ]);
    rows.push(row("activeNotices", notices as usize, "Active global notices"));

    Ok(Report {
        kind: ReportKind::Summary,
        headers: vec!["metric", "value", "description"],
        rows,
    })
}

fn row(metric: &str, value: usize, description: &str) -> Vec<String> {
    vec![metric.to_string(), value.to_string(), description.to_string()]
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use store::{MemoryStore, SwapStatus};

    use super::*;
    use crate::accounts::{register, RegisterInput, ProfileUpdate};
    use crate::swaps::{self, CreateSwap};

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let a = register(
            &store,
            RegisterInput {
                name: "Alice".into(),
                email: "alice@example.com".into(),
                password: "hunter2hunter2".into(),
            },
        )
        .await
        .unwrap();
        let b = register(
            &store,
            RegisterInput {
                name: "Bob \"the Builder\"".into(),
                email: "bob@example.com".into(),
                password: "hunter2hunter2".into(),
            },
        )
        .await
        .unwrap();
        crate::accounts::update_profile(
            &store,
            &a,
            ProfileUpdate {
                skills_offered: Some(vec!["Guitar".into()]),
                skills_wanted: Some(vec!["Python".into()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        swaps::create(
            &store,
            &a,
            CreateSwap {
                to_user: b.id,
                offered_skill: "Guitar".into(),
                requested_skill: "Python".into(),
                message: None,
            },
        )
        .await
        .unwrap();
        store
    }

    #[tokio::test]
    async fn users_report_renders_both_formats() {
        let store = seeded().await;
        let report = generate(&store, ReportKind::Users).await.unwrap();
        assert_eq!(report.rows.len(), 2);

        let json = report.to_json();
        assert_eq!(json["count"], 2);
        assert_eq!(json["report"], "users");
        assert!(json["rows"][0]["email"].is_string());

        let csv = report.to_csv();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("\"id\",\"name\",\"email\""));
        // Embedded quotes are doubled per RFC 4180.
        assert!(csv.contains("\"Bob \"\"the Builder\"\"\""));
    }

    #[tokio::test]
    async fn swaps_report_joins_party_names() {
        let store = seeded().await;
        let report = generate(&store, ReportKind::Swaps).await.unwrap();
        assert_eq!(report.rows.len(), 1);
        let row = &report.rows[0];
        assert_eq!(row[1], "Alice");
        assert_eq!(row[2], "alice@example.com");
        assert_eq!(row[7], "pending");
        // No terminal timestamps yet.
        assert_eq!(row[9], "");
    }

    #[tokio::test]
    async fn skills_report_aggregates_counts() {
        let store = seeded().await;
        let report = generate(&store, ReportKind::Skills).await.unwrap();
        let guitar = report
            .rows
            .iter()
            .find(|r| r[0] == "Guitar")
            .expect("guitar row");
        assert_eq!(guitar[1], "1"); // offered
        assert_eq!(guitar[3], "1"); // total
    }

    #[tokio::test]
    async fn summary_includes_status_breakdown() {
        let store = seeded().await;
        let report = generate(&store, ReportKind::Summary).await.unwrap();
        let metric = |name: &str| {
            report
                .rows
                .iter()
                .find(|r| r[0] == name)
                .map(|r| r[1].clone())
        };
        assert_eq!(metric("totalUsers").as_deref(), Some("2"));
        assert_eq!(metric("totalSwaps").as_deref(), Some("1"));
        assert_eq!(
            metric(&format!("swaps{}", capitalize(SwapStatus::Pending.as_str()))).as_deref(),
            Some("1")
        );
    }

    #[test]
    fn kind_and_format_parse_from_query_strings() {
        assert_eq!("swaps".parse::<ReportKind>().unwrap(), ReportKind::Swaps);
        assert!("bogus".parse::<ReportKind>().is_err());
        assert_eq!("csv".parse::<ReportFormat>().unwrap(), ReportFormat::Csv);
        assert!("xml".parse::<ReportFormat>().is_err());
    }
}
