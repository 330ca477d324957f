//! In-memory [`Store`] for tests and local development.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Feedback, GlobalNotice, SkillCount, Swap, SwapStatus, User,
};
use crate::store::{
    page_bounds, NoticeQuery, Page, Store, StoreResult, SwapQuery, UserQuery,
};

/// In-memory Store. Cheap to clone; all clones share the same data.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    users: Arc<Mutex<HashMap<Uuid, User>>>,
    swaps: Arc<Mutex<HashMap<Uuid, Swap>>>,
    feedback: Arc<Mutex<HashMap<Uuid, Feedback>>>,
    notices: Arc<Mutex<HashMap<Uuid, GlobalNotice>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn paginate<T>(mut items: Vec<T>, page: u64, limit: u64) -> Page<T> {
    let total = items.len() as u64;
    let (skip, limit) = page_bounds(page, limit);
    let items = if skip >= total {
        Vec::new()
    } else {
        items.drain(skip as usize..).take(limit as usize).collect()
    };
    Page {
        items,
        page: page.max(1),
        limit,
        total,
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: User) -> StoreResult<User> {
        self.users.lock().unwrap().insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        self.users.lock().unwrap().insert(user.id, user.clone());
        Ok(())
    }

    async fn list_users(&self, query: &UserQuery) -> StoreResult<Page<User>> {
        let mut users: Vec<User> = self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| !query.public_only || u.profile_public)
            .filter(|u| query.role.map_or(true, |r| u.role == r))
            .filter(|u| query.is_banned.map_or(true, |b| u.is_banned == b))
            .filter(|u| {
                let Some(ref term) = query.search else {
                    return true;
                };
                contains_ci(&u.name, term)
                    || (!query.public_only && contains_ci(&u.email, term))
                    || u.location.as_deref().is_some_and(|l| contains_ci(l, term))
                    || u.skills_offered.iter().any(|s| contains_ci(s, term))
                    || u.skills_wanted.iter().any(|s| contains_ci(s, term))
            })
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(users, query.page, query.limit))
    }

    async fn all_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.users.lock().unwrap().values().cloned().collect())
    }

    async fn users_with_push_tokens(&self) -> StoreResult<Vec<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| u.push_token.is_some())
            .cloned()
            .collect())
    }

    async fn remove_skill_everywhere(&self, skill: &str) -> StoreResult<u64> {
        let mut affected = 0;
        for user in self.users.lock().unwrap().values_mut() {
            let before = user.skills_count();
            user.skills_offered.retain(|s| s != skill);
            user.skills_wanted.retain(|s| s != skill);
            if user.skills_count() != before {
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn skill_counts(&self, search: Option<&str>) -> StoreResult<Vec<SkillCount>> {
        let mut counts: HashMap<String, SkillCount> = HashMap::new();
        for user in self.users.lock().unwrap().values() {
            for skill in &user.skills_offered {
                counts
                    .entry(skill.clone())
                    .or_insert_with(|| SkillCount {
                        skill: skill.clone(),
                        offered_count: 0,
                        wanted_count: 0,
                    })
                    .offered_count += 1;
            }
            for skill in &user.skills_wanted {
                counts
                    .entry(skill.clone())
                    .or_insert_with(|| SkillCount {
                        skill: skill.clone(),
                        offered_count: 0,
                        wanted_count: 0,
                    })
                    .wanted_count += 1;
            }
        }
        let mut counts: Vec<SkillCount> = counts
            .into_values()
            .filter(|c| search.map_or(true, |term| contains_ci(&c.skill, term)))
            .collect();
        counts.sort_by(|a, b| b.total().cmp(&a.total()).then(a.skill.cmp(&b.skill)));
        Ok(counts)
    }

    async fn insert_swap(&self, swap: Swap) -> StoreResult<Swap> {
        self.swaps.lock().unwrap().insert(swap.id, swap.clone());
        Ok(swap)
    }

    async fn swap_by_id(&self, id: Uuid) -> StoreResult<Option<Swap>> {
        Ok(self.swaps.lock().unwrap().get(&id).cloned())
    }

    async fn update_swap(&self, swap: &Swap) -> StoreResult<()> {
        self.swaps.lock().unwrap().insert(swap.id, swap.clone());
        Ok(())
    }

    async fn swaps_for_user(&self, user: Uuid) -> StoreResult<Vec<Swap>> {
        let mut swaps: Vec<Swap> = self
            .swaps
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.is_participant(user))
            .cloned()
            .collect();
        swaps.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(swaps)
    }

    async fn list_swaps(&self, query: &SwapQuery) -> StoreResult<Page<Swap>> {
        let mut swaps: Vec<Swap> = self
            .swaps
            .lock()
            .unwrap()
            .values()
            .filter(|s| query.status.map_or(true, |st| s.status == st))
            .filter(|s| {
                query.skill.as_deref().map_or(true, |term| {
                    contains_ci(&s.offered_skill, term)
                        || contains_ci(&s.requested_skill, term)
                })
            })
            .filter(|s| query.created_after.map_or(true, |t| s.created_at >= t))
            .filter(|s| query.created_before.map_or(true, |t| s.created_at <= t))
            .cloned()
            .collect();
        swaps.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(swaps, query.page, query.limit))
    }

    async fn all_swaps(&self) -> StoreResult<Vec<Swap>> {
        Ok(self.swaps.lock().unwrap().values().cloned().collect())
    }

    async fn pending_swap_exists(&self, from: Uuid, to: Uuid) -> StoreResult<bool> {
        Ok(self.swaps.lock().unwrap().values().any(|s| {
            s.from_user == from && s.to_user == to && s.status == SwapStatus::Pending
        }))
    }

    async fn swap_status_counts(&self) -> StoreResult<Vec<(SwapStatus, u64)>> {
        let swaps = self.swaps.lock().unwrap();
        Ok(SwapStatus::ALL
            .iter()
            .map(|&status| {
                let count = swaps.values().filter(|s| s.status == status).count();
                (status, count as u64)
            })
            .collect())
    }

    async fn insert_feedback(&self, feedback: Feedback) -> StoreResult<Feedback> {
        self.feedback
            .lock()
            .unwrap()
            .insert(feedback.id, feedback.clone());
        Ok(feedback)
    }

    async fn feedback_for(&self, recipient: Uuid) -> StoreResult<Vec<Feedback>> {
        let mut entries: Vec<Feedback> = self
            .feedback
            .lock()
            .unwrap()
            .values()
            .filter(|f| f.to_user == recipient)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn feedback_exists(&self, swap_id: Uuid, author: Uuid) -> StoreResult<bool> {
        Ok(self
            .feedback
            .lock()
            .unwrap()
            .values()
            .any(|f| f.swap_id == swap_id && f.from_user == author))
    }

    async fn insert_notice(&self, notice: GlobalNotice) -> StoreResult<GlobalNotice> {
        self.notices
            .lock()
            .unwrap()
            .insert(notice.id, notice.clone());
        Ok(notice)
    }

    async fn update_notice(&self, notice: &GlobalNotice) -> StoreResult<()> {
        self.notices
            .lock()
            .unwrap()
            .insert(notice.id, notice.clone());
        Ok(())
    }

    async fn list_notices(&self, query: &NoticeQuery) -> StoreResult<Page<GlobalNotice>> {
        let mut notices: Vec<GlobalNotice> = self
            .notices
            .lock()
            .unwrap()
            .values()
            .filter(|n| query.is_active.map_or(true, |a| n.is_active == a))
            .cloned()
            .collect();
        notices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(notices, query.page, query.limit))
    }

    async fn active_notice_count(&self) -> StoreResult<u64> {
        Ok(self
            .notices
            .lock()
            .unwrap()
            .values()
            .filter(|n| n.is_active)
            .count() as u64)
    }

    async fn clear_all(&self) -> StoreResult<()> {
        self.users.lock().unwrap().clear();
        self.swaps.lock().unwrap().clear();
        self.feedback.lock().unwrap().clear();
        self.notices.lock().unwrap().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::Role;

    fn user(name: &str, offered: &[&str], wanted: &[&str]) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            password_hash: "x".into(),
            location: None,
            photo_url: None,
            photo_id: None,
            skills_offered: offered.iter().map(|s| s.to_string()).collect(),
            skills_wanted: wanted.iter().map(|s| s.to_string()).collect(),
            availability: vec!["Weekends".into()],
            profile_public: true,
            role: Role::User,
            is_banned: false,
            ban_reason: None,
            ban_until: None,
            push_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn remove_skill_everywhere_leaves_no_references() {
        let store = MemoryStore::new();
        store
            .insert_user(user("Alice", &["Guitar", "Piano"], &["Python"]))
            .await
            .unwrap();
        store
            .insert_user(user("Bob", &["Python"], &["Guitar"]))
            .await
            .unwrap();
        store.insert_user(user("Cara", &["Welding"], &[])).await.unwrap();

        let affected = store.remove_skill_everywhere("Guitar").await.unwrap();
        assert_eq!(affected, 2);

        for u in store.all_users().await.unwrap() {
            assert!(!u.skills_offered.iter().any(|s| s == "Guitar"));
            assert!(!u.skills_wanted.iter().any(|s| s == "Guitar"));
        }
        let counts = store.skill_counts(None).await.unwrap();
        assert!(counts.iter().all(|c| c.skill != "Guitar"));
    }

    #[tokio::test]
    async fn skill_counts_aggregate_offered_and_wanted() {
        let store = MemoryStore::new();
        store
            .insert_user(user("Alice", &["Guitar"], &["Python"]))
            .await
            .unwrap();
        store
            .insert_user(user("Bob", &["Python"], &["Guitar"]))
            .await
            .unwrap();

        let counts = store.skill_counts(None).await.unwrap();
        let guitar = counts.iter().find(|c| c.skill == "Guitar").unwrap();
        assert_eq!(guitar.offered_count, 1);
        assert_eq!(guitar.wanted_count, 1);
        assert_eq!(guitar.total(), 2);

        let filtered = store.skill_counts(Some("py")).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].skill, "Python");
    }

    #[tokio::test]
    async fn list_users_filters_and_paginates() {
        let store = MemoryStore::new();
        for i in 0..5 {
            let mut u = user(&format!("User{i}"), &[], &[]);
            u.profile_public = i % 2 == 0;
            store.insert_user(u).await.unwrap();
        }

        let q = UserQuery {
            public_only: true,
            page: 1,
            limit: 2,
            ..Default::default()
        };
        let page = store.list_users(&q).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.pages(), 2);
    }

    #[tokio::test]
    async fn pending_pair_lookup_is_directional() {
        let store = MemoryStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let now = Utc::now();
        store
            .insert_swap(Swap {
                id: Uuid::new_v4(),
                from_user: a,
                to_user: b,
                offered_skill: "Guitar".into(),
                requested_skill: "Python".into(),
                message: None,
                status: SwapStatus::Pending,
                created_at: now,
                accepted_at: None,
                rejected_at: None,
                cancelled_at: None,
            })
            .await
            .unwrap();

        assert!(store.pending_swap_exists(a, b).await.unwrap());
        assert!(!store.pending_swap_exists(b, a).await.unwrap());
    }

    #[tokio::test]
    async fn status_counts_cover_every_status_even_at_zero() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .insert_swap(Swap {
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
            })
            .await
            .unwrap();

        let counts = store.swap_status_counts().await.unwrap();
        assert_eq!(counts.len(), SwapStatus::ALL.len());
        for status in SwapStatus::ALL {
            let (_, n) = counts.iter().find(|(s, _)| *s == status).unwrap();
            let expected = if status == SwapStatus::Pending { 1 } else { 0 };
            assert_eq!(*n, expected);
        }
    }
}
