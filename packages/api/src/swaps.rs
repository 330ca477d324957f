//! # Swap request ledger
//!
//! A swap is a directional proposal: `from_user` offers `offered_skill` and
//! asks `to_user` for `requested_skill`. The lifecycle is a four-state
//! machine — `pending` is the only non-terminal state, and self-service
//! transitions may only move `pending` to `accepted`, `rejected`, or
//! `cancelled`.
//!
//! [`admin_override`] is the deliberate escape hatch: any status is reachable
//! from any status. It can produce semantically odd histories (an accepted
//! swap reopened to pending keeps its `acceptedAt` stamp), so every override
//! is logged with actor, reason, and before/after state.
//!
//! Status changes are followed by a best-effort notification to both parties;
//! delivery failure never rolls back or fails the transition.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use store::{Page, Store, Swap, SwapQuery, SwapStatus, User};
use tracing::warn;
use uuid::Uuid;

use crate::accounts::ensure_active;
use crate::error::{ApiError, ApiResult};
use crate::notify::Dispatcher;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSwap {
    pub to_user: Uuid,
    pub offered_skill: String,
    pub requested_skill: String,
    pub message: Option<String>,
}

/// A swap joined with both parties' display fields, for listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapView {
    #[serde(flatten)]
    pub swap: Swap,
    pub from: Participant,
    pub to: Participant,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

fn participant(users: &HashMap<Uuid, User>, id: Uuid) -> Participant {
    match users.get(&id) {
        Some(u) => Participant {
            id,
            name: u.name.clone(),
            email: u.email.clone(),
        },
        // Users are never hard-deleted, but a listing should not 500 on a
        // dangling reference either.
        None => Participant {
            id,
            name: "Unknown".into(),
            email: String::new(),
        },
    }
}

/// Join each swap with its parties' name and email.
pub async fn attach_parties(store: &dyn Store, swaps: Vec<Swap>) -> ApiResult<Vec<SwapView>> {
    let mut users: HashMap<Uuid, User> = HashMap::new();
    for swap in &swaps {
        for id in [swap.from_user, swap.to_user] {
            if !users.contains_key(&id) {
                if let Some(user) = store.user_by_id(id).await? {
                    users.insert(id, user);
                }
            }
        }
    }
    Ok(swaps
        .into_iter()
        .map(|swap| SwapView {
            from: participant(&users, swap.from_user),
            to: participant(&users, swap.to_user),
            swap,
        })
        .collect())
}

/// Create a pending swap from `from` to the named recipient.
pub async fn create(store: &dyn Store, from: &User, input: CreateSwap) -> ApiResult<Swap> {
    ensure_active(from)?;

    if input.to_user == from.id {
        return Err(ApiError::validation("Cannot request a swap with yourself"));
    }
    let offered = input.offered_skill.trim().to_string();
    let requested = input.requested_skill.trim().to_string();
    if offered.is_empty() || requested.is_empty() {
        return Err(ApiError::validation(
            "Offered and requested skills are required",
        ));
    }
    // offered_skill is a data-entry field: it is deliberately not checked
    // against the proposer's skill list.

    if store.user_by_id(input.to_user).await?.is_none() {
        return Err(ApiError::not_found("Recipient not found"));
    }
    if store.pending_swap_exists(from.id, input.to_user).await? {
        return Err(ApiError::conflict(
            "A pending swap with this user already exists",
        ));
    }

    let swap = Swap {
        id: Uuid::new_v4(),
        from_user: from.id,
        to_user: input.to_user,
        offered_skill: offered,
        requested_skill: requested,
        message: input.message.filter(|m| !m.trim().is_empty()),
        status: SwapStatus::Pending,
        created_at: Utc::now(),
        accepted_at: None,
        rejected_at: None,
        cancelled_at: None,
    };
    Ok(store.insert_swap(swap).await?)
}

/// Swaps the user participates in, newest first, with parties attached.
/// An optional status narrows the history to that state.
pub async fn list_for(
    store: &dyn Store,
    user: &User,
    status: Option<SwapStatus>,
) -> ApiResult<Vec<SwapView>> {
    let mut swaps = store.swaps_for_user(user.id).await?;
    if let Some(status) = status {
        swaps.retain(|s| s.status == status);
    }
    attach_parties(store, swaps).await
}

/// Self-service transition by a participant: `pending` to a terminal state.
pub async fn transition(
    store: &dyn Store,
    dispatcher: &Dispatcher,
    swap_id: Uuid,
    acting: &User,
    new_status: SwapStatus,
) -> ApiResult<Swap> {
    ensure_active(acting)?;

    if new_status == SwapStatus::Pending {
        return Err(ApiError::validation(
            "A swap cannot be moved back to pending",
        ));
    }
    let Some(mut swap) = store.swap_by_id(swap_id).await? else {
        return Err(ApiError::not_found("Swap not found"));
    };
    if !swap.is_participant(acting.id) {
        return Err(ApiError::forbidden("Not a participant of this swap"));
    }
    if swap.status.is_terminal() {
        return Err(ApiError::conflict(format!(
            "Swap is already {}",
            swap.status
        )));
    }

    swap.enter_status(new_status, Utc::now());
    store.update_swap(&swap).await?;

    notify_parties(store, dispatcher, &swap, new_status, None).await;
    Ok(swap)
}

/// Admin escape hatch: any status to any status. Audited, never silent.
pub async fn admin_override(
    store: &dyn Store,
    dispatcher: &Dispatcher,
    admin: &User,
    swap_id: Uuid,
    new_status: SwapStatus,
    reason: Option<String>,
) -> ApiResult<Swap> {
    let Some(mut swap) = store.swap_by_id(swap_id).await? else {
        return Err(ApiError::not_found("Swap not found"));
    };

    let previous = swap.status;
    swap.enter_status(new_status, Utc::now());
    store.update_swap(&swap).await?;

    warn!(
        swap = %swap.id,
        actor = %admin.id,
        from = %previous,
        to = %new_status,
        reason = reason.as_deref().unwrap_or(""),
        "admin forced a swap transition"
    );

    notify_parties(store, dispatcher, &swap, new_status, reason.as_deref()).await;
    Ok(swap)
}

/// Filtered, paginated admin listing with a per-status summary.
pub async fn admin_list(
    store: &dyn Store,
    query: &SwapQuery,
) -> ApiResult<(Page<SwapView>, Vec<(SwapStatus, u64)>)> {
    let page = store.list_swaps(query).await?;
    let summary = store.swap_status_counts().await?;
    let views = attach_parties(store, page.items).await?;
    Ok((
        Page {
            items: views,
            page: page.page,
            limit: page.limit,
            total: page.total,
        },
        summary,
    ))
}

/// Best-effort notification to both parties of a status change.
/// Fire-and-forget: nothing here can fail the transition that triggered it.
async fn notify_parties(
    store: &dyn Store,
    dispatcher: &Dispatcher,
    swap: &Swap,
    status: SwapStatus,
    admin_reason: Option<&str>,
) {
    let suffix = admin_reason
        .map(|r| format!(" (Admin: {r})"))
        .unwrap_or_default();
    let data = json!({ "type": "swap_status", "swapId": swap.id.to_string() });

    for (user_id, body) in [
        (
            swap.from_user,
            format!("Your swap request has been {status}{suffix}"),
        ),
        (
            swap.to_user,
            format!("A swap request has been {status}{suffix}"),
        ),
    ] {
        match store.user_by_id(user_id).await {
            Ok(Some(user)) => dispatcher.notify_detached(
                user,
                "Swap Status Updated".to_string(),
                body,
                data.clone(),
            ),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "skipping notification: party lookup failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use store::MemoryStore;

    use super::*;
    use crate::accounts::{register, RegisterInput};
    use crate::notify::RecordingProvider;

    async fn setup() -> (MemoryStore, Dispatcher, RecordingProvider, User, User) {
        let store = MemoryStore::new();
        let provider = RecordingProvider::new();
        let dispatcher = Dispatcher::new(Arc::new(provider.clone()));
        let mut a = register(
            &store,
            RegisterInput {
                name: "Alice".into(),
                email: "alice@example.com".into(),
                password: "hunter2hunter2".into(),
            },
        )
        .await
        .unwrap();
        let mut b = register(
            &store,
            RegisterInput {
                name: "Bob".into(),
                email: "bob@example.com".into(),
                password: "hunter2hunter2".into(),
            },
        )
        .await
        .unwrap();
        a.skills_offered = vec!["Guitar".into()];
        a.push_token = Some("tok-a".into());
        store.update_user(&a).await.unwrap();
        b.push_token = Some("tok-b".into());
        store.update_user(&b).await.unwrap();
        (store, dispatcher, provider, a, b)
    }

    fn guitar_for_python(to: Uuid) -> CreateSwap {
        CreateSwap {
            to_user: to,
            offered_skill: "Guitar".into(),
            requested_skill: "Python".into(),
            message: None,
        }
    }

    #[tokio::test]
    async fn self_swap_is_rejected() {
        let (store, _, _, a, _) = setup().await;
        let err = create(&store, &a, guitar_for_python(a.id)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn accept_stamps_timestamp_and_notifies_both_parties() {
        let (store, dispatcher, provider, a, b) = setup().await;
        let swap = create(&store, &a, guitar_for_python(b.id)).await.unwrap();
        assert_eq!(swap.status, SwapStatus::Pending);

        let swap = transition(&store, &dispatcher, swap.id, &b, SwapStatus::Accepted)
            .await
            .unwrap();
        assert_eq!(swap.status, SwapStatus::Accepted);
        assert!(swap.accepted_at.is_some());

        // Dispatch is detached; let the spawned tasks run.
        for _ in 0..100 {
            if provider.sent().len() >= 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        let targets: Vec<String> = provider.sent().into_iter().map(|m| m.target).collect();
        assert!(targets.contains(&"tok-a".to_string()));
        assert!(targets.contains(&"tok-b".to_string()));
    }

    #[tokio::test]
    async fn transition_succeeds_even_when_every_delivery_fails() {
        let (store, _, _, a, b) = setup().await;
        let failing = RecordingProvider::failing();
        let dispatcher = Dispatcher::new(Arc::new(failing.clone()));

        let swap = create(&store, &a, guitar_for_python(b.id)).await.unwrap();
        let swap = transition(&store, &dispatcher, swap.id, &a, SwapStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(swap.status, SwapStatus::Cancelled);
        assert!(swap.cancelled_at.is_some());
    }

    #[tokio::test]
    async fn non_participants_cannot_transition() {
        let (store, dispatcher, _, a, b) = setup().await;
        let outsider = register(
            &store,
            RegisterInput {
                name: "Mallory".into(),
                email: "mallory@example.com".into(),
                password: "hunter2hunter2".into(),
            },
        )
        .await
        .unwrap();

        let swap = create(&store, &a, guitar_for_python(b.id)).await.unwrap();
        let err = transition(&store, &dispatcher, swap.id, &outsider, SwapStatus::Accepted)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn terminal_swaps_reject_further_self_service_transitions() {
        let (store, dispatcher, _, a, b) = setup().await;
        let swap = create(&store, &a, guitar_for_python(b.id)).await.unwrap();
        transition(&store, &dispatcher, swap.id, &b, SwapStatus::Rejected)
            .await
            .unwrap();

        let err = transition(&store, &dispatcher, swap.id, &a, SwapStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn duplicate_pending_pair_is_a_conflict() {
        let (store, dispatcher, _, a, b) = setup().await;
        let first = create(&store, &a, guitar_for_python(b.id)).await.unwrap();
        let err = create(&store, &a, guitar_for_python(b.id)).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        // Once the first is resolved, a new proposal is allowed again.
        transition(&store, &dispatcher, first.id, &b, SwapStatus::Rejected)
            .await
            .unwrap();
        assert!(create(&store, &a, guitar_for_python(b.id)).await.is_ok());
    }

    #[tokio::test]
    async fn admin_override_reaches_any_state_from_any_state() {
        let (store, dispatcher, _, a, b) = setup().await;
        let admin = {
            let mut u = register(
                &store,
                RegisterInput {
                    name: "Root".into(),
                    email: "root@example.com".into(),
                    password: "hunter2hunter2".into(),
                },
            )
            .await
            .unwrap();
            u.role = store::Role::Admin;
            store.update_user(&u).await.unwrap();
            u
        };

        let swap = create(&store, &a, guitar_for_python(b.id)).await.unwrap();
        let swap = transition(&store, &dispatcher, swap.id, &b, SwapStatus::Accepted)
            .await
            .unwrap();

        // accepted -> pending: only the escape hatch can do this.
        let swap = admin_override(
            &store,
            &dispatcher,
            &admin,
            swap.id,
            SwapStatus::Pending,
            Some("dispute under review".into()),
        )
        .await
        .unwrap();
        assert_eq!(swap.status, SwapStatus::Pending);
        // History stays: the earlier acceptance stamp is not erased.
        assert!(swap.accepted_at.is_some());
    }

    #[tokio::test]
    async fn banned_users_cannot_create_or_transition() {
        let (store, dispatcher, _, mut a, b) = setup().await;
        let swap = create(&store, &a, guitar_for_python(b.id)).await.unwrap();

        a.is_banned = true;
        store.update_user(&a).await.unwrap();

        let err = create(&store, &a, guitar_for_python(b.id)).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        let err = transition(&store, &dispatcher, swap.id, &a, SwapStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn admin_listing_filters_by_status_and_skill() {
        let (store, dispatcher, _, a, b) = setup().await;
        let s1 = create(&store, &a, guitar_for_python(b.id)).await.unwrap();
        transition(&store, &dispatcher, s1.id, &b, SwapStatus::Accepted)
            .await
            .unwrap();
        create(
            &store,
            &b,
            CreateSwap {
                to_user: a.id,
                offered_skill: "Welding".into(),
                requested_skill: "Guitar".into(),
                message: None,
            },
        )
        .await
        .unwrap();

        let (page, summary) = admin_list(
            &store,
            &SwapQuery {
                status: Some(SwapStatus::Accepted),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].from.name, "Alice");
        let accepted = summary
            .iter()
            .find(|(s, _)| *s == SwapStatus::Accepted)
            .unwrap();
        assert_eq!(accepted.1, 1);

        let (page, _) = admin_list(
            &store,
            &SwapQuery {
                skill: Some("weld".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].swap.offered_skill, "Welding");
    }

    #[tokio::test]
    async fn own_history_narrows_by_status() {
        let (store, dispatcher, _, a, b) = setup().await;
        let s1 = create(&store, &a, guitar_for_python(b.id)).await.unwrap();
        transition(&store, &dispatcher, s1.id, &b, SwapStatus::Accepted)
            .await
            .unwrap();
        create(
            &store,
            &b,
            CreateSwap {
                to_user: a.id,
                offered_skill: "Welding".into(),
                requested_skill: "Guitar".into(),
                message: None,
            },
        )
        .await
        .unwrap();

        let all = list_for(&store, &a, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let pending = list_for(&store, &a, Some(SwapStatus::Pending)).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].swap.offered_skill, "Welding");

        let cancelled = list_for(&store, &a, Some(SwapStatus::Cancelled)).await.unwrap();
        assert!(cancelled.is_empty());
    }
}
