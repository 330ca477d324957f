//! Post-swap feedback.
//!
//! Feedback is only accepted once a swap has reached a terminal state, from a
//! participant, about the other participant, at most once per author per swap.

use chrono::Utc;
use serde::Deserialize;
use store::{Feedback, Store, User};
use uuid::Uuid;

use crate::accounts::ensure_active;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFeedback {
    pub swap_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
}

pub async fn submit(store: &dyn Store, author: &User, input: SubmitFeedback) -> ApiResult<Feedback> {
    ensure_active(author)?;

    if !(1..=5).contains(&input.rating) {
        return Err(ApiError::validation("Rating must be between 1 and 5"));
    }
    let Some(swap) = store.swap_by_id(input.swap_id).await? else {
        return Err(ApiError::not_found("Swap not found"));
    };
    if !swap.is_participant(author.id) {
        return Err(ApiError::forbidden("Not a participant of this swap"));
    }
    if !swap.status.is_terminal() {
        return Err(ApiError::conflict("Swap is still pending"));
    }
    if store.feedback_exists(swap.id, author.id).await? {
        return Err(ApiError::conflict(
            "Feedback for this swap has already been submitted",
        ));
    }

    let recipient = swap.counterparty(author.id);

    let feedback = Feedback {
        id: Uuid::new_v4(),
        swap_id: swap.id,
        from_user: author.id,
        to_user: recipient,
        rating: input.rating,
        comment: input.comment.filter(|c| !c.trim().is_empty()),
        created_at: Utc::now(),
    };
    Ok(store.insert_feedback(feedback).await?)
}

/// Feedback received by a user, newest first.
pub async fn received_by(store: &dyn Store, recipient: Uuid) -> ApiResult<Vec<Feedback>> {
    Ok(store.feedback_for(recipient).await?)
}
