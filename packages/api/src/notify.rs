//! # Notification dispatcher — best-effort push
//!
//! A side channel, at-most-once and best-effort: a missing delivery token is
//! a silent no-op, a provider failure is logged and swallowed, and nothing in
//! here can fail the domain operation that triggered it. There is no retry,
//! no queue, and no ordering guarantee.
//!
//! [`PushProvider`] abstracts the wire so tests can record attempts instead
//! of talking to the real endpoint. [`FcmProvider`] posts FCM-style JSON;
//! [`RecordingProvider`] keeps everything in memory.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use store::User;
use tracing::{debug, warn};

/// Broadcast deliveries go to this topic; clients subscribe on login.
pub const BROADCAST_TOPIC: &str = "all";

/// A single delivery attempt as seen by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    /// Device token or `topic:<name>` for broadcasts.
    pub target: String,
    pub title: String,
    pub body: String,
    pub data: Value,
}

/// The push provider contract: deliver or report failure, never error.
#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn send(&self, token: &str, title: &str, body: &str, data: Value) -> bool;
    async fn send_topic(&self, topic: &str, title: &str, body: &str, data: Value) -> bool;
}

/// FCM-style HTTP provider.
pub struct FcmProvider {
    client: reqwest::Client,
    endpoint: String,
    server_key: String,
}

impl FcmProvider {
    pub fn new(endpoint: impl Into<String>, server_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            server_key: server_key.into(),
        }
    }

    async fn post(&self, payload: Value) -> bool {
        let result = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&payload)
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!(status = %response.status(), "push provider rejected delivery");
                false
            }
            Err(e) => {
                warn!(error = %e, "push provider unreachable");
                false
            }
        }
    }
}

#[async_trait]
impl PushProvider for FcmProvider {
    async fn send(&self, token: &str, title: &str, body: &str, data: Value) -> bool {
        self.post(json!({
            "token": token,
            "notification": { "title": title, "body": body },
            "data": data,
        }))
        .await
    }

    async fn send_topic(&self, topic: &str, title: &str, body: &str, data: Value) -> bool {
        self.post(json!({
            "to": format!("/topics/{topic}"),
            "notification": { "title": title, "body": body },
            "data": data,
        }))
        .await
    }
}

/// In-memory provider for tests and push-less deployments. Records every
/// attempt and answers with a configurable outcome.
#[derive(Clone, Default)]
pub struct RecordingProvider {
    sent: Arc<Mutex<Vec<PushMessage>>>,
    fail: bool,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose every delivery fails, for testing the swallow path.
    pub fn failing() -> Self {
        Self {
            sent: Arc::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushProvider for RecordingProvider {
    async fn send(&self, token: &str, title: &str, body: &str, data: Value) -> bool {
        self.sent.lock().unwrap().push(PushMessage {
            target: token.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            data,
        });
        !self.fail
    }

    async fn send_topic(&self, topic: &str, title: &str, body: &str, data: Value) -> bool {
        self.sent.lock().unwrap().push(PushMessage {
            target: format!("topic:{topic}"),
            title: title.to_string(),
            body: body.to_string(),
            data,
        });
        !self.fail
    }
}

/// Dispatch handle shared across the application. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    provider: Arc<dyn PushProvider>,
}

impl Dispatcher {
    pub fn new(provider: Arc<dyn PushProvider>) -> Self {
        Self { provider }
    }

    /// Deliver to one user. A user without a push token is a silent no-op.
    pub async fn notify(&self, user: &User, title: &str, body: &str, data: Value) -> bool {
        let Some(ref token) = user.push_token else {
            debug!(user = %user.id, "skipping notification: no push token");
            return false;
        };
        self.provider.send(token, title, body, data).await
    }

    /// Deliver to everyone subscribed to the broadcast topic.
    pub async fn broadcast(&self, title: &str, body: &str, data: Value) -> bool {
        self.provider
            .send_topic(BROADCAST_TOPIC, title, body, data)
            .await
    }

    /// Fire-and-forget variant: the attempt runs on a detached task, so the
    /// caller's request path never blocks on nor fails from the provider.
    pub fn notify_detached(&self, user: User, title: String, body: String, data: Value) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            if !dispatcher.notify(&user, &title, &body, data).await {
                debug!(user = %user.id, "notification not delivered");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use store::Role;
    use uuid::Uuid;

    use super::*;

    fn user_with_token(token: Option<&str>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name: "Alice".into(),
            email: "alice@example.com".into(),
            password_hash: "x".into(),
            location: None,
            photo_url: None,
            photo_id: None,
            skills_offered: vec![],
            skills_wanted: vec![],
            availability: vec![],
            profile_public: true,
            role: Role::User,
            is_banned: false,
            ban_reason: None,
            ban_until: None,
            push_token: token.map(String::from),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn missing_token_is_a_silent_noop() {
        let provider = RecordingProvider::new();
        let dispatcher = Dispatcher::new(Arc::new(provider.clone()));
        let delivered = dispatcher
            .notify(&user_with_token(None), "Hi", "there", json!({}))
            .await;
        assert!(!delivered);
        assert!(provider.sent().is_empty());
    }

    #[tokio::test]
    async fn delivery_goes_to_the_user_token() {
        let provider = RecordingProvider::new();
        let dispatcher = Dispatcher::new(Arc::new(provider.clone()));
        let delivered = dispatcher
            .notify(&user_with_token(Some("tok-1")), "Hi", "there", json!({}))
            .await;
        assert!(delivered);
        let sent = provider.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].target, "tok-1");
    }

    #[tokio::test]
    async fn broadcast_targets_the_shared_topic() {
        let provider = RecordingProvider::new();
        let dispatcher = Dispatcher::new(Arc::new(provider.clone()));
        assert!(dispatcher.broadcast("Hi", "everyone", json!({})).await);
        assert_eq!(provider.sent()[0].target, "topic:all");
    }
}
