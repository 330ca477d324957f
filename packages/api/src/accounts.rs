//! Registration, login, and self-service profile operations.

use chrono::Utc;
use serde::Deserialize;
use store::{models::normalize_terms, Role, Store, User, UserQuery};
use uuid::Uuid;

use crate::auth;
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Reject mutations from banned accounts. The credential itself stays valid
/// (see the gate), but a suspended account cannot act.
pub fn ensure_active(user: &User) -> ApiResult<()> {
    if user.is_banned {
        return Err(ApiError::forbidden("Account suspended"));
    }
    Ok(())
}

/// Create an account. Duplicate email (case-insensitive) is a conflict,
/// distinct from plain validation failures.
pub async fn register(store: &dyn Store, input: RegisterInput) -> ApiResult<User> {
    let email = input.email.trim().to_lowercase();
    let name = input.name.trim().to_string();

    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::validation("Invalid email address"));
    }
    if input.password.len() < 8 {
        return Err(ApiError::validation(
            "Password must be at least 8 characters",
        ));
    }
    if name.is_empty() {
        return Err(ApiError::validation("Name is required"));
    }

    if store.user_by_email(&email).await?.is_some() {
        return Err(ApiError::conflict(
            "An account with this email already exists",
        ));
    }

    let password_hash = auth::hash_password(&input.password)?;
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        name,
        email,
        password_hash,
        location: None,
        photo_url: None,
        photo_id: None,
        skills_offered: Vec::new(),
        skills_wanted: Vec::new(),
        availability: Vec::new(),
        profile_public: false,
        role: Role::User,
        is_banned: false,
        ban_reason: None,
        ban_until: None,
        push_token: None,
        created_at: now,
        updated_at: now,
    };
    Ok(store.insert_user(user).await?)
}

/// Check an email/password pair. Unknown email and wrong password produce
/// the same generic outcome so callers cannot enumerate accounts.
pub async fn authenticate(store: &dyn Store, email: &str, password: &str) -> ApiResult<User> {
    let email = email.trim().to_lowercase();
    let invalid = || ApiError::unauthorized("Invalid email or password");

    let Some(user) = store.user_by_email(&email).await? else {
        return Err(invalid());
    };
    if !auth::verify_password(password, &user.password_hash)? {
        return Err(invalid());
    }
    Ok(user)
}

/// Self-service profile edit. Only provided fields change; list fields are
/// normalized to the canonical shape at this write boundary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub location: Option<String>,
    pub photo_url: Option<String>,
    pub skills_offered: Option<Vec<String>>,
    pub skills_wanted: Option<Vec<String>>,
    pub availability: Option<Vec<String>>,
    pub profile_public: Option<bool>,
}

pub async fn update_profile(
    store: &dyn Store,
    user: &User,
    update: ProfileUpdate,
) -> ApiResult<User> {
    ensure_active(user)?;
    let mut user = user.clone();
    if let Some(name) = update.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::validation("Name is required"));
        }
        user.name = name;
    }
    if let Some(location) = update.location {
        let location = location.trim().to_string();
        user.location = (!location.is_empty()).then_some(location);
    }
    if let Some(photo_url) = update.photo_url {
        user.photo_url = (!photo_url.is_empty()).then_some(photo_url);
    }
    if let Some(offered) = update.skills_offered {
        user.skills_offered = normalize_terms(offered);
    }
    if let Some(wanted) = update.skills_wanted {
        user.skills_wanted = normalize_terms(wanted);
    }
    if let Some(availability) = update.availability {
        user.availability = normalize_terms(availability);
    }
    if let Some(public) = update.profile_public {
        user.profile_public = public;
    }
    user.updated_at = Utc::now();
    store.update_user(&user).await?;
    Ok(user)
}

/// Save the caller's push delivery token.
pub async fn set_push_token(store: &dyn Store, user: &User, token: String) -> ApiResult<()> {
    if token.trim().is_empty() {
        return Err(ApiError::validation("Push token is required"));
    }
    let mut user = user.clone();
    user.push_token = Some(token);
    user.updated_at = Utc::now();
    store.update_user(&user).await?;
    Ok(())
}

/// Remove the caller's push delivery token.
pub async fn clear_push_token(store: &dyn Store, user: &User) -> ApiResult<()> {
    let mut user = user.clone();
    user.push_token = None;
    user.updated_at = Utc::now();
    store.update_user(&user).await?;
    Ok(())
}

/// Public directory: published profiles only, searchable.
pub async fn public_directory(
    store: &dyn Store,
    search: Option<String>,
    page: u64,
    limit: u64,
) -> ApiResult<store::Page<store::models::PublicProfile>> {
    let query = UserQuery {
        search,
        public_only: true,
        page,
        limit,
        ..Default::default()
    };
    let users = store.list_users(&query).await?;
    Ok(users.map(|u| u.to_public()))
}

#[cfg(test)]
mod tests {
    use store::MemoryStore;

    use super::*;

    fn input(name: &str, email: &str, password: &str) -> RegisterInput {
        RegisterInput {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn register_then_authenticate_round_trip() {
        let store = MemoryStore::new();
        let user = register(&store, input("Alice", "Alice@Example.com", "hunter2hunter2"))
            .await
            .unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.role, Role::User);

        let authed = authenticate(&store, "alice@example.com", "hunter2hunter2")
            .await
            .unwrap();
        assert_eq!(authed.id, user.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict_case_insensitively() {
        let store = MemoryStore::new();
        register(&store, input("Alice", "alice@example.com", "hunter2hunter2"))
            .await
            .unwrap();
        let err = register(&store, input("Imposter", "ALICE@example.com", "hunter2hunter2"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(store.all_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_are_indistinguishable() {
        let store = MemoryStore::new();
        register(&store, input("Alice", "alice@example.com", "hunter2hunter2"))
            .await
            .unwrap();

        let unknown = authenticate(&store, "nobody@example.com", "whatever")
            .await
            .unwrap_err();
        let wrong = authenticate(&store, "alice@example.com", "wrong-password")
            .await
            .unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert!(matches!(unknown, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn validation_failures_are_not_conflicts() {
        let store = MemoryStore::new();
        let short = register(&store, input("Alice", "alice@example.com", "short"))
            .await
            .unwrap_err();
        assert!(matches!(short, ApiError::Validation(_)));
        let bad_email = register(&store, input("Alice", "not-an-email", "hunter2hunter2"))
            .await
            .unwrap_err();
        assert!(matches!(bad_email, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn profile_update_normalizes_skill_lists() {
        let store = MemoryStore::new();
        let user = register(&store, input("Alice", "alice@example.com", "hunter2hunter2"))
            .await
            .unwrap();
        let updated = update_profile(
            &store,
            &user,
            ProfileUpdate {
                skills_offered: Some(vec!["Guitar, Piano".into(), " ".into()]),
                profile_public: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.skills_offered, vec!["Guitar", "Piano"]);
        assert!(updated.profile_public);
    }

    #[tokio::test]
    async fn banned_users_cannot_edit_their_profile() {
        let store = MemoryStore::new();
        let mut user = register(&store, input("Alice", "alice@example.com", "hunter2hunter2"))
            .await
            .unwrap();
        user.is_banned = true;
        store.update_user(&user).await.unwrap();

        let err = update_profile(&store, &user, ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }
}
