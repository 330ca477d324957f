//! Stateless bearer tokens (HS256 JWT).
//!
//! The token carries the subject id, the role claim frozen at issue time, and
//! an expiry. The authorization gate prefers the server-side session and
//! falls back to decoding one of these.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use store::{Role, User};

use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id, as a UUID string.
    pub sub: String,
    pub role: Role,
    pub exp: i64,
}

/// Sign a bearer token for the user, valid for `ttl_hours`.
pub fn sign_token(user: &User, secret: &str, ttl_hours: i64) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role,
        exp: (Utc::now() + Duration::hours(ttl_hours)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Unexpected(format!("failed to sign token: {e}")))
}

/// Decode and validate a bearer token. Returns `None` for anything invalid:
/// bad signature, expired, malformed.
pub fn verify_token(token: &str, secret: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use store::Role;
    use uuid::Uuid;

    use super::*;

    fn test_user() -> User {
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
            push_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn sign_then_verify_carries_subject_and_role() {
        let user = test_user();
        let token = sign_token(&user, "secret", 24).unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.role, Role::User);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn wrong_secret_or_garbage_yields_none() {
        let user = test_user();
        let token = sign_token(&user, "secret", 24).unwrap();
        assert!(verify_token(&token, "other-secret").is_none());
        assert!(verify_token("not.a.token", "secret").is_none());
    }
}
