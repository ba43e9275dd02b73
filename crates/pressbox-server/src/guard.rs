// SPDX-License-Identifier: Apache-2.0

//! Access guard: bearer-credential verification and role checks.
//!
//! The credential is an HS256 JWT carried in an HTTP-only `token` cookie or
//! an `Authorization: Bearer` header. Authentication re-checks the subject's
//! current account status against the Content Store, so a deactivated
//! account loses access before its token expires.

use crate::config::ApiConfig;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::http::HeaderMap;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use pressbox_api::ApiError;
use pressbox_model::{Post, Role, User, UserId};
use pressbox_store::ContentStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

pub const SESSION_COOKIE: &str = "token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub roles: Vec<String>,
    pub iat: u64,
    pub exp: u64,
}

/// Resolved caller identity, backed by the user's current store record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub email: String,
    pub display_name: String,
    pub roles: BTreeSet<Role>,
}

impl Identity {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}

/// Result of a successful authentication. `refreshed_cookie` is set when
/// the presented token was close enough to expiry to warrant re-issuance;
/// attaching it is advisory and never affects the authorization decision.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub identity: Identity,
    pub refreshed_cookie: Option<String>,
}

pub struct AccessGuard {
    secret: String,
    session_ttl: Duration,
    refresh_window: Duration,
    cookie_secure: bool,
}

impl AccessGuard {
    #[must_use]
    pub fn new(api: &ApiConfig) -> Self {
        Self {
            secret: api.jwt_secret.clone(),
            session_ttl: api.session_ttl,
            refresh_window: api.session_refresh_window,
            cookie_secure: api.cookie_secure,
        }
    }

    pub fn issue_token(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            sub: user.id.as_str().to_string(),
            email: user.email.clone(),
            roles: user.roles.iter().map(|r| r.as_str().to_string()).collect(),
            iat: now,
            exp: now + self.session_ttl.as_secs(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::internal(format!("token signing failed: {e}")))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| ApiError::unauthenticated("invalid or expired token"))
    }

    /// Full authentication: token extraction, signature/expiry check, and a
    /// fresh account-status check against the store.
    pub async fn authenticate(
        &self,
        store: &Arc<dyn ContentStore>,
        headers: &HeaderMap,
    ) -> Result<AuthSession, ApiError> {
        let Some(token) = extract_token(headers) else {
            return Err(ApiError::unauthenticated("no token provided"));
        };
        let claims = self.verify_token(&token)?;
        let user_id = UserId::parse(&claims.sub)
            .map_err(|_| ApiError::unauthenticated("malformed subject"))?;
        let user = store
            .find_user_by_id(&user_id)
            .await
            .map_err(|e| ApiError::store_unavailable(e.to_string()))?
            .ok_or_else(|| ApiError::unauthenticated("unknown subject"))?;
        if !user.may_authenticate() {
            return Err(ApiError::unauthenticated("account is not active"));
        }
        let now = Utc::now().timestamp().max(0) as u64;
        let refreshed_cookie = if claims.exp.saturating_sub(now) < self.refresh_window.as_secs() {
            Some(self.session_cookie(&self.issue_token(&user)?))
        } else {
            None
        };
        Ok(AuthSession {
            identity: Identity {
                user_id: user.id.clone(),
                email: user.email.clone(),
                display_name: user.display_name.clone(),
                roles: user.roles.clone(),
            },
            refreshed_cookie,
        })
    }

    #[must_use]
    pub fn session_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
            self.session_ttl.as_secs()
        );
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    #[must_use]
    pub fn clear_cookie(&self) -> String {
        let mut cookie = format!("{SESSION_COOKIE}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0");
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

pub fn authorize(identity: &Identity, required: Role) -> Result<(), ApiError> {
    if identity.roles.contains(&required) {
        Ok(())
    } else {
        Err(ApiError::denied(required.as_str()))
    }
}

/// Trash is open to the post's author as well as admins; everything past
/// trash (restore, purge) is admin-only.
pub fn authorize_author_or_admin(identity: &Identity, post: &Post) -> Result<(), ApiError> {
    if identity.is_admin() || post.author.user_id() == Some(&identity.user_id) {
        Ok(())
    } else {
        Err(ApiError::denied(Role::Admin.as_str()))
    }
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = cookie_value(headers, SESSION_COOKIE) {
        return Some(token);
    }
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get("cookie").and_then(|v| v.to_str().ok())?;
    raw.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        if key == name && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::internal(format!("password hashing failed: {e}")))
}

#[must_use]
pub fn verify_password(hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pressbox_model::AccountStatus;

    fn guard() -> AccessGuard {
        AccessGuard::new(&ApiConfig {
            jwt_secret: "test-secret".to_string(),
            ..ApiConfig::default()
        })
    }

    fn user() -> User {
        User {
            id: UserId::from_bytes([9; 12]),
            email: "dana@example.com".to_string(),
            password_hash: String::new(),
            display_name: "Dana".to_string(),
            bio: None,
            avatar: None,
            roles: BTreeSet::from([Role::Editor]),
            status: AccountStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn issued_tokens_verify_and_carry_the_subject() {
        let guard = guard();
        let token = guard.issue_token(&user()).expect("token");
        let claims = guard.verify_token(&token).expect("claims");
        assert_eq!(claims.sub, user().id.as_str());
        assert_eq!(claims.roles, vec!["editor".to_string()]);
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let guard = guard();
        let mut token = guard.issue_token(&user()).expect("token");
        token.push('x');
        assert!(guard.verify_token(&token).is_err());
    }

    #[test]
    fn token_extraction_prefers_cookie_then_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", "theme=dark; token=abc".parse().expect("header"));
        headers.insert("authorization", "Bearer xyz".parse().expect("header"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc"));

        let mut bearer_only = HeaderMap::new();
        bearer_only.insert("authorization", "Bearer xyz".parse().expect("header"));
        assert_eq!(extract_token(&bearer_only).as_deref(), Some("xyz"));

        assert_eq!(extract_token(&HeaderMap::new()), None);
    }

    #[test]
    fn password_round_trip() {
        let hash = hash_password("hunter2").expect("hash");
        assert!(verify_password(&hash, "hunter2"));
        assert!(!verify_password(&hash, "hunter3"));
        assert!(!verify_password("not-a-hash", "hunter2"));
    }

    #[test]
    fn role_checks() {
        let identity = Identity {
            user_id: UserId::from_bytes([9; 12]),
            email: "dana@example.com".to_string(),
            display_name: "Dana".to_string(),
            roles: BTreeSet::from([Role::Editor]),
        };
        assert!(authorize(&identity, Role::Editor).is_ok());
        assert!(authorize(&identity, Role::Admin).is_err());
    }
}
