// SPDX-License-Identifier: Apache-2.0

use crate::post::ParseError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

pub const EMAIL_MAX_LEN: usize = 254;
const ID_HEX_LEN: usize = 24;

/// Durable user identity: 24 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        if input.len() != ID_HEX_LEN || !input.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseError::InvalidFormat(
                "user id must be 24 hex characters",
            ));
        }
        Ok(Self(input.to_ascii_lowercase()))
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        let mut out = String::with_capacity(ID_HEX_LEN);
        for b in bytes {
            out.push_str(&format!("{b:02x}"));
        }
        Self(out)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Editor,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Editor => "editor",
            Self::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        match raw {
            "editor" => Ok(Self::Editor),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseError::InvalidFormat("role must be 'editor' or 'admin'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Pending,
    Active,
    Rejected,
}

impl AccountStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        match raw {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ParseError::InvalidFormat(
                "account status must be 'pending', 'active', or 'rejected'",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub roles: BTreeSet<Role>,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Account status gates authentication: a pending or rejected account
    /// never authenticates, regardless of password correctness.
    #[must_use]
    pub fn may_authenticate(&self) -> bool {
        self.status == AccountStatus::Active
    }

    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Lowercases and validates an email address shape. Full RFC validation is
/// out of scope; the store's unique index is the real duplicate gate.
pub fn normalize_email(input: &str) -> Result<String, ParseError> {
    let trimmed = input.trim().to_ascii_lowercase();
    if trimmed.is_empty() {
        return Err(ParseError::Empty("email"));
    }
    if trimmed.len() > EMAIL_MAX_LEN {
        return Err(ParseError::TooLong("email", EMAIL_MAX_LEN));
    }
    let Some((local, domain)) = trimmed.split_once('@') else {
        return Err(ParseError::InvalidFormat("email must contain '@'"));
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(ParseError::InvalidFormat("email has an invalid shape"));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_accounts_never_authenticate() {
        let mut user = User {
            id: UserId::from_bytes([1; 12]),
            email: "editor@example.com".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            display_name: "Editor".to_string(),
            bio: None,
            avatar: None,
            roles: BTreeSet::from([Role::Editor]),
            status: AccountStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!user.may_authenticate());
        user.status = AccountStatus::Rejected;
        assert!(!user.may_authenticate());
        user.status = AccountStatus::Active;
        assert!(user.may_authenticate());
    }

    #[test]
    fn email_normalization() {
        assert_eq!(
            normalize_email("  Dana@Example.COM ").expect("email"),
            "dana@example.com"
        );
        assert!(normalize_email("nope").is_err());
        assert!(normalize_email("a@b").is_err());
        assert!(normalize_email("").is_err());
    }
}
