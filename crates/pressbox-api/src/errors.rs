// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ApiErrorCode {
    NotFound,
    DuplicateSlug,
    InvalidTransition,
    ValidationFailed,
    Unauthenticated,
    Denied,
    StoreUnavailable,
    InvalidQueryParameter,
    RateLimited,
    Internal,
}

impl ApiErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::DuplicateSlug => "duplicate_slug",
            Self::InvalidTransition => "invalid_transition",
            Self::ValidationFailed => "validation_failed",
            Self::Unauthenticated => "unauthenticated",
            Self::Denied => "denied",
            Self::StoreUnavailable => "store_unavailable",
            Self::InvalidQueryParameter => "invalid_query_parameter",
            Self::RateLimited => "rate_limited",
            Self::Internal => "internal",
        }
    }

    /// The HTTP status each code maps to at the edge.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::DuplicateSlug => 409,
            Self::InvalidTransition => 409,
            Self::ValidationFailed | Self::InvalidQueryParameter => 400,
            Self::Unauthenticated => 401,
            Self::Denied => 403,
            Self::RateLimited => 429,
            Self::StoreUnavailable => 503,
            Self::Internal => 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Value,
}

impl ApiError {
    #[must_use]
    pub fn new(code: ApiErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
        }
    }

    /// Generic not-found. Public read paths use this for missing, trashed,
    /// and unpublished posts alike, so existence never leaks.
    #[must_use]
    pub fn not_found(what: &str) -> Self {
        Self::new(ApiErrorCode::NotFound, format!("{what} not found"), json!({}))
    }

    #[must_use]
    pub fn duplicate_slug(slug: &str) -> Self {
        Self::new(
            ApiErrorCode::DuplicateSlug,
            "slug already in use",
            json!({ "slug": slug }),
        )
    }

    #[must_use]
    pub fn invalid_transition(action: &str, reason: impl Into<String>) -> Self {
        Self::new(
            ApiErrorCode::InvalidTransition,
            reason,
            json!({ "action": action }),
        )
    }

    #[must_use]
    pub fn validation_failed(reason: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::ValidationFailed, reason, json!({}))
    }

    #[must_use]
    pub fn invalid_param(name: &str, reason: &str) -> Self {
        Self::new(
            ApiErrorCode::InvalidQueryParameter,
            format!("invalid query parameter: {name}"),
            json!({ "parameter": name, "reason": reason }),
        )
    }

    #[must_use]
    pub fn unauthenticated(reason: &str) -> Self {
        Self::new(ApiErrorCode::Unauthenticated, reason, json!({}))
    }

    #[must_use]
    pub fn denied(required_role: &str) -> Self {
        Self::new(
            ApiErrorCode::Denied,
            "insufficient role",
            json!({ "required_role": required_role }),
        )
    }

    #[must_use]
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::new(
            ApiErrorCode::StoreUnavailable,
            message,
            json!({ "retryable": true }),
        )
    }

    #[must_use]
    pub fn rate_limited() -> Self {
        Self::new(ApiErrorCode::RateLimited, "too many requests", json!({}))
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Internal, message, json!({}))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_snake_case() {
        let err = ApiError::duplicate_slug("rental-fraud-101");
        let value = serde_json::to_value(&err).expect("serialize");
        assert_eq!(value["code"], "duplicate_slug");
        assert_eq!(value["details"]["slug"], "rental-fraud-101");
    }

    #[test]
    fn status_mapping_covers_the_taxonomy() {
        assert_eq!(ApiErrorCode::NotFound.http_status(), 404);
        assert_eq!(ApiErrorCode::DuplicateSlug.http_status(), 409);
        assert_eq!(ApiErrorCode::InvalidTransition.http_status(), 409);
        assert_eq!(ApiErrorCode::ValidationFailed.http_status(), 400);
        assert_eq!(ApiErrorCode::Unauthenticated.http_status(), 401);
        assert_eq!(ApiErrorCode::Denied.http_status(), 403);
        assert_eq!(ApiErrorCode::StoreUnavailable.http_status(), 503);
    }
}
