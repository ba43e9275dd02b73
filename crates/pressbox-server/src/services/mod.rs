// SPDX-License-Identifier: Apache-2.0

pub mod lifecycle;
pub mod resolver;
pub mod search;
pub mod views;

use pressbox_api::ApiError;
use pressbox_model::{CommentId, PostId, UserId};
use pressbox_store::{StoreError, StoreErrorCode};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Bounds a Content Store call with the configured timeout. A timed-out
/// mutating call is reported as transient without assuming whether the
/// mutation applied.
pub(crate) async fn bounded_store<T, Fut>(limit: Duration, fut: Fut) -> Result<T, ApiError>
where
    Fut: Future<Output = Result<T, StoreError>>,
{
    match timeout(limit, fut).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(store_error_to_api(e)),
        Err(_) => Err(ApiError::store_unavailable("content store timed out")),
    }
}

pub(crate) fn store_error_to_api(err: StoreError) -> ApiError {
    match err.code {
        StoreErrorCode::Unavailable => ApiError::store_unavailable(err.message),
        StoreErrorCode::DuplicateSlug => {
            ApiError::new(pressbox_api::ApiErrorCode::DuplicateSlug, err.message, serde_json::json!({}))
        }
        StoreErrorCode::DuplicateEmail => ApiError::validation_failed("email already registered"),
        StoreErrorCode::NotFound => ApiError::not_found("record"),
        StoreErrorCode::Validation | StoreErrorCode::Internal => ApiError::internal(err.message),
        _ => ApiError::internal(err.message),
    }
}

pub(crate) fn new_post_id() -> PostId {
    PostId::from_bytes(rand::random())
}

pub(crate) fn new_comment_id() -> CommentId {
    CommentId::from_bytes(rand::random())
}

pub(crate) fn new_user_id() -> UserId {
    UserId::from_bytes(rand::random())
}
