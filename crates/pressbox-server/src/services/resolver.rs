// SPDX-License-Identifier: Apache-2.0

//! Slug resolution: maps a human-readable identifier to exactly one live
//! post. `reserve` is the advisory availability check; the store's unique
//! index remains the authoritative arbiter at insert time.

use crate::services::bounded_store;
use pressbox_api::ApiError;
use pressbox_model::{Post, Slug};
use pressbox_store::ContentStore;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugAvailability {
    Available,
    Taken,
}

/// Resolves a slug to the unique non-deleted post, or a generic not-found.
/// Trashed posts never match; callers that need them go through
/// [`resolve_any`].
pub async fn resolve(
    store: &Arc<dyn ContentStore>,
    limit: Duration,
    slug: &Slug,
) -> Result<Post, ApiError> {
    bounded_store(limit, store.find_live_by_slug(slug))
        .await?
        .ok_or_else(|| ApiError::not_found("post"))
}

/// Admin-path resolution across live and trashed posts.
pub async fn resolve_any(
    store: &Arc<dyn ContentStore>,
    limit: Duration,
    slug: &Slug,
) -> Result<Post, ApiError> {
    bounded_store(limit, store.find_any_by_slug(slug))
        .await?
        .ok_or_else(|| ApiError::not_found("post"))
}

/// Advisory availability check used at creation/rename time. Trashed posts
/// keep their slug reserved, so the probe spans live and trashed records;
/// only a purge releases a slug. Pure read, no side effects.
pub async fn reserve(
    store: &Arc<dyn ContentStore>,
    limit: Duration,
    candidate: &Slug,
) -> Result<SlugAvailability, ApiError> {
    let existing = bounded_store(limit, store.find_any_by_slug(candidate)).await?;
    Ok(if existing.is_some() {
        SlugAvailability::Taken
    } else {
        SlugAvailability::Available
    })
}
