// SPDX-License-Identifier: Apache-2.0

//! Lifecycle manager: create → publish/draft → trash → restore → purge.
//!
//! Trash is a soft flag that leaves `status` untouched, so restore returns
//! a post exactly where it was. Every transition that races with another
//! writer goes through a conditional store write keyed on the current trash
//! state, which is what keeps a restore from reviving a concurrently purged
//! post and a purge from deleting a concurrently restored one.

use crate::guard::{authorize, authorize_author_or_admin, Identity};
use crate::services::{bounded_store, new_post_id, resolver};
use chrono::Utc;
use pressbox_api::{ApiError, CreatePostRequestDto, UpdatePostRequestDto};
use pressbox_core::canonical_slug;
use pressbox_model::{
    AuthorRef, Post, PostDraft, PostStatus, PostUpdate, Role, Slug, ViewLedger,
};
use pressbox_store::{CasOutcome, ContentStore};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

fn parse_requested_slug(dto_slug: Option<&str>, title: &str) -> Result<Slug, ApiError> {
    match dto_slug {
        Some(raw) => {
            let trimmed = raw.trim().to_ascii_lowercase();
            Slug::parse(&trimmed).map_err(|e| ApiError::validation_failed(e.to_string()))
        }
        None => {
            let derived = canonical_slug(title)
                .ok_or_else(|| ApiError::validation_failed("cannot derive a slug from title"))?;
            Slug::parse(&derived).map_err(|e| ApiError::validation_failed(e.to_string()))
        }
    }
}

pub async fn create_post(
    store: &Arc<dyn ContentStore>,
    limit: Duration,
    identity: &Identity,
    dto: CreatePostRequestDto,
) -> Result<Post, ApiError> {
    let slug = parse_requested_slug(dto.slug.as_deref(), &dto.title)?;
    let status = dto.status.unwrap_or(PostStatus::Draft);
    let draft = PostDraft {
        slug: slug.clone(),
        title: dto.title,
        subtitle: dto.subtitle,
        excerpt: dto.excerpt,
        body: dto.body.unwrap_or_default(),
        featured_image: dto.image,
        tags: dto.tags.unwrap_or_default().into_iter().collect(),
        category: dto.category,
        meta_title: dto.meta_title,
        meta_description: dto.meta_description,
        keywords: dto.keywords,
        status,
    };
    draft
        .validate()
        .map_err(|e| ApiError::validation_failed(e.to_string()))?;

    // Advisory pre-check for a friendly error; the store's unique index is
    // what actually arbitrates a race between concurrent creators.
    if resolver::reserve(store, limit, &slug).await? == resolver::SlugAvailability::Taken {
        return Err(ApiError::duplicate_slug(slug.as_str()));
    }

    let now = Utc::now();
    let post = Post {
        id: new_post_id(),
        slug,
        title: draft.title,
        subtitle: draft.subtitle,
        excerpt: draft.excerpt,
        body: draft.body,
        featured_image: draft.featured_image,
        tags: draft.tags,
        category: draft
            .category
            .unwrap_or_else(|| "uncategorized".to_string()),
        meta_title: draft.meta_title,
        meta_description: draft.meta_description,
        keywords: draft.keywords,
        author: AuthorRef::Referenced {
            user_id: identity.user_id.clone(),
            cached_name: identity.display_name.clone(),
        },
        status,
        deleted: false,
        ledger: ViewLedger::default(),
        created_at: now,
        updated_at: now,
    };
    match bounded_store(limit, store.insert_post(&post)).await {
        Ok(()) => Ok(post),
        Err(err) if err.code == pressbox_api::ApiErrorCode::DuplicateSlug => {
            Err(ApiError::duplicate_slug(post.slug.as_str()))
        }
        Err(err) => Err(err),
    }
}

/// Full-replacement field update. Editing a trashed post is not a legal
/// transition; restore it first.
pub async fn update_post(
    store: &Arc<dyn ContentStore>,
    limit: Duration,
    identity: &Identity,
    slug: &Slug,
    dto: UpdatePostRequestDto,
) -> Result<Post, ApiError> {
    let post = resolver::resolve_any(store, limit, slug).await?;
    authorize_author_or_admin(identity, &post)?;
    if post.deleted {
        return Err(ApiError::invalid_transition("update", "post is in trash"));
    }

    let new_slug = match dto.slug.as_deref() {
        Some(raw) => parse_requested_slug(Some(raw), &dto.title)?,
        None => post.slug.clone(),
    };
    let body = dto.body.unwrap_or_default();
    let mut probe = post.clone();
    probe.title = dto.title.clone();
    probe.body = body.clone();
    probe
        .validate_for_status(post.status)
        .map_err(|e| ApiError::validation_failed(e.to_string()))?;

    if new_slug != post.slug {
        if let Some(other) = bounded_store(limit, store.find_any_by_slug(&new_slug)).await? {
            if other.id != post.id {
                return Err(ApiError::duplicate_slug(new_slug.as_str()));
            }
        }
    }

    let update = PostUpdate {
        slug: Some(new_slug.clone()),
        title: Some(dto.title),
        subtitle: Some(dto.subtitle),
        excerpt: Some(dto.excerpt),
        body: Some(body),
        featured_image: Some(dto.image),
        tags: Some(
            dto.tags
                .unwrap_or_default()
                .into_iter()
                .collect::<BTreeSet<_>>(),
        ),
        category: Some(
            dto.category
                .unwrap_or_else(|| "uncategorized".to_string()),
        ),
        meta_title: Some(dto.meta_title),
        meta_description: Some(dto.meta_description),
        keywords: Some(dto.keywords),
    };
    match bounded_store(limit, store.update_post(&post.id, &update)).await {
        Ok(Some(updated)) => Ok(updated),
        Ok(None) => Err(ApiError::not_found("post")),
        Err(err) if err.code == pressbox_api::ApiErrorCode::DuplicateSlug => {
            Err(ApiError::duplicate_slug(new_slug.as_str()))
        }
        Err(err) => Err(err),
    }
}

/// Draft → Published. Re-validates required fields: a published post may
/// not have an empty body. Publishing an already-published post is a no-op
/// success.
pub async fn publish(
    store: &Arc<dyn ContentStore>,
    limit: Duration,
    identity: &Identity,
    slug: &Slug,
) -> Result<Post, ApiError> {
    let post = resolver::resolve_any(store, limit, slug).await?;
    authorize_author_or_admin(identity, &post)?;
    if post.deleted {
        return Err(ApiError::invalid_transition(
            "publish",
            "post is in trash",
        ));
    }
    if post.status == PostStatus::Published {
        return Ok(post);
    }
    post.validate_for_status(PostStatus::Published)
        .map_err(|e| ApiError::validation_failed(e.to_string()))?;
    bounded_store(limit, store.set_post_status(&post.id, PostStatus::Published))
        .await?
        .ok_or_else(|| ApiError::not_found("post"))
}

/// Published → Draft. Unpublishing a draft is a no-op success.
pub async fn unpublish(
    store: &Arc<dyn ContentStore>,
    limit: Duration,
    identity: &Identity,
    slug: &Slug,
) -> Result<Post, ApiError> {
    let post = resolver::resolve_any(store, limit, slug).await?;
    authorize_author_or_admin(identity, &post)?;
    if post.deleted {
        return Err(ApiError::invalid_transition(
            "unpublish",
            "post is in trash",
        ));
    }
    if post.status == PostStatus::Draft {
        return Ok(post);
    }
    bounded_store(limit, store.set_post_status(&post.id, PostStatus::Draft))
        .await?
        .ok_or_else(|| ApiError::not_found("post"))
}

/// Soft-delete. Trashing an already-trashed post is a no-op success, which
/// makes retries after a timed-out call harmless.
pub async fn trash(
    store: &Arc<dyn ContentStore>,
    limit: Duration,
    identity: &Identity,
    slug: &Slug,
) -> Result<Post, ApiError> {
    let post = resolver::resolve_any(store, limit, slug).await?;
    authorize_author_or_admin(identity, &post)?;
    if post.deleted {
        return Ok(post);
    }
    match bounded_store(limit, store.set_post_deleted(&post.id, true, false)).await? {
        CasOutcome::Applied | CasOutcome::StateMismatch => {
            // A mismatch here means another caller trashed it first, which
            // lands in the same place.
            bounded_store(limit, store.find_post_by_id(&post.id))
                .await?
                .ok_or_else(|| ApiError::not_found("post"))
        }
        CasOutcome::Missing => Err(ApiError::not_found("post")),
    }
}

/// Trashed → prior status. Admin-only. The conditional write means a post
/// purged a moment earlier stays gone instead of being revived.
pub async fn restore(
    store: &Arc<dyn ContentStore>,
    limit: Duration,
    identity: &Identity,
    slug: &Slug,
) -> Result<Post, ApiError> {
    authorize(identity, Role::Admin)?;
    let post = resolver::resolve_any(store, limit, slug).await?;
    if !post.deleted {
        return Err(ApiError::invalid_transition(
            "restore",
            "post is not in trash",
        ));
    }
    match bounded_store(limit, store.set_post_deleted(&post.id, false, true)).await? {
        CasOutcome::Applied | CasOutcome::StateMismatch => {
            bounded_store(limit, store.find_post_by_id(&post.id))
                .await?
                .ok_or_else(|| ApiError::not_found("post"))
        }
        CasOutcome::Missing => Err(ApiError::not_found("post")),
    }
}

/// Permanent removal. Admin-only, and only legal from the trash; the store
/// re-checks the trash flag atomically with the delete.
pub async fn purge(
    store: &Arc<dyn ContentStore>,
    limit: Duration,
    identity: &Identity,
    slug: &Slug,
) -> Result<(), ApiError> {
    authorize(identity, Role::Admin)?;
    let post = resolver::resolve_any(store, limit, slug).await?;
    if !post.deleted {
        return Err(ApiError::invalid_transition(
            "destroy",
            "purge is only legal from trash",
        ));
    }
    match bounded_store(limit, store.purge_post(&post.id)).await? {
        CasOutcome::Applied => Ok(()),
        CasOutcome::StateMismatch => Err(ApiError::invalid_transition(
            "destroy",
            "post was restored before the purge applied",
        )),
        CasOutcome::Missing => Err(ApiError::not_found("post")),
    }
}
