// SPDX-License-Identifier: Apache-2.0

use crate::guard::authorize;
use crate::http::handlers::{created_json, ok_json, parse_body, parse_path_slug, respond};
use crate::services::{bounded_store, new_comment_id, resolver};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use chrono::Utc;
use pressbox_api::{ApiError, CommentDto, CommentModerationDto, CommentRequestDto};
use pressbox_model::{Comment, CommentDraft, CommentId, Role};
use pressbox_store::ContentStore;
use serde_json::json;
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

pub(crate) async fn list_comments_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let result = list_comments(&state, &headers, &slug, &params).await;
    respond(&state, "/v1/posts/{slug}/comments", started, result).await
}

async fn list_comments(
    state: &AppState,
    headers: &HeaderMap,
    raw_slug: &str,
    params: &HashMap<String, String>,
) -> Result<Response, ApiError> {
    let slug = parse_path_slug(raw_slug)?;
    let post = resolver::resolve(&state.store, state.api.store_timeout, &slug).await?;
    if !post.publicly_visible() {
        return Err(ApiError::not_found("post"));
    }
    // `all=true` is the moderation view and needs the admin role;
    // unapproved comments never reach public readers.
    let want_all = params.get("all").is_some_and(|v| v == "true");
    let approved_only = if want_all {
        let session = state.guard.authenticate(&state.store, headers).await?;
        authorize(&session.identity, Role::Admin)?;
        false
    } else {
        true
    };
    let comments = bounded_store(
        state.api.store_timeout,
        state.store.list_comments(&slug, approved_only),
    )
    .await?;
    let items: Vec<CommentDto> = comments.iter().map(CommentDto::from_comment).collect();
    Ok(ok_json(json!({ "success": true, "comments": items })))
}

pub(crate) async fn create_comment_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let result = create_comment(&state, &headers, &slug, &body).await;
    respond(&state, "/v1/posts/{slug}/comments", started, result).await
}

async fn create_comment(
    state: &AppState,
    headers: &HeaderMap,
    raw_slug: &str,
    body: &Bytes,
) -> Result<Response, ApiError> {
    let slug = parse_path_slug(raw_slug)?;
    let post = resolver::resolve(&state.store, state.api.store_timeout, &slug).await?;
    if !post.publicly_visible() {
        return Err(ApiError::not_found("post"));
    }
    let dto: CommentRequestDto = parse_body(body)?;
    // Signed-in commenters get their account identity; anonymous ones must
    // supply a name.
    let session = state.guard.authenticate(&state.store, headers).await.ok();
    let (author_name, author_email) = match &session {
        Some(s) => (
            s.identity.display_name.clone(),
            Some(s.identity.email.clone()),
        ),
        None => (
            dto.name.clone().unwrap_or_default(),
            dto.email.clone(),
        ),
    };
    let draft = CommentDraft {
        post_slug: slug.clone(),
        body: dto.body,
        author_name,
        author_email,
        avatar: dto.avatar,
    };
    draft
        .validate()
        .map_err(|e| ApiError::validation_failed(e.to_string()))?;
    let comment = Comment {
        id: new_comment_id(),
        post_slug: draft.post_slug,
        body: draft.body,
        author_name: draft.author_name,
        author_email: draft.author_email,
        avatar: draft.avatar,
        approved: false,
        created_at: Utc::now(),
    };
    bounded_store(state.api.store_timeout, state.store.insert_comment(&comment)).await?;
    info!(slug = %slug, comment_id = %comment.id, "comment submitted for approval");
    Ok(created_json(json!({
        "success": true,
        "message": "comment submitted for approval",
        "comment_id": comment.id.as_str(),
    })))
}

pub(crate) async fn moderate_comment_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let result = moderate_comment(&state, &headers, &id, &body).await;
    respond(&state, "/v1/comments/{id}", started, result).await
}

async fn moderate_comment(
    state: &AppState,
    headers: &HeaderMap,
    raw_id: &str,
    body: &Bytes,
) -> Result<Response, ApiError> {
    let session = state.guard.authenticate(&state.store, headers).await?;
    authorize(&session.identity, Role::Admin)?;
    let id = CommentId::parse(raw_id).map_err(|_| ApiError::not_found("comment"))?;
    let dto: CommentModerationDto = parse_body(body)?;
    let comment = bounded_store(
        state.api.store_timeout,
        state.store.set_comment_approved(&id, dto.approved),
    )
    .await?
    .ok_or_else(|| ApiError::not_found("comment"))?;
    Ok(ok_json(json!({
        "success": true,
        "comment": CommentDto::from_comment(&comment),
    })))
}

pub(crate) async fn delete_comment_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let started = Instant::now();
    let result = delete_comment(&state, &headers, &id).await;
    respond(&state, "/v1/comments/{id}", started, result).await
}

async fn delete_comment(
    state: &AppState,
    headers: &HeaderMap,
    raw_id: &str,
) -> Result<Response, ApiError> {
    let session = state.guard.authenticate(&state.store, headers).await?;
    authorize(&session.identity, Role::Admin)?;
    let id = CommentId::parse(raw_id).map_err(|_| ApiError::not_found("comment"))?;
    let removed = bounded_store(state.api.store_timeout, state.store.delete_comment(&id)).await?;
    if !removed {
        return Err(ApiError::not_found("comment"));
    }
    Ok(ok_json(json!({ "success": true, "message": "comment deleted" })))
}
