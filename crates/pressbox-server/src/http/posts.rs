// SPDX-License-Identifier: Apache-2.0

use crate::http::handlers::{
    client_key, created_json, ok_json, parse_body, parse_path_slug, respond,
};
use crate::services::{bounded_store, lifecycle, resolver};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use pressbox_api::{
    parse_list_posts_params, ApiError, CreatePostRequestDto, PostDetailDto, PostListItemDto,
    SlugCheckDto, UpdatePostRequestDto,
};
use pressbox_model::{PostStatus, Slug};
use pressbox_store::{ContentStore, PostFilter};
use serde_json::json;
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

pub(crate) async fn list_posts_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let result = list_posts(&state, &headers, &params).await;
    respond(&state, "/v1/posts", started, result).await
}

async fn list_posts(
    state: &AppState,
    headers: &HeaderMap,
    params: &HashMap<String, String>,
) -> Result<Response, ApiError> {
    let parsed = parse_list_posts_params(params)?;
    // Trash visibility is an admin privilege; everyone else gets the
    // published, non-deleted slice regardless of what they asked for.
    let session = state.guard.authenticate(&state.store, headers).await.ok();
    let is_admin = session
        .as_ref()
        .is_some_and(|s| s.identity.is_admin());
    let filter = if is_admin {
        PostFilter {
            deleted: parsed.deleted,
            published_only: false,
            category: parsed.category,
            limit: parsed.limit,
            offset: parsed.offset,
        }
    } else {
        PostFilter {
            deleted: Some(false),
            published_only: true,
            category: parsed.category,
            limit: parsed.limit,
            offset: parsed.offset,
        }
    };
    let posts = bounded_store(state.api.store_timeout, state.store.list_posts(&filter)).await?;
    let items: Vec<PostListItemDto> = posts.iter().map(PostListItemDto::from_post).collect();
    Ok(ok_json(json!({
        "success": true,
        "posts": items,
        "count": items.len(),
    })))
}

pub(crate) async fn create_post_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let result = create_post(&state, &headers, &body).await;
    respond(&state, "/v1/posts", started, result).await
}

async fn create_post(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Response, ApiError> {
    let session = state.guard.authenticate(&state.store, headers).await?;
    let dto: CreatePostRequestDto = parse_body(body)?;
    let post = lifecycle::create_post(
        &state.store,
        state.api.store_timeout,
        &session.identity,
        dto,
    )
    .await?;
    info!(slug = %post.slug, author = %session.identity.email, "post created");
    let detail = PostDetailDto::from_post(&post, post.ledger.views);
    Ok(crate::http::handlers::with_refreshed_cookie(
        created_json(json!({ "success": true, "post": detail })),
        session.refreshed_cookie,
    ))
}

pub(crate) async fn get_post_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Response {
    let started = Instant::now();
    let result = get_post(&state, &headers, &slug).await;
    respond(&state, "/v1/posts/{slug}", started, result).await
}

async fn get_post(
    state: &AppState,
    headers: &HeaderMap,
    raw_slug: &str,
) -> Result<Response, ApiError> {
    let slug = parse_path_slug(raw_slug)?;
    let post = resolver::resolve(&state.store, state.api.store_timeout, &slug).await?;
    if post.status != PostStatus::Published {
        // Drafts are visible to their author and to admins; everyone else
        // sees the same generic not-found as a missing slug.
        let session = state
            .guard
            .authenticate(&state.store, headers)
            .await
            .map_err(|_| ApiError::not_found("post"))?;
        crate::guard::authorize_author_or_admin(&session.identity, &post)
            .map_err(|_| ApiError::not_found("post"))?;
    }
    let totals = state.views.read_total(&post).await;
    let detail = PostDetailDto::from_post(&post, totals.cumulative);
    Ok(ok_json(json!({ "success": true, "post": detail })))
}

pub(crate) async fn record_view_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Response {
    let started = Instant::now();
    let result = record_view(&state, &slug).await;
    respond(&state, "/v1/posts/{slug}/view", started, result).await
}

async fn record_view(state: &AppState, raw_slug: &str) -> Result<Response, ApiError> {
    let slug = parse_path_slug(raw_slug)?;
    let post = resolver::resolve(&state.store, state.api.store_timeout, &slug).await?;
    // Best-effort: the aggregator absorbs counter failures, so this is
    // always success-shaped once the slug resolves.
    state.views.record_view(&post.id).await;
    Ok(ok_json(json!({ "success": true, "message": "view counted" })))
}

pub(crate) async fn update_post_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let result = update_post(&state, &headers, &slug, &body).await;
    respond(&state, "/v1/posts/{slug}", started, result).await
}

async fn update_post(
    state: &AppState,
    headers: &HeaderMap,
    raw_slug: &str,
    body: &Bytes,
) -> Result<Response, ApiError> {
    let session = state.guard.authenticate(&state.store, headers).await?;
    let slug = parse_path_slug(raw_slug)?;
    let dto: UpdatePostRequestDto = parse_body(body)?;
    let post = lifecycle::update_post(
        &state.store,
        state.api.store_timeout,
        &session.identity,
        &slug,
        dto,
    )
    .await?;
    let detail = PostDetailDto::from_post(&post, post.ledger.views);
    Ok(crate::http::handlers::with_refreshed_cookie(
        ok_json(json!({ "success": true, "post": detail })),
        session.refreshed_cookie,
    ))
}

pub(crate) async fn delete_post_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let result = delete_post(&state, &headers, &slug, &params).await;
    respond(&state, "/v1/posts/{slug}", started, result).await
}

async fn delete_post(
    state: &AppState,
    headers: &HeaderMap,
    raw_slug: &str,
    params: &HashMap<String, String>,
) -> Result<Response, ApiError> {
    let session = state.guard.authenticate(&state.store, headers).await?;
    let slug = parse_path_slug(raw_slug)?;
    match params.get("action").map(String::as_str) {
        None => {
            let post = lifecycle::trash(
                &state.store,
                state.api.store_timeout,
                &session.identity,
                &slug,
            )
            .await?;
            info!(slug = %post.slug, "post moved to trash");
            Ok(ok_json(json!({ "success": true, "message": "moved to trash" })))
        }
        Some("destroy") => {
            lifecycle::purge(
                &state.store,
                state.api.store_timeout,
                &session.identity,
                &slug,
            )
            .await?;
            info!(slug = %slug, "post permanently deleted");
            Ok(ok_json(json!({ "success": true, "message": "permanently deleted" })))
        }
        Some(other) => Err(ApiError::invalid_param(
            "action",
            &format!("unknown delete action '{other}'"),
        )),
    }
}

pub(crate) async fn patch_post_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let result = patch_post(&state, &headers, &slug, &params).await;
    respond(&state, "/v1/posts/{slug}", started, result).await
}

async fn patch_post(
    state: &AppState,
    headers: &HeaderMap,
    raw_slug: &str,
    params: &HashMap<String, String>,
) -> Result<Response, ApiError> {
    let session = state.guard.authenticate(&state.store, headers).await?;
    let slug = parse_path_slug(raw_slug)?;
    let limit = state.api.store_timeout;
    let post = match params.get("action").map(String::as_str) {
        Some("restore") => {
            lifecycle::restore(&state.store, limit, &session.identity, &slug).await?
        }
        Some("publish") => {
            lifecycle::publish(&state.store, limit, &session.identity, &slug).await?
        }
        Some("unpublish") => {
            lifecycle::unpublish(&state.store, limit, &session.identity, &slug).await?
        }
        Some(other) => {
            return Err(ApiError::invalid_param(
                "action",
                &format!("unknown action '{other}'"),
            ))
        }
        None => {
            return Err(ApiError::invalid_param(
                "action",
                "one of restore, publish, unpublish is required",
            ))
        }
    };
    let item = PostListItemDto::from_post(&post);
    Ok(ok_json(json!({ "success": true, "post": item })))
}

pub(crate) async fn check_slug_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let result = check_slug(&state, &headers, &params).await;
    respond(&state, "/v1/posts/check-slug", started, result).await
}

async fn check_slug(
    state: &AppState,
    headers: &HeaderMap,
    params: &HashMap<String, String>,
) -> Result<Response, ApiError> {
    if !state
        .slug_limiter
        .allow(&client_key(headers), &state.api.slug_check_rate)
        .await
    {
        return Err(ApiError::rate_limited());
    }
    let raw = params
        .get("slug")
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::invalid_param("slug", "missing or empty"))?;
    let slug = Slug::parse(&raw)
        .map_err(|e| ApiError::invalid_param("slug", &e.to_string()))?;
    let availability =
        resolver::reserve(&state.store, state.api.store_timeout, &slug).await?;
    Ok(ok_json(json!(SlugCheckDto {
        slug: slug.as_str().to_string(),
        available: availability == resolver::SlugAvailability::Available,
    })))
}
