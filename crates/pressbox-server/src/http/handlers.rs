// SPDX-License-Identifier: Apache-2.0

//! Shared handler plumbing: error envelopes, request metrics, body parsing,
//! and the ops endpoints.

use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use pressbox_api::ApiError;
use pressbox_model::Slug;
use pressbox_store::{ContentStore, CounterStore};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Instant;

pub(crate) fn api_error_response(err: &ApiError) -> Response {
    let status =
        StatusCode::from_u16(err.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({ "error": err }))).into_response()
}

pub(crate) fn ok_json(payload: Value) -> Response {
    Json(payload).into_response()
}

pub(crate) fn created_json(payload: Value) -> Response {
    (StatusCode::CREATED, Json(payload)).into_response()
}

/// Finishes a handler: records route metrics and turns an [`ApiError`] into
/// the error envelope.
pub(crate) async fn respond(
    state: &AppState,
    route: &'static str,
    started: Instant,
    result: Result<Response, ApiError>,
) -> Response {
    let response = match result {
        Ok(resp) => resp,
        Err(err) => api_error_response(&err),
    };
    state
        .metrics
        .observe_request(route, response.status().as_u16(), started.elapsed())
        .await;
    response
}

/// Parses a JSON body into a request DTO, mapping malformed input to
/// `ValidationFailed` so the error envelope stays uniform.
pub(crate) fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice::<T>(body)
        .map_err(|e| ApiError::validation_failed(format!("invalid request body: {e}")))
}

/// Path slugs are matched verbatim after trimming and lowercasing; anything
/// non-canonical cannot name a post, which public callers see as the same
/// generic not-found as a missing one.
pub(crate) fn parse_path_slug(raw: &str) -> Result<Slug, ApiError> {
    let normalized = raw.trim().to_ascii_lowercase();
    Slug::parse(&normalized).map_err(|_| ApiError::not_found("post"))
}

/// Attaches a `Set-Cookie` header when authentication produced an advisory
/// session refresh.
pub(crate) fn with_refreshed_cookie(mut response: Response, cookie: Option<String>) -> Response {
    if let Some(cookie) = cookie {
        if let Ok(value) = axum::http::HeaderValue::from_str(&cookie) {
            response.headers_mut().append("set-cookie", value);
        }
    }
    response
}

/// Client key for rate limiting: first hop of `x-forwarded-for`, else a
/// shared anonymous bucket.
pub(crate) fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "anonymous".to_string())
}

pub(crate) async fn healthz_handler() -> Response {
    ok_json(json!({ "status": "ok" }))
}

pub(crate) async fn readyz_handler(State(state): State<AppState>) -> Response {
    // Readiness follows the Content Store: a dead store means this replica
    // cannot serve anything useful.
    match state
        .store
        .list_posts(&pressbox_store::PostFilter {
            deleted: Some(false),
            published_only: true,
            category: None,
            limit: 1,
            offset: 0,
        })
        .await
    {
        Ok(_) => ok_json(json!({ "status": "ready", "store": state.store.backend_tag() })),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unready", "error": err.to_string() })),
        )
            .into_response(),
    }
}

pub(crate) async fn metrics_handler(State(state): State<AppState>) -> Response {
    let counter_snapshot = state.counter.metrics().snapshot();
    let text = state
        .metrics
        .render_prometheus(&counter_snapshot)
        .await;
    (
        [("content-type", "text/plain; version=0.0.4")],
        text,
    )
        .into_response()
}
