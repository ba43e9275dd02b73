// SPDX-License-Identifier: Apache-2.0

use crate::http::handlers::{ok_json, respond};
use crate::services::{bounded_store, search};
use crate::AppState;
use axum::extract::{Query, State};
use axum::response::Response;
use pressbox_api::{parse_search_params, ApiError, SearchHitDto, SearchResponseDto};
use pressbox_store::{ContentStore, PostFilter};
use serde_json::json;
use std::collections::HashMap;
use std::time::Instant;

pub(crate) async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let result = run_search(&state, &params).await;
    respond(&state, "/v1/search", started, result).await
}

async fn run_search(
    state: &AppState,
    params: &HashMap<String, String>,
) -> Result<Response, ApiError> {
    let parsed = parse_search_params(params)?;
    // Rebuilt from the store on every query; fine at blog scale.
    let corpus = bounded_store(
        state.api.store_timeout,
        state.store.list_posts(&PostFilter {
            deleted: Some(false),
            published_only: true,
            category: None,
            limit: 0,
            offset: 0,
        }),
    )
    .await?;
    let hits = search::search_posts(&corpus, &parsed.query);
    let total = hits.len();
    let start = (parsed.page - 1) * parsed.page_size;
    let results: Vec<SearchHitDto> = hits
        .into_iter()
        .skip(start)
        .take(parsed.page_size)
        .map(|h| SearchHitDto {
            slug: h.slug,
            title: h.title,
            excerpt: h.excerpt,
            score: h.score,
        })
        .collect();
    Ok(ok_json(json!(SearchResponseDto {
        results,
        total,
        page: parsed.page,
    })))
}
