// SPDX-License-Identifier: Apache-2.0

use crate::guard::authorize;
use crate::http::handlers::{ok_json, parse_body, respond, with_refreshed_cookie};
use crate::services::bounded_store;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use pressbox_api::{ApiError, EditorActionDto, SessionUserDto};
use pressbox_model::{AccountStatus, Role, UserId};
use pressbox_store::ContentStore;
use serde_json::json;
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

pub(crate) async fn list_editors_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let started = Instant::now();
    let result = list_editors(&state, &headers, &params).await;
    respond(&state, "/v1/admin/editors", started, result).await
}

async fn list_editors(
    state: &AppState,
    headers: &HeaderMap,
    params: &HashMap<String, String>,
) -> Result<Response, ApiError> {
    let session = state.guard.authenticate(&state.store, headers).await?;
    authorize(&session.identity, Role::Admin)?;
    let status = match params.get("status").map(String::as_str) {
        None => AccountStatus::Pending,
        Some(raw) => AccountStatus::parse(raw)
            .map_err(|e| ApiError::invalid_param("status", &e.to_string()))?,
    };
    let users = bounded_store(
        state.api.store_timeout,
        state.store.list_users_by_status(status),
    )
    .await?;
    let items: Vec<SessionUserDto> = users.iter().map(SessionUserDto::from_user).collect();
    Ok(with_refreshed_cookie(
        ok_json(json!({ "success": true, "editors": items })),
        session.refreshed_cookie,
    ))
}

pub(crate) async fn editor_action_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let result = editor_action(&state, &headers, &id, &body).await;
    respond(&state, "/v1/admin/editors/{id}", started, result).await
}

async fn editor_action(
    state: &AppState,
    headers: &HeaderMap,
    raw_id: &str,
    body: &Bytes,
) -> Result<Response, ApiError> {
    let session = state.guard.authenticate(&state.store, headers).await?;
    authorize(&session.identity, Role::Admin)?;
    let id = UserId::parse(raw_id).map_err(|_| ApiError::not_found("user"))?;
    let dto: EditorActionDto = parse_body(body)?;
    let status = match dto.action.as_str() {
        "approve" => AccountStatus::Active,
        "reject" => AccountStatus::Rejected,
        other => {
            return Err(ApiError::validation_failed(format!(
                "unknown action '{other}'; expected approve or reject"
            )))
        }
    };
    let user = bounded_store(
        state.api.store_timeout,
        state.store.set_user_status(&id, status),
    )
    .await?
    .ok_or_else(|| ApiError::not_found("user"))?;
    info!(email = %user.email, status = status.as_str(), "editor status updated");
    Ok(ok_json(json!({
        "success": true,
        "user": SessionUserDto::from_user(&user),
    })))
}
