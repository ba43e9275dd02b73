// SPDX-License-Identifier: Apache-2.0

use crate::guard::{hash_password, verify_password};
use crate::http::handlers::{created_json, ok_json, parse_body, respond, with_refreshed_cookie};
use crate::services::{bounded_store, new_user_id};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use chrono::Utc;
use pressbox_api::{
    ApiError, LoginRequestDto, LoginResponseDto, RegisterRequestDto, SessionUserDto,
};
use pressbox_model::{normalize_email, AccountStatus, Role, User};
use pressbox_store::ContentStore;
use serde_json::json;
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::info;

const MIN_PASSWORD_LEN: usize = 8;

pub(crate) async fn register_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let started = Instant::now();
    let result = register(&state, &body).await;
    respond(&state, "/v1/auth/register", started, result).await
}

async fn register(state: &AppState, body: &Bytes) -> Result<Response, ApiError> {
    let dto: RegisterRequestDto = parse_body(body)?;
    let email =
        normalize_email(&dto.email).map_err(|e| ApiError::validation_failed(e.to_string()))?;
    if dto.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation_failed(
            "password must be at least 8 characters",
        ));
    }
    if dto.name.trim().is_empty() {
        return Err(ApiError::validation_failed("name must not be empty"));
    }
    let now = Utc::now();
    let user = User {
        id: new_user_id(),
        email,
        password_hash: hash_password(&dto.password)?,
        display_name: dto.name.trim().to_string(),
        bio: dto.bio,
        avatar: dto.avatar,
        roles: BTreeSet::from([Role::Editor]),
        // New editors wait for admin approval before they can sign in.
        status: AccountStatus::Pending,
        created_at: now,
        updated_at: now,
    };
    bounded_store(state.api.store_timeout, state.store.insert_user(&user)).await?;
    info!(email = %user.email, "editor registered, pending approval");
    Ok(created_json(json!({
        "success": true,
        "status": user.status.as_str(),
    })))
}

pub(crate) async fn login_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let started = Instant::now();
    let result = login(&state, &body).await;
    respond(&state, "/v1/auth/login", started, result).await
}

async fn login(state: &AppState, body: &Bytes) -> Result<Response, ApiError> {
    let dto: LoginRequestDto = parse_body(body)?;
    let email =
        normalize_email(&dto.email).map_err(|_| bad_credentials())?;
    let user = bounded_store(
        state.api.store_timeout,
        state.store.find_user_by_email(&email),
    )
    .await?
    .ok_or_else(bad_credentials)?;
    if !verify_password(&user.password_hash, &dto.password) {
        return Err(bad_credentials());
    }
    if !user.may_authenticate() {
        return Err(ApiError::unauthenticated("account is not active"));
    }
    let token = state.guard.issue_token(&user)?;
    let mut response = ok_json(json!(LoginResponseDto {
        user: SessionUserDto::from_user(&user),
    }));
    if let Ok(value) = HeaderValue::from_str(&state.guard.session_cookie(&token)) {
        response.headers_mut().append("set-cookie", value);
    }
    info!(email = %user.email, "login");
    Ok(response)
}

// One message for unknown email and wrong password, so login probes learn
// nothing about which accounts exist.
fn bad_credentials() -> ApiError {
    ApiError::unauthenticated("invalid email or password")
}

pub(crate) async fn logout_handler(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let mut response = ok_json(json!({ "success": true }));
    if let Ok(value) = HeaderValue::from_str(&state.guard.clear_cookie()) {
        response.headers_mut().append("set-cookie", value);
    }
    state
        .metrics
        .observe_request("/v1/auth/logout", 200, started.elapsed())
        .await;
    response
}

pub(crate) async fn me_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let result = me(&state, &headers).await;
    respond(&state, "/v1/auth/me", started, result).await
}

async fn me(state: &AppState, headers: &HeaderMap) -> Result<Response, ApiError> {
    let session = state.guard.authenticate(&state.store, headers).await?;
    let user = bounded_store(
        state.api.store_timeout,
        state.store.find_user_by_id(&session.identity.user_id),
    )
    .await?
    .ok_or_else(|| ApiError::unauthenticated("unknown subject"))?;
    Ok(with_refreshed_cookie(
        ok_json(json!({ "success": true, "user": SessionUserDto::from_user(&user) })),
        session.refreshed_cookie,
    ))
}
