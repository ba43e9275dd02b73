#![forbid(unsafe_code)]
//! Pressbox HTTP server: slug-addressed content resolution with soft-delete
//! semantics, view aggregation over a fast counter store, and a JWT access
//! guard, served over axum.
//!
//! Store clients are constructed once at startup and injected through
//! [`AppState`]; no component reaches for ambient global state.

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

mod config;
mod guard;
mod http;
mod middleware;
mod rate_limiter;
mod services;
mod telemetry;

pub use config::{validate_startup_config_contract, ApiConfig, RateLimitConfig};
pub use guard::{
    authorize, authorize_author_or_admin, hash_password, verify_password, AccessGuard,
    AuthSession, Claims, Identity, SESSION_COOKIE,
};
pub use services::views::{ViewAggregator, ViewTotals};

use pressbox_store::{ContentStore, CounterStore};
use rate_limiter::RateLimiter;
use telemetry::RequestMetrics;

pub const CRATE_NAME: &str = "pressbox-server";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    pub counter: Arc<dyn CounterStore>,
    pub api: ApiConfig,
    pub guard: Arc<AccessGuard>,
    pub views: Arc<ViewAggregator>,
    pub(crate) metrics: Arc<RequestMetrics>,
    pub(crate) slug_limiter: Arc<RateLimiter>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(
        store: Arc<dyn ContentStore>,
        counter: Arc<dyn CounterStore>,
        api: ApiConfig,
    ) -> Self {
        let guard = Arc::new(AccessGuard::new(&api));
        let views = Arc::new(ViewAggregator::new(
            store.clone(),
            counter.clone(),
            api.store_timeout,
        ));
        Self {
            store,
            counter,
            api,
            guard,
            views,
            metrics: Arc::new(RequestMetrics::default()),
            slug_limiter: Arc::new(RateLimiter::default()),
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(http::handlers::healthz_handler))
        .route("/readyz", get(http::handlers::readyz_handler))
        .route("/metrics", get(http::handlers::metrics_handler))
        .route(
            "/v1/posts",
            get(http::posts::list_posts_handler).post(http::posts::create_post_handler),
        )
        .route("/v1/posts/check-slug", get(http::posts::check_slug_handler))
        .route(
            "/v1/posts/{slug}",
            get(http::posts::get_post_handler)
                .put(http::posts::update_post_handler)
                .delete(http::posts::delete_post_handler)
                .patch(http::posts::patch_post_handler),
        )
        .route(
            "/v1/posts/{slug}/view",
            axum::routing::post(http::posts::record_view_handler),
        )
        .route(
            "/v1/posts/{slug}/comments",
            get(http::comments::list_comments_handler)
                .post(http::comments::create_comment_handler),
        )
        .route(
            "/v1/comments/{id}",
            axum::routing::patch(http::comments::moderate_comment_handler)
                .delete(http::comments::delete_comment_handler),
        )
        .route("/v1/search", get(http::search::search_handler))
        .route(
            "/v1/auth/register",
            axum::routing::post(http::auth::register_handler),
        )
        .route(
            "/v1/auth/login",
            axum::routing::post(http::auth::login_handler),
        )
        .route(
            "/v1/auth/logout",
            axum::routing::post(http::auth::logout_handler),
        )
        .route("/v1/auth/me", get(http::auth::me_handler))
        .route("/v1/admin/editors", get(http::admin::list_editors_handler))
        .route(
            "/v1/admin/editors/{id}",
            axum::routing::patch(http::admin::editor_action_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::request_tracing::request_tracing_middleware,
        ))
        .layer(DefaultBodyLimit::max(state.api.max_body_bytes))
        .with_state(state)
}
