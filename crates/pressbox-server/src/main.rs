#![forbid(unsafe_code)]

use pressbox_server::{build_router, validate_startup_config_contract, ApiConfig, AppState};
use pressbox_store::{
    ContentStore, CounterPolicy, CounterStore, MemoryCounterStore, MemoryStore, MongoStore,
    RedisCounterStore,
};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_str(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let api = ApiConfig {
        max_body_bytes: env_u64("PRESSBOX_MAX_BODY_BYTES", 256 * 1024) as usize,
        store_timeout: Duration::from_millis(env_u64("PRESSBOX_STORE_TIMEOUT_MS", 3000)),
        jwt_secret: env_str("PRESSBOX_JWT_SECRET", ""),
        session_ttl: Duration::from_secs(env_u64("PRESSBOX_SESSION_TTL_SECS", 24 * 60 * 60)),
        session_refresh_window: Duration::from_secs(env_u64(
            "PRESSBOX_SESSION_REFRESH_SECS",
            60 * 60,
        )),
        cookie_secure: env_bool("PRESSBOX_COOKIE_SECURE", false),
        counter_policy: CounterPolicy {
            timeout: Duration::from_millis(env_u64("PRESSBOX_COUNTER_TIMEOUT_MS", 50)),
            retry_attempts: env_u64("PRESSBOX_COUNTER_RETRIES", 2) as usize,
            breaker_failure_threshold: env_u64("PRESSBOX_COUNTER_BREAKER_THRESHOLD", 8) as u32,
            breaker_open_duration: Duration::from_millis(env_u64(
                "PRESSBOX_COUNTER_BREAKER_OPEN_MS",
                3000,
            )),
        },
        counter_prefix: env_str("PRESSBOX_COUNTER_PREFIX", "pressbox"),
        view_flush_interval: Duration::from_secs(env_u64("PRESSBOX_VIEW_FLUSH_SECS", 60)),
        ..ApiConfig::default()
    };
    if let Err(err) = validate_startup_config_contract(&api) {
        error!(error = %err, "invalid startup configuration");
        std::process::exit(2);
    }

    let store: Arc<dyn ContentStore> = match env_str("PRESSBOX_STORE", "mongo").as_str() {
        "memory" => {
            warn!("using the in-memory content store; data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
        _ => {
            let uri = env_str("MONGODB_URI", "mongodb://127.0.0.1:27017");
            let db = env_str("MONGODB_DB", "pressbox");
            match MongoStore::connect(&uri, &db).await {
                Ok(store) => Arc::new(store),
                Err(err) => {
                    error!(error = %err, "failed to connect to the content store");
                    std::process::exit(1);
                }
            }
        }
    };

    let counter: Arc<dyn CounterStore> = match env::var("REDIS_URL") {
        Ok(url) => match RedisCounterStore::new(&url, &api.counter_prefix, api.counter_policy.clone())
        {
            Ok(counter) => Arc::new(counter),
            Err(err) => {
                // Counting is best-effort; a bad counter config degrades to
                // in-process counters instead of refusing to start.
                warn!(error = %err, "redis counter unavailable, falling back to in-process counters");
                Arc::new(MemoryCounterStore::new())
            }
        },
        Err(_) => {
            warn!("REDIS_URL not set; using in-process view counters");
            Arc::new(MemoryCounterStore::new())
        }
    };

    let state = AppState::new(store, counter, api);
    tokio::spawn(
        state
            .views
            .clone()
            .run_flush_loop(state.api.view_flush_interval),
    );

    let bind = env_str("PRESSBOX_BIND", "0.0.0.0:8080");
    let listener = match TcpListener::bind(&bind).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, bind = %bind, "failed to bind listener");
            std::process::exit(1);
        }
    };
    info!(bind = %bind, store = state.store.backend_tag(), counter = state.counter.backend_tag(), "pressbox-server listening");

    let app = build_router(state);
    if let Err(err) = axum::serve(listener, app).await {
        error!(error = %err, "server exited with error");
        std::process::exit(1);
    }
}
