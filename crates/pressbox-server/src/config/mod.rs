use pressbox_store::CounterPolicy;
use serde::Serialize;
use std::time::Duration;

pub const CONFIG_SCHEMA_VERSION: &str = "1";

#[derive(Debug, Clone, Serialize)]
pub struct RateLimitConfig {
    pub capacity: f64,
    pub refill_per_sec: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 10.0,
            refill_per_sec: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiConfig {
    pub max_body_bytes: usize,
    /// Bound on every Content Store call made while handling a request.
    pub store_timeout: Duration,
    /// JWT signing secret. Must be non-empty at startup.
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub session_ttl: Duration,
    /// A valid token with less remaining lifetime than this gets an
    /// advisory refresh cookie alongside the response.
    pub session_refresh_window: Duration,
    pub cookie_secure: bool,
    /// Counter-store operational policy (timeouts, retries, breaker).
    #[serde(skip_serializing)]
    pub counter_policy: CounterPolicy,
    pub counter_prefix: String,
    /// Cadence of the background sweep that folds stale view buckets into
    /// the durable ledger.
    pub view_flush_interval: Duration,
    pub slug_check_rate: RateLimitConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 256 * 1024,
            store_timeout: Duration::from_secs(3),
            jwt_secret: String::new(),
            session_ttl: Duration::from_secs(24 * 60 * 60),
            session_refresh_window: Duration::from_secs(60 * 60),
            cookie_secure: false,
            counter_policy: CounterPolicy::default(),
            counter_prefix: "pressbox".to_string(),
            view_flush_interval: Duration::from_secs(60),
            slug_check_rate: RateLimitConfig::default(),
        }
    }
}

pub fn validate_startup_config_contract(api: &ApiConfig) -> Result<(), String> {
    if api.max_body_bytes == 0 {
        return Err("max_body_bytes must be > 0".to_string());
    }
    if api.store_timeout.is_zero() || api.counter_policy.timeout.is_zero() {
        return Err("timeouts must be > 0".to_string());
    }
    if api.jwt_secret.trim().is_empty() {
        return Err("jwt_secret must be set".to_string());
    }
    if api.session_ttl.is_zero() {
        return Err("session_ttl must be > 0".to_string());
    }
    if api.session_refresh_window >= api.session_ttl {
        return Err("session_refresh_window must be shorter than session_ttl".to_string());
    }
    if api.view_flush_interval.is_zero() {
        return Err("view_flush_interval must be > 0".to_string());
    }
    Ok(())
}
