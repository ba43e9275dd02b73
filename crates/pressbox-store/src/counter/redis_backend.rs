// SPDX-License-Identifier: Apache-2.0

use super::{CounterError, CounterMetrics, CounterPolicy, CounterStore, ViewKey};
use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::timeout;

// Counter buckets expire on their own so an abandoned key cannot leak
// forever; the flush loop normally folds them long before this.
const BUCKET_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Default)]
struct BreakerState {
    failure_count: u32,
    open_until: Option<Instant>,
}

/// Redis-backed [`CounterStore`]. Every command is bounded by the policy
/// timeout and retried a bounded number of times; repeated failures open a
/// circuit breaker that rejects calls outright until it half-opens again.
/// Callers on the view-recording path treat any error here as fail-open.
pub struct RedisCounterStore {
    client: redis::Client,
    prefix: String,
    policy: CounterPolicy,
    breaker: Mutex<BreakerState>,
    key_registry: Mutex<HashSet<ViewKey>>,
    metrics: CounterMetrics,
}

impl RedisCounterStore {
    pub fn new(url: &str, prefix: &str, policy: CounterPolicy) -> Result<Self, CounterError> {
        let client = redis::Client::open(url).map_err(|e| CounterError(e.to_string()))?;
        Ok(Self {
            client,
            prefix: prefix.to_string(),
            policy,
            breaker: Mutex::new(BreakerState::default()),
            key_registry: Mutex::new(HashSet::new()),
            metrics: CounterMetrics::default(),
        })
    }

    fn redis_key(&self, key: &ViewKey) -> String {
        format!("{}:view:{}:{}", self.prefix, key.post_id, key.date)
    }

    async fn breaker_check(&self) -> Result<(), CounterError> {
        let lock = self.breaker.lock().await;
        if let Some(until) = lock.open_until {
            if Instant::now() < until {
                self.metrics
                    .breaker_reject_total
                    .fetch_add(1, Ordering::Relaxed);
                return Err(CounterError("counter breaker open".to_string()));
            }
        }
        Ok(())
    }

    async fn record_failure(&self, msg: String) -> CounterError {
        self.metrics.fail_open_total.fetch_add(1, Ordering::Relaxed);
        let mut lock = self.breaker.lock().await;
        lock.failure_count += 1;
        if lock.failure_count >= self.policy.breaker_failure_threshold {
            lock.open_until = Some(Instant::now() + self.policy.breaker_open_duration);
            self.metrics
                .breaker_open_total
                .fetch_add(1, Ordering::Relaxed);
        }
        CounterError(msg)
    }

    async fn record_success(&self) {
        let mut lock = self.breaker.lock().await;
        lock.failure_count = 0;
        lock.open_until = None;
    }

    async fn with_retry<T, Fut, F>(&self, mut op: F) -> Result<T, String>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, String>>,
    {
        let attempts = self.policy.retry_attempts.max(1);
        let mut last = None;
        for i in 0..attempts {
            match timeout(self.policy.timeout, op()).await {
                Ok(Ok(v)) => return Ok(v),
                Ok(Err(e)) => last = Some(e),
                Err(_) => last = Some("counter store timeout".to_string()),
            }
            if i + 1 < attempts {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        }
        Err(last.unwrap_or_else(|| "counter store failure".to_string()))
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, String> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    fn backend_tag(&self) -> &'static str {
        "redis"
    }

    async fn incr(&self, key: &ViewKey) -> Result<u64, CounterError> {
        self.breaker_check().await?;
        let redis_key = self.redis_key(key);
        let result = self
            .with_retry(|| {
                let redis_key = redis_key.clone();
                async move {
                    let mut conn = self.connection().await?;
                    let value: i64 = conn
                        .incr(&redis_key, 1_i64)
                        .await
                        .map_err(|e| e.to_string())?;
                    let _: bool = conn
                        .expire(&redis_key, BUCKET_TTL_SECS)
                        .await
                        .map_err(|e| e.to_string())?;
                    Ok(value.max(0) as u64)
                }
            })
            .await;
        match result {
            Ok(v) => {
                self.record_success().await;
                self.metrics.increments.fetch_add(1, Ordering::Relaxed);
                self.key_registry.lock().await.insert(key.clone());
                Ok(v)
            }
            Err(e) => Err(self.record_failure(e).await),
        }
    }

    async fn get(&self, key: &ViewKey) -> Result<u64, CounterError> {
        self.breaker_check().await?;
        let redis_key = self.redis_key(key);
        let result = self
            .with_retry(|| {
                let redis_key = redis_key.clone();
                async move {
                    let mut conn = self.connection().await?;
                    let value: Option<i64> =
                        conn.get(&redis_key).await.map_err(|e| e.to_string())?;
                    Ok(value.unwrap_or(0).max(0) as u64)
                }
            })
            .await;
        match result {
            Ok(v) => {
                self.record_success().await;
                self.metrics.reads.fetch_add(1, Ordering::Relaxed);
                Ok(v)
            }
            Err(e) => Err(self.record_failure(e).await),
        }
    }

    async fn take(&self, key: &ViewKey) -> Result<u64, CounterError> {
        self.breaker_check().await?;
        let redis_key = self.redis_key(key);
        // GETDEL is the atomic read-and-remove; increments racing with it
        // land in a fresh bucket and survive for the next merge.
        let result = self
            .with_retry(|| {
                let redis_key = redis_key.clone();
                async move {
                    let mut conn = self.connection().await?;
                    let value: Option<i64> =
                        conn.get_del(&redis_key).await.map_err(|e| e.to_string())?;
                    Ok(value.unwrap_or(0).max(0) as u64)
                }
            })
            .await;
        match result {
            Ok(v) => {
                self.record_success().await;
                self.metrics.takes.fetch_add(1, Ordering::Relaxed);
                self.key_registry.lock().await.remove(key);
                Ok(v)
            }
            Err(e) => Err(self.record_failure(e).await),
        }
    }

    async fn restore(&self, key: &ViewKey, amount: u64) -> Result<(), CounterError> {
        if amount == 0 {
            return Ok(());
        }
        self.breaker_check().await?;
        let redis_key = self.redis_key(key);
        let result = self
            .with_retry(|| {
                let redis_key = redis_key.clone();
                async move {
                    let mut conn = self.connection().await?;
                    let _: i64 = conn
                        .incr(&redis_key, amount as i64)
                        .await
                        .map_err(|e| e.to_string())?;
                    Ok(())
                }
            })
            .await;
        match result {
            Ok(()) => {
                self.record_success().await;
                self.metrics.restores.fetch_add(1, Ordering::Relaxed);
                self.key_registry.lock().await.insert(key.clone());
                Ok(())
            }
            Err(e) => Err(self.record_failure(e).await),
        }
    }

    async fn tracked_keys(&self) -> Vec<ViewKey> {
        self.key_registry.lock().await.iter().cloned().collect()
    }

    fn metrics(&self) -> &CounterMetrics {
        &self.metrics
    }
}
