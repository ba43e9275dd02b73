// SPDX-License-Identifier: Apache-2.0

//! Fast counter store: absorbs high-frequency view increments ahead of the
//! durable ledger. Increments are atomic per key and independent across
//! keys; the whole store is allowed to fail open on the recording path.

mod memory;
mod redis_backend;

pub use memory::MemoryCounterStore;
pub use redis_backend::RedisCounterStore;

use async_trait::async_trait;
use pressbox_core::DateKey;
use pressbox_model::PostId;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counter key: one bucket per post per UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewKey {
    pub post_id: PostId,
    pub date: DateKey,
}

impl ViewKey {
    #[must_use]
    pub fn new(post_id: PostId, date: DateKey) -> Self {
        Self { post_id, date }
    }
}

impl Display for ViewKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.post_id, self.date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterError(pub String);

impl Display for CounterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for CounterError {}

/// Operational policy for the counter backend: every external call is
/// bounded by `timeout`, retried a bounded number of times, and shielded
/// by a circuit breaker so a dead backend cannot slow the read path down.
#[derive(Clone, Debug)]
pub struct CounterPolicy {
    pub timeout: Duration,
    pub retry_attempts: usize,
    pub breaker_failure_threshold: u32,
    pub breaker_open_duration: Duration,
}

impl Default for CounterPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(50),
            retry_attempts: 2,
            breaker_failure_threshold: 8,
            breaker_open_duration: Duration::from_millis(3000),
        }
    }
}

#[derive(Default)]
pub struct CounterMetrics {
    pub increments: AtomicU64,
    pub reads: AtomicU64,
    pub takes: AtomicU64,
    pub restores: AtomicU64,
    pub fail_open_total: AtomicU64,
    pub breaker_open_total: AtomicU64,
    pub breaker_reject_total: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CounterMetricsSnapshot {
    pub increments: u64,
    pub reads: u64,
    pub takes: u64,
    pub restores: u64,
    pub fail_open_total: u64,
    pub breaker_open_total: u64,
    pub breaker_reject_total: u64,
}

impl CounterMetrics {
    #[must_use]
    pub fn snapshot(&self) -> CounterMetricsSnapshot {
        CounterMetricsSnapshot {
            increments: self.increments.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            takes: self.takes.load(Ordering::Relaxed),
            restores: self.restores.load(Ordering::Relaxed),
            fail_open_total: self.fail_open_total.load(Ordering::Relaxed),
            breaker_open_total: self.breaker_open_total.load(Ordering::Relaxed),
            breaker_reject_total: self.breaker_reject_total.load(Ordering::Relaxed),
        }
    }
}

/// Ephemeral per-key counters. Never the system of record: a lost counter
/// is an undercount, never corruption.
#[async_trait]
pub trait CounterStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    /// Atomic increment-by-one; returns the new value.
    async fn incr(&self, key: &ViewKey) -> Result<u64, CounterError>;

    /// Current value, zero when absent.
    async fn get(&self, key: &ViewKey) -> Result<u64, CounterError>;

    /// Atomically reads and removes the bucket, returning the taken value.
    /// The take is what makes a merge immune to double-counting: increments
    /// racing with the take land in a fresh bucket.
    async fn take(&self, key: &ViewKey) -> Result<u64, CounterError>;

    /// Adds a previously-taken value back, used to compensate when the
    /// durable merge fails after a successful take (never-lost guarantee).
    async fn restore(&self, key: &ViewKey, amount: u64) -> Result<(), CounterError>;

    /// Keys this process has incremented and not yet merged. Advisory: the
    /// flush loop sweeps these.
    async fn tracked_keys(&self) -> Vec<ViewKey>;

    fn metrics(&self) -> &CounterMetrics;
}
