// SPDX-License-Identifier: Apache-2.0

use super::{CounterError, CounterMetrics, CounterStore, ViewKey};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// In-memory counter backend for tests and the `memory` dev mode. The
/// mutex-per-call mirrors the atomicity redis gives each command.
#[derive(Default)]
pub struct MemoryCounterStore {
    buckets: Mutex<HashMap<ViewKey, u64>>,
    metrics: CounterMetrics,
    /// When set, every call errors, simulating an unreachable backend so
    /// tests can exercise the fail-open path.
    pub fail_all: AtomicBool,
}

impl MemoryCounterStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn check_available(&self) -> Result<(), CounterError> {
        if self.fail_all.load(Ordering::Relaxed) {
            self.metrics.fail_open_total.fetch_add(1, Ordering::Relaxed);
            return Err(CounterError("counter store unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn incr(&self, key: &ViewKey) -> Result<u64, CounterError> {
        self.check_available()?;
        let mut buckets = self.buckets.lock().await;
        let value = buckets.entry(key.clone()).or_insert(0);
        *value += 1;
        self.metrics.increments.fetch_add(1, Ordering::Relaxed);
        Ok(*value)
    }

    async fn get(&self, key: &ViewKey) -> Result<u64, CounterError> {
        self.check_available()?;
        let buckets = self.buckets.lock().await;
        self.metrics.reads.fetch_add(1, Ordering::Relaxed);
        Ok(buckets.get(key).copied().unwrap_or(0))
    }

    async fn take(&self, key: &ViewKey) -> Result<u64, CounterError> {
        self.check_available()?;
        let mut buckets = self.buckets.lock().await;
        self.metrics.takes.fetch_add(1, Ordering::Relaxed);
        Ok(buckets.remove(key).unwrap_or(0))
    }

    async fn restore(&self, key: &ViewKey, amount: u64) -> Result<(), CounterError> {
        self.check_available()?;
        let mut buckets = self.buckets.lock().await;
        *buckets.entry(key.clone()).or_insert(0) += amount;
        self.metrics.restores.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn tracked_keys(&self) -> Vec<ViewKey> {
        let buckets = self.buckets.lock().await;
        buckets.keys().cloned().collect()
    }

    fn metrics(&self) -> &CounterMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pressbox_core::DateKey;
    use pressbox_model::PostId;

    fn key() -> ViewKey {
        ViewKey::new(
            PostId::from_bytes([7; 12]),
            DateKey::parse("2025-03-09").expect("date"),
        )
    }

    #[tokio::test]
    async fn take_empties_the_bucket() {
        let store = MemoryCounterStore::new();
        store.incr(&key()).await.expect("incr");
        store.incr(&key()).await.expect("incr");
        assert_eq!(store.take(&key()).await.expect("take"), 2);
        assert_eq!(store.get(&key()).await.expect("get"), 0);
    }

    #[tokio::test]
    async fn restore_compensates_a_failed_merge() {
        let store = MemoryCounterStore::new();
        store.incr(&key()).await.expect("incr");
        let taken = store.take(&key()).await.expect("take");
        store.restore(&key(), taken).await.expect("restore");
        assert_eq!(store.get(&key()).await.expect("get"), 1);
    }

    #[tokio::test]
    async fn unavailable_backend_errors_every_call() {
        let store = MemoryCounterStore::new();
        store.fail_all.store(true, Ordering::Relaxed);
        assert!(store.incr(&key()).await.is_err());
        assert!(store.get(&key()).await.is_err());
    }
}
