// SPDX-License-Identifier: Apache-2.0

//! View aggregation: the fast counter store absorbs per-request increments,
//! and merges fold them into the durable ledger.
//!
//! Recording is fail-open: counting is best-effort analytics and must never
//! block content delivery, so counter-store failures on this path are
//! absorbed and surfaced only through metrics. Merges are the opposite:
//! take-then-increment with compensation, so a folded delta is never
//! double-counted and never lost.

use pressbox_core::DateKey;
use pressbox_model::{Post, PostId};
use pressbox_store::{ContentStore, CounterStore, StoreErrorCode, ViewKey};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

pub struct ViewAggregator {
    store: Arc<dyn ContentStore>,
    counter: Arc<dyn CounterStore>,
    store_timeout: Duration,
}

/// Merged totals for one post: the durable ledger plus today's
/// not-yet-folded delta. All prior days are assumed already folded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewTotals {
    pub cumulative: u64,
    pub today_unmerged: u64,
}

impl ViewAggregator {
    #[must_use]
    pub fn new(
        store: Arc<dyn ContentStore>,
        counter: Arc<dyn CounterStore>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            counter,
            store_timeout,
        }
    }

    /// Records one view against today's bucket. Always succeeds from the
    /// caller's perspective; an unreachable or timed-out counter store means
    /// the view silently goes uncounted.
    pub async fn record_view(&self, post_id: &PostId) {
        let key = ViewKey::new(post_id.clone(), DateKey::today());
        if let Err(err) = self.counter.incr(&key).await {
            debug!(post_id = %post_id, error = %err, "view increment dropped (fail-open)");
        }
    }

    /// Durable total plus today's unmerged delta. Counter failures degrade
    /// to the durable number alone.
    pub async fn read_total(&self, post: &Post) -> ViewTotals {
        let key = ViewKey::new(post.id.clone(), DateKey::today());
        let today_unmerged = self.counter.get(&key).await.unwrap_or(0);
        ViewTotals {
            cumulative: post.ledger.views.saturating_add(today_unmerged),
            today_unmerged,
        }
    }

    /// Folds one bucket into the durable ledger. The counter take is atomic
    /// (increments racing with it land in a fresh bucket), and a failed
    /// durable write restores the taken value, so the delta is neither
    /// double-counted nor lost.
    pub async fn merge_bucket(&self, key: &ViewKey) {
        let taken = match self.counter.take(key).await {
            Ok(0) => return,
            Ok(v) => v,
            Err(err) => {
                debug!(key = %key, error = %err, "counter take failed; bucket left for next sweep");
                return;
            }
        };
        let merge = timeout(
            self.store_timeout,
            self.store.merge_views(&key.post_id, &key.date, taken),
        )
        .await;
        let failed = match merge {
            Ok(Ok(())) => false,
            // The post was purged; its pending views have nowhere to go.
            Ok(Err(err)) if err.code == StoreErrorCode::NotFound => {
                debug!(key = %key, "dropping delta for a purged post");
                false
            }
            Ok(Err(err)) => {
                warn!(key = %key, error = %err, "durable view merge failed");
                true
            }
            Err(_) => {
                warn!(key = %key, "durable view merge timed out");
                true
            }
        };
        if failed {
            if let Err(err) = self.counter.restore(key, taken).await {
                // Worst case is an undercount, never a double count.
                warn!(key = %key, amount = taken, error = %err, "failed to restore taken delta");
            }
        }
    }

    /// Sweeps every tracked bucket strictly older than today. Today's
    /// bucket stays live so `read_total` keeps its "durable + today" shape.
    pub async fn flush_stale(&self) {
        let today = DateKey::today();
        for key in self.counter.tracked_keys().await {
            if key.date < today {
                self.merge_bucket(&key).await;
            }
        }
    }

    /// Folds everything, including today's bucket. Used at shutdown and by
    /// tests; `read_total` stays correct because a folded bucket reads back
    /// as zero.
    pub async fn flush_all(&self) {
        for key in self.counter.tracked_keys().await {
            self.merge_bucket(&key).await;
        }
    }

    /// Background sweep loop; runs until the process exits.
    pub async fn run_flush_loop(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.flush_stale().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pressbox_model::{AuthorRef, PostStatus, Slug, ViewLedger};
    use pressbox_store::{MemoryCounterStore, MemoryStore};
    use std::collections::BTreeSet;
    use std::sync::atomic::Ordering;

    fn sample_post() -> Post {
        Post {
            id: PostId::from_bytes([4; 12]),
            slug: Slug::parse("rental-fraud-101").expect("slug"),
            title: "Rental Fraud 101".to_string(),
            subtitle: None,
            excerpt: None,
            body: "<p>body</p>".to_string(),
            featured_image: None,
            tags: BTreeSet::new(),
            category: "uncategorized".to_string(),
            meta_title: None,
            meta_description: None,
            keywords: None,
            author: AuthorRef::Denormalized {
                name: "Admin".to_string(),
            },
            status: PostStatus::Published,
            deleted: false,
            ledger: ViewLedger::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn aggregator() -> (Arc<MemoryStore>, Arc<MemoryCounterStore>, ViewAggregator) {
        let store = Arc::new(MemoryStore::new());
        let counter = Arc::new(MemoryCounterStore::new());
        let agg = ViewAggregator::new(
            store.clone() as Arc<dyn ContentStore>,
            counter.clone() as Arc<dyn CounterStore>,
            Duration::from_secs(1),
        );
        (store, counter, agg)
    }

    #[tokio::test]
    async fn three_views_read_back_before_any_merge() {
        let (store, _counter, agg) = aggregator();
        let post = sample_post();
        store.insert_post(&post).await.expect("insert");
        for _ in 0..3 {
            agg.record_view(&post.id).await;
        }
        let totals = agg.read_total(&post).await;
        assert_eq!(totals.cumulative, 3);
        assert_eq!(totals.today_unmerged, 3);
    }

    #[tokio::test]
    async fn merge_folds_into_ledger_without_double_counting() {
        let (store, _counter, agg) = aggregator();
        let post = sample_post();
        store.insert_post(&post).await.expect("insert");
        for _ in 0..3 {
            agg.record_view(&post.id).await;
        }
        agg.flush_all().await;

        let merged = store
            .find_post_by_id(&post.id)
            .await
            .expect("lookup")
            .expect("post");
        assert_eq!(merged.ledger.views, 3);
        assert_eq!(merged.ledger.ledger_sum(), 3);
        assert!(merged.ledger.is_consistent());

        // The folded bucket reads back as zero, so the merged total is
        // unchanged rather than doubled.
        let totals = agg.read_total(&merged).await;
        assert_eq!(totals.cumulative, 3);
        assert_eq!(totals.today_unmerged, 0);

        // A second sweep with nothing pending is a no-op.
        agg.flush_all().await;
        let again = store
            .find_post_by_id(&post.id)
            .await
            .expect("lookup")
            .expect("post");
        assert_eq!(again.ledger.views, 3);
    }

    #[tokio::test]
    async fn record_view_fails_open_when_counter_is_down() {
        let (store, counter, agg) = aggregator();
        let post = sample_post();
        store.insert_post(&post).await.expect("insert");
        counter.fail_all.store(true, Ordering::Relaxed);

        agg.record_view(&post.id).await;
        let totals = agg.read_total(&post).await;
        assert_eq!(totals.cumulative, 0);
        assert_eq!(counter.metrics().snapshot().increments, 0);
    }

    #[tokio::test]
    async fn failed_durable_merge_restores_the_taken_delta() {
        let (store, counter, agg) = aggregator();
        let post = sample_post();
        store.insert_post(&post).await.expect("insert");
        for _ in 0..2 {
            agg.record_view(&post.id).await;
        }

        store.fail_all.store(true, Ordering::Relaxed);
        agg.flush_all().await;
        store.fail_all.store(false, Ordering::Relaxed);

        // The delta survived the outage and folds on the next sweep.
        let totals = agg.read_total(&post).await;
        assert_eq!(totals.today_unmerged, 2);
        agg.flush_all().await;
        let merged = store
            .find_post_by_id(&post.id)
            .await
            .expect("lookup")
            .expect("post");
        assert_eq!(merged.ledger.views, 2);
    }

    #[tokio::test]
    async fn totals_never_decrease_across_merges() {
        let (store, _counter, agg) = aggregator();
        let post = sample_post();
        store.insert_post(&post).await.expect("insert");

        let mut last = 0;
        for round in 0..4 {
            agg.record_view(&post.id).await;
            if round % 2 == 0 {
                agg.flush_all().await;
            }
            let current = store
                .find_post_by_id(&post.id)
                .await
                .expect("lookup")
                .expect("post");
            let totals = agg.read_total(&current).await;
            assert!(totals.cumulative >= last);
            last = totals.cumulative;
        }
        assert_eq!(last, 4);
    }
}
