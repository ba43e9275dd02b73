// SPDX-License-Identifier: Apache-2.0

use pressbox_core::DateKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Durable view accounting for one post: a cumulative total plus an
/// append-only per-day ledger. The ephemeral counter store is a cache in
/// front of this ledger, never the system of record.
///
/// Invariant: `views >= sum(by_date.values())` at all times; the two are
/// equal for every day that has been merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewLedger {
    pub views: u64,
    pub by_date: BTreeMap<DateKey, u64>,
}

impl ViewLedger {
    #[must_use]
    pub fn ledger_sum(&self) -> u64 {
        self.by_date.values().sum()
    }

    /// Folds a merged counter delta into both the cumulative total and the
    /// day bucket. Buckets only ever grow; there is no decrement.
    pub fn merge(&mut self, date: DateKey, delta: u64) {
        if delta == 0 {
            return;
        }
        self.views = self.views.saturating_add(delta);
        *self.by_date.entry(date).or_insert(0) += delta;
    }

    /// The invariant the aggregator must preserve across merges.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.views >= self.ledger_sum()
    }
}
