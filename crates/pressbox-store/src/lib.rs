#![forbid(unsafe_code)]
//! Storage backends for pressbox.
//!
//! The [`ContentStore`] is the durable system of record for posts, comments,
//! and users; slug uniqueness and lifecycle compare-and-swap live at this
//! layer, delegated to the backing store's native atomic operations. The
//! [`CounterStore`] is the ephemeral write-absorber in front of the view
//! ledger and is allowed to fail open.

mod content;
mod counter;
mod error;
mod memory;
mod mongo;

pub use content::{CasOutcome, ContentStore, PostFilter};
pub use counter::{
    CounterError, CounterMetrics, CounterMetricsSnapshot, CounterPolicy, CounterStore,
    MemoryCounterStore, RedisCounterStore, ViewKey,
};
pub use error::{StoreError, StoreErrorCode};
pub use memory::MemoryStore;
pub use mongo::MongoStore;

pub const CRATE_NAME: &str = "pressbox-store";
