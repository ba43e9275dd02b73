#![forbid(unsafe_code)]
//! Shared primitives: slug canonicalization and calendar-date keys.

mod slug;
mod time;

pub use slug::{canonical_slug, is_canonical_slug, SLUG_MAX_LEN};
pub use time::{DateKey, DateKeyError};

pub const CRATE_NAME: &str = "pressbox-core";
