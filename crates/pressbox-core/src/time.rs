// SPDX-License-Identifier: Apache-2.0

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A UTC calendar date in `YYYY-MM-DD` form, used to bucket view counts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(String);

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DateKeyError {
    InvalidFormat,
}

impl Display for DateKeyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFormat => f.write_str("date key must be YYYY-MM-DD"),
        }
    }
}

impl std::error::Error for DateKeyError {}

impl DateKey {
    /// Today's bucket, in UTC.
    #[must_use]
    pub fn today() -> Self {
        Self(Utc::now().date_naive().format("%Y-%m-%d").to_string())
    }

    pub fn parse(input: &str) -> Result<Self, DateKeyError> {
        let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .map_err(|_| DateKeyError::InvalidFormat)?;
        Ok(Self(date.format("%Y-%m-%d").to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes() {
        let key = DateKey::parse("2025-03-09").expect("valid date");
        assert_eq!(key.as_str(), "2025-03-09");
        assert!(DateKey::parse("2025-3-9").is_err());
        assert!(DateKey::parse("not-a-date").is_err());
    }

    #[test]
    fn today_round_trips() {
        let today = DateKey::today();
        assert_eq!(DateKey::parse(today.as_str()).expect("round trip"), today);
    }

    #[test]
    fn orders_lexicographically_by_date() {
        let earlier = DateKey::parse("2025-01-31").expect("date");
        let later = DateKey::parse("2025-02-01").expect("date");
        assert!(earlier < later);
    }
}
