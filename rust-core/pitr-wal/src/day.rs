// SPDX-License-Identifier: PMPL-1.0-or-later
//
// PITR WAL analysis - Archive days
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Every archive namespace in the store is a calendar date in `YYYY-MM-DD`
// form holding that day's base backup, WAL segments and metadata.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{WalError, WalResult};

/// Text format of an archive day.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// One archive namespace, identified by its calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchiveDay(NaiveDate);

impl ArchiveDay {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parse a `YYYY-MM-DD` namespace name.
    pub fn parse(text: &str) -> WalResult<Self> {
        let trimmed = text.trim().trim_end_matches('/');
        NaiveDate::parse_from_str(trimmed, DAY_FORMAT)
            .map(Self)
            .map_err(|_| WalError::InvalidDay(text.to_string()))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The day before this one.
    pub fn previous(&self) -> Option<Self> {
        self.0.pred_opt().map(Self)
    }

    /// UTC midnight of this day.
    ///
    /// Used as the timestamp of staged segment files whose modification time
    /// was lost in transit.
    pub fn fallback_timestamp(&self) -> DateTime<Utc> {
        self.0.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// A display timestamp for stores that report placeholder times for
    /// folders: midnight of the date shifted by `offset`.
    pub fn placeholder_corrected(&self, offset: Duration) -> DateTime<Utc> {
        self.fallback_timestamp() + offset
    }
}

impl fmt::Display for ArchiveDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DAY_FORMAT))
    }
}

impl FromStr for ArchiveDay {
    type Err = WalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<NaiveDate> for ArchiveDay {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

/// Returns `true` when `timestamp` is a placeholder rather than a real
/// modification time (some stores report year 2000 or the epoch when they
/// have no metadata for an object).
pub fn is_placeholder_timestamp(timestamp: &DateTime<Utc>, cutoff_year: i32) -> bool {
    timestamp.year() <= cutoff_year
}

/// An archive day as exposed to callers of the listing operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayEntry {
    pub date: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_and_display() {
        let day = ArchiveDay::parse("2024-03-01").unwrap();
        assert_eq!(day.to_string(), "2024-03-01");
        assert_eq!("2024-03-01/".parse::<ArchiveDay>().unwrap(), day);
    }

    #[test]
    fn test_parse_rejects_non_dates() {
        assert!(ArchiveDay::parse("WAL").is_err());
        assert!(ArchiveDay::parse("2024-13-01").is_err());
        assert!(ArchiveDay::parse("").is_err());
    }

    #[test]
    fn test_fallback_timestamp_is_utc_midnight() {
        let day = ArchiveDay::parse("2024-03-01").unwrap();
        assert_eq!(
            day.fallback_timestamp(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_placeholder_corrected_applies_offset() {
        let day = ArchiveDay::parse("2024-03-01").unwrap();
        assert_eq!(
            day.placeholder_corrected(Duration::hours(5)),
            Utc.with_ymd_and_hms(2024, 3, 1, 5, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_previous_day() {
        let day = ArchiveDay::parse("2024-03-01").unwrap();
        assert_eq!(day.previous().unwrap().to_string(), "2024-02-29");
    }

    #[test]
    fn test_placeholder_detection() {
        let placeholder = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let real = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert!(is_placeholder_timestamp(&placeholder, 2000));
        assert!(!is_placeholder_timestamp(&real, 2000));
    }

    #[test]
    fn test_ordering_is_chronological() {
        let mut days = vec![
            ArchiveDay::parse("2024-03-02").unwrap(),
            ArchiveDay::parse("2023-12-31").unwrap(),
            ArchiveDay::parse("2024-03-01").unwrap(),
        ];
        days.sort();
        assert_eq!(days[0].to_string(), "2023-12-31");
        assert_eq!(days[2].to_string(), "2024-03-02");
    }
}
