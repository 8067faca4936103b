// SPDX-License-Identifier: PMPL-1.0-or-later
//
// PITR WAL analysis - Day metadata record
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `PitrMetadata` is the durable summary of one archive day: which base backup
// anchors it, which WAL range follows, whether that range is gap-free, and
// how far forward a restore can go. It is written to the store as
// `metadata.json` and exchanged verbatim with API callers, so the field names
// are part of the wire contract.
//
// Metadata written by older tooling encodes "no value" as the zero time
// (`0001-01-01T00:00:00Z`) and the empty string. Both are read back as `None`.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::day::ArchiveDay;

/// Synthetic missing-segment entry recorded when a day has no WAL data at all.
pub const TOTAL_DATA_LOSS_MARKER: &str = "TOTAL_DATA_LOSS_ON_STORAGE";

/// Identifier of the base backup object anchoring a day.
pub const BASE_BACKUP_ID: &str = "base.tar.gz";

/// Recoverability summary for a single archive day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitrMetadata {
    /// Archive day, `YYYY-MM-DD`.
    pub date: String,

    /// Identifier of the base backup the WAL range applies to.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub base_backup: Option<String>,

    /// When the base backup completed; the earliest restorable moment.
    #[serde(default, deserialize_with = "zero_time_as_none")]
    pub base_backup_timestamp: Option<DateTime<Utc>>,

    /// Timeline of the first segment (0 when there are no segments).
    #[serde(default)]
    pub timeline: u32,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub wal_start_segment: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub wal_end_segment: Option<String>,

    #[serde(default, deserialize_with = "zero_time_as_none")]
    pub wal_start_timestamp: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "zero_time_as_none")]
    pub wal_end_timestamp: Option<DateTime<Utc>>,

    /// `true` iff every segment's successor is present.
    pub continuous: bool,

    /// Expected segment names that were not found. Empty iff `continuous`.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub missing_segments: Vec<String>,

    /// Latest moment a restore can reach: the end of the contiguous prefix.
    #[serde(default, deserialize_with = "zero_time_as_none")]
    pub valid_until: Option<DateTime<Utc>>,

    /// Whether the raw segments were already compressed into the archive.
    #[serde(default)]
    pub is_archived: bool,
}

impl PitrMetadata {
    /// An empty, not yet broken window for `day` anchored at `base_time`.
    pub fn empty(day: &ArchiveDay, base_time: Option<DateTime<Utc>>) -> Self {
        Self {
            date: day.to_string(),
            base_backup: Some(BASE_BACKUP_ID.to_string()),
            base_backup_timestamp: base_time,
            timeline: 0,
            wal_start_segment: None,
            wal_end_segment: None,
            wal_start_timestamp: base_time,
            wal_end_timestamp: base_time,
            continuous: true,
            missing_segments: Vec::new(),
            valid_until: base_time,
            is_archived: false,
        }
    }

    /// Sentinel recorded for a day with no segments and no archive.
    pub fn total_loss(day: &ArchiveDay) -> Self {
        Self {
            date: day.to_string(),
            base_backup: None,
            base_backup_timestamp: None,
            timeline: 0,
            wal_start_segment: None,
            wal_end_segment: None,
            wal_start_timestamp: None,
            wal_end_timestamp: None,
            continuous: false,
            missing_segments: vec![TOTAL_DATA_LOSS_MARKER.to_string()],
            valid_until: None,
            is_archived: false,
        }
    }

    /// Whether this record is the total-loss sentinel.
    pub fn is_total_loss(&self) -> bool {
        !self.continuous
            && self.missing_segments.len() == 1
            && self.missing_segments[0] == TOTAL_DATA_LOSS_MARKER
    }

    /// The first missing segment, if the WAL range is broken.
    pub fn first_gap(&self) -> Option<&str> {
        self.missing_segments.first().map(String::as_str)
    }
}

fn zero_time_as_none<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<DateTime<Utc>> = Option::deserialize(deserializer)?;
    Ok(value.filter(|timestamp| timestamp.year() > 1))
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|text| !text.is_empty()))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Vec<String>> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day() -> ArchiveDay {
        ArchiveDay::parse("2024-03-01").unwrap()
    }

    #[test]
    fn test_field_names_on_the_wire() {
        let meta = PitrMetadata::empty(&day(), None);
        let json = serde_json::to_value(&meta).unwrap();
        for field in [
            "date",
            "base_backup",
            "base_backup_timestamp",
            "timeline",
            "wal_start_segment",
            "wal_end_segment",
            "wal_start_timestamp",
            "wal_end_timestamp",
            "continuous",
            "missing_segments",
            "valid_until",
            "is_archived",
        ] {
            assert!(json.get(field).is_some(), "missing field {field}");
        }
        assert_eq!(json.as_object().unwrap().len(), 12);
    }

    #[test]
    fn test_reads_zero_values_as_none() {
        let json = r#"{
            "date": "2024-03-01",
            "base_backup": "",
            "base_backup_timestamp": "0001-01-01T00:00:00Z",
            "timeline": 0,
            "wal_start_segment": "",
            "wal_end_segment": "",
            "wal_start_timestamp": "0001-01-01T00:00:00Z",
            "wal_end_timestamp": "0001-01-01T00:00:00Z",
            "continuous": false,
            "missing_segments": ["TOTAL_DATA_LOSS_ON_STORAGE"],
            "valid_until": "0001-01-01T00:00:00Z",
            "is_archived": false
        }"#;
        let meta: PitrMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta, PitrMetadata::total_loss(&day()));
        assert!(meta.is_total_loss());
    }

    #[test]
    fn test_reads_null_missing_segments() {
        let json = r#"{"date": "2024-03-01", "continuous": true, "missing_segments": null}"#;
        let meta: PitrMetadata = serde_json::from_str(json).unwrap();
        assert!(meta.missing_segments.is_empty());
        assert!(meta.valid_until.is_none());
    }

    #[test]
    fn test_empty_window_uses_base_time() {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 1, 0).unwrap();
        let meta = PitrMetadata::empty(&day(), Some(base));
        assert!(meta.continuous);
        assert_eq!(meta.valid_until, Some(base));
        assert_eq!(meta.wal_start_timestamp, Some(base));
        assert_eq!(meta.first_gap(), None);
    }

    #[test]
    fn test_total_loss_sentinel() {
        let meta = PitrMetadata::total_loss(&day());
        assert!(!meta.continuous);
        assert_eq!(meta.first_gap(), Some(TOTAL_DATA_LOSS_MARKER));
        assert!(!meta.is_archived);
    }
}
