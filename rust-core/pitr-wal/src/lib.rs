// SPDX-License-Identifier: PMPL-1.0-or-later
//
// PITR WAL analysis crate
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reasoning about archived write-ahead-log segments for point-in-time
// recovery. Nothing in this crate performs I/O: callers hand in the segment
// names and modification times they observed, and get back a verdict on
// whether that WAL run can be replayed on top of the day's base backup.
//
// # Architecture
//
// - [`segment`] -- the 24-character segment name: timeline, successor,
//   canonical form.
// - [`day`] -- archive day identifiers (`YYYY-MM-DD` namespaces).
// - [`metadata`] -- the `PitrMetadata` record persisted as `metadata.json`.
// - [`continuity`] -- the gap-detection walk producing `PitrMetadata`.
//
// ## Usage
//
// ```
// use std::collections::BTreeMap;
// use chrono::{TimeZone, Utc};
// use pitr_wal::{ArchiveDay, ContinuityCalculator};
//
// let day = ArchiveDay::parse("2024-03-01").unwrap();
// let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 1, 0).unwrap();
//
// let mut observed = BTreeMap::new();
// observed.insert("0000000100000000000000A1".to_string(), base);
// observed.insert("0000000100000000000000A3".to_string(), base);
//
// let verdict = ContinuityCalculator::default().calculate(&day, Some(base), &observed);
// assert!(!verdict.metadata.continuous);
// assert_eq!(verdict.metadata.missing_segments, vec!["0000000100000000000000A2"]);
// ```

pub mod continuity;
pub mod day;
pub mod error;
pub mod metadata;
pub mod segment;

// Re-export the primary public API for ergonomic imports.
pub use continuity::{
    ContinuityCalculator, ContinuityVerdict, ObservedSegments, DEFAULT_BASE_TOLERANCE_MS,
};
pub use day::{is_placeholder_timestamp, ArchiveDay, DayEntry};
pub use error::{WalError, WalResult};
pub use metadata::{PitrMetadata, BASE_BACKUP_ID, TOTAL_DATA_LOSS_MARKER};
pub use segment::{canonicalize, parse_timeline, successor, CanonicalSegment, SegmentName};
