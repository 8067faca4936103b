// SPDX-License-Identifier: PMPL-1.0-or-later
//
// PITR WAL analysis - Continuity calculation
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Decides whether the WAL segments observed for a day form a gap-free run
// after the day's base backup, and how far forward a restore can reach.
//
// The walk:
//
// 1. Canonicalize every observed object name, dropping non-segments and
//    segments older than `base_time - base_tolerance`.
// 2. Sort the canonical names (fixed-width hex, so text order is log order).
// 3. Compare each name's successor with the next observed name. The first
//    mismatch ends the walk: nothing after a hole can be replayed. A segment
//    at the very end of the log-sequence space has no successor and also
//    ends the walk.
//
// Timestamps always come from the observed objects, so a segment seen only
// as `<name>.partial` is dated by the partial object.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, trace};

use crate::day::ArchiveDay;
use crate::metadata::PitrMetadata;
use crate::segment::{canonicalize, SegmentName};

/// Default allowance for clock skew between the base backup completing and
/// the first segment it needs being written.
pub const DEFAULT_BASE_TOLERANCE_MS: i64 = 1_000;

/// Observed segment objects: raw object name to modification time.
pub type ObservedSegments = BTreeMap<String, DateTime<Utc>>;

/// The outcome of a continuity walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuityVerdict {
    /// The computed metadata (`is_archived` is always `false` here; callers
    /// set it according to where the segments came from).
    pub metadata: PitrMetadata,

    /// Segments that were only observed as `.partial` uploads.
    pub partial_segments: Vec<SegmentName>,

    /// Objects excluded from the walk (non-segments and pre-base segments).
    pub ignored: usize,
}

impl ContinuityVerdict {
    pub fn is_continuous(&self) -> bool {
        self.metadata.continuous
    }
}

/// Computes WAL continuity verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuityCalculator {
    base_tolerance: Duration,
}

impl Default for ContinuityCalculator {
    fn default() -> Self {
        Self::new(Duration::milliseconds(DEFAULT_BASE_TOLERANCE_MS))
    }
}

impl ContinuityCalculator {
    pub fn new(base_tolerance: Duration) -> Self {
        Self { base_tolerance }
    }

    pub fn base_tolerance(&self) -> Duration {
        self.base_tolerance
    }

    /// Walk the segments observed for `day` and produce a verdict.
    pub fn calculate(
        &self,
        day: &ArchiveDay,
        base_time: Option<DateTime<Utc>>,
        observed: &ObservedSegments,
    ) -> ContinuityVerdict {
        let cutoff = base_time.map(|base| base - self.base_tolerance);

        let mut segments: BTreeMap<SegmentName, DateTime<Utc>> = BTreeMap::new();
        let mut partial = BTreeSet::new();
        let mut ignored = 0usize;

        for (raw_name, modified_at) in observed {
            let Some(canonical) = canonicalize(raw_name) else {
                trace!(object = %raw_name, "Skipping non-segment object");
                ignored += 1;
                continue;
            };
            if cutoff.is_some_and(|cutoff| *modified_at < cutoff) {
                trace!(segment = %raw_name, "Skipping segment older than base backup");
                ignored += 1;
                continue;
            }
            if canonical.partial {
                partial.insert(canonical.name.clone());
            }
            // Plain names sort before their `.partial` variant, so a plain
            // object dates the segment when both exist.
            segments.entry(canonical.name).or_insert(*modified_at);
        }

        let sorted: Vec<(SegmentName, DateTime<Utc>)> = segments.into_iter().collect();
        let mut metadata = PitrMetadata::empty(day, base_time);

        if let (Some((first, first_at)), Some((last, last_at))) = (sorted.first(), sorted.last()) {
            metadata.timeline = first.timeline();
            metadata.wal_start_segment = Some(first.to_string());
            metadata.wal_start_timestamp = Some(*first_at);
            metadata.wal_end_segment = Some(last.to_string());
            metadata.wal_end_timestamp = Some(*last_at);
            metadata.valid_until = metadata.wal_end_timestamp;

            for pair in sorted.windows(2) {
                let (current, current_at) = &pair[0];
                let expected = current.successor();
                if expected.as_ref() == Some(&pair[1].0) {
                    continue;
                }
                metadata.continuous = false;
                if let Some(expected) = expected {
                    metadata.missing_segments.push(expected.to_string());
                }
                metadata.wal_end_segment = Some(current.to_string());
                metadata.wal_end_timestamp = Some(*current_at);
                metadata.valid_until = metadata.wal_end_timestamp;
                break;
            }
        }

        debug!(
            day = %day,
            segments = sorted.len(),
            ignored,
            continuous = metadata.continuous,
            first_gap = ?metadata.first_gap(),
            "Computed WAL continuity"
        );

        ContinuityVerdict {
            metadata,
            partial_segments: partial.into_iter().collect(),
            ignored,
        }
    }
}
