// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.

use std::path::PathBuf;
use std::time::Duration as StdDuration;

use pitr_wal::{ContinuityCalculator, DEFAULT_BASE_TOLERANCE_MS};
use serde::{Deserialize, Serialize};

/// Backoff policy for archive store calls made by healing actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero behaves like one.
    pub max_attempts: u32,
    /// Delay before the second attempt (milliseconds)
    pub initial_backoff_ms: u64,
    /// Upper bound for any single delay (milliseconds)
    pub max_backoff_ms: u64,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that tries exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn backoff(&self, attempt: u32) -> StdDuration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let millis = self.initial_backoff_ms as f64 * self.multiplier.max(1.0).powi(exponent);
        StdDuration::from_millis(millis.min(self.max_backoff_ms as f64) as u64)
    }
}

/// Configuration for the archive engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Segments written earlier than the base backup minus this many
    /// milliseconds belong to a previous backup.
    pub base_tolerance_ms: i64,
    /// Timestamps in or before this year are store placeholders, not real
    /// modification times.
    pub placeholder_cutoff_year: i32,
    /// Offset added to a day's midnight when listing days whose store
    /// timestamp is a placeholder. Display only.
    pub placeholder_display_offset_hours: i64,
    /// Directory under which per-action scratch directories are created.
    pub staging_root: PathBuf,
    /// Maximum number of days reconciled concurrently.
    pub max_concurrent_days: usize,
    /// Refresh the cache from stored metadata for healthy days.
    pub warm_cache_on_startup: bool,
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_tolerance_ms: DEFAULT_BASE_TOLERANCE_MS,
            placeholder_cutoff_year: 2000,
            placeholder_display_offset_hours: 5,
            staging_root: std::env::temp_dir(),
            max_concurrent_days: 4,
            warm_cache_on_startup: true,
            retry: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn base_tolerance(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.base_tolerance_ms)
    }

    pub fn placeholder_display_offset(&self) -> chrono::Duration {
        chrono::Duration::hours(self.placeholder_display_offset_hours)
    }

    /// Continuity calculator honouring the configured tolerance.
    pub fn calculator(&self) -> ContinuityCalculator {
        ContinuityCalculator::new(self.base_tolerance())
    }
}
