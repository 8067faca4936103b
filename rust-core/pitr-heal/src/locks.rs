// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-day healing tokens. At most one healing action may run for a given day;
// a second attempt fails immediately instead of queueing behind the first.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use pitr_wal::ArchiveDay;
use tracing::trace;

use crate::error::{PitrError, PitrResult};

#[derive(Debug, Clone, Default)]
pub struct DayLocks {
    held: Arc<Mutex<HashSet<ArchiveDay>>>,
}

/// Proof of exclusive access to one day. Released on drop.
#[derive(Debug)]
pub struct DayGuard {
    day: ArchiveDay,
    held: Arc<Mutex<HashSet<ArchiveDay>>>,
}

impl DayLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the token for `day`, or fail with `HealingInProgress`.
    pub fn try_acquire(&self, day: &ArchiveDay) -> PitrResult<DayGuard> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if !held.insert(*day) {
            return Err(PitrError::HealingInProgress(day.to_string()));
        }
        trace!(day = %day, "Acquired day lock");
        Ok(DayGuard {
            day: *day,
            held: Arc::clone(&self.held),
        })
    }

    pub fn is_held(&self, day: &ArchiveDay) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(day)
    }
}

impl DayGuard {
    pub fn day(&self) -> &ArchiveDay {
        &self.day
    }
}

impl Drop for DayGuard {
    fn drop(&mut self) {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.day);
        trace!(day = %self.day, "Released day lock");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_release() {
        let locks = DayLocks::new();
        let day = ArchiveDay::parse("2024-03-01").unwrap();
        let other = ArchiveDay::parse("2024-03-02").unwrap();

        let guard = locks.try_acquire(&day).unwrap();
        assert!(matches!(
            locks.try_acquire(&day),
            Err(PitrError::HealingInProgress(_))
        ));
        let _other_guard = locks.try_acquire(&other).unwrap();

        drop(guard);
        assert!(!locks.is_held(&day));
        assert!(locks.try_acquire(&day).is_ok());
    }

    #[test]
    fn test_clones_share_tokens() {
        let locks = DayLocks::new();
        let day = ArchiveDay::parse("2024-03-01").unwrap();
        let _guard = locks.clone().try_acquire(&day).unwrap();
        assert!(locks.is_held(&day));
    }
}
