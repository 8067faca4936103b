// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Day metadata cache.
//
// Memoizes settled history only: "today" is never served or stored, and only
// continuous metadata is kept so a transient gap (archival still running) is
// re-evaluated on the next query. Entries never expire. Callers compute
// outside the lock; the write lock is held only for the map update.

use std::collections::HashMap;
use std::sync::Arc;

use pitr_wal::{ArchiveDay, PitrMetadata};
use tokio::sync::RwLock;
use tracing::trace;

use crate::clock::Clock;

/// Process-wide memo of computed metadata, keyed by date.
///
/// Clones share the same entries.
#[derive(Clone)]
pub struct DayMetadataCache {
    entries: Arc<RwLock<HashMap<ArchiveDay, PitrMetadata>>>,
    clock: Arc<dyn Clock>,
}

impl DayMetadataCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Cached metadata for `day`. Always `None` for today.
    pub async fn get(&self, day: &ArchiveDay) -> Option<PitrMetadata> {
        if *day == self.clock.today() {
            return None;
        }
        self.entries.read().await.get(day).cloned()
    }

    /// Remember `metadata` for `day` if it is historical and continuous.
    ///
    /// Returns whether the entry was stored.
    pub async fn put(&self, day: &ArchiveDay, metadata: &PitrMetadata) -> bool {
        if *day == self.clock.today() || !metadata.continuous {
            trace!(day = %day, continuous = metadata.continuous, "Not caching metadata");
            return false;
        }
        self.entries.write().await.insert(*day, metadata.clone());
        true
    }

    /// Replace whatever is cached for `day` with freshly persisted metadata.
    ///
    /// Used after a healing action rewrote the stored object, which is then
    /// authoritative. Non-continuous results evict the old entry.
    pub async fn refresh(&self, day: &ArchiveDay, metadata: &PitrMetadata) -> bool {
        if self.put(day, metadata).await {
            return true;
        }
        self.entries.write().await.remove(day);
        false
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};

    fn day(text: &str) -> ArchiveDay {
        ArchiveDay::parse(text).unwrap()
    }

    fn cache() -> DayMetadataCache {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap());
        DayMetadataCache::new(Arc::new(clock))
    }

    fn continuous(d: &ArchiveDay) -> PitrMetadata {
        PitrMetadata::empty(d, None)
    }

    #[tokio::test]
    async fn test_historical_continuous_is_cached() {
        let cache = cache();
        let d = day("2024-03-01");
        assert!(cache.get(&d).await.is_none());
        assert!(cache.put(&d, &continuous(&d)).await);
        assert_eq!(cache.get(&d).await, Some(continuous(&d)));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_today_is_never_cached() {
        let cache = cache();
        let today = day("2024-03-10");
        assert!(!cache.put(&today, &continuous(&today)).await);
        assert!(cache.get(&today).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_gapped_metadata_is_not_cached() {
        let cache = cache();
        let d = day("2024-03-01");
        let gapped = PitrMetadata::total_loss(&d);
        assert!(!cache.put(&d, &gapped).await);
        assert!(cache.get(&d).await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_evicts_on_gap() {
        let cache = cache();
        let d = day("2024-03-01");
        cache.put(&d, &continuous(&d)).await;

        assert!(!cache.refresh(&d, &PitrMetadata::total_loss(&d)).await);
        assert!(cache.get(&d).await.is_none());

        let mut archived = continuous(&d);
        archived.is_archived = true;
        assert!(cache.refresh(&d, &archived).await);
        assert!(cache.get(&d).await.unwrap().is_archived);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let cache = cache();
        let other = cache.clone();
        let d = day("2024-03-02");
        cache.put(&d, &continuous(&d)).await;
        assert!(other.get(&d).await.is_some());
    }
}
