// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metadata resolution: cache, then stored `metadata.json`, then a live
// continuity scan of the day's raw WAL folder.

use std::sync::Arc;

use pitr_storage::{ArchiveStore, StorageError, TypedObjects};
use pitr_wal::{ArchiveDay, ContinuityCalculator, PitrMetadata};
use tracing::{debug, info, warn};

use crate::cache::DayMetadataCache;
use crate::classifier::DayInventory;
use crate::error::{PitrError, PitrResult};
use crate::layout::METADATA_OBJECT;
use crate::metrics::HealMetrics;
use crate::source::SegmentSource;

/// Answers metadata queries for any archive day.
///
/// Safe to call concurrently. Two concurrent resolves of the same uncached
/// day may both scan; both reach the same result and the last cache write
/// wins.
pub struct MetadataResolver {
    store: Arc<dyn ArchiveStore>,
    objects: TypedObjects,
    cache: DayMetadataCache,
    source: Arc<dyn SegmentSource>,
    calculator: ContinuityCalculator,
    metrics: HealMetrics,
}

impl MetadataResolver {
    pub fn new(
        store: Arc<dyn ArchiveStore>,
        cache: DayMetadataCache,
        source: Arc<dyn SegmentSource>,
        calculator: ContinuityCalculator,
        metrics: HealMetrics,
    ) -> Self {
        Self {
            objects: TypedObjects::new(Arc::clone(&store)),
            store,
            cache,
            source,
            calculator,
            metrics,
        }
    }

    pub fn cache(&self) -> &DayMetadataCache {
        &self.cache
    }

    /// Resolve the metadata for `day`.
    ///
    /// Fails with `ArchiveDayNotFound` when the day has no namespace, and with
    /// `BaseBackupMissing` when neither stored metadata nor a base backup
    /// exists.
    pub async fn resolve(&self, day: &ArchiveDay) -> PitrResult<PitrMetadata> {
        if let Some(cached) = self.cache.get(day).await {
            debug!(day = %day, "Metadata served from cache");
            self.metrics.record_resolve("cache");
            return Ok(cached);
        }

        let listing = self.store.list_objects(&day.to_string()).await.map_err(|err| match err {
            StorageError::NamespaceNotFound(_) => PitrError::ArchiveDayNotFound(day.to_string()),
            other => other.into(),
        })?;
        let inventory = DayInventory::from_listing(&listing);

        if inventory.metadata {
            if let Some(stored) = self.stored(day).await? {
                self.cache.put(day, &stored).await;
                self.metrics.record_resolve("stored");
                return Ok(stored);
            }
        }

        if !inventory.base_backup {
            return Err(PitrError::BaseBackupMissing(day.to_string()));
        }

        info!(day = %day, source = %self.source.describe(), "Calculating live WAL window");
        let observed = self.source.observe(day).await?;
        let verdict = self.calculator.calculate(day, inventory.base_time, &observed);
        if !verdict.partial_segments.is_empty() {
            debug!(day = %day, partial = verdict.partial_segments.len(), "Partial segments observed");
        }

        let mut metadata = verdict.metadata;
        metadata.is_archived = false;
        self.cache.put(day, &metadata).await;
        self.metrics.record_resolve("live");
        Ok(metadata)
    }

    /// Read the stored metadata object. Unreadable or vanished objects yield
    /// `None` so the caller falls back to a live scan.
    async fn stored(&self, day: &ArchiveDay) -> PitrResult<Option<PitrMetadata>> {
        match self.objects.get::<PitrMetadata>(&day.to_string(), METADATA_OBJECT).await {
            Ok(found) => {
                if found.is_some() {
                    debug!(day = %day, "Using stored metadata");
                }
                Ok(found)
            }
            Err(StorageError::SerializationError(reason)) => {
                warn!(day = %day, reason = %reason, "Stored metadata is unreadable, recomputing");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}
