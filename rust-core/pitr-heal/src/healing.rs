// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Healing actions.
//
// Each action brings one day to a consistent state and persists the resulting
// metadata. Actions hold the day's token for their whole duration, work in a
// scratch directory that is removed when they return, and never delete raw
// segments before the archive replacing them has been uploaded and verified.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pitr_storage::{ArchiveStore, TypedObjects};
use pitr_wal::{
    is_placeholder_timestamp, ArchiveDay, ContinuityCalculator, PitrMetadata, BASE_BACKUP_ID,
};
use tracing::{error, info, warn};

use crate::classifier::{ArchiveHealth, DayInventory};
use crate::config::{EngineConfig, RetryPolicy};
use crate::error::{PitrError, PitrResult};
use crate::layout::{ARCHIVE_OBJECT, METADATA_OBJECT, WAL_FOLDER};
use crate::locks::DayLocks;
use crate::metrics::HealMetrics;
use crate::notifier::{Notifier, Severity};
use crate::resolver::MetadataResolver;
use crate::retry::with_retry;
use crate::source::{LocalSegmentDir, SegmentSource};
use crate::staging::{compress_wal_dir, extract_archive, StagingArea};

/// Executes the healing action matching a day's health state.
pub struct Healer {
    store: Arc<dyn ArchiveStore>,
    objects: TypedObjects,
    resolver: Arc<MetadataResolver>,
    notifier: Arc<dyn Notifier>,
    locks: DayLocks,
    metrics: HealMetrics,
    calculator: ContinuityCalculator,
    staging: StagingArea,
    retry: RetryPolicy,
    cutoff_year: i32,
    warm_cache: bool,
}

impl Healer {
    pub fn new(
        store: Arc<dyn ArchiveStore>,
        resolver: Arc<MetadataResolver>,
        notifier: Arc<dyn Notifier>,
        metrics: HealMetrics,
        config: &EngineConfig,
    ) -> Self {
        Self {
            objects: TypedObjects::new(Arc::clone(&store)),
            store,
            resolver,
            notifier,
            locks: DayLocks::new(),
            metrics,
            calculator: config.calculator(),
            staging: StagingArea::new(config.staging_root.clone()),
            retry: config.retry.clone(),
            cutoff_year: config.placeholder_cutoff_year,
            warm_cache: config.warm_cache_on_startup,
        }
    }

    pub fn locks(&self) -> &DayLocks {
        &self.locks
    }

    /// Classify `inventory` and run the matching action.
    ///
    /// Returns the metadata the day ends up with, when it is known.
    pub async fn heal(
        &self,
        day: &ArchiveDay,
        inventory: &DayInventory,
    ) -> PitrResult<Option<PitrMetadata>> {
        match inventory.classify() {
            ArchiveHealth::Healthy => Ok(self.confirm_healthy(day, inventory).await),
            ArchiveHealth::MetadataMissingArchivePresent => self
                .heal_metadata_from_archive(day, inventory.base_time)
                .await
                .map(Some),
            ArchiveHealth::RawOnlyNeedsArchiving => self
                .archive_raw_segments(day, inventory.base_time)
                .await
                .map(Some),
            ArchiveHealth::TotalLoss => self.report_total_loss(day).await.map(Some),
        }
    }

    /// No repair needed. Optionally warms the cache from stored metadata.
    pub async fn confirm_healthy(
        &self,
        day: &ArchiveDay,
        inventory: &DayInventory,
    ) -> Option<PitrMetadata> {
        if inventory.metadata && !inventory.archive && inventory.raw_folder {
            warn!(day = %day, "Metadata present but raw WAL was never archived");
        }
        if inventory.archive && inventory.raw_folder {
            warn!(day = %day, "Raw WAL folder left next to archive");
        }
        info!(day = %day, "Archive day is healthy");

        if !self.warm_cache {
            return None;
        }
        match self.resolver.resolve(day).await {
            Ok(metadata) => Some(metadata),
            Err(err) => {
                warn!(day = %day, error = %err, "Could not load stored metadata");
                None
            }
        }
    }

    /// Download raw segments, compute continuity, compress, upload the
    /// archive, remove the raw folder and persist metadata.
    pub async fn archive_raw_segments(
        &self,
        day: &ArchiveDay,
        base_time: Option<DateTime<Utc>>,
    ) -> PitrResult<PitrMetadata> {
        let _guard = self.locks.try_acquire(day)?;
        self.tracked(ArchiveHealth::RawOnlyNeedsArchiving, day, async {
            let day_name = day.to_string();
            let scratch = self.staging.scratch(day)?;
            let wal_dir = scratch.wal_dir();

            info!(day = %day, "Downloading raw WAL segments");
            let downloaded = with_retry(&self.retry, "download WAL folder", || {
                self.store.download_folder(&day_name, WAL_FOLDER, &wal_dir)
            })
            .await?;
            if downloaded == 0 {
                // Archive the empty folder as is; the next run then sees a healthy day.
                warn!(day = %day, "Raw WAL folder is empty");
                tokio::fs::create_dir_all(&wal_dir).await?;
            }

            let metadata = self.recompute(day, base_time, &wal_dir).await?;

            info!(day = %day, segments = downloaded, "Compressing WAL folder");
            let archive = scratch.archive_path();
            let size = match compress_wal_dir(day, &wal_dir, &archive).await {
                Ok(size) => size,
                Err(err) => {
                    self.notifier.notify(
                        Severity::High,
                        format!("Compressing WAL for {day} failed: {err}. Raw WAL left in place."),
                    );
                    return Err(err);
                }
            };

            self.upload_archive(day, &archive, size).await?;

            match with_retry(&self.retry, "delete raw WAL", || {
                self.store.delete_object(&day_name, WAL_FOLDER)
            })
            .await
            {
                Ok(_) => info!(day = %day, "Removed raw WAL folder after archiving"),
                Err(err) => warn!(day = %day, error = %err, "Raw WAL folder could not be removed"),
            }

            self.persist(day, &metadata).await?;
            self.announce(day, &metadata);
            Ok(metadata)
        })
        .await
    }

    /// Recover raw segments from the existing archive and regenerate the
    /// day's metadata. The archive object itself is left untouched.
    pub async fn heal_metadata_from_archive(
        &self,
        day: &ArchiveDay,
        base_time: Option<DateTime<Utc>>,
    ) -> PitrResult<PitrMetadata> {
        let _guard = self.locks.try_acquire(day)?;
        self.tracked(ArchiveHealth::MetadataMissingArchivePresent, day, async {
            let day_name = day.to_string();
            let scratch = self.staging.scratch(day)?;
            let archive = scratch.archive_path();

            info!(day = %day, "Downloading archive to regenerate metadata");
            with_retry(&self.retry, "download archive", || {
                self.store.download_object(&day_name, ARCHIVE_OBJECT, &archive)
            })
            .await?;
            extract_archive(day, &archive, scratch.path()).await?;

            let metadata = self.recompute(day, base_time, &scratch.wal_dir()).await?;
            self.persist(day, &metadata).await?;

            self.notifier.notify(
                Severity::Info,
                format!("Metadata consistency restored for {day} (extracted from archive)."),
            );
            self.announce(day, &metadata);
            Ok(metadata)
        })
        .await
    }

    /// Persist the total-loss sentinel and raise a critical notification.
    pub async fn report_total_loss(&self, day: &ArchiveDay) -> PitrResult<PitrMetadata> {
        let _guard = self.locks.try_acquire(day)?;
        self.tracked(ArchiveHealth::TotalLoss, day, async {
            error!(day = %day, "No WAL segments or archive found, data loss");
            self.notifier.notify(
                Severity::Critical,
                format!("CRITICAL DATA LOSS: no WAL segments or archive found for {day} on the archive store."),
            );
            let metadata = PitrMetadata::total_loss(day);
            self.persist(day, &metadata).await?;
            Ok(metadata)
        })
        .await
    }

    async fn tracked<T>(
        &self,
        state: ArchiveHealth,
        day: &ArchiveDay,
        work: impl Future<Output = PitrResult<T>>,
    ) -> PitrResult<T> {
        info!(day = %day, state = %state, action = state.action(), "Starting healing action");
        self.metrics.record_action(state.label());
        let result = work.await;
        if let Err(err) = &result {
            self.metrics.record_failure(state.label());
            error!(day = %day, state = %state, error = %err, "Healing action failed");
        }
        result
    }

    /// Continuity over staged segment files, marked as archived. Missing
    /// timestamps fall back to the day's midnight.
    async fn recompute(
        &self,
        day: &ArchiveDay,
        base_time: Option<DateTime<Utc>>,
        wal_dir: &Path,
    ) -> PitrResult<PitrMetadata> {
        let observed = LocalSegmentDir::new(wal_dir, self.cutoff_year)
            .observe(day)
            .await?;
        let verdict = self.calculator.calculate(day, base_time, &observed);

        let fallback = day.fallback_timestamp();
        let mut metadata = verdict.metadata;
        metadata.base_backup = Some(BASE_BACKUP_ID.to_string());
        metadata.base_backup_timestamp.get_or_insert(fallback);
        metadata.valid_until.get_or_insert(fallback);
        metadata.is_archived = true;
        Ok(metadata)
    }

    /// Upload the archive and confirm the store holds all of it.
    async fn upload_archive(&self, day: &ArchiveDay, archive: &Path, size: u64) -> PitrResult<()> {
        let day_name = day.to_string();
        let uploaded = with_retry(&self.retry, "upload archive", || {
            self.store.upload_file(archive, &day_name, ARCHIVE_OBJECT)
        })
        .await;

        let verdict = match uploaded {
            Err(err) => Err(err.to_string()),
            Ok(()) => match with_retry(&self.retry, "verify archive", || {
                self.store.object_info(&day_name, ARCHIVE_OBJECT)
            })
            .await
            {
                Ok(Some(info)) if info.size_bytes == size => Ok(()),
                Ok(Some(info)) => Err(format!(
                    "archive size mismatch: uploaded {size} bytes, store has {}",
                    info.size_bytes
                )),
                Ok(None) => Err("archive not visible after upload".to_string()),
                Err(err) => Err(err.to_string()),
            },
        };

        verdict.map_err(|reason| {
            self.notifier.notify(
                Severity::High,
                format!("Uploading WAL archive for {day} failed: {reason}. Raw WAL left in place."),
            );
            PitrError::UploadFailed {
                day: day_name.clone(),
                reason,
            }
        })
    }

    /// Write `metadata.json` and make it the cached answer for the day.
    async fn persist(&self, day: &ArchiveDay, metadata: &PitrMetadata) -> PitrResult<()> {
        let day_name = day.to_string();
        with_retry(&self.retry, "write metadata", || {
            self.objects.put(&day_name, METADATA_OBJECT, metadata)
        })
        .await?;
        self.resolver.cache().refresh(day, metadata).await;
        info!(day = %day, continuous = metadata.continuous, "Persisted metadata");
        Ok(())
    }

    fn announce(&self, day: &ArchiveDay, metadata: &PitrMetadata) {
        let (severity, message) = archive_summary(day, metadata, self.cutoff_year);
        self.notifier.notify(severity, message);
    }
}

/// Operator summary of a freshly computed day.
pub fn archive_summary(
    day: &ArchiveDay,
    metadata: &PitrMetadata,
    cutoff_year: i32,
) -> (Severity, String) {
    let valid_until = match metadata.valid_until {
        Some(ts) if !is_placeholder_timestamp(&ts, cutoff_year) => {
            ts.format("%b %d, %H:%M UTC").to_string()
        }
        _ => "date only (time unknown)".to_string(),
    };
    let mut message = format!(
        "PITR archive ready: {day}\nContinuous: {}\nValid until: {valid_until}",
        metadata.continuous
    );
    match metadata.first_gap() {
        Some(gap) if !metadata.continuous => {
            message.push_str(&format!("\nFirst missing segment: {gap}"));
            (Severity::Warning, message)
        }
        _ => (Severity::Info, message),
    }
}
