// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine facade.
//
// `ArchiveEngine` wires the resolver, classifier and healer around one
// archive store and exposes the operations the service surface needs:
// listing days, resolving a day's recovery window, and reconciling
// historical days.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use pitr_storage::{ArchiveStore, StorageError};
use pitr_wal::{is_placeholder_timestamp, ArchiveDay, DayEntry, PitrMetadata};
use prometheus::Registry;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::DayMetadataCache;
use crate::classifier::{ArchiveHealth, DayInventory};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{PitrError, PitrResult};
use crate::healing::Healer;
use crate::metrics::HealMetrics;
use crate::notifier::Notifier;
use crate::resolver::MetadataResolver;
use crate::retry::with_retry;
use crate::source::{SegmentSource, StoreSegmentFolder};

/// What happened to one day during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayOutcome {
    /// The day is today or later and was left alone.
    Skipped,
    /// Healthy; no repair performed.
    Confirmed,
    /// A healing action ran and completed.
    Healed,
    /// Classification or healing failed.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayReport {
    pub day: String,
    pub state: Option<ArchiveHealth>,
    pub outcome: DayOutcome,
    /// Continuity of the metadata the day ended up with, when known.
    pub continuous: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DayReport {
    fn new(day: &ArchiveDay, state: Option<ArchiveHealth>, outcome: DayOutcome) -> Self {
        Self {
            day: day.to_string(),
            state,
            outcome,
            continuous: None,
            error: None,
        }
    }

    fn failed(day: &ArchiveDay, state: Option<ArchiveHealth>, err: &PitrError) -> Self {
        let mut report = Self::new(day, state, DayOutcome::Failed);
        report.error = Some(err.to_string());
        report
    }

    pub fn is_failure(&self) -> bool {
        self.outcome == DayOutcome::Failed
    }
}

/// Result of one reconciliation pass over all historical days.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Per-day results, newest day first.
    pub days: Vec<DayReport>,
}

impl ReconciliationReport {
    pub fn count(&self, state: ArchiveHealth) -> usize {
        self.days.iter().filter(|d| d.state == Some(state)).count()
    }

    pub fn healed(&self) -> usize {
        self.days
            .iter()
            .filter(|d| d.outcome == DayOutcome::Healed)
            .count()
    }

    pub fn failures(&self) -> usize {
        self.days.iter().filter(|d| d.is_failure()).count()
    }
}

/// Builder for [`ArchiveEngine`].
pub struct EngineBuilder {
    store: Arc<dyn ArchiveStore>,
    notifier: Arc<dyn Notifier>,
    config: EngineConfig,
    clock: Option<Arc<dyn Clock>>,
    registry: Option<Registry>,
    source: Option<Arc<dyn SegmentSource>>,
}

impl EngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Registry the engine counters are registered on. A private registry
    /// is used when none is given.
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Override where live scans read segments from. Defaults to the day's
    /// `WAL/` folder on the archive store.
    pub fn segment_source(mut self, source: Arc<dyn SegmentSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn build(self) -> PitrResult<ArchiveEngine> {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let registry = self.registry.unwrap_or_default();
        let metrics = HealMetrics::new(&registry)?;
        let source = self.source.unwrap_or_else(|| {
            Arc::new(StoreSegmentFolder::new(
                Arc::clone(&self.store),
                self.config.placeholder_cutoff_year,
            ))
        });

        let resolver = Arc::new(MetadataResolver::new(
            Arc::clone(&self.store),
            DayMetadataCache::new(Arc::clone(&clock)),
            source,
            self.config.calculator(),
            metrics.clone(),
        ));
        let healer = Healer::new(
            Arc::clone(&self.store),
            Arc::clone(&resolver),
            self.notifier,
            metrics.clone(),
            &self.config,
        );

        info!(
            store = self.store.name(),
            tolerance_ms = self.config.base_tolerance_ms,
            "Archive engine ready"
        );
        Ok(ArchiveEngine {
            store: self.store,
            clock,
            config: self.config,
            resolver,
            healer,
            metrics,
            registry,
        })
    }
}

/// The continuity and healing engine for one archive store.
pub struct ArchiveEngine {
    store: Arc<dyn ArchiveStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    resolver: Arc<MetadataResolver>,
    healer: Healer,
    metrics: HealMetrics,
    registry: Registry,
}

impl ArchiveEngine {
    pub fn builder(store: Arc<dyn ArchiveStore>, notifier: Arc<dyn Notifier>) -> EngineBuilder {
        EngineBuilder {
            store,
            notifier,
            config: EngineConfig::default(),
            clock: None,
            registry: None,
            source: None,
        }
    }

    pub fn store(&self) -> &Arc<dyn ArchiveStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &DayMetadataCache {
        self.resolver.cache()
    }

    pub fn healer(&self) -> &Healer {
        &self.healer
    }

    pub fn metrics(&self) -> &HealMetrics {
        &self.metrics
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// All archive days, newest first.
    ///
    /// Placeholder timestamps reported by the store are replaced by the
    /// day's midnight plus the configured display offset. A listing failure
    /// is logged and yields an empty list.
    pub async fn list_days(&self) -> Vec<DayEntry> {
        let listing = match self.store.list_day_namespaces().await {
            Ok(listing) => listing,
            Err(err) => {
                warn!(error = %err, "Listing archive days failed");
                return Vec::new();
            }
        };

        let offset = self.config.placeholder_display_offset();
        let cutoff = self.config.placeholder_cutoff_year;
        let mut days: Vec<DayEntry> = listing
            .into_iter()
            .filter(|object| object.is_dir)
            .filter_map(|object| {
                let Ok(day) = ArchiveDay::parse(&object.name) else {
                    debug!(name = %object.name, "Ignoring non-day namespace");
                    return None;
                };
                let timestamp = match object.modified_at {
                    Some(ts) if !is_placeholder_timestamp(&ts, cutoff) => ts,
                    _ => day.placeholder_corrected(offset),
                };
                Some(DayEntry {
                    date: day.to_string(),
                    timestamp,
                })
            })
            .collect();
        days.sort_by(|a, b| b.date.cmp(&a.date));
        days
    }

    /// Recovery window for the day named `date` (`YYYY-MM-DD`).
    pub async fn get_metadata(&self, date: &str) -> PitrResult<PitrMetadata> {
        let day = ArchiveDay::parse(date)?;
        self.resolver.resolve(&day).await
    }

    /// Classify and heal every historical day.
    ///
    /// Today and any later day are skipped. Days are processed with bounded
    /// parallelism; a failure on one day never stops the others.
    pub async fn run_startup_reconciliation(&self) -> ReconciliationReport {
        let started_at = self.clock.now();
        let today = self.clock.today();

        let days: Vec<ArchiveDay> = match with_retry(&self.config.retry, "list days", || {
            self.store.list_day_namespaces()
        })
        .await
        {
            Ok(listing) => listing
                .iter()
                .filter(|object| object.is_dir)
                .filter_map(|object| ArchiveDay::parse(&object.name).ok())
                .filter(|day| *day < today)
                .collect(),
            Err(err) => {
                warn!(error = %err, "Listing archive days failed, skipping reconciliation");
                Vec::new()
            }
        };

        info!(days = days.len(), "Starting archive reconciliation");
        let mut reports: Vec<DayReport> = stream::iter(days)
            .map(|day| async move { self.reconcile_day(&day).await })
            .buffer_unordered(self.config.max_concurrent_days.max(1))
            .collect()
            .await;
        reports.sort_by(|a, b| b.day.cmp(&a.day));

        let report = ReconciliationReport {
            started_at,
            finished_at: self.clock.now(),
            days: reports,
        };
        info!(
            days = report.days.len(),
            healed = report.healed(),
            failures = report.failures(),
            "Archive reconciliation finished"
        );
        report
    }

    /// Classify one day and run its healing action.
    pub async fn reconcile_day(&self, day: &ArchiveDay) -> DayReport {
        if *day >= self.clock.today() {
            debug!(day = %day, "Skipping current day");
            return DayReport::new(day, None, DayOutcome::Skipped);
        }

        let inventory = match self.inventory(day).await {
            Ok(inventory) => inventory,
            Err(err) => {
                warn!(day = %day, error = %err, "Cannot inspect archive day");
                return DayReport::failed(day, None, &err);
            }
        };
        let state = inventory.classify();
        info!(day = %day, state = %state, action = state.action(), "Classified archive day");

        match self.healer.heal(day, &inventory).await {
            Ok(metadata) => {
                let outcome = if state.needs_healing() {
                    DayOutcome::Healed
                } else {
                    DayOutcome::Confirmed
                };
                let mut report = DayReport::new(day, Some(state), outcome);
                report.continuous = metadata.map(|m| m.continuous);
                report
            }
            Err(err) => DayReport::failed(day, Some(state), &err),
        }
    }

    /// Nightly archival of a finished day.
    ///
    /// Runs through the classifier, so re-running it on an already archived
    /// day only confirms it.
    pub async fn archive_day(&self, day: &ArchiveDay) -> DayReport {
        info!(day = %day, "Archiving day");
        self.reconcile_day(day).await
    }

    /// Archive the day before today, per the engine's clock.
    pub async fn archive_yesterday(&self) -> Option<DayReport> {
        let yesterday = self.clock.today().previous()?;
        Some(self.archive_day(&yesterday).await)
    }

    async fn inventory(&self, day: &ArchiveDay) -> PitrResult<DayInventory> {
        let day_name = day.to_string();
        let listing = with_retry(&self.config.retry, "list day", || {
            self.store.list_objects(&day_name)
        })
        .await
        .map_err(|err| match err {
            StorageError::NamespaceNotFound(_) => PitrError::ArchiveDayNotFound(day_name.clone()),
            other => other.into(),
        })?;
        Ok(DayInventory::from_listing(&listing))
    }
}
