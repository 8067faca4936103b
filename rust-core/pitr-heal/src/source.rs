// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Segment sources.
//
// A segment source enumerates the WAL files observed for a day together with
// their modification times. Two sources exist: the remote `WAL` folder of a
// day namespace (live scans) and a local directory of staged files (healing
// actions, after a download or extraction).
//
// Timestamps that are missing, or that are store placeholders, fall back to
// the day's UTC midnight.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pitr_storage::ArchiveStore;
use pitr_wal::{is_placeholder_timestamp, ArchiveDay, ObservedSegments};
use tracing::debug;

use crate::error::{PitrError, PitrResult};
use crate::layout::WAL_FOLDER;

#[async_trait]
pub trait SegmentSource: Send + Sync {
    /// Raw file names and timestamps observed for `day`. A day without any
    /// segments yields an empty map, not an error.
    async fn observe(&self, day: &ArchiveDay) -> PitrResult<ObservedSegments>;

    fn describe(&self) -> String;
}

fn effective_timestamp(
    modified_at: Option<DateTime<Utc>>,
    day: &ArchiveDay,
    cutoff_year: i32,
) -> DateTime<Utc> {
    match modified_at {
        Some(ts) if !is_placeholder_timestamp(&ts, cutoff_year) => ts,
        _ => day.fallback_timestamp(),
    }
}

/// The `WAL` folder of a day namespace in the archive store.
#[derive(Clone)]
pub struct StoreSegmentFolder {
    store: Arc<dyn ArchiveStore>,
    cutoff_year: i32,
}

impl StoreSegmentFolder {
    pub fn new(store: Arc<dyn ArchiveStore>, cutoff_year: i32) -> Self {
        Self { store, cutoff_year }
    }
}

#[async_trait]
impl SegmentSource for StoreSegmentFolder {
    async fn observe(&self, day: &ArchiveDay) -> PitrResult<ObservedSegments> {
        let listing = match self.store.list_folder(&day.to_string(), WAL_FOLDER).await {
            Ok(listing) => listing,
            Err(err) if err.is_not_found() => {
                debug!(day = %day, "No WAL folder in archive yet");
                return Ok(ObservedSegments::new());
            }
            Err(err) => return Err(err.into()),
        };
        Ok(listing
            .into_iter()
            .filter(|object| !object.is_dir)
            .map(|object| {
                let ts = effective_timestamp(object.modified_at, day, self.cutoff_year);
                (object.name, ts)
            })
            .collect())
    }

    fn describe(&self) -> String {
        format!("{} store {}", self.store.name(), WAL_FOLDER)
    }
}

/// A local directory of segment files, typically a staging area.
#[derive(Debug, Clone)]
pub struct LocalSegmentDir {
    dir: PathBuf,
    cutoff_year: i32,
}

impl LocalSegmentDir {
    pub fn new(dir: impl Into<PathBuf>, cutoff_year: i32) -> Self {
        Self {
            dir: dir.into(),
            cutoff_year,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl SegmentSource for LocalSegmentDir {
    async fn observe(&self, day: &ArchiveDay) -> PitrResult<ObservedSegments> {
        let dir = self.dir.clone();
        let day = *day;
        let cutoff_year = self.cutoff_year;
        tokio::task::spawn_blocking(move || -> PitrResult<ObservedSegments> {
            let mut observed = ObservedSegments::new();
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(observed),
                Err(err) => return Err(err.into()),
            };
            for entry in entries {
                let entry = entry?;
                let metadata = entry.metadata()?;
                if !metadata.is_file() {
                    continue;
                }
                let modified = metadata.modified().ok().map(DateTime::<Utc>::from);
                observed.insert(
                    entry.file_name().to_string_lossy().into_owned(),
                    effective_timestamp(modified, &day, cutoff_year),
                );
            }
            Ok(observed)
        })
        .await
        .map_err(|e| PitrError::Io(std::io::Error::other(e)))?
    }

    fn describe(&self) -> String {
        format!("local {}", self.dir.display())
    }
}
