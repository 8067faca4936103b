// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Live WAL shipping.
//
// The database drops completed segments into a local spool directory. Each
// pass moves them into today's `WAL/` folder on the archive store. A spool
// file is deleted only after its own upload succeeded; failures leave it for
// the next pass.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pitr_storage::ArchiveStore;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{PitrError, PitrResult};
use crate::layout::wal_object;

/// Counts from one shipping pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShipReport {
    pub day: String,
    pub uploaded: usize,
    pub failed: usize,
}

pub struct WalShipper {
    spool: PathBuf,
    store: Arc<dyn ArchiveStore>,
    clock: Arc<dyn Clock>,
}

impl WalShipper {
    pub fn new(spool: impl Into<PathBuf>, store: Arc<dyn ArchiveStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            spool: spool.into(),
            store,
            clock,
        }
    }

    pub fn spool(&self) -> &Path {
        &self.spool
    }

    /// Upload every visible spool file to today's WAL folder.
    pub async fn ship_once(&self) -> PitrResult<ShipReport> {
        let day = self.clock.today().to_string();
        let mut report = ShipReport {
            day: day.clone(),
            ..ShipReport::default()
        };

        for name in self.pending().await? {
            let path = self.spool.join(&name);
            match self.store.upload_file(&path, &day, &wal_object(&name)).await {
                Ok(()) => {
                    report.uploaded += 1;
                    if let Err(err) = tokio::fs::remove_file(&path).await {
                        warn!(file = %name, error = %err, "Shipped segment could not be removed from spool");
                    }
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(file = %name, day = %day, error = %err, "Segment upload failed, will retry");
                }
            }
        }

        if report.uploaded > 0 || report.failed > 0 {
            info!(
                day = %day,
                uploaded = report.uploaded,
                failed = report.failed,
                "WAL shipping pass finished"
            );
        }
        Ok(report)
    }

    /// Regular, non-hidden spool files in name order.
    async fn pending(&self) -> PitrResult<Vec<String>> {
        let spool = self.spool.clone();
        tokio::task::spawn_blocking(move || -> PitrResult<Vec<String>> {
            let entries = match std::fs::read_dir(&spool) {
                Ok(entries) => entries,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    debug!(spool = %spool.display(), "WAL spool does not exist yet");
                    return Ok(Vec::new());
                }
                Err(err) => return Err(err.into()),
            };
            let mut names = Vec::new();
            for entry in entries {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                if !name.starts_with('.') {
                    names.push(name);
                }
            }
            names.sort();
            Ok(names)
        })
        .await
        .map_err(|e| PitrError::Io(std::io::Error::other(e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use pitr_storage::InMemoryArchiveStore;
    use tempfile::TempDir;

    fn shipper(spool: &Path, store: &InMemoryArchiveStore) -> WalShipper {
        WalShipper::new(
            spool,
            Arc::new(store.clone()),
            Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap())),
        )
    }

    #[tokio::test]
    async fn test_ships_visible_files_and_clears_spool() {
        let spool = TempDir::new().unwrap();
        std::fs::write(spool.path().join("0000000100000000000000A1"), b"a1").unwrap();
        std::fs::write(spool.path().join("0000000100000000000000A2"), b"a2").unwrap();
        std::fs::write(spool.path().join(".in-progress"), b"tmp").unwrap();
        std::fs::create_dir(spool.path().join("archive_status")).unwrap();
        let store = InMemoryArchiveStore::new();

        let report = shipper(spool.path(), &store).ship_once().await.unwrap();
        assert_eq!(report.day, "2024-03-04");
        assert_eq!(report.uploaded, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(
            store.object_paths("2024-03-04").await,
            vec!["WAL/0000000100000000000000A1", "WAL/0000000100000000000000A2"]
        );
        assert!(!spool.path().join("0000000100000000000000A1").exists());
        assert!(spool.path().join(".in-progress").exists());
        assert!(spool.path().join("archive_status").exists());
    }

    #[tokio::test]
    async fn test_failed_uploads_stay_in_spool() {
        let spool = TempDir::new().unwrap();
        std::fs::write(spool.path().join("0000000100000000000000A1"), b"a1").unwrap();
        let store = InMemoryArchiveStore::new();
        store.set_offline(true);

        let report = shipper(spool.path(), &store).ship_once().await.unwrap();
        assert_eq!(report.uploaded, 0);
        assert_eq!(report.failed, 1);
        assert!(spool.path().join("0000000100000000000000A1").exists());
    }

    #[tokio::test]
    async fn test_missing_spool_is_empty_pass() {
        let root = TempDir::new().unwrap();
        let store = InMemoryArchiveStore::new();
        let report = shipper(&root.path().join("absent"), &store).ship_once().await.unwrap();
        assert_eq!(report.uploaded + report.failed, 0);
    }
}
