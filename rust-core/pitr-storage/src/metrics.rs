// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metrics-collecting wrapper for archive stores.
//
// Wraps any `ArchiveStore` and counts every call that reaches it, together
// with byte totals and failures. Besides feeding dashboards, the counters let
// tests prove that a cached answer really never touched the archive.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::backend::{ArchiveStore, ObjectInfo};
use crate::error::StorageError;

/// Accumulated statistics for an archive store.
///
/// All counters are monotonically increasing until
/// [`MetricsStore::reset_stats`] is called.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    /// Number of listing calls (days, namespace contents, folders).
    pub list_count: u64,
    /// Number of `read_object` calls.
    pub read_count: u64,
    /// Number of `write_object` calls.
    pub write_count: u64,
    /// Number of `delete_object` calls.
    pub delete_count: u64,
    /// Number of folder or object downloads.
    pub download_count: u64,
    /// Number of file uploads.
    pub upload_count: u64,
    /// Number of calls that returned an error.
    pub failure_count: u64,
    /// Total bytes returned by reads and object downloads.
    pub total_bytes_read: u64,
    /// Total bytes accepted by writes.
    pub total_bytes_written: u64,
    /// Cumulative wall-clock latency of all calls, in milliseconds.
    pub latency_sum_ms: f64,
}

impl StoreStats {
    /// Total number of calls that reached the store.
    pub fn total_calls(&self) -> u64 {
        self.list_count
            + self.read_count
            + self.write_count
            + self.delete_count
            + self.download_count
            + self.upload_count
    }
}

#[derive(Clone, Copy)]
enum Op {
    List,
    Read,
    Write,
    Delete,
    Download,
    Upload,
}

/// An archive store wrapper that collects operation metrics.
///
/// # Example
///
/// ```rust
/// use pitr_storage::memory::InMemoryArchiveStore;
/// use pitr_storage::metrics::MetricsStore;
/// use pitr_storage::backend::ArchiveStore;
///
/// # tokio_test::block_on(async {
/// let metered = MetricsStore::new(InMemoryArchiveStore::new());
///
/// metered.write_object("2024-03-01", "metadata.json", b"{}").await.unwrap();
/// metered.read_object("2024-03-01", "metadata.json").await.unwrap();
///
/// let stats = metered.stats().await;
/// assert_eq!(stats.write_count, 1);
/// assert_eq!(stats.read_count, 1);
/// # });
/// ```
pub struct MetricsStore<S: ArchiveStore> {
    inner: S,
    stats: Arc<RwLock<StoreStats>>,
}

impl<S: ArchiveStore> MetricsStore<S> {
    /// Wrap `inner` with metrics collection.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            stats: Arc::new(RwLock::new(StoreStats::default())),
        }
    }

    /// Return a snapshot of the current statistics.
    pub async fn stats(&self) -> StoreStats {
        self.stats.read().await.clone()
    }

    /// Reset all statistics to zero.
    pub async fn reset_stats(&self) {
        *self.stats.write().await = StoreStats::default();
    }

    /// Return a reference to the inner store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn record(&self, op: Op, start: Instant, failed: bool, bytes_read: u64, bytes_written: u64) {
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        let mut s = self.stats.write().await;
        match op {
            Op::List => s.list_count += 1,
            Op::Read => s.read_count += 1,
            Op::Write => s.write_count += 1,
            Op::Delete => s.delete_count += 1,
            Op::Download => s.download_count += 1,
            Op::Upload => s.upload_count += 1,
        }
        s.latency_sum_ms += elapsed_ms;
        if failed {
            s.failure_count += 1;
        } else {
            s.total_bytes_read += bytes_read;
            s.total_bytes_written += bytes_written;
        }
    }
}

#[async_trait]
impl<S: ArchiveStore> ArchiveStore for MetricsStore<S> {
    async fn list_day_namespaces(&self) -> Result<Vec<ObjectInfo>, StorageError> {
        let start = Instant::now();
        let result = self.inner.list_day_namespaces().await;
        self.record(Op::List, start, result.is_err(), 0, 0).await;
        result
    }

    async fn list_objects(&self, day: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        let start = Instant::now();
        let result = self.inner.list_objects(day).await;
        self.record(Op::List, start, result.is_err(), 0, 0).await;
        result
    }

    async fn list_folder(&self, day: &str, folder: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        let start = Instant::now();
        let result = self.inner.list_folder(day, folder).await;
        self.record(Op::List, start, result.is_err(), 0, 0).await;
        result
    }

    async fn read_object(&self, day: &str, name: &str) -> Result<Vec<u8>, StorageError> {
        let start = Instant::now();
        let result = self.inner.read_object(day, name).await;
        let bytes = result.as_ref().map(|b| b.len() as u64).unwrap_or(0);
        self.record(Op::Read, start, result.is_err(), bytes, 0).await;
        result
    }

    async fn write_object(&self, day: &str, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let start = Instant::now();
        let result = self.inner.write_object(day, name, bytes).await;
        self.record(Op::Write, start, result.is_err(), 0, bytes.len() as u64).await;
        result
    }

    async fn delete_object(&self, day: &str, name: &str) -> Result<bool, StorageError> {
        let start = Instant::now();
        let result = self.inner.delete_object(day, name).await;
        self.record(Op::Delete, start, result.is_err(), 0, 0).await;
        result
    }

    async fn download_folder(
        &self,
        day: &str,
        folder: &str,
        dest: &Path,
    ) -> Result<usize, StorageError> {
        let start = Instant::now();
        let result = self.inner.download_folder(day, folder, dest).await;
        self.record(Op::Download, start, result.is_err(), 0, 0).await;
        result
    }

    async fn download_object(
        &self,
        day: &str,
        name: &str,
        dest: &Path,
    ) -> Result<u64, StorageError> {
        let start = Instant::now();
        let result = self.inner.download_object(day, name, dest).await;
        let bytes = result.as_ref().copied().unwrap_or(0);
        self.record(Op::Download, start, result.is_err(), bytes, 0).await;
        result
    }

    async fn upload_file(&self, local: &Path, day: &str, name: &str) -> Result<(), StorageError> {
        let start = Instant::now();
        let result = self.inner.upload_file(local, day, name).await;
        self.record(Op::Upload, start, result.is_err(), 0, 0).await;
        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
