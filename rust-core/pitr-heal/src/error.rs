// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine error types.

use pitr_storage::StorageError;
use pitr_wal::WalError;
use thiserror::Error;

/// Errors surfaced by metadata resolution and healing.
#[derive(Debug, Error)]
pub enum PitrError {
    /// No namespace exists in the archive for the requested date.
    #[error("archive day not found: {0}")]
    ArchiveDayNotFound(String),

    /// The day has no stored metadata and no base backup to anchor a scan.
    #[error("base backup missing for {0}")]
    BaseBackupMissing(String),

    /// The archive store could not be reached.
    #[error("remote store unavailable: {0}")]
    RemoteStoreUnavailable(String),

    #[error("compression failed for {day}: {reason}")]
    CompressionFailed { day: String, reason: String },

    #[error("upload failed for {day}: {reason}")]
    UploadFailed { day: String, reason: String },

    /// Another healing action currently holds this day.
    #[error("healing already in progress for {0}")]
    HealingInProgress(String),

    #[error("invalid input: {0}")]
    Wal(#[from] WalError),

    #[error("storage error: {0}")]
    Storage(StorageError),

    #[error("notification delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("metrics registration failed: {0}")]
    Metrics(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for PitrError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::BackendUnavailable(reason) => PitrError::RemoteStoreUnavailable(reason),
            other => PitrError::Storage(other),
        }
    }
}

impl From<prometheus::Error> for PitrError {
    fn from(err: prometheus::Error) -> Self {
        PitrError::Metrics(err.to_string())
    }
}

impl PitrError {
    /// Whether a later run may succeed without anything changing.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PitrError::RemoteStoreUnavailable(_)
                | PitrError::HealingInProgress(_)
                | PitrError::UploadFailed { .. }
        )
    }
}

/// Convenience alias used throughout the engine.
pub type PitrResult<T> = Result<T, PitrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_store_maps_to_remote_unavailable() {
        let err: PitrError = StorageError::BackendUnavailable("timeout".into()).into();
        assert!(matches!(err, PitrError::RemoteStoreUnavailable(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_not_found_stays_storage_error() {
        let err: PitrError = StorageError::object_not_found("2024-03-01", "metadata.json").into();
        assert!(matches!(err, PitrError::Storage(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_display() {
        let err = PitrError::CompressionFailed {
            day: "2024-03-01".into(),
            reason: "disk full".into(),
        };
        assert_eq!(err.to_string(), "compression failed for 2024-03-01: disk full");
        assert_eq!(
            PitrError::BaseBackupMissing("2024-03-01".into()).to_string(),
            "base backup missing for 2024-03-01"
        );
    }
}
