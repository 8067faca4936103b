// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Archive store error types.
//
// Distinguishes the failures callers react to differently: a missing day or
// object (answered to the caller, never retried), an unreachable store
// (transient, retried with backoff by healing actions), and local I/O or
// serialization problems.

use thiserror::Error;

/// Errors that can occur when interacting with an archive store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred in the underlying storage layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested day namespace does not exist.
    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),

    /// The requested object does not exist in the namespace.
    #[error("object not found: {day}/{name}")]
    ObjectNotFound {
        /// Day namespace that was searched.
        day: String,
        /// Object name within the namespace.
        name: String,
    },

    /// Failed to serialize or deserialize a stored object.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// The store is not reachable (network failure, mount gone, ...).
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// An object name that cannot be mapped into the store.
    #[error("invalid object name: {0}")]
    InvalidName(String),
}

impl StorageError {
    pub fn object_not_found(day: &str, name: &str) -> Self {
        StorageError::ObjectNotFound {
            day: day.to_string(),
            name: name.to_string(),
        }
    }

    /// Whether the operation may succeed if retried unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::BackendUnavailable(_))
    }

    /// Whether the error means the day or object simply is not there.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::NamespaceNotFound(_) | StorageError::ObjectNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file gone");
        let err = StorageError::Io(io_err);
        assert!(err.to_string().contains("I/O error"));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_object_not_found_display() {
        let err = StorageError::object_not_found("2024-03-01", "metadata.json");
        assert_eq!(err.to_string(), "object not found: 2024-03-01/metadata.json");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_namespace_not_found_display() {
        let err = StorageError::NamespaceNotFound("2024-03-01".to_string());
        assert!(err.to_string().contains("namespace not found"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_backend_unavailable_is_transient() {
        let err = StorageError::BackendUnavailable("connection refused".to_string());
        assert!(err.to_string().contains("backend unavailable"));
        assert!(err.is_transient());
        assert!(!err.is_not_found());
    }
}
