// SPDX-License-Identifier: PMPL-1.0-or-later
//
// PITR WAL analysis - Error types
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Errors raised while interpreting WAL segment names and archive day
// identifiers. None of these are fatal to a scan: callers skip the offending
// object and keep going.

use thiserror::Error;

/// Errors that can occur while parsing WAL names and archive days.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalError {
    /// The name is not a 24-character hexadecimal WAL segment name.
    #[error("Malformed WAL segment name '{name}': {reason}")]
    MalformedSegmentName {
        /// The offending name as observed.
        name: String,
        /// Why the name was rejected.
        reason: String,
    },

    /// An archive namespace that is not a `YYYY-MM-DD` calendar date.
    #[error("Invalid archive day '{0}': expected YYYY-MM-DD")]
    InvalidDay(String),
}

impl WalError {
    pub(crate) fn malformed(name: &str, reason: impl Into<String>) -> Self {
        WalError::MalformedSegmentName {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for WAL analysis results.
pub type WalResult<T> = Result<T, WalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_malformed() {
        let error = WalError::malformed("0000XYZ", "expected 24 characters, got 7");
        let message = format!("{error}");
        assert!(message.contains("0000XYZ"));
        assert!(message.contains("24 characters"));
    }

    #[test]
    fn test_error_display_invalid_day() {
        let error = WalError::InvalidDay("lost+found".to_string());
        assert!(error.to_string().contains("lost+found"));
    }
}
