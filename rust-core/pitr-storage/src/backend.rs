// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core archive store trait.
//
// The archive is organised as one namespace per calendar day. Each namespace
// holds a handful of well-known objects (`base.tar.gz`, `metadata.json`,
// `WAL_archive.tar.gz`) and a `WAL` folder of raw segment files. Object names
// may contain `/` to address files inside a folder (`WAL/0000...A1`).
//
// Implementations must be `Send + Sync` and every operation may block for
// seconds; callers must not hold locks across these calls.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// One entry of a store listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Name relative to the listed namespace or folder.
    pub name: String,
    /// Whether the entry is a folder.
    pub is_dir: bool,
    /// Size in bytes (sum of contained files for folders).
    pub size_bytes: u64,
    /// Last modification time, when the store knows it.
    pub modified_at: Option<DateTime<Utc>>,
}

/// A day-scoped object store holding PITR archives.
///
/// Implementations must be safe to share across threads and tokio tasks.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// List all day namespaces, most recent (lexicographically greatest)
    /// first.
    async fn list_day_namespaces(&self) -> Result<Vec<ObjectInfo>, StorageError>;

    /// List the top-level entries of a day namespace.
    ///
    /// Fails with [`StorageError::NamespaceNotFound`] if the day does not
    /// exist.
    async fn list_objects(&self, day: &str) -> Result<Vec<ObjectInfo>, StorageError>;

    /// List the files inside `folder` of a day namespace.
    ///
    /// Fails with [`StorageError::ObjectNotFound`] if the folder does not
    /// exist.
    async fn list_folder(&self, day: &str, folder: &str) -> Result<Vec<ObjectInfo>, StorageError>;

    /// Read an object's full contents.
    async fn read_object(&self, day: &str, name: &str) -> Result<Vec<u8>, StorageError>;

    /// Create or replace an object, creating the namespace if needed.
    async fn write_object(&self, day: &str, name: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Delete an object or a whole folder.
    ///
    /// Returns `Ok(true)` if something was removed, `Ok(false)` if nothing
    /// existed under that name.
    async fn delete_object(&self, day: &str, name: &str) -> Result<bool, StorageError>;

    /// Copy every file of `folder` into the local directory `dest`, keeping
    /// modification times. Returns the number of files copied.
    async fn download_folder(
        &self,
        day: &str,
        folder: &str,
        dest: &Path,
    ) -> Result<usize, StorageError>;

    /// Copy one object to the local file `dest`, keeping its modification
    /// time. Returns the number of bytes copied.
    async fn download_object(&self, day: &str, name: &str, dest: &Path)
        -> Result<u64, StorageError>;

    /// Upload a local file as object `name`, keeping its modification time.
    async fn upload_file(&self, local: &Path, day: &str, name: &str) -> Result<(), StorageError>;

    /// A human-readable name for this store, used in logging.
    fn name(&self) -> &str;

    /// Look up a single top-level entry of a namespace.
    async fn object_info(&self, day: &str, name: &str) -> Result<Option<ObjectInfo>, StorageError> {
        let objects = self.list_objects(day).await?;
        Ok(objects.into_iter().find(|object| object.name == name))
    }
}

/// Reject object names that would escape their namespace.
pub fn validate_object_name(name: &str) -> Result<(), StorageError> {
    let bad = name.is_empty()
        || name.starts_with('/')
        || name.contains('\\')
        || name.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if bad {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_object_name() {
        assert!(validate_object_name("metadata.json").is_ok());
        assert!(validate_object_name("WAL/0000000100000000000000A1").is_ok());
        assert!(validate_object_name("").is_err());
        assert!(validate_object_name("/etc/passwd").is_err());
        assert!(validate_object_name("WAL/../base.tar.gz").is_err());
        assert!(validate_object_name("WAL//x").is_err());
    }
}
