// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Directory-backed archive store.
//
// Maps each day namespace to a directory under a root path, which is how a
// network share or a mounted bucket presents the archive. All filesystem work
// runs on the blocking pool. A missing root is reported as an unavailable
// backend (the mount went away), never as an empty archive.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::backend::{validate_object_name, ArchiveStore, ObjectInfo};
use crate::error::StorageError;
use crate::files::{blocking, copy_stamped, modified_utc};

/// An archive store rooted at a local (or mounted) directory.
///
/// # Example
///
/// ```rust,no_run
/// use pitr_storage::local::LocalArchiveStore;
/// use pitr_storage::backend::ArchiveStore;
///
/// # tokio_test::block_on(async {
/// let store = LocalArchiveStore::new("/mnt/pitr-archive");
/// for day in store.list_day_namespaces().await.unwrap() {
///     println!("{}", day.name);
/// }
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct LocalArchiveStore {
    root: PathBuf,
}

impl LocalArchiveStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the archive.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn day_dir(&self, day: &str) -> Result<PathBuf, StorageError> {
        validate_object_name(day)?;
        Ok(self.root.join(day))
    }

    fn object_path(&self, day: &str, name: &str) -> Result<PathBuf, StorageError> {
        validate_object_name(name)?;
        Ok(self.day_dir(day)?.join(name))
    }
}

fn check_root(root: &Path) -> Result<(), StorageError> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(StorageError::BackendUnavailable(format!(
            "archive root {} is not reachable",
            root.display()
        )))
    }
}

fn describe(path: &Path) -> io::Result<ObjectInfo> {
    let metadata = fs::metadata(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let size_bytes = if metadata.is_dir() {
        let mut total = 0;
        for entry in fs::read_dir(path)? {
            let entry_meta = entry?.metadata()?;
            if entry_meta.is_file() {
                total += entry_meta.len();
            }
        }
        total
    } else {
        metadata.len()
    };
    Ok(ObjectInfo {
        name,
        is_dir: metadata.is_dir(),
        size_bytes,
        modified_at: modified_utc(&metadata),
    })
}

fn list_dir(dir: &Path) -> io::Result<Vec<ObjectInfo>> {
    let mut listing = Vec::new();
    for entry in fs::read_dir(dir)? {
        listing.push(describe(&entry?.path())?);
    }
    listing.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(listing)
}

fn not_found_as(err: io::Error, missing: impl FnOnce() -> StorageError) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        missing()
    } else {
        StorageError::Io(err)
    }
}

#[async_trait]
impl ArchiveStore for LocalArchiveStore {
    async fn list_day_namespaces(&self) -> Result<Vec<ObjectInfo>, StorageError> {
        let root = self.root.clone();
        blocking(move || {
            check_root(&root)?;
            let mut days: Vec<ObjectInfo> =
                list_dir(&root)?.into_iter().filter(|o| o.is_dir).collect();
            days.reverse();
            Ok(days)
        })
        .await
    }

    async fn list_objects(&self, day: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        let root = self.root.clone();
        let dir = self.day_dir(day)?;
        let day = day.to_string();
        blocking(move || {
            check_root(&root)?;
            list_dir(&dir).map_err(|e| not_found_as(e, || StorageError::NamespaceNotFound(day)))
        })
        .await
    }

    async fn list_folder(&self, day: &str, folder: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        let root = self.root.clone();
        let dir = self.object_path(day, folder)?;
        let (day, folder) = (day.to_string(), folder.to_string());
        blocking(move || {
            check_root(&root)?;
            let listing = list_dir(&dir)
                .map_err(|e| not_found_as(e, || StorageError::object_not_found(&day, &folder)))?;
            Ok(listing.into_iter().filter(|o| !o.is_dir).collect())
        })
        .await
    }

    async fn read_object(&self, day: &str, name: &str) -> Result<Vec<u8>, StorageError> {
        let root = self.root.clone();
        let path = self.object_path(day, name)?;
        let (day, name) = (day.to_string(), name.to_string());
        blocking(move || {
            check_root(&root)?;
            fs::read(&path).map_err(|e| not_found_as(e, || StorageError::object_not_found(&day, &name)))
        })
        .await
    }

    async fn write_object(&self, day: &str, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let root = self.root.clone();
        let path = self.object_path(day, name)?;
        let bytes = bytes.to_vec();
        blocking(move || {
            check_root(&root)?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            // Readers never observe a half-written object.
            let tmp = path.with_extension("partial-write");
            fs::write(&tmp, &bytes)?;
            fs::rename(&tmp, &path)?;
            debug!(path = %path.display(), bytes = bytes.len(), "wrote archive object");
            Ok(())
        })
        .await
    }

    async fn delete_object(&self, day: &str, name: &str) -> Result<bool, StorageError> {
        let root = self.root.clone();
        let path = self.object_path(day, name)?;
        blocking(move || {
            check_root(&root)?;
            let removed = match fs::metadata(&path) {
                Ok(meta) if meta.is_dir() => fs::remove_dir_all(&path),
                Ok(_) => fs::remove_file(&path),
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
                Err(e) => return Err(e.into()),
            };
            removed?;
            Ok(true)
        })
        .await
    }

    async fn download_folder(
        &self,
        day: &str,
        folder: &str,
        dest: &Path,
    ) -> Result<usize, StorageError> {
        let root = self.root.clone();
        let dir = self.object_path(day, folder)?;
        let dest = dest.to_path_buf();
        let (day, folder) = (day.to_string(), folder.to_string());
        blocking(move || {
            check_root(&root)?;
            let listing = list_dir(&dir)
                .map_err(|e| not_found_as(e, || StorageError::object_not_found(&day, &folder)))?;
            fs::create_dir_all(&dest)?;
            let mut copied = 0;
            for object in listing.iter().filter(|o| !o.is_dir) {
                copy_stamped(&dir.join(&object.name), &dest.join(&object.name))?;
                copied += 1;
            }
            Ok(copied)
        })
        .await
    }

    async fn download_object(
        &self,
        day: &str,
        name: &str,
        dest: &Path,
    ) -> Result<u64, StorageError> {
        let root = self.root.clone();
        let path = self.object_path(day, name)?;
        let dest = dest.to_path_buf();
        let (day, name) = (day.to_string(), name.to_string());
        blocking(move || {
            check_root(&root)?;
            copy_stamped(&path, &dest)
                .map_err(|e| not_found_as(e, || StorageError::object_not_found(&day, &name)))
        })
        .await
    }

    async fn upload_file(&self, local: &Path, day: &str, name: &str) -> Result<(), StorageError> {
        let root = self.root.clone();
        let path = self.object_path(day, name)?;
        let local = local.to_path_buf();
        blocking(move || {
            check_root(&root)?;
            copy_stamped(&local, &path)?;
            Ok(())
        })
        .await
    }

    fn name(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::write_stamped;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    const DAY: &str = "2024-03-01";

    fn setup() -> (TempDir, LocalArchiveStore) {
        let dir = TempDir::new().unwrap();
        let store = LocalArchiveStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_write_read_delete() {
        let (_dir, store) = setup();
        store.write_object(DAY, "metadata.json", b"{\"x\":1}").await.unwrap();
        assert_eq!(store.read_object(DAY, "metadata.json").await.unwrap(), b"{\"x\":1}".to_vec());

        assert!(store.delete_object(DAY, "metadata.json").await.unwrap());
        assert!(!store.delete_object(DAY, "metadata.json").await.unwrap());
        assert!(store.read_object(DAY, "metadata.json").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_days_listed_most_recent_first() {
        let (dir, store) = setup();
        for day in ["2024-02-28", "2024-03-01", "2024-02-29"] {
            fs::create_dir(dir.path().join(day)).unwrap();
        }
        fs::write(dir.path().join("stray.txt"), b"x").unwrap();

        let names: Vec<String> = store
            .list_day_namespaces()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.name)
            .collect();
        assert_eq!(names, vec!["2024-03-01", "2024-02-29", "2024-02-28"]);
    }

    #[tokio::test]
    async fn test_missing_root_is_unavailable() {
        let store = LocalArchiveStore::new("/nonexistent/pitr-archive-root");
        let err = store.list_day_namespaces().await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_missing_day_and_folder() {
        let (dir, store) = setup();
        assert!(matches!(
            store.list_objects(DAY).await,
            Err(StorageError::NamespaceNotFound(_))
        ));
        fs::create_dir(dir.path().join(DAY)).unwrap();
        assert!(matches!(
            store.list_folder(DAY, "WAL").await,
            Err(StorageError::ObjectNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_folder_download_keeps_timestamps() {
        let (dir, store) = setup();
        let stamp = Utc.with_ymd_and_hms(2024, 3, 1, 2, 30, 0).unwrap();
        let wal = dir.path().join(DAY).join("WAL");
        write_stamped(&wal.join("0000000100000000000000A1"), b"seg", Some(stamp)).unwrap();

        let folder = store.object_info(DAY, "WAL").await.unwrap().unwrap();
        assert!(folder.is_dir);
        assert_eq!(folder.size_bytes, 3);

        let staging = TempDir::new().unwrap();
        assert_eq!(store.download_folder(DAY, "WAL", staging.path()).await.unwrap(), 1);
        let local = staging.path().join("0000000100000000000000A1");
        assert_eq!(modified_utc(&fs::metadata(&local).unwrap()), Some(stamp));
    }

    #[tokio::test]
    async fn test_empty_folder_download_creates_destination() {
        let (dir, store) = setup();
        fs::create_dir_all(dir.path().join(DAY).join("WAL")).unwrap();

        let staging = TempDir::new().unwrap();
        let dest = staging.path().join("WAL");
        assert_eq!(store.download_folder(DAY, "WAL", &dest).await.unwrap(), 0);
        assert!(dest.is_dir());
    }

    #[tokio::test]
    async fn test_upload_creates_namespace() {
        let (_dir, store) = setup();
        let staging = TempDir::new().unwrap();
        let local = staging.path().join("base.tar.gz");
        fs::write(&local, b"base").unwrap();

        store.upload_file(&local, DAY, "base.tar.gz").await.unwrap();
        let info = store.object_info(DAY, "base.tar.gz").await.unwrap().unwrap();
        assert_eq!(info.size_bytes, 4);
    }

    #[tokio::test]
    async fn test_rejects_escaping_names() {
        let (_dir, store) = setup();
        let err = store.write_object(DAY, "../outside", b"x").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidName(_)));
    }
}
