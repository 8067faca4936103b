// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory archive store.
//
// Keeps every namespace as a sorted map of object paths wrapped in a tokio
// `RwLock`. Folders are implicit: `WAL/x` and `WAL/y` make `WAL` show up as a
// folder in the namespace listing. Intended for tests and development; the
// store can be switched "offline" to exercise transient-failure paths.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::backend::{validate_object_name, ArchiveStore, ObjectInfo};
use crate::error::StorageError;
use crate::files::{blocking, modified_utc, write_stamped};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    modified_at: Option<DateTime<Utc>>,
}

type Namespace = BTreeMap<String, StoredObject>;

/// An archive store living entirely in process memory.
///
/// Clones share state.
///
/// # Example
///
/// ```rust
/// use pitr_storage::memory::InMemoryArchiveStore;
/// use pitr_storage::backend::ArchiveStore;
///
/// # tokio_test::block_on(async {
/// let store = InMemoryArchiveStore::new();
/// store.write_object("2024-03-01", "metadata.json", b"{}").await.unwrap();
/// let bytes = store.read_object("2024-03-01", "metadata.json").await.unwrap();
/// assert_eq!(bytes, b"{}".to_vec());
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryArchiveStore {
    days: Arc<RwLock<BTreeMap<String, Namespace>>>,
    offline: Arc<AtomicBool>,
}

impl InMemoryArchiveStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty day namespace.
    pub async fn create_namespace(&self, day: &str) {
        self.days.write().await.entry(day.to_string()).or_default();
    }

    /// Seed an object with an explicit modification time.
    pub async fn insert_object(
        &self,
        day: &str,
        name: &str,
        bytes: &[u8],
        modified_at: Option<DateTime<Utc>>,
    ) {
        self.days.write().await.entry(day.to_string()).or_default().insert(
            name.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                modified_at,
            },
        );
    }

    /// All object paths stored under a day, sorted.
    pub async fn object_paths(&self, day: &str) -> Vec<String> {
        self.days
            .read()
            .await
            .get(day)
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Simulate the store becoming unreachable (`true`) or recovering.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StorageError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::BackendUnavailable(
                "in-memory store is offline".to_string(),
            ));
        }
        Ok(())
    }

    /// Files directly inside `folder`, keyed by their name within it.
    fn folder_files<'a>(
        namespace: &'a Namespace,
        folder: &str,
    ) -> impl Iterator<Item = (&'a str, &'a StoredObject)> + 'a {
        let prefix = format!("{folder}/");
        namespace
            .iter()
            .filter_map(move |(path, object)| {
                path.strip_prefix(prefix.as_str())
                    .filter(|rest| !rest.contains('/'))
                    .map(|rest| (rest, object))
            })
    }
}

#[async_trait]
impl ArchiveStore for InMemoryArchiveStore {
    async fn list_day_namespaces(&self) -> Result<Vec<ObjectInfo>, StorageError> {
        self.check_online()?;
        let days = self.days.read().await;
        let mut listing: Vec<ObjectInfo> = days
            .iter()
            .map(|(day, namespace)| ObjectInfo {
                name: day.clone(),
                is_dir: true,
                size_bytes: namespace.values().map(|o| o.bytes.len() as u64).sum(),
                modified_at: None,
            })
            .collect();
        listing.reverse();
        Ok(listing)
    }

    async fn list_objects(&self, day: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        self.check_online()?;
        let days = self.days.read().await;
        let namespace = days
            .get(day)
            .ok_or_else(|| StorageError::NamespaceNotFound(day.to_string()))?;

        let mut entries: BTreeMap<String, ObjectInfo> = BTreeMap::new();
        for (path, object) in namespace {
            let size = object.bytes.len() as u64;
            match path.split_once('/') {
                Some((folder, _)) => {
                    let entry = entries.entry(folder.to_string()).or_insert_with(|| ObjectInfo {
                        name: folder.to_string(),
                        is_dir: true,
                        size_bytes: 0,
                        modified_at: None,
                    });
                    entry.size_bytes += size;
                    entry.modified_at = entry.modified_at.max(object.modified_at);
                }
                None => {
                    entries.insert(
                        path.clone(),
                        ObjectInfo {
                            name: path.clone(),
                            is_dir: false,
                            size_bytes: size,
                            modified_at: object.modified_at,
                        },
                    );
                }
            }
        }
        Ok(entries.into_values().collect())
    }

    async fn list_folder(&self, day: &str, folder: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        self.check_online()?;
        validate_object_name(folder)?;
        let days = self.days.read().await;
        let namespace = days
            .get(day)
            .ok_or_else(|| StorageError::NamespaceNotFound(day.to_string()))?;

        let listing: Vec<ObjectInfo> = Self::folder_files(namespace, folder)
            .map(|(name, object)| ObjectInfo {
                name: name.to_string(),
                is_dir: false,
                size_bytes: object.bytes.len() as u64,
                modified_at: object.modified_at,
            })
            .collect();
        if listing.is_empty() {
            return Err(StorageError::object_not_found(day, folder));
        }
        Ok(listing)
    }

    async fn read_object(&self, day: &str, name: &str) -> Result<Vec<u8>, StorageError> {
        self.check_online()?;
        let days = self.days.read().await;
        days.get(day)
            .and_then(|ns| ns.get(name))
            .map(|object| object.bytes.clone())
            .ok_or_else(|| StorageError::object_not_found(day, name))
    }

    async fn write_object(&self, day: &str, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.check_online()?;
        validate_object_name(name)?;
        self.insert_object(day, name, bytes, Some(Utc::now())).await;
        Ok(())
    }

    async fn delete_object(&self, day: &str, name: &str) -> Result<bool, StorageError> {
        self.check_online()?;
        let mut days = self.days.write().await;
        let Some(namespace) = days.get_mut(day) else {
            return Ok(false);
        };
        let folder_prefix = format!("{name}/");
        let before = namespace.len();
        namespace.retain(|path, _| path != name && !path.starts_with(&folder_prefix));
        Ok(namespace.len() != before)
    }

    async fn download_folder(
        &self,
        day: &str,
        folder: &str,
        dest: &Path,
    ) -> Result<usize, StorageError> {
        self.check_online()?;
        let files: Vec<(String, StoredObject)> = {
            let days = self.days.read().await;
            let namespace = days
                .get(day)
                .ok_or_else(|| StorageError::NamespaceNotFound(day.to_string()))?;
            Self::folder_files(namespace, folder)
                .map(|(name, object)| (name.to_string(), object.clone()))
                .collect()
        };
        if files.is_empty() {
            return Err(StorageError::object_not_found(day, folder));
        }

        let dest = dest.to_path_buf();
        blocking(move || {
            for (name, object) in &files {
                write_stamped(&dest.join(name), &object.bytes, object.modified_at)?;
            }
            Ok(files.len())
        })
        .await
    }

    async fn download_object(
        &self,
        day: &str,
        name: &str,
        dest: &Path,
    ) -> Result<u64, StorageError> {
        self.check_online()?;
        let object = {
            let days = self.days.read().await;
            days.get(day)
                .and_then(|ns| ns.get(name))
                .cloned()
                .ok_or_else(|| StorageError::object_not_found(day, name))?
        };
        let dest = dest.to_path_buf();
        blocking(move || {
            write_stamped(&dest, &object.bytes, object.modified_at)?;
            Ok(object.bytes.len() as u64)
        })
        .await
    }

    async fn upload_file(&self, local: &Path, day: &str, name: &str) -> Result<(), StorageError> {
        self.check_online()?;
        validate_object_name(name)?;
        let local = local.to_path_buf();
        let (bytes, modified_at) = blocking(move || {
            let bytes = std::fs::read(&local)?;
            let modified_at = modified_utc(&std::fs::metadata(&local)?);
            Ok((bytes, modified_at))
        })
        .await?;
        self.insert_object(day, name, &bytes, modified_at).await;
        Ok(())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
