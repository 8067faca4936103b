// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Typed object access.
//
// Provides a serde-based interface on top of any `ArchiveStore` for the JSON
// documents kept next to the archives (metadata files, sentinels). Values are
// written as pretty-printed JSON so operators can read them in place.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::backend::ArchiveStore;
use crate::error::StorageError;

/// A typed wrapper around an [`ArchiveStore`] handling JSON serialization.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use pitr_storage::memory::InMemoryArchiveStore;
/// use pitr_storage::typed::TypedObjects;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Serialize, Deserialize, PartialEq)]
/// struct Marker { reason: String }
///
/// # tokio_test::block_on(async {
/// let objects = TypedObjects::new(Arc::new(InMemoryArchiveStore::new()));
///
/// let marker = Marker { reason: "disk replaced".into() };
/// objects.put("2024-03-01", "marker.json", &marker).await.unwrap();
///
/// let back: Marker = objects.get("2024-03-01", "marker.json").await.unwrap().unwrap();
/// assert_eq!(back, marker);
/// # });
/// ```
#[derive(Clone)]
pub struct TypedObjects {
    store: Arc<dyn ArchiveStore>,
}

impl TypedObjects {
    pub fn new(store: Arc<dyn ArchiveStore>) -> Self {
        Self { store }
    }

    /// Return the underlying store.
    pub fn store(&self) -> &Arc<dyn ArchiveStore> {
        &self.store
    }

    /// Retrieve and deserialize an object.
    ///
    /// Returns `Ok(None)` if the day or the object does not exist.
    pub async fn get<T: DeserializeOwned>(
        &self,
        day: &str,
        name: &str,
    ) -> Result<Option<T>, StorageError> {
        let bytes = match self.store.read_object(day, name).await {
            Ok(bytes) => bytes,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        };
        let value = serde_json::from_slice(&bytes).map_err(|err| {
            StorageError::SerializationError(format!(
                "failed to deserialize {day}/{name}: {err}"
            ))
        })?;
        Ok(Some(value))
    }

    /// Serialize and store a value.
    pub async fn put<T: Serialize + Sync>(
        &self,
        day: &str,
        name: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|err| {
            StorageError::SerializationError(format!("failed to serialize {day}/{name}: {err}"))
        })?;
        self.store.write_object(day, name, &bytes).await
    }
}
