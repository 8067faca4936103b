// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PITR Archive Store Abstraction
//
// This crate provides the day-scoped object store the archive engine reads
// and writes. The `ArchiveStore` trait is the contract every store meets, so
// the engine can run against a mounted share in production and an in-memory
// store in tests.
//
// # Modules
//
// - [`backend`] -- The `ArchiveStore` trait and listing entries.
// - [`error`] -- The `StorageError` enum covering all store failure modes.
// - [`local`] -- A directory-backed store for mounted archives.
// - [`memory`] -- An in-memory `BTreeMap`-based store for tests.
// - [`typed`] -- A serde-based JSON wrapper.
// - [`metrics`] -- A transparent wrapper that counts store calls.
//
// # Example
//
// ```rust
// use std::sync::Arc;
// use pitr_storage::backend::ArchiveStore;
// use pitr_storage::memory::InMemoryArchiveStore;
// use pitr_storage::metrics::MetricsStore;
// use pitr_storage::typed::TypedObjects;
//
// # tokio_test::block_on(async {
// let metered = Arc::new(MetricsStore::new(InMemoryArchiveStore::new()));
// let objects = TypedObjects::new(metered.clone());
// objects.put("2024-03-01", "note.json", &serde_json::json!({"ok": true})).await.unwrap();
//
// assert_eq!(metered.stats().await.write_count, 1);
// # });
// ```

pub mod backend;
pub mod error;
mod files;
pub mod local;
pub mod memory;
pub mod metrics;
pub mod typed;

// Re-export the most commonly used types at the crate root for convenience.
pub use backend::{validate_object_name, ArchiveStore, ObjectInfo};
pub use error::StorageError;
pub use local::LocalArchiveStore;
pub use memory::InMemoryArchiveStore;
pub use metrics::{MetricsStore, StoreStats};
pub use typed::TypedObjects;
