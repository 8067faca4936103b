// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PITR Archive Healing Engine
//
// Keeps daily archive namespaces consistent and answers "until when can this
// day be recovered?" for any of them.
//
// # Modules
//
// - [`engine`] -- `ArchiveEngine`, the facade used by the service.
// - [`resolver`] -- cache, stored metadata, then live scan.
// - [`classifier`] -- the four archive health states.
// - [`healing`] -- the action run for each state.
// - [`cache`] -- settled-day metadata cache.
// - [`source`] -- where segment names and timestamps are observed.
// - [`shipper`] -- moves spooled segments into today's namespace.
// - [`notifier`] -- operator notifications and their delivery worker.
// - [`staging`], [`locks`], [`retry`], [`metrics`], [`clock`], [`config`],
//   [`layout`], [`error`] -- supporting pieces.

pub mod cache;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod healing;
pub mod layout;
pub mod locks;
pub mod metrics;
pub mod notifier;
pub mod resolver;
pub mod retry;
pub mod shipper;
pub mod source;
pub mod staging;

pub use cache::DayMetadataCache;
pub use classifier::{classify, ArchiveHealth, DayInventory};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{EngineConfig, RetryPolicy};
pub use engine::{ArchiveEngine, DayOutcome, DayReport, EngineBuilder, ReconciliationReport};
pub use error::{PitrError, PitrResult};
pub use healing::{archive_summary, Healer};
pub use metrics::HealMetrics;
pub use notifier::{
    spawn_notification_worker, LogSink, MemoryNotifier, Notification, NotificationSink, Notifier,
    QueuedNotifier, Severity,
};
pub use resolver::MetadataResolver;
pub use shipper::{ShipReport, WalShipper};
pub use source::{LocalSegmentDir, SegmentSource, StoreSegmentFolder};
