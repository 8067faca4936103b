// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Archive health classification.
//
// A day's state is a pure function of which well-known objects its namespace
// holds. Nothing is persisted: the state is recomputed from the store on
// every run, so classifying again after a partial failure is always safe.
//
// | archive | metadata | raw WAL | state                          |
// |---------|----------|---------|--------------------------------|
// | yes     | yes      | any     | Healthy                        |
// | yes     | no       | any     | MetadataMissingArchivePresent  |
// | no      | no       | yes     | RawOnlyNeedsArchiving          |
// | no      | no       | no      | TotalLoss                      |
// | no      | yes      | any     | Healthy (metadata is terminal) |

use std::fmt;

use chrono::{DateTime, Utc};
use pitr_storage::ObjectInfo;
use serde::{Deserialize, Serialize};

use crate::layout::{ARCHIVE_OBJECT, BASE_BACKUP_OBJECT, METADATA_OBJECT, WAL_FOLDER};

/// Consistency state of one historical archive day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveHealth {
    /// Archive and metadata are both present. Nothing to do.
    Healthy,
    /// The archive exists but its metadata was lost.
    MetadataMissingArchivePresent,
    /// Only raw segments exist; the day was never archived.
    RawOnlyNeedsArchiving,
    /// Nothing recoverable exists for the day.
    TotalLoss,
}

impl ArchiveHealth {
    /// Stable label used in logs, metrics and API responses.
    pub fn label(&self) -> &'static str {
        match self {
            ArchiveHealth::Healthy => "healthy",
            ArchiveHealth::MetadataMissingArchivePresent => "metadata_missing_archive_present",
            ArchiveHealth::RawOnlyNeedsArchiving => "raw_only_needs_archiving",
            ArchiveHealth::TotalLoss => "total_loss",
        }
    }

    /// Name of the healing action this state dispatches to.
    pub fn action(&self) -> &'static str {
        match self {
            ArchiveHealth::Healthy => "confirm-healthy",
            ArchiveHealth::MetadataMissingArchivePresent => "heal-metadata-from-archive",
            ArchiveHealth::RawOnlyNeedsArchiving => "archive-raw-segments",
            ArchiveHealth::TotalLoss => "report-total-loss",
        }
    }

    pub fn needs_healing(&self) -> bool {
        !matches!(self, ArchiveHealth::Healthy)
    }
}

impl fmt::Display for ArchiveHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Presence of the well-known objects in a day namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayInventory {
    pub archive: bool,
    pub metadata: bool,
    pub raw_folder: bool,
    pub base_backup: bool,
    /// Modification time of the base backup, when present.
    pub base_time: Option<DateTime<Utc>>,
}

impl DayInventory {
    /// Build an inventory from a namespace listing.
    pub fn from_listing(listing: &[ObjectInfo]) -> Self {
        let mut inventory = Self::default();
        for object in listing {
            match (object.name.as_str(), object.is_dir) {
                (ARCHIVE_OBJECT, false) => inventory.archive = true,
                (METADATA_OBJECT, false) => inventory.metadata = true,
                (WAL_FOLDER, true) => inventory.raw_folder = true,
                (BASE_BACKUP_OBJECT, false) => {
                    inventory.base_backup = true;
                    inventory.base_time = object.modified_at;
                }
                _ => {}
            }
        }
        inventory
    }

    pub fn classify(&self) -> ArchiveHealth {
        classify(self)
    }
}

/// Map an inventory to its health state.
pub fn classify(inventory: &DayInventory) -> ArchiveHealth {
    match (inventory.archive, inventory.metadata, inventory.raw_folder) {
        (true, true, _) => ArchiveHealth::Healthy,
        (true, false, _) => ArchiveHealth::MetadataMissingArchivePresent,
        (false, false, true) => ArchiveHealth::RawOnlyNeedsArchiving,
        (false, false, false) => ArchiveHealth::TotalLoss,
        (false, true, _) => ArchiveHealth::Healthy,
    }
}
