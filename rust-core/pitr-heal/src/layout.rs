// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Well-known object names inside a day namespace.

/// Physical base backup anchoring the day.
pub const BASE_BACKUP_OBJECT: &str = "base.tar.gz";

/// Persisted `PitrMetadata` for the day.
pub const METADATA_OBJECT: &str = "metadata.json";

/// Compressed archive of the day's WAL folder.
pub const ARCHIVE_OBJECT: &str = "WAL_archive.tar.gz";

/// Folder of raw segment files.
pub const WAL_FOLDER: &str = "WAL";

/// Object name of a raw segment file inside the WAL folder.
pub fn wal_object(segment_file: &str) -> String {
    format!("{WAL_FOLDER}/{segment_file}")
}
