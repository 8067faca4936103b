// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Local file helpers shared by the store implementations. Segment timestamps
// are the only record of when WAL was written, so every copy keeps the
// source modification time.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use crate::error::StorageError;

/// Modification time of a file as UTC, if the platform reports one.
pub(crate) fn modified_utc(metadata: &fs::Metadata) -> Option<DateTime<Utc>> {
    metadata.modified().ok().map(DateTime::<Utc>::from)
}

/// Set a file's modification time.
pub(crate) fn set_modified(path: &Path, modified_at: DateTime<Utc>) -> io::Result<()> {
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_modified(SystemTime::from(modified_at))
}

/// Write `bytes` to `path` (creating parent directories) and stamp it with
/// `modified_at` when known.
pub(crate) fn write_stamped(
    path: &Path,
    bytes: &[u8],
    modified_at: Option<DateTime<Utc>>,
) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    if let Some(modified_at) = modified_at {
        set_modified(path, modified_at)?;
    }
    Ok(())
}

/// Copy `src` to `dest`, creating parent directories and keeping the source
/// modification time. Returns the number of bytes copied.
pub(crate) fn copy_stamped(src: &Path, dest: &Path) -> io::Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let copied = fs::copy(src, dest)?;
    if let Some(modified_at) = modified_utc(&fs::metadata(src)?) {
        set_modified(dest, modified_at)?;
    }
    Ok(copied)
}

/// Run blocking filesystem work off the async runtime.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T, StorageError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| StorageError::BackendUnavailable(format!("blocking task failed: {e}")))?
}
