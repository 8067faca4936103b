// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Local staging for healing actions.
//
// Every action works inside its own scratch directory, which is removed when
// the `StagingDir` is dropped, on success and on failure alike. Archives are
// gzip-compressed tarballs holding a single top-level `WAL/` directory;
// modification times survive the round trip because they are the segment
// timestamps continuity is computed from.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use pitr_wal::ArchiveDay;
use tempfile::TempDir;
use tracing::debug;

use crate::error::{PitrError, PitrResult};
use crate::layout::{ARCHIVE_OBJECT, WAL_FOLDER};

/// Parent directory for per-action scratch directories.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh scratch directory for `day`.
    pub fn scratch(&self, day: &ArchiveDay) -> PitrResult<StagingDir> {
        std::fs::create_dir_all(&self.root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("pitr-{day}-"))
            .tempdir_in(&self.root)?;
        debug!(day = %day, path = %dir.path().display(), "Created staging directory");
        Ok(StagingDir { dir })
    }
}

/// A scratch directory owned by one healing action.
#[derive(Debug)]
pub struct StagingDir {
    dir: TempDir,
}

impl StagingDir {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where raw segments are downloaded or extracted to.
    pub fn wal_dir(&self) -> PathBuf {
        self.dir.path().join(WAL_FOLDER)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.dir.path().join(ARCHIVE_OBJECT)
    }
}

/// Compress `wal_dir` into the gzip tarball `archive`, storing its files
/// under `WAL/`. Returns the archive size in bytes.
pub async fn compress_wal_dir(day: &ArchiveDay, wal_dir: &Path, archive: &Path) -> PitrResult<u64> {
    let wal_dir = wal_dir.to_path_buf();
    let archive = archive.to_path_buf();
    let result = tokio::task::spawn_blocking(move || -> std::io::Result<u64> {
        let file = BufWriter::new(File::create(&archive)?);
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        builder.append_dir_all(WAL_FOLDER, &wal_dir)?;
        builder.into_inner()?.finish()?.flush()?;
        Ok(std::fs::metadata(&archive)?.len())
    })
    .await;

    match result {
        Ok(Ok(size)) => {
            debug!(day = %day, size_bytes = size, "Compressed WAL folder");
            Ok(size)
        }
        Ok(Err(err)) => Err(PitrError::CompressionFailed {
            day: day.to_string(),
            reason: err.to_string(),
        }),
        Err(err) => Err(PitrError::CompressionFailed {
            day: day.to_string(),
            reason: format!("compression task failed: {err}"),
        }),
    }
}

/// Unpack the gzip tarball `archive` into `dest`. Returns the number of
/// regular files extracted.
pub async fn extract_archive(day: &ArchiveDay, archive: &Path, dest: &Path) -> PitrResult<usize> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    let result = tokio::task::spawn_blocking(move || -> std::io::Result<usize> {
        let file = BufReader::new(File::open(&archive)?);
        let mut tarball = tar::Archive::new(GzDecoder::new(file));
        tarball.set_preserve_mtime(true);
        let mut files = 0;
        for entry in tarball.entries()? {
            let mut entry = entry?;
            if entry.header().entry_type().is_file() {
                files += 1;
            }
            // `unpack_in` refuses paths escaping `dest`.
            entry.unpack_in(&dest)?;
        }
        Ok(files)
    })
    .await;

    match result {
        Ok(Ok(files)) => {
            debug!(day = %day, files, "Extracted WAL archive");
            Ok(files)
        }
        Ok(Err(err)) => Err(PitrError::CompressionFailed {
            day: day.to_string(),
            reason: format!("cannot extract archive: {err}"),
        }),
        Err(err) => Err(PitrError::CompressionFailed {
            day: day.to_string(),
            reason: format!("extraction task failed: {err}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use std::time::SystemTime;

    fn day() -> ArchiveDay {
        ArchiveDay::parse("2024-03-01").unwrap()
    }

    #[test]
    fn test_scratch_dirs_are_removed_on_drop() {
        let root = TempDir::new().unwrap();
        let area = StagingArea::new(root.path().join("staging"));
        let scratch = area.scratch(&day()).unwrap();
        let path = scratch.path().to_path_buf();
        assert!(path.exists());
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("pitr-2024-03-01-"));
        assert_eq!(scratch.wal_dir(), path.join("WAL"));

        drop(scratch);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_compress_then_extract_keeps_names_and_mtimes() {
        let root = TempDir::new().unwrap();
        let area = StagingArea::new(root.path());
        let source = area.scratch(&day()).unwrap();
        std::fs::create_dir_all(source.wal_dir()).unwrap();

        let stamp = Utc.with_ymd_and_hms(2024, 3, 1, 6, 30, 0).unwrap();
        for name in ["0000000100000000000000A1", "0000000100000000000000A2"] {
            let path = source.wal_dir().join(name);
            std::fs::write(&path, name.as_bytes()).unwrap();
            File::options()
                .write(true)
                .open(&path)
                .unwrap()
                .set_modified(SystemTime::from(stamp))
                .unwrap();
        }

        let size = compress_wal_dir(&day(), &source.wal_dir(), &source.archive_path())
            .await
            .unwrap();
        assert!(size > 0);

        let target = area.scratch(&day()).unwrap();
        let files = extract_archive(&day(), &source.archive_path(), target.path())
            .await
            .unwrap();
        assert_eq!(files, 2);

        let extracted = target.wal_dir().join("0000000100000000000000A2");
        assert_eq!(std::fs::read(&extracted).unwrap(), b"0000000100000000000000A2");
        let modified: DateTime<Utc> = std::fs::metadata(&extracted).unwrap().modified().unwrap().into();
        assert_eq!(modified, stamp);
    }

    #[tokio::test]
    async fn test_missing_wal_dir_is_compression_failure() {
        let root = TempDir::new().unwrap();
        let scratch = StagingArea::new(root.path()).scratch(&day()).unwrap();
        let err = compress_wal_dir(&day(), &scratch.wal_dir(), &scratch.archive_path())
            .await
            .unwrap_err();
        assert!(matches!(err, PitrError::CompressionFailed { .. }));
    }

    #[tokio::test]
    async fn test_corrupt_archive_is_reported() {
        let root = TempDir::new().unwrap();
        let scratch = StagingArea::new(root.path()).scratch(&day()).unwrap();
        std::fs::write(scratch.archive_path(), b"definitely not gzip").unwrap();
        let err = extract_archive(&day(), &scratch.archive_path(), scratch.path())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot extract archive"));
    }
}
