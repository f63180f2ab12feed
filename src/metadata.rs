//! Classification-relevant facts about a file: extension, size and creation year.
//!
//! Metadata is read fresh on every call; nothing is cached, so a sync pass
//! always sees the current state of the filesystem.

use crate::error::{SortError, SortResult};
use chrono::{DateTime, Datelike, Local};
use std::fs::{self, Metadata};
use std::path::Path;
use std::time::SystemTime;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Facts about a file used to pick its category and subfolder.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    /// Lower-case extension including the leading dot, or empty.
    pub extension: String,
    /// Size in gigabytes (1024^3 bytes).
    pub size_gb: f64,
    /// Creation year in local time.
    pub year: i32,
}

impl FileMetadata {
    /// Extracts metadata for the regular file at `path`.
    ///
    /// Symlinks are followed, so a link to a regular file is accepted.
    ///
    /// # Errors
    ///
    /// * `SortError::NotAFile` if the path is a directory or special file
    /// * `SortError::Unreadable` if the file cannot be stat'ed
    pub fn extract(path: &Path) -> SortResult<Self> {
        let metadata = fs::metadata(path).map_err(|source| SortError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        if !metadata.is_file() {
            return Err(SortError::NotAFile(path.to_path_buf()));
        }

        let created = creation_time(&metadata).map_err(|source| SortError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            extension: extension_of(path),
            size_gb: metadata.len() as f64 / BYTES_PER_GB,
            year: DateTime::<Local>::from(created).year(),
        })
    }

    /// Extension without the dot, upper-cased, for type subfolders.
    pub fn type_folder(&self) -> String {
        let ext = self.extension.trim_start_matches('.');
        if ext.is_empty() {
            "UNKNOWN".to_string()
        } else {
            ext.to_uppercase()
        }
    }
}

/// Lower-case extension of `path` with a leading dot, or an empty string.
///
/// Only the last component counts (`archive.tar.gz` gives `.gz`), and a
/// leading-dot name such as `.bashrc` has no extension.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

/// Birth time when the platform records it, status-change time otherwise.
fn creation_time(metadata: &Metadata) -> std::io::Result<SystemTime> {
    match metadata.created() {
        Ok(created) => Ok(created),
        Err(_) => status_change_time(metadata),
    }
}

#[cfg(unix)]
fn status_change_time(metadata: &Metadata) -> std::io::Result<SystemTime> {
    use std::os::unix::fs::MetadataExt;
    use std::time::{Duration, UNIX_EPOCH};

    let secs = metadata.ctime();
    let nanos = metadata.ctime_nsec().clamp(0, 999_999_999) as u32;
    let time = if secs >= 0 {
        UNIX_EPOCH.checked_add(Duration::new(secs as u64, nanos))
    } else {
        UNIX_EPOCH.checked_sub(Duration::new(secs.unsigned_abs(), 0))
    };
    time.ok_or_else(|| std::io::Error::other("status-change time out of range"))
}

#[cfg(not(unix))]
fn status_change_time(metadata: &Metadata) -> std::io::Result<SystemTime> {
    metadata.modified()
}
