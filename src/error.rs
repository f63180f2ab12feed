//! Per-item errors raised while classifying or moving a single entry.
//!
//! None of these are fatal to a batch pass or to the watcher: callers catch
//! them at the item boundary, report them, and carry on with the next entry.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while routing one file or directory.
#[derive(Debug, Error)]
pub enum SortError {
    /// The path does not resolve to a regular file.
    #[error("Not a file: {}", .0.display())]
    NotAFile(PathBuf),

    /// The path does not resolve to a directory.
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Metadata for the path could not be read (permissions, vanished file).
    #[error("Cannot read metadata for {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The entry was classified into a category that has no destination configured.
    #[error("No path configured for category '{0}'")]
    MissingCategoryPath(String),

    /// The underlying move (or directory creation) failed.
    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for routing operations.
pub type SortResult<T> = Result<T, SortError>;
