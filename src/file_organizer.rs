/// Collision-safe moves and the single-item routing pipeline.
///
/// `FileOrganizer` is the only part of the crate that mutates the
/// filesystem. Every move goes through [`FileOrganizer::safe_move`], which
/// never overwrites: a name already taken at the destination gets a numeric
/// suffix (`name_1.ext`, `name_2.ext`, ...).
use crate::config::RoutingConfig;
use crate::error::{SortError, SortResult};
use crate::file_category::classify_file;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file or directory that was routed, and where it ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct SortedItem {
    /// Where the item was before the move.
    pub source: PathBuf,
    /// The category it was routed to, if any.
    pub category: Option<String>,
    /// Its final path after collision resolution.
    pub destination: PathBuf,
}

/// Moves files and directories into destination directories.
pub struct FileOrganizer;

impl FileOrganizer {
    /// Moves `source` into `dest_dir` without ever overwriting.
    ///
    /// Creates `dest_dir` (and its parents) if needed. If the name is taken,
    /// the first free `<stem>_<n><suffix>` with `n` counting from 1 is used.
    /// Files and directories follow the same policy. An item that already
    /// sits directly in `dest_dir` is left alone and its path returned.
    ///
    /// # Returns
    ///
    /// The final path of the moved item.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sortify::file_organizer::FileOrganizer;
    /// use std::path::Path;
    ///
    /// let result = FileOrganizer::safe_move(
    ///     Path::new("/downloads/a.txt"),
    ///     Path::new("/sorted/docs"),
    /// );
    ///
    /// match result {
    ///     Ok(path) => println!("Moved to {}", path.display()),
    ///     Err(e) => eprintln!("Move failed: {}", e),
    /// }
    /// ```
    pub fn safe_move(source: &Path, dest_dir: &Path) -> SortResult<PathBuf> {
        fs::create_dir_all(dest_dir).map_err(|e| SortError::MoveFailed {
            from: source.to_path_buf(),
            to: dest_dir.to_path_buf(),
            source: e,
        })?;

        if Self::already_in(source, dest_dir) {
            return Ok(source.to_path_buf());
        }

        let destination = Self::claim_destination(source, dest_dir).map_err(|e| {
            SortError::MoveFailed {
                from: source.to_path_buf(),
                to: dest_dir.to_path_buf(),
                source: e,
            }
        })?;
        if let Err(e) = Self::relocate(source, &destination) {
            release(&destination);
            return Err(SortError::MoveFailed {
                from: source.to_path_buf(),
                to: destination,
                source: e,
            });
        }

        Ok(destination)
    }

    /// Computes the collision-free path `source` would get inside `dest_dir`.
    ///
    /// Does not touch the filesystem beyond existence checks.
    pub fn unique_destination(source: &Path, dest_dir: &Path) -> PathBuf {
        if Self::already_in(source, dest_dir) {
            return source.to_path_buf();
        }

        candidates(source, dest_dir)
            .find(|candidate| !exists(candidate))
            .unwrap_or_else(|| dest_dir.to_path_buf())
    }

    /// Reserves the first free candidate name by creating a placeholder there.
    ///
    /// The placeholder is an empty file for files and an empty directory for
    /// directories, created exclusively, so two movers racing for the same
    /// name never both win it. The move then renames over the placeholder.
    fn claim_destination(source: &Path, dest_dir: &Path) -> io::Result<PathBuf> {
        let is_dir = fs::symlink_metadata(source)?.is_dir();

        for candidate in candidates(source, dest_dir) {
            let claimed = if is_dir {
                fs::create_dir(&candidate)
            } else {
                OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&candidate)
                    .map(drop)
            };
            match claimed {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "no free name left in destination",
        ))
    }

    /// Classifies a regular file and moves it into its planned destination.
    ///
    /// Relative category paths resolve against `base_dir`.
    pub fn route_file(
        path: &Path,
        config: &RoutingConfig,
        base_dir: Option<&Path>,
    ) -> SortResult<SortedItem> {
        let classification = classify_file(path, config, base_dir)?;
        let destination = Self::safe_move(path, &classification.destination)?;
        tracing::info!(
            source = %path.display(),
            destination = %destination.display(),
            category = %classification.category,
            "file routed"
        );

        Ok(SortedItem {
            source: path.to_path_buf(),
            category: Some(classification.category),
            destination,
        })
    }

    fn already_in(source: &Path, dest_dir: &Path) -> bool {
        let Some(parent) = source.parent() else {
            return false;
        };
        match (fs::canonicalize(parent), fs::canonicalize(dest_dir)) {
            (Ok(parent), Ok(dest_dir)) => parent == dest_dir,
            _ => false,
        }
    }

    /// Renames, falling back to copy-and-delete across filesystems.
    fn relocate(source: &Path, destination: &Path) -> io::Result<()> {
        match fs::rename(source, destination) {
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                tracing::debug!(
                    source = %source.display(),
                    "rename crosses devices, copying instead"
                );
                if fs::symlink_metadata(source)?.is_dir() {
                    copy_tree(source, destination)?;
                    fs::remove_dir_all(source)
                } else {
                    fs::copy(source, destination)?;
                    fs::remove_file(source)
                }
            }
            other => other,
        }
    }
}

/// `<name>`, then `<stem>_1<suffix>`, `<stem>_2<suffix>`, ... inside `dest_dir`.
fn candidates(source: &Path, dest_dir: &Path) -> impl Iterator<Item = PathBuf> {
    let file_name = source
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let dest_dir = dest_dir.to_path_buf();

    std::iter::once(dest_dir.join(file_name)).chain(
        (1u64..).map(move |n| dest_dir.join(format!("{}_{}{}", stem, n, suffix))),
    )
}

/// Drops a placeholder left behind by a failed move.
fn release(placeholder: &Path) {
    let removed = match fs::symlink_metadata(placeholder) {
        Ok(meta) if meta.is_dir() => fs::remove_dir(placeholder),
        Ok(meta) if meta.len() == 0 => fs::remove_file(placeholder),
        _ => return,
    };
    if let Err(e) = removed {
        tracing::warn!(path = %placeholder.display(), error = %e, "could not remove placeholder");
    }
}

/// Existence check that also sees dangling symlinks.
fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

fn copy_tree(source: &Path, destination: &Path) -> io::Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
