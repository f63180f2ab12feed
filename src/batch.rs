//! One-shot batch passes over a directory.
//!
//! Every mode works from a snapshot of entries taken when it starts and
//! handles entries one at a time. A failure on one entry is recorded in the
//! [`BatchReport`] and the pass moves on to the next entry.
//!
//! Default and custom-target routing live here; revert and sync are in
//! [`crate::undo`] and [`crate::sync`].

use crate::config::{FOLDERS, OTHERS, RoutingConfig, resolve_against};
use crate::error::{SortError, SortResult};
use crate::file_category::{classify, classify_file};
use crate::file_organizer::{FileOrganizer, SortedItem};
use crate::metadata::FileMetadata;
use crate::output::OutputFormatter;
use crate::path_planner::PathPlanner;
use indicatif::ProgressBar;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Outcome of a batch pass.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Items that were moved (or would be, in a dry run).
    pub moved: Vec<SortedItem>,
    /// Files inspected by sync that were already where they belong.
    pub unchanged: Vec<PathBuf>,
    /// Items that could not be processed, with the reason.
    pub failed: Vec<(PathBuf, String)>,
    /// Directories removed because they were left empty.
    pub pruned: Vec<PathBuf>,
}

impl BatchReport {
    /// Moved items counted per category (`Reverted` for uncategorized moves).
    pub fn category_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for item in &self.moved {
            let key = item.category.as_deref().unwrap_or("Reverted");
            *counts.entry(key.to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Returns true if no item failed.
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives batch passes over a target directory.
pub struct BatchOrchestrator<'a> {
    pub(crate) config: &'a RoutingConfig,
    pub(crate) dry_run: bool,
    pub(crate) progress: ProgressBar,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(config: &'a RoutingConfig) -> Self {
        Self {
            config,
            dry_run: false,
            progress: ProgressBar::hidden(),
        }
    }

    /// Plan only: report where items would go without touching anything.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Report progress and per-item lines through `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Routes every top-level entry of `target` by the configured paths.
    ///
    /// Files are classified and moved, with relative category paths resolved
    /// against `target`. Directories are moved intact into `Folders`, or, when
    /// `flatten` is set, dissolved: each nested file is routed on its own and
    /// the emptied directory tree is removed.
    ///
    /// Entries that are a category destination, or hold one further down, are
    /// left alone so a repeated run does not swallow its own output.
    pub fn sort_default(&self, target: &Path, flatten: bool) -> SortResult<BatchReport> {
        let target = canonical_dir(target)?;
        let protected: Vec<PathBuf> = self
            .config
            .routing
            .iter()
            .map(|(_, rule)| resolve_against(&rule.path, Some(&target)))
            .collect();

        let route_file = |path: &Path| {
            let classification = classify_file(path, self.config, Some(&target))?;
            self.relocate(path, &classification.destination, Some(classification.category))
        };
        let route_dir = |dir: &Path| {
            let rule = self
                .config
                .rule(FOLDERS)
                .ok_or_else(|| SortError::MissingCategoryPath(FOLDERS.to_string()))?;
            let dest_dir = resolve_against(&rule.path, Some(&target));
            self.relocate(dir, &dest_dir, Some(FOLDERS.to_string()))
        };

        self.route_entries(&target, flatten, &protected, route_file, route_dir)
    }

    /// Routes every top-level entry of `target` into category folders under `root`.
    ///
    /// Configured paths are ignored: one subfolder per configured category
    /// (plus `Others`) is created under `root` up front, files go to
    /// `<root>/<category>[/<year>]` and directories to `<root>/Folders`.
    /// When `root` lies inside `target`, the top-level entry holding it is skipped.
    pub fn sort_custom(&self, target: &Path, root: &Path, flatten: bool) -> SortResult<BatchReport> {
        let target = canonical_dir(target)?;

        if !self.dry_run {
            let categories = self
                .config
                .routing
                .names()
                .chain(std::iter::once(OTHERS));
            for category in categories {
                let dir = root.join(category);
                fs::create_dir_all(&dir).map_err(|e| SortError::MoveFailed {
                    from: target.clone(),
                    to: dir.clone(),
                    source: e,
                })?;
            }
        }
        let root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());

        let route_file = |path: &Path| {
            let metadata = FileMetadata::extract(path)?;
            let category = classify(&metadata, &self.config.routing);
            let dest_dir =
                PathPlanner::plan_in_root(&root, category, self.config.rule(category), &metadata);
            self.relocate(path, &dest_dir, Some(category.to_string()))
        };
        let route_dir = |dir: &Path| self.relocate(dir, &root.join(FOLDERS), Some(FOLDERS.to_string()));

        self.route_entries(&target, flatten, std::slice::from_ref(&root), route_file, route_dir)
    }

    fn route_entries(
        &self,
        target: &Path,
        flatten: bool,
        protected: &[PathBuf],
        route_file: impl Fn(&Path) -> SortResult<SortedItem>,
        route_dir: impl Fn(&Path) -> SortResult<SortedItem>,
    ) -> SortResult<BatchReport> {
        let entries = snapshot_entries(target)?;
        let mut report = BatchReport::default();
        self.progress.set_length(entries.len() as u64);

        for entry in entries {
            if is_protected(&entry, protected) {
                tracing::debug!(path = %entry.display(), "skipping destination directory");
                self.progress.inc(1);
                continue;
            }

            if entry.is_file() {
                self.record(&mut report, &entry, route_file(&entry));
            } else if entry.is_dir() {
                if flatten {
                    for file in collect_files(&entry) {
                        self.record(&mut report, &file, route_file(&file));
                    }
                    if !self.dry_run {
                        self.prune(&mut report, &entry, true, &[]);
                    }
                } else {
                    self.record(&mut report, &entry, route_dir(&entry));
                }
            }
            self.progress.inc(1);
        }

        Ok(report)
    }

    /// Moves `source` into `dest_dir`, or only plans the move in a dry run.
    pub(crate) fn relocate(
        &self,
        source: &Path,
        dest_dir: &Path,
        category: Option<String>,
    ) -> SortResult<SortedItem> {
        let destination = if self.dry_run {
            FileOrganizer::unique_destination(source, dest_dir)
        } else {
            FileOrganizer::safe_move(source, dest_dir)?
        };

        Ok(SortedItem {
            source: source.to_path_buf(),
            category,
            destination,
        })
    }

    /// Files a per-item result into the report and prints its line.
    pub(crate) fn record(
        &self,
        report: &mut BatchReport,
        path: &Path,
        result: SortResult<SortedItem>,
    ) {
        match result {
            Ok(item) => {
                tracing::info!(
                    source = %item.source.display(),
                    destination = %item.destination.display(),
                    dry_run = self.dry_run,
                    "item routed"
                );
                let line = OutputFormatter::format_moved(&item, self.dry_run);
                self.progress.suspend(|| println!("{}", line));
                report.moved.push(item);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "item failed");
                let line = OutputFormatter::format_failure(path, &e.to_string());
                self.progress.suspend(|| eprintln!("{}", line));
                report.failed.push((path.to_path_buf(), e.to_string()));
            }
        }
    }

    /// Removes empty directories below `dir` bottom-up, and `dir` itself when
    /// `include_root` is set. Nothing inside `keep` is removed.
    pub(crate) fn prune(
        &self,
        report: &mut BatchReport,
        dir: &Path,
        include_root: bool,
        keep: &[PathBuf],
    ) {
        for removed in remove_empty_dirs(dir, include_root, keep) {
            tracing::info!(path = %removed.display(), "removed empty folder");
            let line = OutputFormatter::format_pruned(&removed);
            self.progress.suspend(|| println!("{}", line));
            report.pruned.push(removed);
        }
    }
}

/// Canonical form of a directory that must exist.
pub(crate) fn canonical_dir(dir: &Path) -> SortResult<PathBuf> {
    let canonical = fs::canonicalize(dir).map_err(|source| SortError::Unreadable {
        path: dir.to_path_buf(),
        source,
    })?;
    if !canonical.is_dir() {
        return Err(SortError::NotADirectory(dir.to_path_buf()));
    }
    Ok(canonical)
}

/// Top-level entries of `dir`, sorted by path.
pub(crate) fn snapshot_entries(dir: &Path) -> SortResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| SortError::Unreadable {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut paths: Vec<PathBuf> = entries.flatten().map(|entry| entry.path()).collect();
    paths.sort();
    Ok(paths)
}

/// Every regular file below `dir`, in a stable order. Symlinks are not followed.
pub fn collect_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

/// Removes empty directories under `dir`, deepest first, returning what was removed.
pub fn remove_empty_dirs(dir: &Path, include_root: bool, keep: &[PathBuf]) -> Vec<PathBuf> {
    let min_depth = if include_root { 0 } else { 1 };
    let candidates: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(min_depth)
        .contents_first(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| !keep.iter().any(|keep| entry.path().starts_with(keep)))
        .map(|entry| entry.into_path())
        .collect();

    candidates
        .into_iter()
        .filter(|path| {
            let empty = fs::read_dir(path).is_ok_and(|mut entries| entries.next().is_none());
            empty && fs::remove_dir(path).is_ok()
        })
        .collect()
}

/// True when `entry` is a destination directory or contains one.
fn is_protected(entry: &Path, protected: &[PathBuf]) -> bool {
    protected.iter().any(|dir| {
        dir.starts_with(entry)
            || fs::canonicalize(dir).is_ok_and(|canonical| canonical.starts_with(entry))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_remove_empty_dirs_bottom_up() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("tree");
        fs::create_dir_all(root.join("a").join("b").join("c")).unwrap();
        fs::create_dir_all(root.join("keep")).unwrap();
        fs::write(root.join("keep").join("file.txt"), "x").unwrap();

        let removed = remove_empty_dirs(&root, false, &[]);

        assert_eq!(removed.len(), 3);
        assert!(!root.join("a").exists());
        assert!(root.join("keep").join("file.txt").exists());
        assert!(root.exists());
    }

    #[test]
    fn test_remove_empty_dirs_including_root() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("tree");
        fs::create_dir_all(root.join("empty")).unwrap();

        remove_empty_dirs(&root, true, &[]);
        assert!(!root.exists());
    }

    #[test]
    fn test_remove_empty_dirs_respects_keep() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("tree");
        let keep = root.join("dest");
        fs::create_dir_all(&keep).unwrap();
        fs::create_dir_all(root.join("gone")).unwrap();

        remove_empty_dirs(&root, false, &[keep.clone()]);
        assert!(keep.exists());
        assert!(!root.join("gone").exists());
    }

    #[test]
    fn test_ancestor_of_destination_is_protected() {
        let protected = [PathBuf::from("/t/sorted/img")];
        assert!(is_protected(Path::new("/t/sorted"), &protected));
        assert!(is_protected(Path::new("/t/sorted/img"), &protected));
        assert!(!is_protected(Path::new("/t/sort"), &protected));
        assert!(!is_protected(Path::new("/t/other"), &protected));
    }

    #[test]
    fn test_collect_files_is_recursive() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir_all(root.join("x").join("y")).unwrap();
        fs::write(root.join("top.txt"), "1").unwrap();
        fs::write(root.join("x").join("y").join("deep.txt"), "2").unwrap();

        let files = collect_files(root);
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.is_file()));
    }

    #[test]
    fn test_report_category_counts() {
        let mut report = BatchReport::default();
        for category in [Some("Images"), Some("Images"), None] {
            report.moved.push(SortedItem {
                source: PathBuf::from("a"),
                category: category.map(str::to_string),
                destination: PathBuf::from("b"),
            });
        }
        let counts = report.category_counts();
        assert_eq!(counts["Images"], 2);
        assert_eq!(counts["Reverted"], 1);
        assert!(report.is_complete_success());
    }
}
