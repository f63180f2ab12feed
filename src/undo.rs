/// Revert: collect everything under a sorted directory back into one place.
///
/// There is no history file; revert works from what is on disk. Directories
/// that were moved intact into the `Folders` category go back unchanged,
/// every other file found anywhere under the target is pulled out on its
/// own, and the emptied directory tree is removed afterwards.
use crate::batch::{BatchOrchestrator, BatchReport, canonical_dir, snapshot_entries};
use crate::config::{FOLDERS, resolve_against};
use crate::error::{SortError, SortResult};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

impl BatchOrchestrator<'_> {
    /// Moves every item under `target` into `destination`.
    ///
    /// 1. Items inside the intact-folder category directory are moved as-is.
    /// 2. Every other file below `target` is moved individually.
    /// 3. Directories left empty under `target` are removed.
    ///
    /// Both listings are taken before anything moves. `destination` may live
    /// inside `target`; it is never descended into, and neither is the folder
    /// category once its items have been handled.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sortify::batch::BatchOrchestrator;
    /// use sortify::config::RoutingConfig;
    /// use std::path::Path;
    ///
    /// let config = RoutingConfig::load(None).unwrap();
    /// let report = BatchOrchestrator::new(&config)
    ///     .revert(Path::new("/home/me/Sorted"), Path::new("/home/me/Unsorted"))
    ///     .unwrap();
    /// println!("Reverted {} items", report.moved.len());
    /// ```
    pub fn revert(&self, target: &Path, destination: &Path) -> SortResult<BatchReport> {
        let target = canonical_dir(target)?;

        if !self.dry_run {
            fs::create_dir_all(destination).map_err(|e| SortError::MoveFailed {
                from: target.clone(),
                to: destination.to_path_buf(),
                source: e,
            })?;
        }
        let destination = fs::canonicalize(destination)
            .or_else(|_| std::path::absolute(destination))
            .unwrap_or_else(|_| destination.to_path_buf());
        let folders_dir = self.folders_dir(&target);

        let intact: Vec<PathBuf> = if folders_dir.is_dir() && folders_dir != destination {
            snapshot_entries(&folders_dir)?
                .into_iter()
                .filter(|item| !destination.starts_with(item))
                .collect()
        } else {
            Vec::new()
        };
        let loose = self.loose_files(&target, &destination, &folders_dir);

        let mut report = BatchReport::default();
        self.progress.set_length((intact.len() + loose.len()) as u64);

        let mut keep = Vec::new();
        if destination != target {
            keep.push(destination.clone());
        }

        for item in intact {
            let result = self.relocate(&item, &destination, None);
            if let Ok(moved) = &result {
                keep.push(moved.destination.clone());
            }
            self.record(&mut report, &item, result);
            self.progress.inc(1);
        }

        for file in loose {
            let result = self.relocate(&file, &destination, None);
            self.record(&mut report, &file, result);
            self.progress.inc(1);
        }

        if !self.dry_run {
            self.prune(&mut report, &target, false, &keep);
        }

        Ok(report)
    }

    /// The configured intact-folder directory, or `<target>/Folders`.
    pub(crate) fn folders_dir(&self, target: &Path) -> PathBuf {
        let dir = match self.config.rule(FOLDERS) {
            Some(rule) => resolve_against(&rule.path, Some(target)),
            None => target.join(FOLDERS),
        };
        fs::canonicalize(&dir).unwrap_or(dir)
    }

    /// Files under `target` outside `destination` and the folder category.
    fn loose_files(&self, target: &Path, destination: &Path, folders_dir: &Path) -> Vec<PathBuf> {
        let skip_destination = destination != target;
        let skip_folders = folders_dir != target;

        WalkDir::new(target)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let path = entry.path();
                !(skip_destination && path.starts_with(destination))
                    && !(skip_folders && path.starts_with(folders_dir))
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|file| file.parent() != Some(destination))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::batch::BatchOrchestrator;
    use crate::config::RoutingConfig;
    use std::fs;
    use tempfile::TempDir;

    fn config() -> RoutingConfig {
        RoutingConfig::from_json(
            r#"{"routing":{
                "Images": {"path": "Images", "extensions": [".jpg"]},
                "Folders": {"path": "Folders"},
                "Others": {"path": "Others"}
            }}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_revert_collects_files_and_intact_folders() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let target = temp_dir.path().join("sorted");
        fs::create_dir_all(target.join("Images").join("2023")).unwrap();
        fs::create_dir_all(target.join("Others")).unwrap();
        fs::create_dir_all(target.join("Folders").join("project").join("src")).unwrap();
        fs::write(target.join("Images").join("2023").join("a.jpg"), "a").unwrap();
        fs::write(target.join("Others").join("b.txt"), "b").unwrap();
        fs::write(
            target.join("Folders").join("project").join("src").join("main.rs"),
            "fn main() {}",
        )
        .unwrap();

        let destination = temp_dir.path().join("restored");
        let config = config();
        let report = BatchOrchestrator::new(&config)
            .revert(&target, &destination)
            .expect("Revert failed");

        assert_eq!(report.moved.len(), 3);
        assert!(report.is_complete_success());
        assert!(destination.join("a.jpg").is_file());
        assert!(destination.join("b.txt").is_file());
        assert!(destination.join("project").join("src").join("main.rs").is_file());

        // Emptied category folders are gone, the target itself stays.
        assert!(target.is_dir());
        assert_eq!(fs::read_dir(&target).unwrap().count(), 0);
    }

    #[test]
    fn test_revert_into_nested_destination() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let target = temp_dir.path();
        fs::create_dir_all(target.join("Others").join("deep")).unwrap();
        fs::write(target.join("Others").join("deep").join("x.txt"), "x").unwrap();

        let destination = target.join("Others").join("restored");
        let config = config();
        let report = BatchOrchestrator::new(&config)
            .revert(target, &destination)
            .expect("Revert failed");

        assert_eq!(report.moved.len(), 1);
        assert!(destination.join("x.txt").is_file());
        assert!(!target.join("Others").join("deep").exists());
    }

    #[test]
    fn test_revert_dry_run_moves_nothing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let target = temp_dir.path().join("sorted");
        fs::create_dir_all(target.join("Others")).unwrap();
        fs::write(target.join("Others").join("b.txt"), "b").unwrap();

        let destination = temp_dir.path().join("restored");
        let config = config();
        let report = BatchOrchestrator::new(&config)
            .dry_run(true)
            .revert(&target, &destination)
            .expect("Revert failed");

        assert_eq!(report.moved.len(), 1);
        assert!(target.join("Others").join("b.txt").is_file());
        assert!(!destination.exists());
    }
}
