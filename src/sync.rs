//! Re-sync: re-apply the current rules to files already sorted.
//!
//! After the routing configuration changes, files sitting in category
//! directories may no longer be where the rules would put them. Sync walks
//! every category directory, re-classifies each file and moves the ones whose
//! planned destination differs from where they are. Directories moved intact
//! into `Folders` are left alone.

use crate::batch::{BatchOrchestrator, BatchReport, canonical_dir, collect_files};
use crate::config::{FOLDERS, resolve_against};
use crate::error::SortResult;
use crate::file_category::classify_file;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

impl BatchOrchestrator<'_> {
    /// Re-routes every file found under the configured category directories.
    ///
    /// Relative category paths resolve against `base`. Files already in their
    /// planned directory are counted as unchanged and not touched. Category
    /// directories emptied by the pass are pruned, but the category
    /// directories themselves stay.
    ///
    /// The `Folders` category is not walked: it only ever holds directories
    /// moved intact, never loose files, so there is nothing in it to
    /// re-classify. Its contents are also kept out of pruning when it sits
    /// below another category directory.
    pub fn sync(&self, base: &Path) -> SortResult<BatchReport> {
        let base = canonical_dir(base)?;
        let files = self.sorted_files(&base);

        let mut report = BatchReport::default();
        self.progress.set_length(files.len() as u64);

        for file in &files {
            match classify_file(file, self.config, Some(&base)) {
                Ok(classification) if is_in(file, &classification.destination) => {
                    tracing::debug!(path = %file.display(), "already in place");
                    report.unchanged.push(file.clone());
                }
                Ok(classification) => {
                    let result = self.relocate(
                        file,
                        &classification.destination,
                        Some(classification.category),
                    );
                    self.record(&mut report, file, result);
                }
                Err(e) => self.record(&mut report, file, Err(e)),
            }
            self.progress.inc(1);
        }

        if !self.dry_run {
            let keep = [self.folders_dir(&base)];
            for dir in self.category_dirs(&base) {
                self.prune(&mut report, &dir, false, &keep);
            }
        }

        Ok(report)
    }

    /// Existing category directories, `Folders` excluded.
    fn category_dirs(&self, base: &Path) -> Vec<PathBuf> {
        self.config
            .routing
            .iter()
            .filter(|(name, _)| *name != FOLDERS)
            .map(|(_, rule)| resolve_against(&rule.path, Some(base)))
            .filter(|dir| dir.is_dir())
            .collect()
    }

    /// Every file below the category directories, each listed once.
    fn sorted_files(&self, base: &Path) -> Vec<PathBuf> {
        let folders_dir = self
            .config
            .rule(FOLDERS)
            .map(|rule| resolve_against(&rule.path, Some(base)));

        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for dir in self.category_dirs(base) {
            for file in collect_files(&dir) {
                if folders_dir.as_ref().is_some_and(|f| file.starts_with(f)) {
                    continue;
                }
                let key = fs::canonicalize(&file).unwrap_or_else(|_| file.clone());
                if seen.insert(key) {
                    files.push(file);
                }
            }
        }
        files
    }
}

fn is_in(file: &Path, dir: &Path) -> bool {
    let Some(parent) = file.parent() else {
        return false;
    };
    parent == dir
        || matches!(
            (fs::canonicalize(parent), fs::canonicalize(dir)),
            (Ok(a), Ok(b)) if a == b
        )
}
