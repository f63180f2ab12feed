//! Destination directory planning.
//!
//! Turns a category's configured path plus its subfolder policy into the
//! directory a file should be moved into:
//!
//! ```text
//! <path>[/<year>][/<EXT>]
//! ```

use crate::config::{CategoryRule, resolve_against};
use crate::metadata::FileMetadata;
use std::path::{Path, PathBuf};

pub struct PathPlanner;

impl PathPlanner {
    /// Plans the destination directory for a file under its category rule.
    ///
    /// The year subfolder comes first and the type subfolder nests inside it.
    /// A relative result is resolved against `base_dir` when one is given.
    pub fn plan(rule: &CategoryRule, metadata: &FileMetadata, base_dir: Option<&Path>) -> PathBuf {
        let mut destination = rule.path.clone();

        if rule.year {
            destination.push(metadata.year.to_string());
        }

        if rule.file_type {
            destination.push(metadata.type_folder());
        }

        resolve_against(&destination, base_dir)
    }

    /// Plans a destination inside a user-chosen root, ignoring configured paths.
    ///
    /// Files land in `<root>/<category>`, with the year subfolder still applied
    /// when the category asks for it.
    pub fn plan_in_root(
        root: &Path,
        category: &str,
        rule: Option<&CategoryRule>,
        metadata: &FileMetadata,
    ) -> PathBuf {
        let mut destination = root.join(category);
        if rule.is_some_and(|rule| rule.year) {
            destination.push(metadata.year.to_string());
        }
        destination
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo() -> FileMetadata {
        FileMetadata {
            extension: ".jpg".to_string(),
            size_gb: 0.01,
            year: 2023,
        }
    }

    #[test]
    fn test_plain_path() {
        let rule = CategoryRule::new("/dest/img");
        assert_eq!(PathPlanner::plan(&rule, &photo(), None), PathBuf::from("/dest/img"));
    }

    #[test]
    fn test_year_subfolder() {
        let mut rule = CategoryRule::new("/dest/img");
        rule.year = true;
        assert_eq!(
            PathPlanner::plan(&rule, &photo(), None),
            PathBuf::from("/dest/img/2023")
        );
    }

    #[test]
    fn test_year_then_type_subfolder() {
        let mut rule = CategoryRule::new("/dest/img");
        rule.year = true;
        rule.file_type = true;
        assert_eq!(
            PathPlanner::plan(&rule, &photo(), None),
            PathBuf::from("/dest/img/2023/JPG")
        );
    }

    #[test]
    fn test_type_subfolder_without_extension() {
        let mut rule = CategoryRule::new("/dest/misc");
        rule.file_type = true;
        let mut metadata = photo();
        metadata.extension.clear();
        assert_eq!(
            PathPlanner::plan(&rule, &metadata, None),
            PathBuf::from("/dest/misc/UNKNOWN")
        );
    }

    #[test]
    fn test_relative_path_resolved_against_base() {
        let mut rule = CategoryRule::new("Images");
        rule.year = true;
        assert_eq!(
            PathPlanner::plan(&rule, &photo(), Some(Path::new("/downloads"))),
            PathBuf::from("/downloads/Images/2023")
        );
    }

    #[test]
    fn test_absolute_path_ignores_base() {
        let rule = CategoryRule::new("/dest/img");
        assert_eq!(
            PathPlanner::plan(&rule, &photo(), Some(Path::new("/downloads"))),
            PathBuf::from("/dest/img")
        );
    }

    #[test]
    fn test_plan_in_root() {
        let mut rule = CategoryRule::new("/ignored");
        rule.year = true;
        rule.file_type = true;
        assert_eq!(
            PathPlanner::plan_in_root(Path::new("/custom"), "Images", Some(&rule), &photo()),
            PathBuf::from("/custom/Images/2023")
        );
        assert_eq!(
            PathPlanner::plan_in_root(Path::new("/custom"), "Others", None, &photo()),
            PathBuf::from("/custom/Others")
        );
    }
}
