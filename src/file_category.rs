/// Rule-based categorization of files.
///
/// Categories are evaluated in the order they are declared in the routing
/// configuration and the first one whose rules all hold wins. The reserved
/// `Others` and `Folders` categories never take part in matching: `Others`
/// is the fallback and `Folders` only ever receives directories.
///
/// # Examples
///
/// ```
/// use sortify::config::RoutingConfig;
/// use sortify::file_category::classify;
/// use sortify::metadata::FileMetadata;
///
/// let config = RoutingConfig::from_json(
///     r#"{"routing": {"Images": {"path": "/dest/img", "extensions": [".jpg", ".png"]},
///                     "Others": {"path": "/dest/misc"}}}"#,
/// )
/// .unwrap();
///
/// let photo = FileMetadata { extension: ".jpg".into(), size_gb: 0.2, year: 2024 };
/// let notes = FileMetadata { extension: ".txt".into(), size_gb: 0.0, year: 2024 };
/// assert_eq!(classify(&photo, &config.routing), "Images");
/// assert_eq!(classify(&notes, &config.routing), "Others");
/// ```
use crate::config::{CategoryRule, FOLDERS, OTHERS, Routing, RoutingConfig};
use crate::error::{SortError, SortResult};
use crate::metadata::FileMetadata;
use crate::path_planner::PathPlanner;
use std::path::{Path, PathBuf};

/// The category chosen for a file and the directory it should land in.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub category: String,
    pub destination: PathBuf,
}

/// Returns true for the category names that never match by rule.
pub fn is_reserved(category: &str) -> bool {
    category == OTHERS || category == FOLDERS
}

/// Picks the first category whose rules match, or `Others`.
///
/// The year flag does not take part in matching; it only shapes the
/// destination once a category has been chosen.
pub fn classify<'a>(metadata: &FileMetadata, routing: &'a Routing) -> &'a str {
    routing
        .iter()
        .filter(|(name, _)| !is_reserved(name))
        .find(|(_, rule)| rule_matches(metadata, rule))
        .map(|(name, _)| name)
        .unwrap_or(OTHERS)
}

/// Checks extension membership and both size bounds.
pub fn rule_matches(metadata: &FileMetadata, rule: &CategoryRule) -> bool {
    if !rule.extensions.is_empty()
        && !rule
            .extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(&metadata.extension))
    {
        return false;
    }

    if let Some(min_gb) = rule.min_gb
        && metadata.size_gb < min_gb
    {
        return false;
    }

    if let Some(max_gb) = rule.max_gb
        && metadata.size_gb > max_gb
    {
        return false;
    }

    true
}

/// Reads metadata for `path`, classifies it and plans its destination.
///
/// Relative category paths are resolved against `base_dir` when given.
///
/// # Errors
///
/// * `SortError::NotAFile` / `SortError::Unreadable` from metadata extraction
/// * `SortError::MissingCategoryPath` if the chosen category is not configured
pub fn classify_file(
    path: &Path,
    config: &RoutingConfig,
    base_dir: Option<&Path>,
) -> SortResult<ClassificationResult> {
    let metadata = FileMetadata::extract(path)?;
    let category = classify(&metadata, &config.routing);
    let rule = config
        .rule(category)
        .ok_or_else(|| SortError::MissingCategoryPath(category.to_string()))?;

    Ok(ClassificationResult {
        category: category.to_string(),
        destination: PathPlanner::plan(rule, &metadata, base_dir),
    })
}
