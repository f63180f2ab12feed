//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output, including colored output,
//! progress tracking, and formatted tables. This module abstracts away output details,
//! making it easy to change formatting globally.

use crate::file_organizer::SortedItem;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::Path;

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - Per-item move lines for batch passes and the watcher
/// - Progress bars for operations
/// - Summary tables with statistics
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sortify::output::OutputFormatter;
    /// OutputFormatter::success("Sorting complete!");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Formats the line for a moved item.
    ///
    /// ```text
    /// photo.jpg → [Images] /sorted/img/2024/photo.jpg
    /// ```
    pub fn format_moved(item: &SortedItem, dry_run: bool) -> String {
        let name = item
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| item.source.display().to_string());
        let label = item.category.as_deref().unwrap_or("Reverted");
        let arrow = if dry_run { "would move to" } else { "→" };
        format!(
            "  {} {} {} {}",
            name,
            arrow,
            format!("[{}]", label).cyan(),
            item.destination.display()
        )
    }

    /// Formats the line for an item that failed.
    pub fn format_failure(path: &Path, reason: &str) -> String {
        format!("  {} {}: {}", "✗".red(), path.display(), reason)
    }

    /// Formats the line for a removed empty directory.
    pub fn format_pruned(path: &Path) -> String {
        format!("  {} {}", "removed empty folder".dimmed(), path.display())
    }

    /// Creates and returns a progress bar for batch passes.
    ///
    /// The length is set by the pass once it has taken its snapshot.
    pub fn create_progress_bar() -> ProgressBar {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        pb
    }

    /// Prints a summary table with moved items by category.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sortify::output::OutputFormatter;
    /// use std::collections::HashMap;
    ///
    /// let mut counts = HashMap::new();
    /// counts.insert("Documents".to_string(), 15);
    /// counts.insert("Images".to_string(), 8);
    /// OutputFormatter::summary_table(&counts, 23);
    /// ```
    pub fn summary_table(category_counts: &HashMap<String, usize>, total_items: usize) {
        Self::header("SUMMARY");

        let mut categories: Vec<_> = category_counts.iter().collect();
        categories.sort_by_key(|&(name, _)| name);

        let max_category_len = categories
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max(8); // At least "Category" width

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Items".bold(),
            width = max_category_len
        );
        println!("{}", "-".repeat(max_category_len + 10));

        for (category, count) in &categories {
            let item_word = if **count == 1 { "item" } else { "items" };
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                item_word,
                width = max_category_len
            );
        }

        println!("{}", "-".repeat(max_category_len + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_items.to_string().green().bold(),
            if total_items == 1 { "item" } else { "items" },
            width = max_category_len
        );
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_moved_mentions_category_and_destination() {
        colored::control::set_override(false);
        let item = SortedItem {
            source: PathBuf::from("/in/photo.jpg"),
            category: Some("Images".to_string()),
            destination: PathBuf::from("/out/img/photo.jpg"),
        };

        let line = OutputFormatter::format_moved(&item, false);
        assert_eq!(line, "  photo.jpg → [Images] /out/img/photo.jpg");

        let line = OutputFormatter::format_moved(&item, true);
        assert!(line.contains("would move to"));
    }
}
