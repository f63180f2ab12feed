//! sortify - rule-based file routing
//!
//! This library classifies files by extension, size and creation year,
//! moves them into configured destinations without ever overwriting, and
//! drives that pipeline either once over a directory (sort, flatten, revert,
//! re-sync) or continuously from filesystem events.

pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod file_category;
pub mod file_organizer;
pub mod metadata;
pub mod notification;
pub mod output;
pub mod path_planner;
pub mod sync;
pub mod undo;
pub mod watcher;

pub use batch::{BatchOrchestrator, BatchReport};
pub use config::{CategoryRule, ConfigError, FOLDERS, OTHERS, Routing, RoutingConfig};
pub use error::{SortError, SortResult};
pub use file_category::{ClassificationResult, classify, classify_file};
pub use file_organizer::{FileOrganizer, SortedItem};
pub use metadata::FileMetadata;
pub use path_planner::PathPlanner;
pub use watcher::{
    EventSource, NotifySource, WatchError, WatchEvent, WatchEventKind, WatchLoop, WatchReport,
};
