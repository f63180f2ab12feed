//! Routing configuration.
//!
//! The configuration names the directories the watcher monitors and an
//! ordered set of categories, each with a destination path and optional
//! matching rules. Category order matters: classification picks the first
//! category whose rules hold, in the order they appear in the file.
//!
//! # Configuration File Format
//!
//! JSON is the canonical format:
//!
//! ```json
//! {
//!   "monitored_sources": ["/home/me/Downloads"],
//!   "routing": {
//!     "Videos":  { "path": "/media/videos", "extensions": [".mp4", ".mkv"], "min_gb": 1.0 },
//!     "Images":  { "path": "/media/img", "extensions": [".jpg", ".png"], "year": true },
//!     "Folders": { "path": "/media/folders" },
//!     "Others":  { "path": "/media/misc" }
//!   }
//! }
//! ```
//!
//! A file with a `.toml` extension is read with the same schema.

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fallback category for files no rule matches.
pub const OTHERS: &str = "Others";

/// Category used for directories moved intact.
pub const FOLDERS: &str = "Folders";

/// Errors that can occur while loading the routing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but could not be read.
    #[error("IO error reading configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Malformed JSON/TOML, missing required keys, or rules that fail validation.
    #[error("Invalid configuration {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}

/// Rules and destination for a single category.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategoryRule {
    /// Destination directory. Relative paths are resolved by the caller.
    pub path: PathBuf,

    /// Accepted extensions, lower-case with a leading dot. Empty accepts any.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Inclusive lower size bound in gigabytes.
    #[serde(default)]
    pub min_gb: Option<f64>,

    /// Inclusive upper size bound in gigabytes.
    #[serde(default)]
    pub max_gb: Option<f64>,

    /// Group output into a subfolder per creation year.
    #[serde(default)]
    pub year: bool,

    /// Group output into a subfolder per upper-case extension.
    #[serde(default)]
    pub file_type: bool,
}

impl CategoryRule {
    /// A rule with only a destination path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            extensions: Vec::new(),
            min_gb: None,
            max_gb: None,
            year: false,
            file_type: false,
        }
    }

    fn normalize(&mut self, category: &str) -> Result<(), String> {
        for (name, bound) in [("min_gb", self.min_gb), ("max_gb", self.max_gb)] {
            if let Some(value) = bound
                && (value.is_nan() || value < 0.0)
            {
                return Err(format!(
                    "category '{}': {} must be a non-negative number",
                    category, name
                ));
            }
        }
        if let (Some(min), Some(max)) = (self.min_gb, self.max_gb)
            && min > max
        {
            return Err(format!(
                "category '{}': min_gb ({}) is greater than max_gb ({})",
                category, min, max
            ));
        }

        self.extensions = self
            .extensions
            .iter()
            .map(|ext| {
                let ext = ext.trim().to_lowercase();
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{}", ext)
                }
            })
            .collect();
        Ok(())
    }
}

/// Categories in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Routing {
    categories: Vec<(String, CategoryRule)>,
}

impl Routing {
    /// Looks up the rule for a category by name.
    pub fn get(&self, category: &str) -> Option<&CategoryRule> {
        self.categories
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, rule)| rule)
    }

    /// Iterates categories in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CategoryRule)> {
        self.categories
            .iter()
            .map(|(name, rule)| (name.as_str(), rule))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Appends a category. Returns false if the name is already taken.
    pub fn push(&mut self, name: impl Into<String>, rule: CategoryRule) -> bool {
        let name = name.into();
        if self.get(&name).is_some() {
            return false;
        }
        self.categories.push((name, rule));
        true
    }
}

impl FromIterator<(String, CategoryRule)> for Routing {
    fn from_iter<I: IntoIterator<Item = (String, CategoryRule)>>(iter: I) -> Self {
        let mut routing = Routing::default();
        for (name, rule) in iter {
            routing.push(name, rule);
        }
        routing
    }
}

// Deserialized by hand so the document order survives: a plain map type
// would re-sort or hash the keys.
impl<'de> Deserialize<'de> for Routing {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RoutingVisitor;

        impl<'de> Visitor<'de> for RoutingVisitor {
            type Value = Routing;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of category names to routing rules")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Routing, A::Error> {
                let mut routing = Routing::default();
                while let Some((name, rule)) = map.next_entry::<String, CategoryRule>()? {
                    if !routing.push(name.clone(), rule) {
                        return Err(de::Error::custom(format!(
                            "duplicate category '{}'",
                            name
                        )));
                    }
                }
                Ok(routing)
            }
        }

        deserializer.deserialize_map(RoutingVisitor)
    }
}

/// The full routing configuration. Loaded once per run, read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RoutingConfig {
    /// Directories the watcher monitors (non-recursively).
    #[serde(default)]
    pub monitored_sources: Vec<PathBuf>,

    /// Categories in evaluation order.
    pub routing: Routing,
}

impl RoutingConfig {
    /// Load configuration from a file, with fallback discovery.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `sortify.json` in the current directory
    /// 3. Look for `~/.config/sortify/config.json` in home directory
    ///
    /// Routing has no built-in default, so finding no file at all is an error.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from("sortify.json");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("sortify")
                .join("config.json");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Err(ConfigError::NotFound(local_config))
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file does not exist,
    /// `ConfigError::Io` if it cannot be read and `ConfigError::Invalid`
    /// if parsing or validation fails.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let parsed = if is_toml {
            toml::from_str::<Self>(&content).map_err(|e| e.to_string())
        } else {
            serde_json::from_str::<Self>(&content).map_err(|e| e.to_string())
        };

        parsed.and_then(Self::validated).map_err(|reason| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parses and validates a JSON document.
    pub fn from_json(content: &str) -> Result<Self, String> {
        let config: Self = serde_json::from_str(content).map_err(|e| e.to_string())?;
        config.validated()
    }

    fn validated(mut self) -> Result<Self, String> {
        for (name, rule) in self.routing.categories.iter_mut() {
            rule.normalize(name)?;
        }
        Ok(self)
    }

    /// The rule for a category, or `None` if the category is not configured.
    pub fn rule(&self, category: &str) -> Option<&CategoryRule> {
        self.routing.get(category)
    }
}

/// Joins a relative path onto `base`; absolute paths are returned unchanged.
pub fn resolve_against(path: &Path, base: Option<&Path>) -> PathBuf {
    match base {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const SCENARIO: &str = r#"{
        "routing": {
            "Images": {"path": "/dest/img", "extensions": [".jpg", ".png"]},
            "Others": {"path": "/dest/misc"}
        }
    }"#;

    #[test]
    fn test_parse_minimal_config() {
        let config = RoutingConfig::from_json(SCENARIO).unwrap();
        assert!(config.monitored_sources.is_empty());
        assert_eq!(config.routing.len(), 2);

        let images = config.rule("Images").unwrap();
        assert_eq!(images.path, PathBuf::from("/dest/img"));
        assert_eq!(images.extensions, vec![".jpg", ".png"]);
        assert!(!images.year);
        assert!(!images.file_type);
        assert_eq!(images.min_gb, None);
    }

    #[test]
    fn test_category_order_is_preserved() {
        let config = RoutingConfig::from_json(
            r#"{"routing": {
                "Zeta": {"path": "z"},
                "Alpha": {"path": "a"},
                "Mid": {"path": "m"}
            }}"#,
        )
        .unwrap();

        let names: Vec<_> = config.routing.names().collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_missing_routing_is_invalid() {
        let result = RoutingConfig::from_json(r#"{"monitored_sources": ["/tmp"]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_category_without_path_is_invalid() {
        let result = RoutingConfig::from_json(r#"{"routing": {"Images": {"extensions": [".jpg"]}}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_category_is_invalid() {
        let result =
            RoutingConfig::from_json(r#"{"routing": {"A": {"path": "a"}, "A": {"path": "b"}}}"#);
        let err = result.unwrap_err();
        assert!(err.contains("duplicate category"), "{}", err);
    }

    #[test]
    fn test_inverted_size_bounds_are_invalid() {
        let result = RoutingConfig::from_json(
            r#"{"routing": {"Big": {"path": "b", "min_gb": 2.0, "max_gb": 1.0}}}"#,
        );
        assert!(result.is_err());

        let result =
            RoutingConfig::from_json(r#"{"routing": {"Big": {"path": "b", "min_gb": -1}}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_extensions_are_normalized() {
        let config = RoutingConfig::from_json(
            r#"{"routing": {"Images": {"path": "i", "extensions": ["JPG", ".Png", " gif "]}}}"#,
        )
        .unwrap();
        assert_eq!(
            config.rule("Images").unwrap().extensions,
            vec![".jpg", ".png", ".gif"]
        );
    }

    #[test]
    fn test_empty_routing_is_allowed() {
        let config = RoutingConfig::from_json(r#"{"routing": {}}"#).unwrap();
        assert!(config.routing.is_empty());
        assert!(config.rule(OTHERS).is_none());
    }

    #[test]
    fn test_load_from_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(SCENARIO.as_bytes()).unwrap();

        let config = RoutingConfig::load(Some(&path)).unwrap();
        assert_eq!(config.routing.len(), 2);
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
monitored_sources = ["/tmp/in"]

[routing.Videos]
path = "/dest/video"
extensions = [".mp4"]
min_gb = 1.5

[routing.Images]
path = "/dest/img"
year = true
"#,
        )
        .unwrap();

        let config = RoutingConfig::load(Some(&path)).unwrap();
        assert_eq!(config.monitored_sources, vec![PathBuf::from("/tmp/in")]);
        let names: Vec<_> = config.routing.names().collect();
        assert_eq!(names, vec!["Videos", "Images"]);
        assert_eq!(config.rule("Videos").unwrap().min_gb, Some(1.5));
        assert!(config.rule("Images").unwrap().year);
    }

    #[test]
    fn test_load_missing_file() {
        let result = RoutingConfig::load(Some(Path::new("/non/existent/config.json")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let result = RoutingConfig::load(Some(&path));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_resolve_against() {
        let base = Path::new("/base");
        assert_eq!(
            resolve_against(Path::new("Images"), Some(base)),
            PathBuf::from("/base/Images")
        );
        assert_eq!(
            resolve_against(Path::new("/abs/Images"), Some(base)),
            PathBuf::from("/abs/Images")
        );
        assert_eq!(
            resolve_against(Path::new("Images"), None),
            PathBuf::from("Images")
        );
    }
}
