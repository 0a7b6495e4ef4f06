//! Project-level configuration support
//!
//! Loads per-project configuration from `commitgate.toml` in the repository
//! root and overlays it onto the built-in defaults. Keys missing from the file
//! keep their defaults; keys the defaults do not know about are ignored.
//!
//! # Configuration Format
//!
//! ```toml
//! # commitgate.toml
//! parallelism = 4
//! timeout_secs = 30
//!
//! [cache]
//! enabled = true
//! directory = ".commitgate-cache"
//! ttl_days = 30
//!
//! [rules]
//! stylesheet = ["brace-balance", "selector-count"]
//!
//! [thresholds]
//! max_selectors = 50
//! max_complexity = 10
//! min_score = 70
//! ```

use crate::models::FileCategory;
use crate::rules;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Name of the project config file looked up in the repository root
pub const CONFIG_FILE_NAME: &str = "commitgate.toml";

/// Errors raised while reading a config file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Immutable run configuration, passed explicitly into every component
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker pool size (0 in the file means auto-detect)
    pub parallelism: usize,

    /// Deadline for the whole dispatched batch, in seconds
    pub timeout_secs: u64,

    /// Result cache settings
    pub cache: CacheConfig,

    /// Enabled rule ids per file category
    pub rules: RulesConfig,

    /// Rule and score thresholds
    pub thresholds: Thresholds,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            timeout_secs: 30,
            cache: CacheConfig::default(),
            rules: RulesConfig::default(),
            thresholds: Thresholds::default(),
        }
    }
}

/// Worker count when none is configured: available cores, capped at 8
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
        .min(8)
}

/// Result cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether cached results are read and written at all
    pub enabled: bool,

    /// Cache directory (default: per-repo directory under the user cache dir)
    pub directory: Option<PathBuf>,

    /// Entries older than this many days are pruned after a batch (None = never)
    pub ttl_days: Option<u64>,

    /// Include a content hash in the fingerprint, not just name/mtime/size
    pub verify_content: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
            ttl_days: Some(30),
            verify_content: false,
        }
    }
}

/// Enabled rules per category
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub markup: Vec<String>,
    pub stylesheet: Vec<String>,
    pub script: Vec<String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            markup: rules::default_rule_ids(FileCategory::Markup),
            stylesheet: rules::default_rule_ids(FileCategory::Stylesheet),
            script: rules::default_rule_ids(FileCategory::Script),
        }
    }
}

impl RulesConfig {
    /// Rule ids enabled for a category
    pub fn enabled(&self, category: FileCategory) -> &[String] {
        match category {
            FileCategory::Markup => &self.markup,
            FileCategory::Stylesheet => &self.stylesheet,
            FileCategory::Script => &self.script,
            FileCategory::Unsupported => &[],
        }
    }

    /// Check whether a rule is enabled (ids compare in normalized kebab-case)
    pub fn is_enabled(&self, category: FileCategory, rule_id: &str) -> bool {
        let wanted = normalize_rule_id(rule_id);
        self.enabled(category)
            .iter()
            .any(|id| normalize_rule_id(id) == wanted)
    }
}

/// Thresholds used by individual rules and by the scorer
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Maximum distinct class/id selectors in one stylesheet
    pub max_selectors: usize,

    /// Maximum estimated cyclomatic complexity of one script
    pub max_complexity: usize,

    /// Minimum score for a file to pass (and for a batch to be production ready)
    pub min_score: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_selectors: 50,
            max_complexity: 10,
            min_score: 70,
        }
    }
}

impl Config {
    /// Parse a config file, overlaying its keys onto the defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: Config = toml::from_str(content)?;
        if config.parallelism == 0 {
            config.parallelism = default_parallelism();
        }
        Ok(config)
    }

    /// Batch deadline as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Effective cache directory for a repository
    pub fn cache_dir(&self, repo_path: &Path) -> PathBuf {
        match &self.cache.directory {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => repo_path.join(dir),
            None => crate::cache::get_cache_dir(repo_path),
        }
    }

    /// Override the worker count (values below 1 are raised to 1)
    pub fn with_parallelism(mut self, workers: usize) -> Self {
        self.parallelism = workers.max(1);
        self
    }

    /// Override the batch deadline
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Enable or disable the result cache
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache.enabled = enabled;
        self
    }

    /// Use an explicit cache directory
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache.directory = Some(dir.into());
        self
    }
}

/// Load configuration from the repository root.
///
/// Returns default configuration when no config file exists, and falls back
/// to defaults (with a warning) when the file cannot be read or parsed.
pub fn load_config(repo_path: &Path) -> Config {
    let path = repo_path.join(CONFIG_FILE_NAME);
    if !path.exists() {
        debug!("No project config found, using defaults");
        return Config::default();
    }

    match Config::from_file(&path) {
        Ok(config) => {
            debug!("Loaded project config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{}; using default configuration", e);
            Config::default()
        }
    }
}

/// Normalize a rule id for config lookup
///
/// `Unclosed_Tags`, `unclosed_tags` and `unclosed-tags` all map to `unclosed-tags`.
pub fn normalize_rule_id(id: &str) -> String {
    id.trim().to_ascii_lowercase().replace('_', "-")
}
