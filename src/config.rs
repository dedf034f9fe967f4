//! Configuration management and validation.
//!
//! Settings are layered: built-in defaults, then an optional JSON file,
//! then `TABLOAD_*` environment variables. Command-line flags are applied
//! last by the CLI.

use crate::error::{Result, TabloadError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding [`TabloadConfig::storage_root`]
pub const ENV_STORAGE_ROOT: &str = "TABLOAD_STORAGE_ROOT";
/// Environment variable overriding [`TabloadConfig::warehouse_root`]
pub const ENV_WAREHOUSE_ROOT: &str = "TABLOAD_WAREHOUSE_ROOT";
/// Environment variable overriding [`TabloadConfig::default_project`]
pub const ENV_PROJECT: &str = "TABLOAD_PROJECT";
/// Environment variable holding the statistics API token
pub const ENV_STATS_TOKEN: &str = "TABLOAD_STATS_TOKEN";

/// How an unfiltered folder listing treats plain files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionPolicy {
    /// The first plain file's extension becomes the filter for the
    /// remaining siblings at that level (legacy behaviour)
    #[default]
    InheritFromFirstFile,
    /// No filter means every entry is listed
    Unfiltered,
}

/// Folder traversal settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalConfig {
    /// Maximum folder nesting below the listing root
    pub max_depth: usize,
    pub extension_policy: ExtensionPolicy,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_depth: 32,
            extension_policy: ExtensionPolicy::default(),
        }
    }
}

impl TraversalConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_extension_policy(mut self, policy: ExtensionPolicy) -> Self {
        self.extension_policy = policy;
        self
    }
}

/// Statistics API client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    /// Base URL; series requests go to `{base_url}/{id}/datos/{start}/{end}`
    pub base_url: String,
    /// Header carrying the API token
    pub token_header: String,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.banxico.org.mx/SieAPIRest/service/v1/series".to_string(),
            token_header: "Bmx-Token".to_string(),
            token: None,
            timeout_secs: 30,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TabloadConfig {
    /// Root directory served by the local file store
    pub storage_root: PathBuf,
    /// Root directory of the local Parquet warehouse
    pub warehouse_root: PathBuf,
    /// Project used when a load does not name one
    pub default_project: String,
    pub traversal: TraversalConfig,
    pub statistics: StatisticsConfig,
}

impl Default for TabloadConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tabload");
        Self {
            storage_root: PathBuf::from("."),
            warehouse_root: data_dir.join("warehouse"),
            default_project: "default".to_string(),
            traversal: TraversalConfig::default(),
            statistics: StatisticsConfig::default(),
        }
    }
}

impl TabloadConfig {
    /// `<config_dir>/tabload/config.json`
    pub fn default_config_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("tabload").join("config.json"))
            .ok_or_else(|| TabloadError::configuration("could not determine config directory"))
    }

    /// Read a JSON config file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            TabloadError::configuration(format!("cannot read '{}': {}", path.display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            TabloadError::configuration(format!("invalid config '{}': {}", path.display(), e))
        })
    }

    /// Defaults, then `config_file` (if any), then the environment
    pub fn load_layered(config_file: Option<&Path>) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(root) = lookup(ENV_STORAGE_ROOT) {
            self.storage_root = PathBuf::from(root);
        }
        if let Some(root) = lookup(ENV_WAREHOUSE_ROOT) {
            self.warehouse_root = PathBuf::from(root);
        }
        if let Some(project) = lookup(ENV_PROJECT) {
            self.default_project = project;
        }
        if let Some(token) = lookup(ENV_STATS_TOKEN) {
            self.statistics.token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_project.trim().is_empty() {
            return Err(TabloadError::configuration("default_project must not be empty"));
        }
        if self.traversal.max_depth == 0 {
            return Err(TabloadError::configuration("traversal.max_depth must be at least 1"));
        }
        if self.statistics.timeout_secs == 0 {
            return Err(TabloadError::configuration("statistics.timeout_secs must be at least 1"));
        }
        Ok(())
    }

    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = root.into();
        self
    }

    pub fn with_warehouse_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.warehouse_root = root.into();
        self
    }

    pub fn with_default_project(mut self, project: impl Into<String>) -> Self {
        self.default_project = project.into();
        self
    }
}
