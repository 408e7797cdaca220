//! Project-level configuration support
//!
//! Loads per-project configuration from `modscope.toml` or `.modscoperc.json`
//! in the project root.
//!
//! # Configuration Format
//!
//! ```toml
//! # modscope.toml
//! plugins = ["modscope-rules.toml"]
//!
//! [rules."architecture/max-providers-per-module"]
//! enabled = true
//! thresholds = { max = 12 }
//!
//! [categories]
//! performance = false
//!
//! [exclude]
//! paths = ["**/generated/**", "scripts/"]
//!
//! [[projects]]
//! name = "api"
//! root = "apps/api"
//! ```

use crate::models::Category;
use crate::error::ScanError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const TOML_CONFIG: &str = "modscope.toml";
pub const JSON_CONFIG: &str = ".modscoperc.json";

/// Project-level configuration loaded from modscope.toml or similar
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ModscopeConfig {
    /// Per-rule overrides keyed by rule id (`category/name`)
    #[serde(default)]
    pub rules: HashMap<String, RuleOverride>,

    /// Category switches (`security = false` disables every security rule)
    #[serde(default)]
    pub categories: HashMap<String, bool>,

    /// Path exclusion patterns
    #[serde(default)]
    pub exclude: ExcludeConfig,

    /// Declarative rule plugins, relative to the project root
    #[serde(default)]
    pub plugins: Vec<PathBuf>,

    /// Explicit sub-projects for multi-project workspaces
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
}

/// Configuration override for a specific rule
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RuleOverride {
    /// Whether the rule is enabled (default: true)
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Rule-specific thresholds (e.g. `max`, `max_public_methods`)
    #[serde(default)]
    pub thresholds: HashMap<String, ThresholdValue>,
}

/// A threshold value can be an integer, float, boolean or string
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ThresholdValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
}

impl ThresholdValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ThresholdValue::Integer(v) => Some(*v),
            ThresholdValue::Float(v) => Some(*v as i64),
            _ => None,
        }
    }
}

/// Path exclusion configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ExcludeConfig {
    /// Glob patterns relative to the project root. A trailing `/` excludes a directory.
    #[serde(default)]
    pub paths: Vec<String>,
}

/// One sub-project of a multi-project workspace
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ProjectEntry {
    pub name: String,
    pub root: PathBuf,
}

/// Load project configuration from the project root.
///
/// Searches `modscope.toml` then `.modscoperc.json`. Unreadable or invalid
/// files are logged and skipped; defaults are returned when nothing loads.
pub fn load_project_config(root: &Path) -> ModscopeConfig {
    for name in [TOML_CONFIG, JSON_CONFIG] {
        let path = root.join(name);
        if !path.exists() {
            continue;
        }
        match load_config_file(&path) {
            Ok(config) => {
                debug!("Loaded project config from {}", path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {:#}", path.display(), e);
            }
        }
    }

    debug!("No project config found, using defaults");
    ModscopeConfig::default()
}

/// Load a configuration file, choosing the format by extension
pub fn load_config_file(path: &Path) -> Result<ModscopeConfig, ScanError> {
    let content = std::fs::read_to_string(path).map_err(|source| ScanError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = if path.extension().and_then(|e| e.to_str()) == Some("json") {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    } else {
        toml::from_str(&content).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| ScanError::Config(format!("{}: {}", path.display(), message)))
}

impl ModscopeConfig {
    /// Rule-level `enabled` wins, then the category switch, then enabled
    pub fn is_rule_enabled(&self, id: &str, category: Category) -> bool {
        if let Some(enabled) = self.rules.get(id).and_then(|r| r.enabled) {
            return enabled;
        }
        self.categories
            .get(category.as_str())
            .copied()
            .unwrap_or(true)
    }

    pub fn threshold(&self, id: &str, key: &str) -> Option<&ThresholdValue> {
        self.rules.get(id).and_then(|r| r.thresholds.get(key))
    }

    pub fn threshold_i64(&self, id: &str, key: &str) -> Option<i64> {
        self.threshold(id, key).and_then(|v| v.as_i64())
    }

    /// Compile the exclusion globs. Invalid patterns are logged and skipped.
    pub fn exclude_set(&self) -> GlobSet {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude.paths {
            let pattern = if pattern.ends_with('/') {
                format!("{pattern}**")
            } else {
                pattern.clone()
            };
            match Glob::new(&pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => warn!("Ignoring invalid exclude pattern '{}': {}", pattern, e),
            }
        }
        builder.build().unwrap_or_else(|e| {
            warn!("Failed to build exclude patterns: {}", e);
            GlobSet::empty()
        })
    }
}
