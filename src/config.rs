//! Layered configuration: built-in defaults, then the user file
//! (`<config_dir>/weft/config.toml`), then the workspace's `weft.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::fs::FeatureLayout;
use crate::plan::SchedulePolicy;
use crate::worktree::WorktreeOptions;

/// Name of the per-workspace configuration file
pub const WORKSPACE_CONFIG_FILE: &str = "weft.toml";

/// Effective configuration after all layers are applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeftConfig {
    /// Glob patterns, relative to the workspace root, naming candidate repositories
    pub search_paths: Vec<String>,
    /// Directory names never treated as repositories
    pub exclude: Vec<String>,
    pub branch_prefix: String,
    /// Workspace-relative directory holding feature worktrees
    pub features_dir: String,
    pub schedule_policy: SchedulePolicy,
    /// Remove worktrees even when they hold uncommitted changes
    pub force_remove: bool,
}

impl Default for WeftConfig {
    fn default() -> Self {
        Self {
            search_paths: ["FE/*", "BE/*", "services/*", "packages/*", "apps/*"]
                .map(String::from)
                .to_vec(),
            exclude: ["node_modules", "dist", "build", ".git"]
                .map(String::from)
                .to_vec(),
            branch_prefix: "feature".to_string(),
            features_dir: "features".to_string(),
            schedule_policy: SchedulePolicy::default(),
            force_remove: false,
        }
    }
}

/// One configuration file; absent keys leave the lower layer alone
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigLayer {
    search_paths: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    branch_prefix: Option<String>,
    features_dir: Option<String>,
    schedule_policy: Option<SchedulePolicy>,
    force_remove: Option<bool>,
}

impl WeftConfig {
    /// Load the effective configuration for a workspace
    pub fn load(workspace_root: &Path) -> Result<Self> {
        let mut config = Self::default();
        if let Some(user_file) = Self::user_config_path() {
            config.apply_file(&user_file)?;
        }
        config.apply_file(&workspace_root.join(WORKSPACE_CONFIG_FILE))?;
        Ok(config)
    }

    /// Location of the per-user configuration file, if the platform has one
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("weft").join("config.toml"))
    }

    /// Parse a configuration document on top of the defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config = Self::default();
        config.apply(toml::from_str(content).context("Failed to parse configuration")?);
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<()> {
        if !path.is_file() {
            return Ok(());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let layer: ConfigLayer = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::debug!("applied configuration from {}", path.display());
        self.apply(layer);
        Ok(())
    }

    fn apply(&mut self, layer: ConfigLayer) {
        if let Some(search_paths) = layer.search_paths {
            self.search_paths = search_paths;
        }
        if let Some(exclude) = layer.exclude {
            self.exclude = exclude;
        }
        if let Some(branch_prefix) = layer.branch_prefix {
            self.branch_prefix = branch_prefix;
        }
        if let Some(features_dir) = layer.features_dir {
            self.features_dir = features_dir;
        }
        if let Some(schedule_policy) = layer.schedule_policy {
            self.schedule_policy = schedule_policy;
        }
        if let Some(force_remove) = layer.force_remove {
            self.force_remove = force_remove;
        }
    }

    pub fn layout(&self) -> FeatureLayout {
        FeatureLayout {
            branch_prefix: self.branch_prefix.clone(),
            features_dir: self.features_dir.clone(),
        }
    }

    pub fn worktree_options(&self) -> WorktreeOptions {
        WorktreeOptions {
            force_remove: self.force_remove,
            ..WorktreeOptions::default()
        }
    }
}
