//! Common utility functions shared across command implementations.
//!
//! This module provides utilities for:
//! - Workspace root discovery and opening
//! - Per-repository worktree managers
//! - Success/failure tallies for bulk operations

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use colored::Colorize;

use crate::config::WeftConfig;
use crate::error;
use crate::fs::FeatureStore;
use crate::git::Repository;
use crate::models::{Feature, Status};
use crate::worktree::WorktreeManager;

/// An opened workspace: its root, effective configuration and feature store
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub config: WeftConfig,
    pub store: FeatureStore,
}

impl Workspace {
    /// Resolve the workspace root without requiring a document.
    ///
    /// An explicit path wins. Otherwise walk up from the current directory
    /// looking for a workspace document, falling back to the current
    /// directory itself.
    pub fn resolve_root(explicit: Option<&Path>) -> Result<PathBuf> {
        let root = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let cwd = std::env::current_dir().context("Failed to read current directory")?;
                FeatureStore::locate(&cwd).unwrap_or(cwd)
            }
        };
        root.canonicalize()
            .with_context(|| format!("Workspace root {} does not exist", root.display()))
    }

    /// Open the workspace at `root` with its layered configuration
    pub fn at(root: PathBuf) -> Result<Self> {
        let config = WeftConfig::load(&root)?;
        let store = FeatureStore::new(&root).with_layout(config.layout());
        Ok(Self {
            root,
            config,
            store,
        })
    }

    /// Open an initialized workspace
    pub fn open(explicit: Option<&Path>) -> Result<Self> {
        let workspace = Self::at(Self::resolve_root(explicit)?)?;
        if !workspace.store.is_initialized() {
            bail!(
                "No weft workspace found at {}. Run 'weft init' first.",
                workspace.root.display()
            );
        }
        Ok(workspace)
    }

    /// Worktree manager for a known repository
    pub fn manager_for(&self, repository: &str) -> error::Result<WorktreeManager<Repository>> {
        let path = self.store.project_path(repository)?;
        Ok(WorktreeManager::with_options(
            Repository::new(path),
            self.config.worktree_options(),
        ))
    }

    pub fn feature(&self, feature_id: &str) -> Result<Feature> {
        self.store
            .get(feature_id)
            .with_context(|| format!("Failed to load feature {feature_id}"))
    }
}

/// Success/failure counts for a bulk operation
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub succeeded: usize,
    pub failed: usize,
}

impl Tally {
    pub fn record<T, E>(&mut self, result: &std::result::Result<T, E>) {
        if result.is_ok() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Print the closing summary of a bulk operation
    pub fn print(&self, label: &str) {
        println!();
        println!("{}", "Summary".bold());
        println!(
            "  {} {label}: {}/{}",
            "✓".green().bold(),
            self.succeeded,
            self.total()
        );
        if self.failed > 0 {
            println!(
                "  {} Failed: {}/{}",
                "✗".red().bold(),
                self.failed,
                self.total()
            );
        }
    }
}

/// Status icon for display
pub fn status_icon(status: Status) -> colored::ColoredString {
    match status {
        Status::Completed => "✓".green().bold(),
        Status::InProgress => "●".yellow(),
        Status::Pending => "○".dimmed(),
    }
}

/// Status label colored like its icon
pub fn status_label(status: Status) -> colored::ColoredString {
    let label = status.to_string();
    match status {
        Status::Completed => label.green(),
        Status::InProgress => label.yellow(),
        Status::Pending => label.dimmed(),
    }
}

/// Truncate a string for display, adding "…" if truncated
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{kept}…")
}

/// Format a duration as "Xh Ym"
pub fn format_duration(duration: chrono::Duration) -> String {
    let minutes = duration.num_minutes().max(0);
    format!("{}h {}m", minutes / 60, minutes % 60)
}
