//! Repository discovery under a workspace root

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use glob::glob;
use tracing::debug;

use crate::config::WeftConfig;

/// Find the git repositories of a workspace.
///
/// Each search pattern is expanded relative to `root`; directories holding a
/// `.git` entry and not named in `exclude` become repositories, keyed by
/// directory name. When nothing matches, the root's immediate children are
/// scanned instead. The first path found for a name wins.
///
/// Returns repository name -> workspace-relative path (forward slashes).
pub fn discover_repositories(root: &Path, config: &WeftConfig) -> Result<BTreeMap<String, String>> {
    let mut found = BTreeMap::new();

    for pattern in &config.search_paths {
        let full_pattern = root.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        let mut matches: Vec<_> = glob(&pattern_str)
            .map_err(|e| anyhow::anyhow!("Invalid search pattern '{pattern}': {e}"))?
            .filter_map(|r| r.ok())
            .collect();
        matches.sort();

        for path in matches {
            consider(root, &path, config, &mut found);
        }
    }

    if found.is_empty() {
        debug!("no repositories under search paths, scanning {}", root.display());
        let mut children: Vec<_> = fs::read_dir(root)
            .with_context(|| format!("Failed to read {}", root.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        children.sort();

        for path in children {
            consider(root, &path, config, &mut found);
        }
    }

    Ok(found)
}

fn consider(root: &Path, path: &Path, config: &WeftConfig, found: &mut BTreeMap<String, String>) {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return;
    };
    if config.exclude.iter().any(|e| *e == name) {
        return;
    }
    if !path.is_dir() || !path.join(".git").exists() {
        return;
    }
    let Ok(relative) = path.strip_prefix(root) else {
        return;
    };

    let relative = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    if let Some(existing) = found.get(&name) {
        debug!("repository name {name} already taken by {existing}, skipping {relative}");
        return;
    }
    debug!("discovered repository {name} at {relative}");
    found.insert(name, relative);
}
