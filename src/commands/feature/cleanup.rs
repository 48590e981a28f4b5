use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::Colorize;

use crate::commands::common::{Tally, Workspace};
use crate::git::{self, Deletion};
use crate::models::Feature;
use crate::worktree::{teardown, TeardownPlan};

/// Delete features: remove their worktrees and branches, then their records.
///
/// A feature whose worktree could not be removed keeps its branch and record.
pub fn execute(
    workspace: Option<&Path>,
    feature_ids: &[String],
    all: bool,
    force_remove: bool,
) -> Result<()> {
    let mut workspace = Workspace::open(workspace)?;
    workspace.config.force_remove |= force_remove;
    let features = workspace.store.list()?;

    if features.is_empty() {
        println!("No features to clean up.");
        return Ok(());
    }

    let selected: Vec<Feature> = if all {
        features
    } else {
        if feature_ids.is_empty() {
            bail!("Name the features to delete, or pass --all");
        }
        let mut selected = Vec::new();
        for id in feature_ids {
            match features.iter().find(|f| &f.id == id) {
                Some(feature) => selected.push(feature.clone()),
                None => bail!("Feature not found: {id}"),
            }
        }
        selected
    };

    git::ensure_available().context("Cannot remove worktrees")?;

    println!("Deleting {} feature(s)...", selected.len());

    let mut tally = Tally::default();
    for feature in &selected {
        println!();
        println!("{} {}", format!("{}:", feature.id).bold(), feature.name);

        let mut clean = true;
        let mut surviving = false;
        for project in &feature.projects {
            let manager = match workspace.manager_for(&project.name) {
                Ok(manager) => manager,
                Err(e) => {
                    println!("  {} {}: {e:#}", "✗".red().bold(), project.name.cyan());
                    clean = false;
                    surviving = true;
                    continue;
                }
            };

            // Full teardown without the merge: remove the worktree, then the branch
            let report = teardown(
                &manager,
                project,
                &workspace.store.worktree_path(project),
                TeardownPlan::RemoveWorktrees,
            );
            for warning in &report.warnings {
                println!("  {} {}: {warning}", "!".yellow().bold(), project.name.cyan());
                clean = false;
            }
            if report.worktree_survived() {
                println!(
                    "  {} {}: kept {} with its worktree",
                    "!".yellow().bold(),
                    project.name.cyan(),
                    project.branch.dimmed()
                );
                surviving = true;
                continue;
            }

            match manager.retire_branch(&project.branch) {
                Ok(Deletion::Deleted) => {
                    println!("  {} {}: removed worktree and {}", "✓".green().bold(), project.name.cyan(), project.branch.dimmed())
                }
                Ok(Deletion::AlreadyAbsent) => {
                    println!("  {} {}: removed worktree", "✓".green().bold(), project.name.cyan())
                }
                Err(e) => {
                    println!("  {} {}: {e}", "!".yellow().bold(), project.name.cyan());
                    clean = false;
                }
            }
            if let Err(e) = manager.vcs().prune_worktrees() {
                tracing::debug!(project = %project.name, "worktree prune failed: {e}");
            }
        }

        let feature_dir = workspace.store.feature_dir(&feature.id);
        if feature_dir.is_dir() {
            let _ = fs::remove_dir(&feature_dir);
        }

        if surviving {
            println!(
                "  {} kept {}; commit or discard its worktree changes, or pass --force-remove",
                "✗".red().bold(),
                feature.id.bold()
            );
            tally.failed += 1;
            continue;
        }

        let deleted = workspace.store.delete(&feature.id);
        if let Err(e) = &deleted {
            println!("  {} {e}", "✗".red().bold());
        }
        tally.record(&deleted);
        if deleted.is_ok() && !clean {
            println!("  {} record deleted with warnings", "!".yellow().bold());
        }
    }

    tally.print("Deleted");
    Ok(())
}
