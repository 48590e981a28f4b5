use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::commands::common::{Tally, Workspace};
use crate::git;

/// Force-delete every local branch under the feature prefix in every repository
pub fn execute(workspace: Option<&Path>, dry_run: bool) -> Result<()> {
    let workspace = Workspace::open(workspace)?;
    let projects = workspace.store.available_projects()?;

    if projects.is_empty() {
        println!("No repositories known to this workspace.");
        return Ok(());
    }

    git::ensure_available().context("Cannot list branches")?;

    let prefix = format!("{}/", workspace.config.branch_prefix);
    println!("Scanning {} repositories for {prefix}* branches...", projects.len());

    let mut candidates = Vec::new();
    for name in &projects {
        let scanned = workspace
            .manager_for(name)
            .and_then(|manager| Ok(manager.vcs().branches_with_prefix(&prefix)?));
        match scanned {
            Ok(branches) if branches.is_empty() => {}
            Ok(branches) => {
                println!("  {} {}", name.cyan(), branches.join(", ").dimmed());
                candidates.extend(branches.into_iter().map(|b| (name.clone(), b)));
            }
            Err(e) => println!("  {} could not scan {}: {e}", "!".yellow().bold(), name.cyan()),
        }
    }

    if candidates.is_empty() {
        println!("{} No feature branches to prune", "✓".green().bold());
        return Ok(());
    }

    if dry_run {
        println!();
        println!("Would delete {} branch(es) (--dry-run)", candidates.len());
        return Ok(());
    }

    println!();
    let mut tally = Tally::default();
    for (project, branch) in &candidates {
        let result = workspace
            .manager_for(project)
            .and_then(|manager| Ok(manager.retire_branch(branch)?));
        match &result {
            Ok(_) => println!("  {} {project}: {branch}", "✓".green().bold()),
            Err(e) => println!("  {} {project}: {branch} - {e}", "✗".red().bold()),
        }
        tally.record(&result);
    }

    tally.print("Deleted");
    Ok(())
}
