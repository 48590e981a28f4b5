use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::commands::common::{Tally, Workspace};
use crate::git;
use crate::models::Feature;
use crate::worktree::Provisioned;

/// Create a feature across `repos` and provision a worktree in each
pub fn execute(workspace: Option<&Path>, name: &str, repos: &[String], no_worktrees: bool) -> Result<()> {
    let workspace = Workspace::open(workspace)?;

    let feature = workspace
        .store
        .create(name, repos)
        .with_context(|| format!("Failed to create feature '{name}'"))?;

    println!(
        "{} Created {} {}",
        "✓".green().bold(),
        feature.id.bold(),
        format!("({name})").dimmed()
    );

    if no_worktrees {
        println!(
            "  Worktrees not created; run {} later",
            format!("weft feature provision {}", feature.id).cyan()
        );
        return Ok(());
    }

    provision_all(&workspace, &feature)
}

/// (Re)provision the worktrees of an existing feature
pub fn provision(workspace: Option<&Path>, feature_id: &str) -> Result<()> {
    let workspace = Workspace::open(workspace)?;
    let feature = workspace.feature(feature_id)?;
    println!("Provisioning worktrees for {}", feature.id.bold());
    provision_all(&workspace, &feature)
}

fn provision_all(workspace: &Workspace, feature: &Feature) -> Result<()> {
    git::ensure_available().context("Cannot create worktrees")?;

    let target_dir = workspace.store.feature_dir(&feature.id);
    let mut tally = Tally::default();

    println!();
    for project in &feature.projects {
        let result = workspace
            .manager_for(&project.name)
            .and_then(|manager| Ok(manager.provision_branch(&project.branch, &project.name, &target_dir)?));

        match &result {
            Ok(Provisioned::Created {
                path,
                branch,
                source_branch,
                branch_created,
                advisory,
            }) => {
                let how = if *branch_created { "new branch" } else { "existing branch" };
                println!(
                    "  {} {} {} ({how} from {source_branch})",
                    "✓".green().bold(),
                    project.name.cyan(),
                    branch.dimmed()
                );
                println!("      {}", path.display().to_string().dimmed());
                if let Some(advisory) = advisory {
                    println!("      {} {advisory}", "!".yellow().bold());
                }
            }
            Ok(Provisioned::Existing { path }) => {
                println!(
                    "  {} {} already has a worktree at {}",
                    "•".dimmed(),
                    project.name.cyan(),
                    path.display()
                );
            }
            Err(e) => {
                println!("  {} {}: {e:#}", "✗".red().bold(), project.name.cyan());
            }
        }
        tally.record(&result);
    }

    tally.print("Worktrees ready");
    if tally.failed > 0 {
        println!(
            "Fix the failures above and run {}; existing worktrees are left alone.",
            format!("weft feature provision {}", feature.id).cyan()
        );
    }
    Ok(())
}
