use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::Colorize;

use crate::commands::common::{status_label, Workspace};
use crate::models::Status;

/// Set one project's status
pub fn execute(workspace: Option<&Path>, feature_id: &str, repository: &str, status: Status) -> Result<()> {
    let workspace = Workspace::open(workspace)?;

    let transition = workspace
        .store
        .transition_project_status(feature_id, repository, status)
        .with_context(|| format!("Failed to update {repository} in {feature_id}"))?;

    println!(
        "{} {} {}: {} -> {}",
        "✓".green().bold(),
        feature_id.bold(),
        repository.cyan(),
        status_label(transition.previous),
        status_label(status)
    );
    println!("  Progress: {}", transition.feature.progress());

    if transition.previous != Status::Completed && transition.feature.is_complete() {
        println!();
        println!(
            "{} All projects completed. Finish up with {}",
            "✓".green().bold(),
            format!("weft feature complete {feature_id}").cyan()
        );
    }
    Ok(())
}

/// Promote pending projects whose worktrees show work to in-progress.
///
/// Never marks anything completed and never demotes.
pub fn refresh(workspace: Option<&Path>, feature_id: &str) -> Result<()> {
    let workspace = Workspace::open(workspace)?;
    let feature = workspace.feature(feature_id)?;

    let mut promoted = 0;
    let mut failed = Vec::new();
    for project in &feature.projects {
        if project.status != Status::Pending {
            continue;
        }

        let manager = match workspace.manager_for(&project.name) {
            Ok(manager) => manager,
            Err(e) => {
                println!("  {} {}: {e}", "✗".red().bold(), project.name.cyan());
                failed.push(project.name.as_str());
                continue;
            }
        };
        let observed = manager.inspect(&workspace.store.worktree_path(project));
        if observed != Status::InProgress {
            continue;
        }

        match workspace
            .store
            .transition_project_status(feature_id, &project.name, Status::InProgress)
        {
            Ok(_) => {
                println!(
                    "  {} {} -> {}",
                    "✓".green().bold(),
                    project.name.cyan(),
                    status_label(Status::InProgress)
                );
                promoted += 1;
            }
            Err(e) => {
                println!("  {} {}: {e}", "✗".red().bold(), project.name.cyan());
                failed.push(project.name.as_str());
            }
        }
    }

    if promoted == 0 {
        println!("No status changes for {feature_id}");
    } else {
        println!("Promoted {promoted} project(s) in {}", feature_id.bold());
    }
    if !failed.is_empty() {
        bail!("Could not refresh {} in {feature_id}", failed.join(", "));
    }
    Ok(())
}
