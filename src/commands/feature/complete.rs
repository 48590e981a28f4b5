use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::Colorize;

use crate::commands::common::{Tally, Workspace};
use crate::git::{self, Deletion, MergeOutcome, Removal};
use crate::models::Status;
use crate::worktree::{teardown, TeardownPlan, TeardownReport};

/// Finish a feature: run `plan` for every project, then drop the record unless `keep`.
///
/// The record also stays while any worktree survives teardown, so the
/// feature can be completed again once the worktree is dealt with.
pub fn execute(
    workspace: Option<&Path>,
    feature_id: &str,
    plan: TeardownPlan,
    keep: bool,
    force: bool,
    force_remove: bool,
) -> Result<()> {
    let mut workspace = Workspace::open(workspace)?;
    workspace.config.force_remove |= force_remove;
    let feature = workspace.feature(feature_id)?;

    if !feature.is_complete() && !force {
        let unfinished: Vec<&str> = feature
            .projects
            .iter()
            .filter(|p| p.status != Status::Completed)
            .map(|p| p.name.as_str())
            .collect();
        bail!(
            "{feature_id} has unfinished projects: {}. Pass --force to complete anyway.",
            unfinished.join(", ")
        );
    }

    git::ensure_available().context("Cannot tear down worktrees")?;

    println!(
        "Completing {} {} with action {}",
        feature.id.bold(),
        format!("({})", feature.name).dimmed(),
        plan.to_string().cyan()
    );

    let mut tally = Tally::default();
    let mut surviving = Vec::new();
    for project in &feature.projects {
        let manager = match workspace.manager_for(&project.name) {
            Ok(manager) => manager,
            Err(e) => {
                println!("  {} {}: {e:#}", "✗".red().bold(), project.name.cyan());
                tally.failed += 1;
                surviving.push(project.name.as_str());
                continue;
            }
        };

        let report = teardown(
            &manager,
            project,
            &workspace.store.worktree_path(project),
            plan,
        );
        print_report(&report);
        if report.worktree_survived() {
            surviving.push(project.name.as_str());
        }
        if report.is_clean() {
            tally.succeeded += 1;
        } else {
            tally.failed += 1;
        }
    }

    tally.print("Processed");

    // Leave the feature directory behind only if something is still in it
    let feature_dir = workspace.store.feature_dir(&feature.id);
    if feature_dir.is_dir() {
        let _ = fs::remove_dir(&feature_dir);
    }

    if keep {
        println!("Kept {} in the workspace document (--keep)", feature.id.bold());
    } else if !surviving.is_empty() {
        bail!(
            "Kept {} in the workspace document: worktrees remain for {}. \
             Commit or discard their changes, or pass --force-remove.",
            feature.id,
            surviving.join(", ")
        );
    } else {
        workspace
            .store
            .delete(&feature.id)
            .with_context(|| format!("Failed to remove {} from the workspace document", feature.id))?;
        println!("{} Removed {} from the workspace document", "✓".green().bold(), feature.id.bold());
    }
    Ok(())
}

fn print_report(report: &TeardownReport) {
    let icon = if report.is_clean() {
        "✓".green().bold()
    } else {
        "!".yellow().bold()
    };
    println!("  {icon} {}", report.project.cyan());

    match &report.merge {
        Some(MergeOutcome::AlreadyUpToDate) => println!("      merge: already up to date"),
        Some(MergeOutcome::FastForward { target }) => {
            println!("      merge: fast-forwarded {target}")
        }
        Some(MergeOutcome::Merged { target, stats }) => println!(
            "      merge: merged into {target} ({} files, {}, {})",
            stats.files_changed,
            format!("+{}", stats.insertions).green(),
            format!("-{}", stats.deletions).red()
        ),
        None => {}
    }
    match report.removal {
        Some(Removal::Removed) => println!("      worktree: removed"),
        Some(Removal::AlreadyGone) => println!("      worktree: already gone"),
        None => {}
    }
    match report.deletion {
        Some(Deletion::Deleted) => println!("      branch: deleted"),
        Some(Deletion::AlreadyAbsent) => println!("      branch: already absent"),
        None => {}
    }
    for warning in &report.warnings {
        println!("      {} {warning}", "warning:".yellow());
    }
}
