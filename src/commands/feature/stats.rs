use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;

use crate::commands::common::{format_duration, status_icon, Workspace};
use crate::error;
use crate::git::{self, Vcs};
use crate::models::{Feature, FeatureStats, ProjectStatus, Status};

/// Show timing, progress and git statistics for a feature, caching the numbers
pub fn execute(workspace: Option<&Path>, feature_id: &str) -> Result<()> {
    let workspace = Workspace::open(workspace)?;
    let feature = workspace.feature(feature_id)?;

    println!("{} {}", feature.name.bold(), format!("({})", feature.id).dimmed());
    println!("{}", "─".repeat(60).dimmed());

    print_timing(&feature);
    print_progress(&feature);

    git::ensure_available().context("Cannot gather git statistics")?;

    let mut stats = FeatureStats::default();
    for project in &feature.projects {
        if !workspace.store.worktree_path(project).is_dir() {
            continue;
        }
        match project_stats(&workspace, project) {
            Ok(project_stats) => {
                stats.total_commits += project_stats.total_commits;
                stats.files_changed += project_stats.files_changed;
                stats.lines_added += project_stats.lines_added;
                stats.lines_deleted += project_stats.lines_deleted;
            }
            Err(e) => {
                tracing::warn!(project = %project.name, kind = %e.kind(), "skipping git statistics: {e}");
            }
        }
    }

    println!();
    println!("{}", "Git Statistics".bold());
    println!("  Commits:       {}", stats.total_commits);
    println!("  Files changed: {}", stats.files_changed);
    println!("  Lines added:   {}", format!("+{}", stats.lines_added).green());
    println!("  Lines deleted: {}", format!("-{}", stats.lines_deleted).red());
    println!(
        "  Net change:    {}",
        i64::from(stats.lines_added) - i64::from(stats.lines_deleted)
    );

    workspace
        .store
        .record_stats(&feature.id, stats)
        .with_context(|| format!("Failed to save statistics for {}", feature.id))?;

    println!();
    println!("{}", "Projects".bold());
    for project in &feature.projects {
        println!("  {} {:<20} {}", status_icon(project.status), project.name, project.status);
        println!("      {}", project.worktree_path.dimmed());
        if let Some(updated) = project.last_updated {
            println!(
                "      {}",
                format!("Updated: {}", updated.format("%Y-%m-%d %H:%M UTC")).dimmed()
            );
        }
    }
    Ok(())
}

/// Commits and diff of a project's feature branch relative to its trunk
fn project_stats(workspace: &Workspace, project: &ProjectStatus) -> error::Result<FeatureStats> {
    let manager = workspace.manager_for(&project.name)?;
    let repo = manager.vcs();
    let base = repo.resolve_default_branch()?;
    let commits = repo.commits_ahead_of(&base, &project.branch)?;
    let diff = repo.diff_stat(&base, &project.branch)?;
    Ok(FeatureStats {
        total_commits: commits,
        files_changed: diff.files_changed,
        lines_added: diff.insertions,
        lines_deleted: diff.deletions,
    })
}

fn print_timing(feature: &Feature) {
    let format = "%Y-%m-%d %H:%M UTC";
    println!();
    println!("{}", "Time Tracking".bold());
    println!("  Created:   {}", feature.created_at.format(format));
    match feature.started_at {
        Some(started) => println!("  Started:   {}", started.format(format)),
        None => println!("  Started:   {}", "not started yet".dimmed()),
    }

    let start = feature.started_at.unwrap_or(feature.created_at);
    match feature.completed_at {
        Some(completed) => {
            println!("  Completed: {}", completed.format(format));
            println!("  Duration:  {}", format_duration(completed - start));
        }
        None => {
            println!("  Completed: {}", "in progress".dimmed());
            println!("  Elapsed:   {}", format_duration(Utc::now() - start));
        }
    }
}

fn print_progress(feature: &Feature) {
    println!();
    println!("{}", "Project Status".bold());
    println!("  Total:       {}", feature.projects.len());
    println!("  Completed:   {}", feature.count(Status::Completed).to_string().green());
    println!("  In progress: {}", feature.count(Status::InProgress).to_string().yellow());
    println!("  Pending:     {}", feature.count(Status::Pending));
    println!("  Progress:    {}%", feature.progress().percent());
}
