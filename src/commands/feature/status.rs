use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::commands::common::{status_icon, status_label, Workspace};
use crate::commands::plan::print_plan;
use crate::plan::build_execution_plan;

/// Show every feature with its per-project status, then any conflicts
pub fn execute(workspace: Option<&Path>) -> Result<()> {
    let workspace = Workspace::open(workspace)?;
    let features = workspace.store.list()?;

    if features.is_empty() {
        println!(
            "No features yet. Run {} to get started.",
            "weft feature create".cyan()
        );
        return Ok(());
    }

    println!("{}", "Feature Status".bold());
    println!("{}", "─".repeat(50).dimmed());

    for feature in &features {
        println!();
        println!("{} {}", format!("{}:", feature.id).bold(), feature.name.bold());
        println!(
            "  {} {}",
            "Created:".dimmed(),
            feature.created_at.format("%Y-%m-%d %H:%M UTC").to_string().dimmed()
        );
        println!("  Progress: {}", feature.progress());

        for project in &feature.projects {
            println!(
                "  {} {:<20} {}",
                status_icon(project.status),
                project.name,
                status_label(project.status)
            );
            println!("      {}", format!("└─ {}", project.worktree_path).dimmed());
        }
    }

    let plan = build_execution_plan(&features, &workspace.config.schedule_policy)?;
    if !plan.is_conflict_free() {
        println!();
        print_plan(&plan, &features);
    }

    Ok(())
}
