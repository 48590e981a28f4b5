//! Show conflicts between features and the batches they can run in
//! Usage: weft plan [--policy <list-order|oldest-first>]

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::commands::common::Workspace;
use crate::models::Feature;
use crate::plan::{build_execution_plan, ExecutionPlan, SchedulePolicy};

pub fn execute(workspace: Option<&Path>, policy: Option<SchedulePolicy>) -> Result<()> {
    let workspace = Workspace::open(workspace)?;
    let features = workspace.store.list()?;

    if features.is_empty() {
        println!("No features to plan.");
        return Ok(());
    }

    let policy = policy.unwrap_or(workspace.config.schedule_policy);
    let plan = build_execution_plan(&features, &policy)
        .with_context(|| format!("Failed to order features with policy {policy}"))?;

    if plan.is_conflict_free() {
        println!(
            "{} No conflicts: all {} feature(s) can proceed in parallel",
            "✓".green().bold(),
            features.len()
        );
        println!();
    }
    print_plan(&plan, &features);
    Ok(())
}

/// Print conflicts, then each batch with its feature names
pub fn print_plan(plan: &ExecutionPlan, features: &[Feature]) {
    if !plan.conflicts.is_empty() {
        println!("{}", "Conflicts Detected".yellow().bold());
        for conflict in &plan.conflicts {
            println!(
                "  {} {} ↔ {}",
                "!".yellow().bold(),
                conflict.feature1.bold(),
                conflict.feature2.bold()
            );
            println!(
                "      {}",
                format!("shared: {}", conflict.conflicting_projects.join(", ")).dimmed()
            );
        }
        println!();
    }

    println!("{}", "Execution Order".bold());
    for (index, batch) in plan.batches.iter().enumerate() {
        println!("  Batch {} (can work in parallel):", index + 1);
        for id in batch {
            let name = features
                .iter()
                .find(|f| &f.id == id)
                .map(|f| f.name.as_str())
                .unwrap_or_default();
            println!("    - {}: {name}", id.cyan());
        }
    }
}
