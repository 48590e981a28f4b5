use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use colored::Colorize;

use crate::commands::common::{truncate, Tally, Workspace};
use crate::process::{detect_project_type, run_in_dir};

/// Lines of output shown per project
const PREVIEW_LINES: usize = 5;

/// Run a command in every existing worktree of a feature
pub fn execute(
    workspace: Option<&Path>,
    feature_id: &str,
    command: &[String],
    timeout_secs: Option<u64>,
) -> Result<()> {
    let workspace = Workspace::open(workspace)?;
    let feature = workspace.feature(feature_id)?;
    let timeout = timeout_secs.map(Duration::from_secs);

    let worktrees: Vec<_> = feature
        .projects
        .iter()
        .map(|p| (p, workspace.store.worktree_path(p)))
        .filter(|(_, path)| path.is_dir())
        .collect();

    if worktrees.is_empty() {
        bail!("No worktrees found for {feature_id}");
    }

    println!("{} {}", "Feature:".dimmed(), feature.name);
    println!("{} {}", "Command:".dimmed(), command.join(" "));

    let mut tally = Tally::default();
    let mut failed_projects = Vec::new();

    for (project, path) in worktrees {
        println!();
        println!("{}", project.name.cyan().bold());
        println!("   {}", path.display().to_string().dimmed());
        println!("   Detected: {}", detect_project_type(&path).dimmed());

        let outcome = run_in_dir(command, &path, timeout);
        match &outcome {
            Ok(result) if result.success => {
                println!(
                    "   {} Success {}",
                    "✓".green().bold(),
                    format!("({:.1}s)", result.duration.as_secs_f64()).dimmed()
                );
                print_preview(&result.stdout, PREVIEW_LINES);
            }
            Ok(result) => {
                let reason = if result.timed_out {
                    "timed out".to_string()
                } else {
                    match result.exit_code {
                        Some(code) => format!("exit code {code}"),
                        None => "terminated".to_string(),
                    }
                };
                println!("   {} Failed ({reason})", "✗".red().bold());
                print_preview(&result.stdout, 3);
                print_preview(&result.stderr, 3);
            }
            Err(e) => println!("   {} {e:#}", "✗".red().bold()),
        }

        if matches!(&outcome, Ok(result) if result.success) {
            tally.succeeded += 1;
        } else {
            tally.failed += 1;
            failed_projects.push(project.name.clone());
        }
    }

    tally.print("Successful");
    if !failed_projects.is_empty() {
        bail!("Command failed in: {}", failed_projects.join(", "));
    }
    Ok(())
}

fn print_preview(output: &str, max_lines: usize) {
    let lines: Vec<&str> = output.trim().lines().collect();
    for line in lines.iter().take(max_lines) {
        println!("   {}", truncate(line, 120).dimmed());
    }
    if lines.len() > max_lines {
        println!(
            "   {}",
            format!("... ({} more lines)", lines.len() - max_lines).dimmed()
        );
    }
}
