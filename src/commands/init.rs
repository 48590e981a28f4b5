//! Initialize a weft workspace
//! Usage: weft init [-w <dir>]

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::commands::common::Workspace;
use crate::config::WORKSPACE_CONFIG_FILE;
use crate::discovery::discover_repositories;

/// Discover repositories under the workspace root and write a fresh document
pub fn execute(workspace: Option<&Path>) -> Result<()> {
    let root = Workspace::resolve_root(workspace)?;
    let workspace = Workspace::at(root)?;

    println!("{}", "Initializing weft workspace...".bold());
    println!("  Root: {}", workspace.root.display().to_string().dimmed());

    let locations = discover_repositories(&workspace.root, &workspace.config)
        .context("Failed to discover repositories")?;

    let document = workspace.store.initialize(locations).with_context(|| {
        format!(
            "Failed to initialize workspace at {}",
            workspace.root.display()
        )
    })?;

    println!(
        "{} Wrote {}",
        "✓".green().bold(),
        workspace.store.document_path().display()
    );

    if document.project_locations.is_empty() {
        println!();
        println!("{}", "No repositories found.".yellow().bold());
        println!("Searched:");
        for pattern in &workspace.config.search_paths {
            println!("  - {}", pattern.dimmed());
        }
        println!(
            "Set {} in {} to point at your repositories.",
            "search_paths".cyan(),
            WORKSPACE_CONFIG_FILE
        );
        return Ok(());
    }

    println!();
    println!(
        "Found {} repositor{}:",
        document.project_locations.len(),
        if document.project_locations.len() == 1 { "y" } else { "ies" }
    );
    for (name, path) in &document.project_locations {
        println!("  - {} ({})", name.cyan(), path.dimmed());
    }

    println!();
    println!("Next steps:");
    println!("  weft feature create <name> --repos <a,b>");
    println!("  weft feature status");
    Ok(())
}
