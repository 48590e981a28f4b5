//! Git command runner
//!
//! Every git invocation in weft goes through these functions so that spawn
//! failures, non-zero exits and logging are handled in one place.

use std::io;
use std::path::Path;
use std::process::{Command, Output};

use tracing::debug;

use super::error::GitError;

/// Check that git can be found on PATH
pub fn ensure_available() -> Result<(), GitError> {
    which::which("git").map_err(|_| GitError::ToolUnavailable)?;
    Ok(())
}

/// Run a git command and return the raw Output.
///
/// Only fails when the process cannot be spawned; a non-zero exit is left
/// for the caller to classify.
pub fn run_git(args: &[&str], repo_root: &Path) -> Result<Output, GitError> {
    debug!(repo = %repo_root.display(), "git {}", args.join(" "));
    Command::new("git")
        .args(args)
        .current_dir(repo_root)
        .output()
        .map_err(|e| spawn_error(e, args, repo_root))
}

/// Run a git command, check for success, and return stdout trimmed.
pub fn run_git_checked(args: &[&str], repo_root: &Path) -> Result<String, GitError> {
    let output = run_git(args, repo_root)?;
    if !output.status.success() {
        return Err(command_error(args, repo_root, &output));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Run a git command and return true if exit code is 0.
///
/// Spawn failures and non-zero exits both read as `false`.
pub fn run_git_bool(args: &[&str], repo_root: &Path) -> bool {
    run_git(args, repo_root)
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Combined stdout and stderr of a finished command
pub fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Trimmed stderr of a finished command
pub fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

pub(crate) fn command_error(args: &[&str], repo_root: &Path, output: &Output) -> GitError {
    GitError::Command {
        repo: repo_root.to_path_buf(),
        args: args.join(" "),
        stderr: stderr_of(output),
    }
}

fn spawn_error(err: io::Error, args: &[&str], repo_root: &Path) -> GitError {
    if err.kind() == io::ErrorKind::NotFound && repo_root.is_dir() {
        return GitError::ToolUnavailable;
    }
    GitError::Command {
        repo: repo_root.to_path_buf(),
        args: args.join(" "),
        stderr: err.to_string(),
    }
}
