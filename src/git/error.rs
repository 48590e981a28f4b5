//! Error types for git operations

use std::fmt;
use std::path::PathBuf;

use crate::error::ErrorKind;

/// Why `git worktree add` was refused before or while running
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorktreeCreateReason {
    /// Something already lives at the target path
    PathOccupied,
    /// The branch to check out does not exist
    BranchMissing,
    /// git rejected the request
    Rejected(String),
}

impl fmt::Display for WorktreeCreateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorktreeCreateReason::PathOccupied => write!(f, "path already exists"),
            WorktreeCreateReason::BranchMissing => write!(f, "branch does not exist"),
            WorktreeCreateReason::Rejected(stderr) => write!(f, "{stderr}"),
        }
    }
}

/// Error types for repository operations
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("git is not installed or not on PATH")]
    ToolUnavailable,

    #[error("git {args} failed in {}: {stderr}", repo.display())]
    Command {
        repo: PathBuf,
        args: String,
        stderr: String,
    },

    #[error("Failed to create branch '{branch}' from '{source_branch}': {reason}")]
    BranchCreate {
        branch: String,
        source_branch: String,
        reason: String,
    },

    #[error("Failed to create worktree at {} for branch '{branch}': {reason}", path.display())]
    WorktreeCreate {
        path: PathBuf,
        branch: String,
        reason: WorktreeCreateReason,
    },

    #[error("Failed to remove worktree at {}: {reason}", path.display())]
    WorktreeRemove { path: PathBuf, reason: String },

    #[error("Failed to delete branch '{branch}': {reason}")]
    BranchDelete { branch: String, reason: String },

    #[error("Merge conflict merging '{branch}' into '{target}' ({} file(s): {})", files.len(), files.join(", "))]
    MergeConflict {
        branch: String,
        target: String,
        files: Vec<String>,
    },

    #[error("Failed to merge '{branch}' into '{target}': {reason}")]
    Merge {
        branch: String,
        target: String,
        reason: String,
    },
}

impl GitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GitError::MergeConflict { .. } => ErrorKind::MergeConflict,
            GitError::WorktreeCreate {
                reason: WorktreeCreateReason::PathOccupied,
                ..
            } => ErrorKind::AlreadyExists,
            _ => ErrorKind::ExternalTool,
        }
    }

    /// True when the error only says the worktree path is already taken
    pub fn is_path_occupied(&self) -> bool {
        matches!(
            self,
            GitError::WorktreeCreate {
                reason: WorktreeCreateReason::PathOccupied,
                ..
            }
        )
    }
}
