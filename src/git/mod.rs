//! Git operations for feature worktree management
//!
//! This module provides:
//! - A typed repository handle over the git CLI
//! - Parsers for git's porcelain and summary output
//! - The error kinds every git-facing operation reports

mod error;
pub mod parser;
mod repository;
pub mod runner;

pub use error::{GitError, WorktreeCreateReason};
pub use parser::{DiffStat, Divergence, WorktreeInfo};
pub use repository::{
    Deletion, Head, MergeOutcome, Removal, Repository, Vcs, DEFAULT_BRANCH_CANDIDATES,
};
pub use runner::ensure_available;
