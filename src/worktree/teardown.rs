//! Per-project teardown when a feature is finished
//!
//! ## Teardown Phases
//!
//! 1. Merge - merge the feature branch into the trunk (plans that merge)
//! 2. Worktree removal - remove the isolated checkout
//! 3. Branch deletion - delete the feature branch (`Full` only)
//!
//! Failures are collected as warnings and never stop later phases, except
//! that a failed merge or a surviving worktree skips branch deletion so
//! unmerged or uncommitted work survives.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::warn;

use super::manager::WorktreeManager;
use crate::git::{Deletion, MergeOutcome, Removal, Vcs};
use crate::models::{ProjectStatus, Worktree, WorktreeState};

/// What to do with each project of a finished feature
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TeardownPlan {
    /// Remove worktrees, keep branches
    #[default]
    RemoveWorktrees,
    /// Merge branches into the trunk, then remove worktrees
    MergeAndRemove,
    /// Merge, remove worktrees, delete branches
    Full,
}

impl TeardownPlan {
    pub fn merges(&self) -> bool {
        matches!(self, TeardownPlan::MergeAndRemove | TeardownPlan::Full)
    }

    pub fn deletes_branches(&self) -> bool {
        matches!(self, TeardownPlan::Full)
    }
}

impl fmt::Display for TeardownPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeardownPlan::RemoveWorktrees => write!(f, "remove-worktrees"),
            TeardownPlan::MergeAndRemove => write!(f, "merge"),
            TeardownPlan::Full => write!(f, "full"),
        }
    }
}

impl FromStr for TeardownPlan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "remove-worktrees" | "remove" => Ok(TeardownPlan::RemoveWorktrees),
            "merge" | "merge-and-remove" => Ok(TeardownPlan::MergeAndRemove),
            "full" | "full-cleanup" => Ok(TeardownPlan::Full),
            other => Err(format!(
                "unknown action '{other}' (expected remove-worktrees, merge or full)"
            )),
        }
    }
}

/// What teardown did for one project
#[derive(Debug, Clone)]
pub struct TeardownReport {
    pub project: String,
    /// Where the worktree ended up in its lifecycle
    pub state: WorktreeState,
    pub merge: Option<MergeOutcome>,
    pub removal: Option<Removal>,
    pub deletion: Option<Deletion>,
    /// Errors that occurred (non-fatal)
    pub warnings: Vec<String>,
}

impl TeardownReport {
    /// Check if teardown was fully successful (no warnings)
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// The worktree could not be removed and is still on disk
    pub fn worktree_survived(&self) -> bool {
        self.removal.is_none()
    }
}

/// Run `plan` for one project whose worktree lives at `worktree_path`.
pub fn teardown<V: Vcs>(
    manager: &WorktreeManager<V>,
    project: &ProjectStatus,
    worktree_path: &Path,
    plan: TeardownPlan,
) -> TeardownReport {
    let mut worktree = Worktree::new(
        project.name.clone(),
        worktree_path.to_path_buf(),
        project.branch.clone(),
    );
    let mut report = TeardownReport {
        project: project.name.clone(),
        state: worktree.state,
        merge: None,
        removal: None,
        deletion: None,
        warnings: Vec::new(),
    };
    let mut merge_failed = false;

    // Phase 1: merge
    if plan.merges() {
        match manager.absorb(&project.branch) {
            Ok(outcome) => {
                if worktree.is_live() {
                    advance(&mut worktree, WorktreeState::Merged, &mut report);
                }
                report.merge = Some(outcome);
            }
            Err(e) => {
                merge_failed = true;
                warn!(project = %project.name, error = %e, "merge failed");
                report.warnings.push(format!("merge of {} failed: {e}", project.branch));
            }
        }
    } else if worktree.is_live() {
        advance(&mut worktree, WorktreeState::Abandoned, &mut report);
    }

    // Phase 2: worktree removal
    match manager.decommission(worktree_path) {
        Ok(removal) => {
            if worktree.state != WorktreeState::NotProvisioned {
                advance(&mut worktree, WorktreeState::Removed, &mut report);
            }
            report.removal = Some(removal);
        }
        Err(e) => {
            warn!(project = %project.name, error = %e, "worktree removal failed");
            report
                .warnings
                .push(format!("removing {} failed: {e}", worktree_path.display()));
        }
    }

    // Phase 3: branch deletion
    if plan.deletes_branches() {
        if merge_failed {
            report.warnings.push(format!(
                "kept branch {} because it was not merged",
                project.branch
            ));
        } else if report.worktree_survived() {
            report.warnings.push(format!(
                "kept branch {} because its worktree is still present",
                project.branch
            ));
        } else {
            match manager.retire_branch(&project.branch) {
                Ok(deletion) => report.deletion = Some(deletion),
                Err(e) => {
                    warn!(project = %project.name, error = %e, "branch deletion failed");
                    report
                        .warnings
                        .push(format!("deleting {} failed: {e}", project.branch));
                }
            }
        }
    }

    report.state = worktree.state;
    report
}

fn advance(worktree: &mut Worktree, state: WorktreeState, report: &mut TeardownReport) {
    if let Err(e) = worktree.advance(state) {
        report.warnings.push(e.to_string());
    }
}
