use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

/// A Worktree represents one repository's isolated checkout for a feature.
/// Worktrees live in {features_dir}/{feature_id}/{repository} directories.
#[derive(Debug, Clone)]
pub struct Worktree {
    /// Repository the worktree belongs to
    pub repository: String,
    /// Absolute path to worktree directory
    pub path: PathBuf,
    /// Git branch name (e.g., "feature/feat-001")
    pub branch: String,
    /// Current lifecycle state
    pub state: WorktreeState,
}

/// Lifecycle of a feature worktree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorktreeState {
    /// No checkout exists yet
    NotProvisioned,
    /// Checkout exists on the feature branch
    Provisioned,
    /// Feature branch has been merged into the trunk
    Merged,
    /// Work was dropped without merging
    Abandoned,
    /// Checkout has been removed
    Removed,
}

impl fmt::Display for WorktreeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorktreeState::NotProvisioned => write!(f, "not-provisioned"),
            WorktreeState::Provisioned => write!(f, "provisioned"),
            WorktreeState::Merged => write!(f, "merged"),
            WorktreeState::Abandoned => write!(f, "abandoned"),
            WorktreeState::Removed => write!(f, "removed"),
        }
    }
}

impl WorktreeState {
    /// Check if transitioning from the current state to the target state is valid.
    ///
    /// Valid transitions:
    /// - `NotProvisioned` -> `Provisioned`
    /// - `Provisioned` -> `Merged` | `Abandoned` | `Removed`
    /// - `Merged` -> `Removed`
    /// - `Abandoned` -> `Removed`
    ///
    /// Re-entering the same state is allowed; every lifecycle operation is idempotent.
    pub fn can_transition_to(&self, target: &WorktreeState) -> bool {
        if self == target {
            return true;
        }

        matches!(
            (self, target),
            (WorktreeState::NotProvisioned, WorktreeState::Provisioned)
                | (WorktreeState::Provisioned, WorktreeState::Merged)
                | (WorktreeState::Provisioned, WorktreeState::Abandoned)
                | (WorktreeState::Provisioned, WorktreeState::Removed)
                | (WorktreeState::Merged, WorktreeState::Removed)
                | (WorktreeState::Abandoned, WorktreeState::Removed)
        )
    }

    /// Attempt to transition to a new state, returning an error if invalid
    pub fn try_transition(&self, new_state: WorktreeState) -> Result<WorktreeState> {
        if self.can_transition_to(&new_state) {
            Ok(new_state)
        } else {
            bail!("invalid worktree transition: {self} -> {new_state}")
        }
    }
}

impl Worktree {
    /// A worktree record for a checkout that may or may not exist on disk yet
    pub fn new(repository: String, path: PathBuf, branch: String) -> Self {
        let state = if path.exists() {
            WorktreeState::Provisioned
        } else {
            WorktreeState::NotProvisioned
        };
        Self {
            repository,
            path,
            branch,
            state,
        }
    }

    /// Move to `state`, rejecting transitions the lifecycle does not allow
    pub fn advance(&mut self, state: WorktreeState) -> Result<()> {
        self.state = self.state.try_transition(state)?;
        Ok(())
    }

    /// Returns true while the checkout is on disk
    pub fn is_live(&self) -> bool {
        matches!(
            self.state,
            WorktreeState::Provisioned | WorktreeState::Merged | WorktreeState::Abandoned
        )
    }

    /// Directory holding every worktree of a feature
    pub fn feature_dir(workspace_root: &Path, features_dir: &str, feature_id: &str) -> PathBuf {
        workspace_root.join(features_dir).join(feature_id)
    }
}
