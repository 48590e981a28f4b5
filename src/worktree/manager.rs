//! Feature worktree lifecycle over one repository
//!
//! Every operation here is safe to repeat: provisioning an existing
//! worktree, removing a missing one, or deleting an absent branch all report
//! the no-op instead of failing.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::git::{Deletion, GitError, Head, MergeOutcome, Removal, Repository, Vcs};
use crate::models::Status;

/// Knobs for the lifecycle operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeOptions {
    /// Remove worktrees even with uncommitted changes
    pub force_remove: bool,
    /// Delete branches even if git considers them unmerged
    pub force_branch_delete: bool,
}

impl Default for WorktreeOptions {
    fn default() -> Self {
        Self {
            force_remove: false,
            force_branch_delete: true,
        }
    }
}

/// Outcome of provisioning a worktree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provisioned {
    /// Something was already at the target path; nothing was touched
    Existing { path: PathBuf },
    /// A fresh worktree was added
    Created {
        path: PathBuf,
        branch: String,
        source_branch: String,
        /// False when the feature branch already existed
        branch_created: bool,
        /// Set when the source branch is behind its upstream
        advisory: Option<String>,
    },
}

impl Provisioned {
    pub fn path(&self) -> &Path {
        match self {
            Provisioned::Existing { path } | Provisioned::Created { path, .. } => path,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Provisioned::Created { .. })
    }
}

/// Creates, merges and tears down feature worktrees for one repository
#[derive(Debug)]
pub struct WorktreeManager<V: Vcs = Repository> {
    vcs: V,
    options: WorktreeOptions,
}

impl WorktreeManager<Repository> {
    /// Manager over the repository at `path` with default options
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(Repository::new(path))
    }
}

impl<V: Vcs> WorktreeManager<V> {
    pub fn new(vcs: V) -> Self {
        Self::with_options(vcs, WorktreeOptions::default())
    }

    pub fn with_options(vcs: V, options: WorktreeOptions) -> Self {
        Self { vcs, options }
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    pub fn options(&self) -> &WorktreeOptions {
        &self.options
    }

    /// Ensure a worktree on `feature/<feature_id>` exists at `target_dir/repository_name`
    pub fn provision(
        &self,
        feature_id: &str,
        repository_name: &str,
        target_dir: &Path,
    ) -> Result<Provisioned, GitError> {
        self.provision_branch(&format!("feature/{feature_id}"), repository_name, target_dir)
    }

    /// Ensure a worktree on `branch` exists at `target_dir/repository_name`.
    ///
    /// The branch is cut from whatever the repository currently has checked
    /// out (the trunk when HEAD is detached) and reused if it already exists.
    pub fn provision_branch(
        &self,
        branch: &str,
        repository_name: &str,
        target_dir: &Path,
    ) -> Result<Provisioned, GitError> {
        let path = target_dir.join(repository_name);
        if path.exists() {
            debug!("worktree {} already present", path.display());
            return Ok(Provisioned::Existing { path });
        }

        let source_branch = match self.vcs.current_branch()? {
            Head::Branch(name) => name,
            Head::Detached => self.vcs.resolve_default_branch()?,
        };

        let advisory = match self.vcs.divergence_from_remote(&source_branch) {
            Ok(divergence) if divergence.behind > 0 => Some(format!(
                "{source_branch} is {} commit(s) behind its upstream; consider pulling first",
                divergence.behind
            )),
            Ok(_) => None,
            Err(e) => {
                warn!(repo = repository_name, error = %e, "could not compare {source_branch} with its upstream");
                None
            }
        };

        let branch_created = if self.vcs.branch_exists(branch)? {
            debug!("reusing existing branch {branch}");
            false
        } else {
            self.vcs.create_branch_from(branch, &source_branch)?;
            true
        };

        match self.vcs.add_worktree(&path, branch) {
            Ok(()) => {}
            Err(e) if e.is_path_occupied() => {
                debug!("worktree {} appeared concurrently", path.display());
                return Ok(Provisioned::Existing { path });
            }
            Err(e) => return Err(e),
        }

        info!(repo = repository_name, branch, "provisioned {}", path.display());
        Ok(Provisioned::Created {
            path,
            branch: branch.to_string(),
            source_branch,
            branch_created,
            advisory,
        })
    }

    /// Remove a worktree; a missing one is already decommissioned
    pub fn decommission(&self, path: &Path) -> Result<Removal, GitError> {
        self.vcs.remove_worktree(path, self.options.force_remove)
    }

    /// Merge a feature branch into the repository's trunk
    pub fn absorb(&self, feature_branch: &str) -> Result<MergeOutcome, GitError> {
        self.vcs.merge_into(feature_branch)
    }

    /// Delete a feature branch; an absent one is already retired
    pub fn retire_branch(&self, feature_branch: &str) -> Result<Deletion, GitError> {
        self.vcs
            .delete_local_branch(feature_branch, self.options.force_branch_delete)
    }

    /// Best-effort status of a worktree from what is on disk.
    ///
    /// Never reports `Completed`; that only comes from an explicit update.
    pub fn inspect(&self, path: &Path) -> Status {
        if !path.exists() {
            return Status::Pending;
        }
        if self.vcs.worktree_has_commits(path) {
            Status::InProgress
        } else {
            Status::Pending
        }
    }
}
