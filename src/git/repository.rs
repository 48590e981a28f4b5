//! Repository handle: typed git operations against one repository path

use std::cell::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::error::{GitError, WorktreeCreateReason};
use super::parser::{self, DiffStat, Divergence, WorktreeInfo};
use super::runner::{combined_output, command_error, run_git, run_git_bool, run_git_checked, stderr_of};

/// Branch names tried, in order, when the remote does not name a trunk
pub const DEFAULT_BRANCH_CANDIDATES: [&str; 5] = ["main", "master", "staging", "develop", "dev"];

/// What HEAD points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    Branch(String),
    Detached,
}

/// Result of removing a worktree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// git removed the worktree
    Removed,
    /// Nothing was there to remove
    AlreadyGone,
}

/// Result of deleting a local branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    Deleted,
    AlreadyAbsent,
}

/// Result of a successful merge into the trunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Nothing to merge (branches are identical)
    AlreadyUpToDate,
    /// Trunk was fast-forwarded to the feature branch
    FastForward { target: String },
    /// A merge commit was created
    Merged { target: String, stats: DiffStat },
}

/// Version-control operations the worktree lifecycle is built on.
///
/// `Repository` is the production implementation; tests substitute fakes.
pub trait Vcs {
    /// Path of the repository this handle operates on
    fn path(&self) -> &Path;
    fn list_local_branches(&self) -> Result<Vec<String>, GitError>;
    fn current_branch(&self) -> Result<Head, GitError>;
    fn resolve_default_branch(&self) -> Result<String, GitError>;
    fn branch_exists(&self, name: &str) -> Result<bool, GitError>;
    fn create_branch_from(&self, new_branch: &str, source_branch: &str) -> Result<(), GitError>;
    fn add_worktree(&self, path: &Path, branch: &str) -> Result<(), GitError>;
    fn remove_worktree(&self, path: &Path, force: bool) -> Result<Removal, GitError>;
    fn delete_local_branch(&self, name: &str, force: bool) -> Result<Deletion, GitError>;
    fn merge_into(&self, source_branch: &str) -> Result<MergeOutcome, GitError>;
    fn divergence_from_remote(&self, branch: &str) -> Result<Divergence, GitError>;
    fn is_working_tree_clean(&self) -> Result<bool, GitError>;
    /// True when HEAD of the checkout at `worktree` resolves to a commit
    fn worktree_has_commits(&self, worktree: &Path) -> bool;
}

/// Handle on a single git repository.
///
/// Holds no state besides the path and the memoized trunk name, which lives
/// only as long as this value.
#[derive(Debug, Clone)]
pub struct Repository {
    root: PathBuf,
    default_branch: OnceCell<String>,
}

impl Repository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_branch: OnceCell::new(),
        }
    }

    /// True if the path is inside a git work tree
    pub fn is_repository(&self) -> bool {
        self.root.is_dir()
            && run_git_bool(&["rev-parse", "--is-inside-work-tree"], &self.root)
    }

    /// All worktrees registered with this repository, main checkout included
    pub fn list_worktrees(&self) -> Result<Vec<WorktreeInfo>, GitError> {
        let stdout = run_git_checked(&["worktree", "list", "--porcelain"], &self.root)?;
        Ok(parser::parse_worktree_list(&stdout))
    }

    /// Check if a path is a worktree registered with this repository
    pub fn is_registered_worktree(&self, path: &Path) -> Result<bool, GitError> {
        let worktrees = self.list_worktrees()?;

        // Canonicalize to see through symlinks and relative segments
        let wanted = path.canonicalize().ok();

        Ok(worktrees.iter().any(|wt| {
            match (&wanted, wt.path.canonicalize().ok()) {
                (Some(a), Some(b)) => *a == b,
                _ => wt.path == path,
            }
        }))
    }

    /// Drop stale worktree administrative entries
    pub fn prune_worktrees(&self) -> Result<(), GitError> {
        run_git_checked(&["worktree", "prune"], &self.root)?;
        Ok(())
    }

    /// Commits reachable from `branch` but not from `base`
    pub fn commits_ahead_of(&self, base: &str, branch: &str) -> Result<u32, GitError> {
        let range = format!("{base}..{branch}");
        let args = ["rev-list", "--count", range.as_str()];
        let stdout = run_git_checked(&args, &self.root)?;
        parser::parse_count(&stdout).ok_or_else(|| unparsable(&args, &self.root, &stdout))
    }

    /// Diff summary between the merge base of `base` and `branch`, and `branch`
    pub fn diff_stat(&self, base: &str, branch: &str) -> Result<DiffStat, GitError> {
        let range = format!("{base}...{branch}");
        let stdout = run_git_checked(&["diff", "--shortstat", range.as_str()], &self.root)?;
        Ok(parser::parse_shortstat(&stdout))
    }

    /// Local branches whose name starts with `prefix`, case-insensitively
    pub fn branches_with_prefix(&self, prefix: &str) -> Result<Vec<String>, GitError> {
        let prefix = prefix.to_lowercase();
        Ok(self
            .list_local_branches()?
            .into_iter()
            .filter(|b| b.to_lowercase().starts_with(&prefix))
            .collect())
    }

    fn checkout(&self, branch: &str) -> Result<(), GitError> {
        run_git_checked(&["checkout", branch], &self.root)?;
        Ok(())
    }

    fn conflicting_files(&self) -> Vec<String> {
        run_git_checked(&["diff", "--name-only", "--diff-filter=U"], &self.root)
            .map(|out| parser::parse_name_list(&out))
            .unwrap_or_default()
    }

    fn abort_merge(&self) {
        if let Err(e) = run_git_checked(&["merge", "--abort"], &self.root) {
            debug!(error = %e, "merge --abort failed");
        }
    }

    fn upstream_of(&self, branch: &str) -> Option<String> {
        let spec = format!("{branch}@{{upstream}}");
        run_git_checked(
            &["rev-parse", "--abbrev-ref", "--symbolic-full-name", spec.as_str()],
            &self.root,
        )
        .ok()
        .filter(|s| !s.is_empty())
    }

    fn remote_default_branch(&self) -> Option<String> {
        let remotes = run_git_checked(&["remote"], &self.root)
            .map(|out| parser::parse_remotes(&out))
            .unwrap_or_default();

        let remote = remotes
            .iter()
            .find(|r| r.as_str() == "origin")
            .or_else(|| remotes.first())?;

        let head_ref = format!("refs/remotes/{remote}/HEAD");
        let stdout = run_git_checked(&["symbolic-ref", head_ref.as_str()], &self.root).ok()?;
        parser::parse_remote_head(&stdout, remote)
    }
}

impl Vcs for Repository {
    fn path(&self) -> &Path {
        &self.root
    }

    fn list_local_branches(&self) -> Result<Vec<String>, GitError> {
        let stdout = run_git_checked(&["branch", "--list", "--no-color"], &self.root)?;
        Ok(parser::parse_branch_names(&stdout))
    }

    fn current_branch(&self) -> Result<Head, GitError> {
        // symbolic-ref works on an unborn branch and exits 1, silently, when detached
        let args = ["symbolic-ref", "--short", "-q", "HEAD"];
        let output = run_git(&args, &self.root)?;
        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Ok(parser::parse_head_ref(&stdout).map_or(Head::Detached, Head::Branch));
        }
        if output.status.code() == Some(1) && output.stderr.is_empty() {
            return Ok(Head::Detached);
        }
        Err(command_error(&args, &self.root, &output))
    }

    fn resolve_default_branch(&self) -> Result<String, GitError> {
        if let Some(branch) = self.default_branch.get() {
            return Ok(branch.clone());
        }

        let resolved = match self.remote_default_branch() {
            Some(branch) => branch,
            None => {
                let local = self.list_local_branches()?;
                let preferred = DEFAULT_BRANCH_CANDIDATES
                    .iter()
                    .find(|candidate| local.iter().any(|b| b == *candidate));
                match preferred {
                    Some(name) => name.to_string(),
                    None => match self.current_branch()? {
                        Head::Branch(name) => name,
                        Head::Detached => {
                            return Err(GitError::Command {
                                repo: self.root.clone(),
                                args: "symbolic-ref HEAD".to_string(),
                                stderr: "could not determine default branch: HEAD is detached \
                                         and no conventional trunk exists"
                                    .to_string(),
                            })
                        }
                    },
                }
            }
        };

        debug!(repo = %self.root.display(), branch = %resolved, "resolved default branch");
        Ok(self.default_branch.get_or_init(|| resolved).clone())
    }

    fn branch_exists(&self, name: &str) -> Result<bool, GitError> {
        let ref_path = format!("refs/heads/{name}");
        let output = run_git(&["rev-parse", "--verify", "--quiet", ref_path.as_str()], &self.root)?;
        Ok(output.status.success())
    }

    fn create_branch_from(&self, new_branch: &str, source_branch: &str) -> Result<(), GitError> {
        let create_error = |reason: String| GitError::BranchCreate {
            branch: new_branch.to_string(),
            source_branch: source_branch.to_string(),
            reason,
        };

        if self.branch_exists(new_branch)? {
            return Err(create_error("branch already exists".to_string()));
        }

        // `git branch` creates without checking out, so the working copy stays put
        let output = run_git(&["branch", new_branch, source_branch], &self.root)?;
        if !output.status.success() {
            return Err(create_error(stderr_of(&output)));
        }

        info!(repo = %self.root.display(), "created branch {new_branch} from {source_branch}");
        Ok(())
    }

    fn add_worktree(&self, path: &Path, branch: &str) -> Result<(), GitError> {
        let create_error = |reason: WorktreeCreateReason| GitError::WorktreeCreate {
            path: path.to_path_buf(),
            branch: branch.to_string(),
            reason,
        };

        if path.exists() {
            return Err(create_error(WorktreeCreateReason::PathOccupied));
        }
        if !self.branch_exists(branch)? {
            return Err(create_error(WorktreeCreateReason::BranchMissing));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| create_error(WorktreeCreateReason::Rejected(e.to_string())))?;
        }

        let path_str = path.to_string_lossy();
        let output = run_git(&["worktree", "add", path_str.as_ref(), branch], &self.root)?;
        if !output.status.success() {
            let stderr = stderr_of(&output);
            let reason = if stderr.contains("already exists") && path.exists() {
                WorktreeCreateReason::PathOccupied
            } else {
                WorktreeCreateReason::Rejected(stderr)
            };
            return Err(create_error(reason));
        }

        info!(repo = %self.root.display(), "added worktree {} on {branch}", path.display());
        Ok(())
    }

    fn remove_worktree(&self, path: &Path, force: bool) -> Result<Removal, GitError> {
        if !path.exists() {
            debug!("worktree {} already gone", path.display());
            return Ok(Removal::AlreadyGone);
        }

        if !self.is_registered_worktree(path)? {
            return Err(GitError::WorktreeRemove {
                path: path.to_path_buf(),
                reason: format!(
                    "not a registered worktree of {}",
                    self.root.display()
                ),
            });
        }

        let path_str = path.to_string_lossy();
        let mut args = vec!["worktree", "remove"];
        if force {
            args.push("--force");
        }
        args.push(path_str.as_ref());

        let output = run_git(&args, &self.root)?;
        if !output.status.success() {
            let stderr = stderr_of(&output);
            if parser::is_not_a_worktree(&stderr) {
                debug!("worktree {} vanished during removal", path.display());
                return Ok(Removal::AlreadyGone);
            }
            return Err(GitError::WorktreeRemove {
                path: path.to_path_buf(),
                reason: stderr,
            });
        }

        info!(repo = %self.root.display(), "removed worktree {}", path.display());
        Ok(Removal::Removed)
    }

    fn delete_local_branch(&self, name: &str, force: bool) -> Result<Deletion, GitError> {
        if !self.branch_exists(name)? {
            debug!("branch {name} already absent");
            return Ok(Deletion::AlreadyAbsent);
        }

        let flag = if force { "-D" } else { "-d" };
        let output = run_git(&["branch", flag, name], &self.root)?;
        if !output.status.success() {
            return Err(GitError::BranchDelete {
                branch: name.to_string(),
                reason: stderr_of(&output),
            });
        }

        info!(repo = %self.root.display(), "deleted branch {name}");
        Ok(Deletion::Deleted)
    }

    fn merge_into(&self, source_branch: &str) -> Result<MergeOutcome, GitError> {
        let target = self.resolve_default_branch()?;
        let merge_error = |reason: String| GitError::Merge {
            branch: source_branch.to_string(),
            target: target.clone(),
            reason,
        };

        if !self.branch_exists(source_branch)? {
            return Err(merge_error("branch does not exist".to_string()));
        }

        self.checkout(&target).map_err(|e| merge_error(e.to_string()))?;

        let output = run_git(&["merge", "--no-edit", source_branch], &self.root)?;
        let text = combined_output(&output);

        if output.status.success() {
            if parser::merge_already_up_to_date(&text) {
                return Ok(MergeOutcome::AlreadyUpToDate);
            }
            info!(repo = %self.root.display(), "merged {source_branch} into {target}");
            if text.contains("Fast-forward") {
                return Ok(MergeOutcome::FastForward { target });
            }
            return Ok(MergeOutcome::Merged {
                stats: parser::parse_shortstat(&text),
                target,
            });
        }

        if parser::merge_reports_conflict(&text) {
            let files = self.conflicting_files();
            // Leave the trunk as it was; resolution is a human job
            self.abort_merge();
            return Err(GitError::MergeConflict {
                branch: source_branch.to_string(),
                target,
                files,
            });
        }

        Err(merge_error(stderr_of(&output)))
    }

    fn divergence_from_remote(&self, branch: &str) -> Result<Divergence, GitError> {
        let Some(upstream) = self.upstream_of(branch) else {
            return Ok(Divergence::default());
        };

        let range = format!("{branch}...{upstream}");
        let args = ["rev-list", "--left-right", "--count", range.as_str()];
        let stdout = run_git_checked(&args, &self.root)?;
        parser::parse_left_right_count(&stdout).ok_or_else(|| unparsable(&args, &self.root, &stdout))
    }

    fn is_working_tree_clean(&self) -> Result<bool, GitError> {
        let stdout = run_git_checked(&["status", "--porcelain"], &self.root)?;
        Ok(stdout.is_empty())
    }

    fn worktree_has_commits(&self, worktree: &Path) -> bool {
        run_git_bool(&["rev-parse", "--verify", "--quiet", "HEAD"], worktree)
    }
}

fn unparsable(args: &[&str], repo_root: &Path, stdout: &str) -> GitError {
    GitError::Command {
        repo: repo_root.to_path_buf(),
        args: args.join(" "),
        stderr: format!("unparsable output: {stdout:?}"),
    }
}
