//! Repository handle against real git repositories

use std::fs;

use serial_test::serial;
use tempfile::TempDir;
use weft::error::ErrorKind;
use weft::git::{Deletion, Divergence, GitError, Head, MergeOutcome, Removal, Repository, Vcs};

use super::helpers::{commit_file, create_branch_with_file, git, init_test_repo};

#[test]
#[serial]
fn test_default_branch_without_remote() {
    let repo_dir = init_test_repo();
    let repo = Repository::new(repo_dir.path());

    assert!(repo.is_repository());
    assert_eq!(repo.resolve_default_branch().unwrap(), "main");
    assert_eq!(repo.current_branch().unwrap(), Head::Branch("main".to_string()));
}

#[test]
#[serial]
fn test_default_branch_prefers_conventional_trunk() {
    let repo_dir = init_test_repo();
    git(repo_dir.path(), &["checkout", "-b", "topic"]);

    // On "topic", but "main" exists and wins
    let repo = Repository::new(repo_dir.path());
    assert_eq!(repo.resolve_default_branch().unwrap(), "main");
}

#[test]
#[serial]
fn test_default_branch_follows_remote_head() {
    let origin = init_test_repo();
    git(origin.path(), &["branch", "trunk"]);
    git(origin.path(), &["symbolic-ref", "HEAD", "refs/heads/trunk"]);

    let clone_parent = TempDir::new().unwrap();
    let clone_path = clone_parent.path().join("clone");
    git(
        clone_parent.path(),
        &["clone", &origin.path().to_string_lossy(), "clone"],
    );
    // A local "main" would win the fallback list; the remote HEAD comes first
    git(&clone_path, &["branch", "main", "origin/main"]);

    let clone = Repository::new(&clone_path);
    assert_eq!(clone.resolve_default_branch().unwrap(), "trunk");
}

#[test]
#[serial]
fn test_default_branch_is_cached_per_handle() {
    let repo_dir = init_test_repo();
    let repo = Repository::new(repo_dir.path());
    assert_eq!(repo.resolve_default_branch().unwrap(), "main");

    git(repo_dir.path(), &["branch", "-m", "main", "master"]);

    assert_eq!(repo.resolve_default_branch().unwrap(), "main");
    let fresh = Repository::new(repo_dir.path());
    assert_eq!(fresh.resolve_default_branch().unwrap(), "master");
}

#[test]
#[serial]
fn test_detached_head() {
    let repo_dir = init_test_repo();
    git(repo_dir.path(), &["checkout", "--detach"]);

    let repo = Repository::new(repo_dir.path());
    assert_eq!(repo.current_branch().unwrap(), Head::Detached);
}

#[test]
#[serial]
fn test_create_branch_from() {
    let repo_dir = init_test_repo();
    let repo = Repository::new(repo_dir.path());

    assert!(!repo.branch_exists("feature/feat-001").unwrap());
    repo.create_branch_from("feature/feat-001", "main").unwrap();
    assert!(repo.branch_exists("feature/feat-001").unwrap());

    // Working copy stays on main
    assert_eq!(repo.current_branch().unwrap(), Head::Branch("main".to_string()));

    let err = repo.create_branch_from("feature/feat-001", "main").unwrap_err();
    assert!(matches!(err, GitError::BranchCreate { .. }));

    let err = repo.create_branch_from("feature/feat-002", "no-such-branch").unwrap_err();
    assert!(matches!(err, GitError::BranchCreate { .. }));
}

#[test]
#[serial]
fn test_worktree_add_and_remove() {
    let repo_dir = init_test_repo();
    let scratch = TempDir::new().unwrap();
    let repo = Repository::new(repo_dir.path());
    let path = scratch.path().join("features/feat-001/api");

    repo.create_branch_from("feature/feat-001", "main").unwrap();
    repo.add_worktree(&path, "feature/feat-001").unwrap();

    assert!(path.join("README.md").exists());
    assert!(repo.is_registered_worktree(&path).unwrap());
    let worktrees = repo.list_worktrees().unwrap();
    assert_eq!(worktrees.len(), 2);
    assert!(worktrees
        .iter()
        .any(|wt| wt.branch.as_deref() == Some("feature/feat-001")));

    assert_eq!(repo.remove_worktree(&path, true).unwrap(), Removal::Removed);
    assert!(!path.exists());
    assert_eq!(repo.remove_worktree(&path, true).unwrap(), Removal::AlreadyGone);
}

#[test]
#[serial]
fn test_add_worktree_refuses_occupied_path() {
    let repo_dir = init_test_repo();
    let scratch = TempDir::new().unwrap();
    let repo = Repository::new(repo_dir.path());
    let path = scratch.path().join("api");
    fs::create_dir_all(&path).unwrap();

    repo.create_branch_from("feature/feat-001", "main").unwrap();
    let err = repo.add_worktree(&path, "feature/feat-001").unwrap_err();
    assert!(err.is_path_occupied());
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
}

#[test]
#[serial]
fn test_add_worktree_requires_branch() {
    let repo_dir = init_test_repo();
    let scratch = TempDir::new().unwrap();
    let repo = Repository::new(repo_dir.path());

    let err = repo
        .add_worktree(&scratch.path().join("api"), "feature/missing")
        .unwrap_err();
    assert!(!err.is_path_occupied());
    assert!(err.to_string().contains("branch does not exist"));
}

#[test]
#[serial]
fn test_remove_unregistered_directory_fails() {
    let repo_dir = init_test_repo();
    let scratch = TempDir::new().unwrap();
    let repo = Repository::new(repo_dir.path());
    let stray = scratch.path().join("stray");
    fs::create_dir_all(&stray).unwrap();

    let err = repo.remove_worktree(&stray, true).unwrap_err();
    assert!(matches!(err, GitError::WorktreeRemove { .. }));
    assert!(stray.exists());
}

#[test]
#[serial]
fn test_delete_local_branch() {
    let repo_dir = init_test_repo();
    let repo = Repository::new(repo_dir.path());
    create_branch_with_file("feature/unmerged", "a.txt", "a\n", repo_dir.path());

    // Unmerged work needs force
    let err = repo.delete_local_branch("feature/unmerged", false).unwrap_err();
    assert!(matches!(err, GitError::BranchDelete { .. }));

    assert_eq!(
        repo.delete_local_branch("feature/unmerged", true).unwrap(),
        Deletion::Deleted
    );
    assert_eq!(
        repo.delete_local_branch("feature/unmerged", true).unwrap(),
        Deletion::AlreadyAbsent
    );
}

#[test]
#[serial]
fn test_merge_fast_forward() {
    let repo_dir = init_test_repo();
    let repo = Repository::new(repo_dir.path());
    create_branch_with_file("feature/feat-001", "api.txt", "endpoint\n", repo_dir.path());

    let outcome = repo.merge_into("feature/feat-001").unwrap();
    assert_eq!(
        outcome,
        MergeOutcome::FastForward {
            target: "main".to_string()
        }
    );
    assert!(repo_dir.path().join("api.txt").exists());

    assert_eq!(
        repo.merge_into("feature/feat-001").unwrap(),
        MergeOutcome::AlreadyUpToDate
    );
}

#[test]
#[serial]
fn test_merge_creates_merge_commit() {
    let repo_dir = init_test_repo();
    let repo = Repository::new(repo_dir.path());
    create_branch_with_file("feature/feat-001", "api.txt", "endpoint\n", repo_dir.path());
    commit_file(repo_dir.path(), "other.txt", "trunk moved on\n");

    match repo.merge_into("feature/feat-001").unwrap() {
        MergeOutcome::Merged { target, stats } => {
            assert_eq!(target, "main");
            assert_eq!(stats.files_changed, 1);
            assert_eq!(stats.insertions, 1);
        }
        other => panic!("expected a merge commit, got {other:?}"),
    }
}

#[test]
#[serial]
fn test_merge_conflict_leaves_trunk_clean() {
    let repo_dir = init_test_repo();
    let repo = Repository::new(repo_dir.path());
    create_branch_with_file("feature/feat-001", "shared.txt", "feature side\n", repo_dir.path());
    commit_file(repo_dir.path(), "shared.txt", "trunk side\n");

    let err = repo.merge_into("feature/feat-001").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MergeConflict);
    match err {
        GitError::MergeConflict { files, target, .. } => {
            assert_eq!(target, "main");
            assert_eq!(files, vec!["shared.txt".to_string()]);
        }
        other => panic!("expected a merge conflict, got {other:?}"),
    }

    assert!(repo.is_working_tree_clean().unwrap());
    assert_eq!(repo.current_branch().unwrap(), Head::Branch("main".to_string()));
    assert_eq!(
        fs::read_to_string(repo_dir.path().join("shared.txt")).unwrap(),
        "trunk side\n"
    );
}

#[test]
#[serial]
fn test_merge_missing_branch() {
    let repo_dir = init_test_repo();
    let repo = Repository::new(repo_dir.path());

    let err = repo.merge_into("feature/nope").unwrap_err();
    assert!(matches!(err, GitError::Merge { .. }));
}

#[test]
#[serial]
fn test_divergence_without_upstream() {
    let repo_dir = init_test_repo();
    let repo = Repository::new(repo_dir.path());

    assert_eq!(repo.divergence_from_remote("main").unwrap(), Divergence::default());
}

#[test]
#[serial]
fn test_divergence_behind_upstream() {
    let origin = init_test_repo();
    let clone_parent = TempDir::new().unwrap();
    let clone_path = clone_parent.path().join("clone");
    git(
        clone_parent.path(),
        &["clone", &origin.path().to_string_lossy(), "clone"],
    );

    commit_file(origin.path(), "upstream.txt", "new\n");
    git(&clone_path, &["fetch"]);

    let clone = Repository::new(&clone_path);
    assert_eq!(
        clone.divergence_from_remote("main").unwrap(),
        Divergence { ahead: 0, behind: 1 }
    );
    assert_eq!(clone.resolve_default_branch().unwrap(), "main");
}

#[test]
#[serial]
fn test_commits_ahead_and_diff_stat() {
    let repo_dir = init_test_repo();
    let repo = Repository::new(repo_dir.path());

    git(repo_dir.path(), &["checkout", "-b", "feature/feat-001"]);
    commit_file(repo_dir.path(), "a.txt", "one\ntwo\n");
    commit_file(repo_dir.path(), "b.txt", "three\n");
    git(repo_dir.path(), &["checkout", "main"]);

    assert_eq!(repo.commits_ahead_of("main", "feature/feat-001").unwrap(), 2);
    let stat = repo.diff_stat("main", "feature/feat-001").unwrap();
    assert_eq!(stat.files_changed, 2);
    assert_eq!(stat.insertions, 3);
    assert_eq!(stat.deletions, 0);

    assert_eq!(repo.commits_ahead_of("main", "main").unwrap(), 0);
}

#[test]
#[serial]
fn test_branches_with_prefix_ignores_case() {
    let repo_dir = init_test_repo();
    let repo = Repository::new(repo_dir.path());
    repo.create_branch_from("feature/feat-001", "main").unwrap();
    repo.create_branch_from("Feature/Legacy", "main").unwrap();
    repo.create_branch_from("featured", "main").unwrap();

    let mut branches = repo.branches_with_prefix("feature/").unwrap();
    branches.sort();
    assert_eq!(branches, vec!["Feature/Legacy", "feature/feat-001"]);
}
