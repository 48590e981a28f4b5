//! Worktree lifecycle (provision, inspect, teardown) on real repositories

use serial_test::serial;
use tempfile::TempDir;
use weft::git::{Deletion, Head, MergeOutcome, Removal, Repository, Vcs};
use weft::models::{ProjectStatus, Status, WorktreeState};
use weft::worktree::{teardown, Provisioned, TeardownPlan, WorktreeManager, WorktreeOptions};

use super::helpers::{commit_file, git, init_test_repo};

fn project(name: &str, branch: &str) -> ProjectStatus {
    ProjectStatus::new(name, branch, format!("features/feat-001/{name}"))
}

#[test]
#[serial]
fn test_provision_is_idempotent() {
    let repo_dir = init_test_repo();
    let workspace = TempDir::new().unwrap();
    let target = workspace.path().join("features/feat-001");
    let manager = WorktreeManager::open(repo_dir.path());

    let first = manager.provision("feat-001", "api", &target).unwrap();
    match &first {
        Provisioned::Created {
            path,
            branch,
            source_branch,
            branch_created,
            advisory,
        } => {
            assert_eq!(path, &target.join("api"));
            assert_eq!(branch, "feature/feat-001");
            assert_eq!(source_branch, "main");
            assert!(branch_created);
            assert!(advisory.is_none());
        }
        other => panic!("expected a new worktree, got {other:?}"),
    }
    assert!(target.join("api/README.md").exists());

    let second = manager.provision("feat-001", "api", &target).unwrap();
    assert_eq!(
        second,
        Provisioned::Existing {
            path: target.join("api")
        }
    );
    assert_eq!(manager.vcs().list_worktrees().unwrap().len(), 2);
}

#[test]
#[serial]
fn test_provision_reuses_existing_branch() {
    let repo_dir = init_test_repo();
    let workspace = TempDir::new().unwrap();
    let target = workspace.path().join("features/feat-001");
    let manager = WorktreeManager::open(repo_dir.path());

    git(repo_dir.path(), &["branch", "feature/feat-001"]);

    match manager.provision("feat-001", "api", &target).unwrap() {
        Provisioned::Created { branch_created, .. } => assert!(!branch_created),
        other => panic!("expected a new worktree, got {other:?}"),
    }
}

#[test]
#[serial]
fn test_provision_from_detached_head_uses_trunk() {
    let repo_dir = init_test_repo();
    let workspace = TempDir::new().unwrap();
    let target = workspace.path().join("features/feat-001");
    git(repo_dir.path(), &["checkout", "--detach"]);

    let manager = WorktreeManager::open(repo_dir.path());
    match manager.provision("feat-001", "api", &target).unwrap() {
        Provisioned::Created { source_branch, .. } => assert_eq!(source_branch, "main"),
        other => panic!("expected a new worktree, got {other:?}"),
    }
    assert_eq!(manager.vcs().current_branch().unwrap(), Head::Detached);
}

#[test]
#[serial]
fn test_inspect_reports_in_progress_for_live_worktree() {
    let repo_dir = init_test_repo();
    let workspace = TempDir::new().unwrap();
    let target = workspace.path().join("features/feat-001");
    let manager = WorktreeManager::open(repo_dir.path());

    assert_eq!(manager.inspect(&target.join("api")), Status::Pending);
    manager.provision("feat-001", "api", &target).unwrap();
    assert_eq!(manager.inspect(&target.join("api")), Status::InProgress);
}

#[test]
#[serial]
fn test_full_teardown_merges_removes_and_deletes() {
    let repo_dir = init_test_repo();
    let workspace = TempDir::new().unwrap();
    let target = workspace.path().join("features/feat-001");
    let manager = WorktreeManager::open(repo_dir.path());

    let provisioned = manager.provision("feat-001", "api", &target).unwrap();
    commit_file(provisioned.path(), "endpoint.txt", "GET /health\n");

    let report = teardown(
        &manager,
        &project("api", "feature/feat-001"),
        provisioned.path(),
        TeardownPlan::Full,
    );

    assert!(report.is_clean(), "warnings: {:?}", report.warnings);
    assert_eq!(
        report.merge,
        Some(MergeOutcome::FastForward {
            target: "main".to_string()
        })
    );
    assert_eq!(report.removal, Some(Removal::Removed));
    assert_eq!(report.deletion, Some(Deletion::Deleted));
    assert_eq!(report.state, WorktreeState::Removed);

    assert!(!provisioned.path().exists());
    assert!(repo_dir.path().join("endpoint.txt").exists());
    assert!(!manager.vcs().branch_exists("feature/feat-001").unwrap());
}

#[test]
#[serial]
fn test_remove_worktrees_keeps_branch_and_repeats_cleanly() {
    let repo_dir = init_test_repo();
    let workspace = TempDir::new().unwrap();
    let target = workspace.path().join("features/feat-001");
    let manager = WorktreeManager::open(repo_dir.path());
    let provisioned = manager.provision("feat-001", "api", &target).unwrap();
    let api = project("api", "feature/feat-001");

    let report = teardown(&manager, &api, provisioned.path(), TeardownPlan::RemoveWorktrees);
    assert!(report.is_clean());
    assert_eq!(report.merge, None);
    assert_eq!(report.removal, Some(Removal::Removed));
    assert_eq!(report.deletion, None);
    assert!(manager.vcs().branch_exists("feature/feat-001").unwrap());

    let again = teardown(&manager, &api, provisioned.path(), TeardownPlan::RemoveWorktrees);
    assert!(again.is_clean());
    assert_eq!(again.removal, Some(Removal::AlreadyGone));
    assert_eq!(again.state, WorktreeState::NotProvisioned);
}

#[test]
#[serial]
fn test_conflicting_merge_keeps_branch() {
    let repo_dir = init_test_repo();
    let workspace = TempDir::new().unwrap();
    let target = workspace.path().join("features/feat-001");
    let manager = WorktreeManager::open(repo_dir.path());

    let provisioned = manager.provision("feat-001", "api", &target).unwrap();
    commit_file(provisioned.path(), "shared.txt", "feature side\n");
    commit_file(repo_dir.path(), "shared.txt", "trunk side\n");

    let report = teardown(
        &manager,
        &project("api", "feature/feat-001"),
        provisioned.path(),
        TeardownPlan::Full,
    );

    assert!(!report.is_clean());
    assert_eq!(report.merge, None);
    assert_eq!(report.removal, Some(Removal::Removed));
    assert_eq!(report.deletion, None);
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("kept branch feature/feat-001")));

    assert!(manager.vcs().branch_exists("feature/feat-001").unwrap());
    assert!(manager.vcs().is_working_tree_clean().unwrap());
}

#[test]
#[serial]
fn test_dirty_worktree_survives_unforced_removal() {
    let repo_dir = init_test_repo();
    let workspace = TempDir::new().unwrap();
    let target = workspace.path().join("features/feat-001");
    let manager = WorktreeManager::open(repo_dir.path());
    let provisioned = manager.provision("feat-001", "api", &target).unwrap();
    let api = project("api", "feature/feat-001");

    std::fs::write(provisioned.path().join("wip.txt"), "half done\n").unwrap();
    std::fs::write(provisioned.path().join("README.md"), "# Edited\n").unwrap();

    let report = teardown(&manager, &api, provisioned.path(), TeardownPlan::Full);
    assert!(report.worktree_survived());
    assert_eq!(report.deletion, None);
    assert!(report.warnings.iter().any(|w| w.contains("removing")));
    assert!(provisioned.path().join("wip.txt").exists());
    assert!(manager.vcs().branch_exists("feature/feat-001").unwrap());

    let forced = WorktreeManager::with_options(
        Repository::new(repo_dir.path()),
        WorktreeOptions {
            force_remove: true,
            ..WorktreeOptions::default()
        },
    );
    let report = teardown(&forced, &api, provisioned.path(), TeardownPlan::RemoveWorktrees);
    assert_eq!(report.removal, Some(Removal::Removed));
    assert!(!provisioned.path().exists());
}
