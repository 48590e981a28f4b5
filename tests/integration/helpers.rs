//! Shared helpers for integration tests that drive real git repositories

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Run git in `dir`, panicking on failure
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Initialize a repository at `repo_root` with one commit on `main`
pub fn init_repo_at(repo_root: &Path) {
    fs::create_dir_all(repo_root).expect("Failed to create repository directory");
    git(repo_root, &["init"]);
    git(repo_root, &["config", "user.email", "test@test.com"]);
    git(repo_root, &["config", "user.name", "Test User"]);
    git(repo_root, &["config", "commit.gpgsign", "false"]);

    fs::write(repo_root.join("README.md"), "# Test Repository\n")
        .expect("Failed to write README.md");
    git(repo_root, &["add", "."]);
    git(repo_root, &["commit", "-m", "Initial commit"]);
    git(repo_root, &["branch", "-M", "main"]);
}

/// Test helper: Create a temporary git repository with initial commit
pub fn init_test_repo() -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    init_repo_at(temp_dir.path());
    temp_dir
}

/// Commit `content` to `filename` on whatever `dir` has checked out
pub fn commit_file(dir: &Path, filename: &str, content: &str) {
    fs::write(dir.join(filename), content).expect("Failed to write file");
    git(dir, &["add", filename]);
    git(dir, &["commit", "-m", &format!("Add {filename}")]);
}

/// Test helper: Create a branch with a commit adding a file, then return to main
pub fn create_branch_with_file(name: &str, filename: &str, content: &str, repo_root: &Path) {
    git(repo_root, &["checkout", "-b", name]);
    commit_file(repo_root, filename, content);
    git(repo_root, &["checkout", "main"]);
}

/// Lay out a workspace with repositories under `services/`
pub fn init_workspace(repositories: &[&str]) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    for name in repositories {
        init_repo_at(&temp_dir.path().join("services").join(name));
    }
    temp_dir
}
