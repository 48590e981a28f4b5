//! Whole-workspace flows: init, create, update, plan, complete and cleanup

use std::fs;
use std::path::Path;

use serial_test::serial;
use weft::commands::common::Workspace;
use weft::commands::{feature, init};
use weft::git::{Repository, Vcs};
use weft::models::Status;
use weft::plan::{build_execution_plan, SchedulePolicy};
use weft::worktree::TeardownPlan;

use super::helpers::{commit_file, git, init_workspace};

fn open(root: &Path) -> Workspace {
    Workspace::open(Some(root)).unwrap()
}

#[test]
#[serial]
fn test_init_discovers_repositories() {
    let dir = init_workspace(&["api", "web", "auth"]);
    init::execute(Some(dir.path())).unwrap();

    let workspace = open(dir.path());
    let document = workspace.store.load().unwrap();
    assert_eq!(
        workspace.store.available_projects().unwrap(),
        vec!["api", "auth", "web"]
    );
    assert_eq!(document.project_locations["api"], "services/api");
    assert!(document.features.is_empty());

    // A second init refuses to clobber the document
    assert!(init::execute(Some(dir.path())).is_err());
}

#[test]
#[serial]
fn test_create_provisions_worktrees() {
    let dir = init_workspace(&["api", "web"]);
    init::execute(Some(dir.path())).unwrap();

    let repos = vec!["api".to_string(), "web".to_string()];
    feature::create::execute(Some(dir.path()), "Login flow", &repos, false).unwrap();

    let workspace = open(dir.path());
    let created = workspace.feature("feat-001").unwrap();
    assert_eq!(created.name, "Login flow");
    assert_eq!(created.repository_names().collect::<Vec<_>>(), vec!["api", "web"]);

    for project in &created.projects {
        assert_eq!(project.status, Status::Pending);
        assert_eq!(project.branch, "feature/feat-001");
        let path = workspace.store.worktree_path(project);
        assert!(path.join("README.md").exists(), "missing {}", path.display());
    }

    // Re-provisioning is a no-op
    feature::create::provision(Some(dir.path()), "feat-001").unwrap();

    // Unknown repositories are rejected before anything is written
    let err = feature::create::execute(Some(dir.path()), "Bad", &["nope".to_string()], false)
        .unwrap_err();
    assert!(format!("{err:#}").contains("nope"));
    assert_eq!(workspace.store.list().unwrap().len(), 1);
}

#[test]
#[serial]
fn test_update_and_refresh_statuses() {
    let dir = init_workspace(&["api", "web"]);
    init::execute(Some(dir.path())).unwrap();
    let repos = vec!["api".to_string(), "web".to_string()];
    feature::create::execute(Some(dir.path()), "Login flow", &repos, false).unwrap();

    feature::update::execute(Some(dir.path()), "feat-001", "api", Status::InProgress).unwrap();
    let workspace = open(dir.path());
    let updated = workspace.feature("feat-001").unwrap();
    assert!(updated.started_at.is_some());
    assert_eq!(updated.project("api").unwrap().status, Status::InProgress);

    // web has a live worktree, so refresh promotes it; nothing is completed
    feature::update::refresh(Some(dir.path()), "feat-001").unwrap();
    let refreshed = workspace.feature("feat-001").unwrap();
    assert_eq!(refreshed.count(Status::InProgress), 2);
    assert!(refreshed.completed_at.is_none());

    feature::update::execute(Some(dir.path()), "feat-001", "api", Status::Completed).unwrap();
    feature::update::execute(Some(dir.path()), "feat-001", "web", Status::Completed).unwrap();
    assert!(workspace.feature("feat-001").unwrap().completed_at.is_some());

    let err = feature::update::execute(Some(dir.path()), "feat-001", "auth", Status::Completed)
        .unwrap_err();
    assert!(format!("{err:#}").contains("auth"));
}

#[test]
#[serial]
fn test_refresh_continues_past_unknown_repository() {
    let dir = init_workspace(&["api", "web"]);
    init::execute(Some(dir.path())).unwrap();
    let repos = vec!["api".to_string(), "web".to_string()];
    feature::create::execute(Some(dir.path()), "Login flow", &repos, false).unwrap();

    // Forget where api lives; web still gets refreshed
    let document_path = dir.path().join(".weft.json");
    let mut document: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&document_path).unwrap()).unwrap();
    document["projectLocations"]
        .as_object_mut()
        .unwrap()
        .remove("api");
    fs::write(&document_path, serde_json::to_string_pretty(&document).unwrap()).unwrap();

    let err = feature::update::refresh(Some(dir.path()), "feat-001").unwrap_err();
    assert!(err.to_string().contains("api"));
    assert!(!err.to_string().contains("web"));

    let refreshed = open(dir.path()).feature("feat-001").unwrap();
    assert_eq!(refreshed.project("api").unwrap().status, Status::Pending);
    assert_eq!(refreshed.project("web").unwrap().status, Status::InProgress);
}

#[test]
#[serial]
fn test_provision_uses_recorded_branch() {
    let dir = init_workspace(&["api"]);
    init::execute(Some(dir.path())).unwrap();
    feature::create::execute(Some(dir.path()), "Login flow", &["api".to_string()], true).unwrap();

    // The prefix changes after the feature was recorded
    fs::write(dir.path().join("weft.toml"), "branch_prefix = \"topic\"\n").unwrap();
    feature::create::provision(Some(dir.path()), "feat-001").unwrap();

    let worktree = dir.path().join("features/feat-001/api");
    assert_eq!(
        git(&worktree, &["rev-parse", "--abbrev-ref", "HEAD"]),
        "feature/feat-001"
    );
    let api = Repository::new(dir.path().join("services/api"));
    assert!(!api.branch_exists("topic/feat-001").unwrap());
}

#[test]
#[serial]
fn test_plan_orders_conflicting_features() {
    let dir = init_workspace(&["api", "web", "auth"]);
    init::execute(Some(dir.path())).unwrap();

    let create = |name: &str, repos: &[&str]| {
        let repos: Vec<String> = repos.iter().map(|r| r.to_string()).collect();
        feature::create::execute(Some(dir.path()), name, &repos, true).unwrap();
    };
    create("Login flow", &["api", "web"]);
    create("Audit log", &["api", "auth"]);
    create("Docs refresh", &["web"]);

    let workspace = open(dir.path());
    let features = workspace.store.list().unwrap();
    let plan = build_execution_plan(&features, &SchedulePolicy::ListOrder).unwrap();

    assert_eq!(plan.conflicts.len(), 2);
    assert_eq!(
        plan.batches,
        vec![
            vec!["feat-001".to_string()],
            vec!["feat-002".to_string(), "feat-003".to_string()],
        ]
    );

    weft::commands::plan::execute(Some(dir.path()), None).unwrap();
    feature::status::execute(Some(dir.path())).unwrap();
}

#[test]
#[serial]
fn test_complete_merges_and_removes_record() {
    let dir = init_workspace(&["api", "web"]);
    init::execute(Some(dir.path())).unwrap();
    let repos = vec!["api".to_string(), "web".to_string()];
    feature::create::execute(Some(dir.path()), "Login flow", &repos, false).unwrap();

    let workspace = open(dir.path());
    let api_worktree = dir.path().join("features/feat-001/api");
    commit_file(&api_worktree, "login.txt", "POST /login\n");

    // Unfinished projects block completion without --force
    let err = feature::complete::execute(Some(dir.path()), "feat-001", TeardownPlan::Full, false, false, false)
        .unwrap_err();
    assert!(err.to_string().contains("--force"));

    feature::complete::execute(Some(dir.path()), "feat-001", TeardownPlan::Full, false, true, false)
        .unwrap();

    assert!(workspace.store.list().unwrap().is_empty());
    assert!(!api_worktree.exists());
    assert!(!dir.path().join("features/feat-001").exists());

    let api = Repository::new(dir.path().join("services/api"));
    assert!(dir.path().join("services/api/login.txt").exists());
    assert!(!api.branch_exists("feature/feat-001").unwrap());
}

#[test]
#[serial]
fn test_complete_keep_leaves_record() {
    let dir = init_workspace(&["api"]);
    init::execute(Some(dir.path())).unwrap();
    feature::create::execute(Some(dir.path()), "Login flow", &["api".to_string()], false).unwrap();
    feature::update::execute(Some(dir.path()), "feat-001", "api", Status::Completed).unwrap();

    feature::complete::execute(
        Some(dir.path()),
        "feat-001",
        TeardownPlan::RemoveWorktrees,
        true,
        false,
        false,
    )
    .unwrap();

    let workspace = open(dir.path());
    assert!(workspace.feature("feat-001").is_ok());
    assert!(!dir.path().join("features/feat-001/api").exists());
    let api = Repository::new(dir.path().join("services/api"));
    assert!(api.branch_exists("feature/feat-001").unwrap());
}

#[test]
#[serial]
fn test_complete_keeps_record_while_worktree_is_dirty() {
    let dir = init_workspace(&["api"]);
    init::execute(Some(dir.path())).unwrap();
    feature::create::execute(Some(dir.path()), "Login flow", &["api".to_string()], false).unwrap();
    feature::update::execute(Some(dir.path()), "feat-001", "api", Status::Completed).unwrap();

    let worktree = dir.path().join("features/feat-001/api");
    fs::write(worktree.join("wip.txt"), "half done\n").unwrap();

    let err = feature::complete::execute(
        Some(dir.path()),
        "feat-001",
        TeardownPlan::Full,
        false,
        false,
        false,
    )
    .unwrap_err();
    assert!(err.to_string().contains("--force-remove"));

    let workspace = open(dir.path());
    assert!(workspace.feature("feat-001").is_ok());
    assert!(worktree.join("wip.txt").exists());
    let api = Repository::new(dir.path().join("services/api"));
    assert!(api.branch_exists("feature/feat-001").unwrap());

    // Cleanup refuses the same way
    feature::cleanup::execute(Some(dir.path()), &["feat-001".to_string()], false, false).unwrap();
    assert!(workspace.feature("feat-001").is_ok());
    assert!(worktree.join("wip.txt").exists());

    feature::complete::execute(
        Some(dir.path()),
        "feat-001",
        TeardownPlan::RemoveWorktrees,
        false,
        false,
        true,
    )
    .unwrap();
    assert!(workspace.store.list().unwrap().is_empty());
    assert!(!worktree.exists());
}

#[test]
#[serial]
fn test_run_reports_failures() {
    let dir = init_workspace(&["api", "web"]);
    init::execute(Some(dir.path())).unwrap();
    let repos = vec!["api".to_string(), "web".to_string()];
    feature::create::execute(Some(dir.path()), "Login flow", &repos, false).unwrap();

    feature::run::execute(Some(dir.path()), "feat-001", &["git".to_string(), "status".to_string()], None)
        .unwrap();

    let failing = ["sh", "-c", "exit 2"].map(String::from);
    let err = feature::run::execute(Some(dir.path()), "feat-001", &failing, Some(30)).unwrap_err();
    assert!(err.to_string().contains("api"));
    assert!(err.to_string().contains("web"));
}

#[test]
#[serial]
fn test_stats_records_git_numbers() {
    let dir = init_workspace(&["api"]);
    init::execute(Some(dir.path())).unwrap();
    feature::create::execute(Some(dir.path()), "Login flow", &["api".to_string()], false).unwrap();

    let worktree = dir.path().join("features/feat-001/api");
    commit_file(&worktree, "login.txt", "one\ntwo\n");

    feature::stats::execute(Some(dir.path()), "feat-001").unwrap();

    let stats = open(dir.path()).feature("feat-001").unwrap().stats.unwrap();
    assert_eq!(stats.total_commits, 1);
    assert_eq!(stats.files_changed, 1);
    assert_eq!(stats.lines_added, 2);
    assert_eq!(stats.lines_deleted, 0);
}

#[test]
#[serial]
fn test_cleanup_and_prune_branches() {
    let dir = init_workspace(&["api", "web"]);
    init::execute(Some(dir.path())).unwrap();
    let repos = vec!["api".to_string(), "web".to_string()];
    feature::create::execute(Some(dir.path()), "Login flow", &repos, false).unwrap();
    feature::create::execute(Some(dir.path()), "Audit log", &["api".to_string()], true).unwrap();

    assert!(feature::cleanup::execute(Some(dir.path()), &[], false, false).is_err());

    feature::cleanup::execute(Some(dir.path()), &["feat-001".to_string()], false, false).unwrap();
    let workspace = open(dir.path());
    let remaining: Vec<String> = workspace.store.list().unwrap().into_iter().map(|f| f.id).collect();
    assert_eq!(remaining, vec!["feat-002"]);
    assert!(!dir.path().join("features/feat-001").exists());

    let web = Repository::new(dir.path().join("services/web"));
    assert!(!web.branch_exists("feature/feat-001").unwrap());

    // Leftover branches from outside weft
    web.create_branch_from("feature/stale", "main").unwrap();
    web.create_branch_from("hotfix/keep", "main").unwrap();

    feature::prune::execute(Some(dir.path()), true).unwrap();
    assert!(web.branch_exists("feature/stale").unwrap());

    feature::prune::execute(Some(dir.path()), false).unwrap();
    assert!(!web.branch_exists("feature/stale").unwrap());
    assert!(web.branch_exists("hotfix/keep").unwrap());

    feature::cleanup::execute(Some(dir.path()), &[], true, false).unwrap();
    assert!(workspace.store.list().unwrap().is_empty());
}
