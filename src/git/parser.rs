//! Parsers for git's textual output
//!
//! Nothing outside this module looks at raw git output. If git changes a
//! format, this is the only file that needs to follow.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

/// Parsed worktree information from `git worktree list --porcelain`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeInfo {
    pub path: PathBuf,
    pub head: String,
    pub branch: Option<String>,
    pub is_bare: bool,
}

/// Commits ahead of / behind the upstream branch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Divergence {
    pub ahead: u32,
    pub behind: u32,
}

/// Line counts from a `--shortstat` summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStat {
    pub files_changed: u32,
    pub insertions: u32,
    pub deletions: u32,
}

static SHORTSTAT_FILES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) files? changed").expect("valid regex"));
static SHORTSTAT_INSERTIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) insertions?\(\+\)").expect("valid regex"));
static SHORTSTAT_DELETIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) deletions?\(-\)").expect("valid regex"));

/// Parse `git branch --list --no-color` output into branch names.
///
/// Handles the `*` (current) and `+` (checked out in another worktree)
/// markers and skips detached-HEAD pseudo entries.
///
/// ```text
/// * main
/// + feature/feat-001
///   staging
/// ```
pub fn parse_branch_names(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|line| line.trim_start_matches(['*', '+']).trim())
        .filter(|name| !name.is_empty() && !name.starts_with('('))
        .map(String::from)
        .collect()
}

/// Parse `git rev-parse --abbrev-ref HEAD`; `None` means detached
pub fn parse_head_ref(output: &str) -> Option<String> {
    let name = output.trim();
    if name.is_empty() || name == "HEAD" {
        None
    } else {
        Some(name.to_string())
    }
}

/// Parse `git symbolic-ref refs/remotes/<remote>/HEAD`
///
/// `refs/remotes/origin/main` -> `main`
pub fn parse_remote_head(output: &str, remote: &str) -> Option<String> {
    let prefix = format!("refs/remotes/{remote}/");
    output
        .trim()
        .strip_prefix(&prefix)
        .filter(|name| !name.is_empty())
        .map(String::from)
}

/// Parse `git remote` output into remote names
pub fn parse_remotes(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Parse git worktree list --porcelain output
///
/// Example input:
/// ```text
/// worktree /home/user/api
/// HEAD abc123def456
/// branch refs/heads/main
///
/// worktree /home/user/features/feat-001/api
/// HEAD def789abc012
/// branch refs/heads/feature/feat-001
/// ```
pub fn parse_worktree_list(output: &str) -> Vec<WorktreeInfo> {
    let mut worktrees = Vec::new();
    let mut current: Option<WorktreeInfo> = None;

    for line in output.lines() {
        if let Some(path) = line.strip_prefix("worktree ") {
            if let Some(wt) = current.take() {
                worktrees.push(wt);
            }
            current = Some(WorktreeInfo {
                path: PathBuf::from(path),
                head: String::new(),
                branch: None,
                is_bare: false,
            });
        } else if let Some(head) = line.strip_prefix("HEAD ") {
            if let Some(ref mut wt) = current {
                wt.head = head.to_string();
            }
        } else if let Some(branch_line) = line.strip_prefix("branch ") {
            if let Some(ref mut wt) = current {
                let branch_name = branch_line
                    .strip_prefix("refs/heads/")
                    .unwrap_or(branch_line);
                wt.branch = Some(branch_name.to_string());
            }
        } else if line == "bare" {
            if let Some(ref mut wt) = current {
                wt.is_bare = true;
            }
        }
    }

    if let Some(wt) = current {
        worktrees.push(wt);
    }

    worktrees
}

/// Parse `git rev-list --left-right --count <branch>...<upstream>`
///
/// The left column counts commits only on the branch (ahead), the right
/// column commits only on the upstream (behind).
pub fn parse_left_right_count(output: &str) -> Option<Divergence> {
    let mut parts = output.split_whitespace();
    let ahead = parts.next()?.parse().ok()?;
    let behind = parts.next()?.parse().ok()?;
    Some(Divergence { ahead, behind })
}

/// Parse a single integer such as `git rev-list --count` output
pub fn parse_count(output: &str) -> Option<u32> {
    output.trim().parse().ok()
}

/// Parse a `--shortstat` line:
/// ` 3 files changed, 10 insertions(+), 5 deletions(-)`
pub fn parse_shortstat(output: &str) -> DiffStat {
    let capture = |re: &Regex| {
        re.captures(output)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };

    DiffStat {
        files_changed: capture(&SHORTSTAT_FILES),
        insertions: capture(&SHORTSTAT_INSERTIONS),
        deletions: capture(&SHORTSTAT_DELETIONS),
    }
}

/// True when merge output reports conflicts
pub fn merge_reports_conflict(output: &str) -> bool {
    output.contains("CONFLICT") || output.contains("Automatic merge failed")
}

/// True when merge output says there was nothing to merge
pub fn merge_already_up_to_date(output: &str) -> bool {
    output.contains("Already up to date") || output.contains("Already up-to-date")
}

/// Parse `git diff --name-only --diff-filter=U` into file names
pub fn parse_name_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// True when `git worktree remove` says the path was never (or is no longer) a worktree
pub fn is_not_a_worktree(stderr: &str) -> bool {
    stderr.contains("is not a working tree")
}
