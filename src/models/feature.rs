use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unit of cross-repository work.
///
/// `completed_at` is set exactly while every project is completed;
/// `started_at` is set by the first move to in-progress and then kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: String,
    pub name: String,
    pub projects: Vec<ProjectStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Last git statistics gathered for this feature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<FeatureStats>,
}

/// One repository's participation in a feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatus {
    /// Repository name, a key of the workspace's project locations
    pub name: String,
    pub status: Status,
    pub branch: String,
    pub worktree_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Progress of a single project.
///
/// `Completed` is only ever set on request. It is never inferred from
/// repository state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Pending,
    InProgress,
    Completed,
}

/// Aggregated git statistics across a feature's worktrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureStats {
    #[serde(default)]
    pub total_commits: u32,
    #[serde(default)]
    pub files_changed: u32,
    #[serde(default)]
    pub lines_added: u32,
    #[serde(default)]
    pub lines_deleted: u32,
}

/// Completed projects out of all projects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// Rounded completion percentage; 0 when there are no projects
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed as f64 * 100.0) / self.total as f64).round() as u32
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}%", self.completed, self.total, self.percent())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Pending => write!(f, "pending"),
            Status::InProgress => write!(f, "in_progress"),
            Status::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(Status::Pending),
            "in_progress" | "inprogress" => Ok(Status::InProgress),
            "completed" | "done" => Ok(Status::Completed),
            other => Err(format!(
                "unknown status '{other}' (expected pending, in_progress or completed)"
            )),
        }
    }
}

impl ProjectStatus {
    /// A pending project on `branch` with its worktree at `worktree_path`
    pub fn new(name: impl Into<String>, branch: impl Into<String>, worktree_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: Status::Pending,
            branch: branch.into(),
            worktree_path: worktree_path.into(),
            last_updated: None,
        }
    }
}

impl Feature {
    /// Create a feature with every project reset to pending
    pub fn new(id: String, name: String, projects: Vec<ProjectStatus>, now: DateTime<Utc>) -> Self {
        let projects = projects
            .into_iter()
            .map(|p| ProjectStatus {
                status: Status::Pending,
                last_updated: None,
                ..p
            })
            .collect();

        Self {
            id,
            name,
            projects,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            stats: None,
        }
    }

    pub fn project(&self, name: &str) -> Option<&ProjectStatus> {
        self.projects.iter().find(|p| p.name == name)
    }

    /// Repository names in project order
    pub fn repository_names(&self) -> impl Iterator<Item = &str> {
        self.projects.iter().map(|p| p.name.as_str())
    }

    pub fn progress(&self) -> Progress {
        Progress {
            completed: self.count(Status::Completed),
            total: self.projects.len(),
        }
    }

    /// Number of projects currently in `status`
    pub fn count(&self, status: Status) -> usize {
        self.projects.iter().filter(|p| p.status == status).count()
    }

    pub fn is_complete(&self) -> bool {
        !self.projects.is_empty() && self.projects.iter().all(|p| p.status == Status::Completed)
    }

    /// Set one project's status and update the feature's timestamps.
    ///
    /// Returns the project's previous status, or `None` if the feature has no
    /// project with that name (nothing is changed in that case).
    pub fn apply_status(&mut self, project: &str, status: Status, now: DateTime<Utc>) -> Option<Status> {
        let entry = self.projects.iter_mut().find(|p| p.name == project)?;
        let previous = entry.status;
        entry.status = status;
        entry.last_updated = Some(now);

        if status == Status::InProgress && self.started_at.is_none() {
            self.started_at = Some(now);
        }

        if self.is_complete() {
            if self.completed_at.is_none() {
                self.completed_at = Some(now);
            }
        } else {
            self.completed_at = None;
        }

        self.updated_at = now;
        Some(previous)
    }
}
