//! Feature store: the workspace document on disk.
//!
//! Every operation loads a fresh snapshot, and every mutation rewrites the
//! whole document. There is no locking; concurrent writers get
//! last-write-wins.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::ErrorKind;
use crate::models::{Feature, FeatureStats, ProjectStatus, Status, WorkspaceDocument, Worktree};

/// File name of the workspace document
pub const DOCUMENT_FILE: &str = ".weft.json";

/// How many parent directories `locate` climbs before giving up
pub const MAX_LOCATE_DEPTH: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no workspace document at {}; run `weft init` first", .0.display())]
    NotInitialized(PathBuf),

    #[error("feature not found: {0}")]
    FeatureNotFound(String),

    #[error("project '{project}' is not part of feature {feature}")]
    ProjectNotFound { feature: String, project: String },

    #[error("unknown repository: {0}")]
    RepositoryNotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("failed to access {}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("workspace document {} is corrupt", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotInitialized(_)
            | StoreError::FeatureNotFound(_)
            | StoreError::ProjectNotFound { .. }
            | StoreError::RepositoryNotFound(_) => ErrorKind::NotFound,
            StoreError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            StoreError::Persistence { .. } | StoreError::Corrupt { .. } => ErrorKind::Persistence,
        }
    }
}

/// Naming of the branches and worktree directories a new feature gets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureLayout {
    pub branch_prefix: String,
    pub features_dir: String,
}

impl Default for FeatureLayout {
    fn default() -> Self {
        Self {
            branch_prefix: "feature".to_string(),
            features_dir: "features".to_string(),
        }
    }
}

impl FeatureLayout {
    pub fn branch_for(&self, feature_id: &str) -> String {
        format!("{}/{feature_id}", self.branch_prefix)
    }

    /// Workspace-relative worktree path, always with forward slashes
    pub fn worktree_path_for(&self, feature_id: &str, repository: &str) -> String {
        format!("{}/{feature_id}/{repository}", self.features_dir)
    }
}

/// Result of a project status change
#[derive(Debug, Clone)]
pub struct Transition {
    pub previous: Status,
    pub feature: Feature,
}

/// Persistent collection of features for one workspace
#[derive(Debug, Clone)]
pub struct FeatureStore {
    root: PathBuf,
    layout: FeatureLayout,
}

impl FeatureStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            layout: FeatureLayout::default(),
        }
    }

    pub fn with_layout(mut self, layout: FeatureLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Walk up from `start` looking for a workspace document.
    ///
    /// Returns the directory containing it, checking `start` and at most
    /// `MAX_LOCATE_DEPTH` ancestors.
    pub fn locate(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .take(MAX_LOCATE_DEPTH + 1)
            .find(|dir| dir.join(DOCUMENT_FILE).is_file())
            .map(Path::to_path_buf)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    pub fn document_path(&self) -> PathBuf {
        self.root.join(DOCUMENT_FILE)
    }

    pub fn is_initialized(&self) -> bool {
        self.document_path().is_file()
    }

    /// Write a fresh document with the given repository locations
    pub fn initialize(
        &self,
        locations: BTreeMap<String, String>,
    ) -> Result<WorkspaceDocument, StoreError> {
        let path = self.document_path();
        if path.exists() {
            return Err(StoreError::AlreadyExists(path.display().to_string()));
        }

        let document = WorkspaceDocument::new(self.root.clone(), locations);
        self.save(&document)?;
        info!("initialized workspace document at {}", path.display());
        Ok(document)
    }

    /// Load a fresh snapshot of the document
    pub fn load(&self) -> Result<WorkspaceDocument, StoreError> {
        let path = self.document_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotInitialized(path))
            }
            Err(source) => return Err(StoreError::Persistence { path, source }),
        };

        serde_json::from_str(&content).map_err(|source| StoreError::Corrupt { path, source })
    }

    /// Serialize the whole document and atomically replace the file
    fn save(&self, document: &WorkspaceDocument) -> Result<(), StoreError> {
        let path = self.document_path();
        let persistence = |source: io::Error| StoreError::Persistence {
            path: path.clone(),
            source,
        };

        let json = serde_json::to_string_pretty(document)
            .map_err(|e| persistence(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        fs::create_dir_all(&self.root).map_err(persistence)?;
        let mut staging = NamedTempFile::new_in(&self.root).map_err(persistence)?;
        staging.write_all(json.as_bytes()).map_err(persistence)?;
        staging.write_all(b"\n").map_err(persistence)?;
        staging.as_file().sync_all().map_err(persistence)?;
        staging
            .persist(&path)
            .map_err(|e| persistence(e.error))?;

        debug!("wrote {}", path.display());
        Ok(())
    }

    /// Load, apply `change`, and write back only if it succeeded
    fn update<T>(
        &self,
        change: impl FnOnce(&mut WorkspaceDocument) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut document = self.load()?;
        let value = change(&mut document)?;
        self.save(&document)?;
        Ok(value)
    }

    /// Create a feature spanning `projects`, all pending
    pub fn create(&self, name: &str, projects: &[String]) -> Result<Feature, StoreError> {
        self.update(|document| {
            let mut seen = Vec::with_capacity(projects.len());
            for project in projects {
                if seen.contains(&project) {
                    return Err(StoreError::AlreadyExists(format!("project '{project}'")));
                }
                if !document.project_locations.contains_key(project) {
                    return Err(StoreError::RepositoryNotFound(project.clone()));
                }
                seen.push(project);
            }

            let id = document
                .next_feature_id()
                .ok_or_else(|| StoreError::AlreadyExists(format!("feature feat-{}", u32::MAX)))?;
            let entries = projects
                .iter()
                .map(|repo| {
                    ProjectStatus::new(
                        repo.as_str(),
                        self.layout.branch_for(&id),
                        self.layout.worktree_path_for(&id, repo),
                    )
                })
                .collect();

            let feature = Feature::new(id, name.to_string(), entries, Utc::now());
            document.features.push(feature.clone());
            info!(feature = %feature.id, "created feature '{name}'");
            Ok(feature)
        })
    }

    /// Add an already-built feature record
    pub fn insert(&self, feature: Feature) -> Result<(), StoreError> {
        self.update(|document| {
            if document.feature(&feature.id).is_some() {
                return Err(StoreError::AlreadyExists(format!("feature {}", feature.id)));
            }
            document.features.push(feature);
            Ok(())
        })
    }

    pub fn get(&self, feature_id: &str) -> Result<Feature, StoreError> {
        self.load()?
            .feature(feature_id)
            .cloned()
            .ok_or_else(|| StoreError::FeatureNotFound(feature_id.to_string()))
    }

    pub fn list(&self) -> Result<Vec<Feature>, StoreError> {
        Ok(self.load()?.features)
    }

    /// Set one project's status, maintaining the feature's timestamps
    pub fn transition_project_status(
        &self,
        feature_id: &str,
        project: &str,
        status: Status,
    ) -> Result<Transition, StoreError> {
        self.update(|document| {
            let feature = document
                .feature_mut(feature_id)
                .ok_or_else(|| StoreError::FeatureNotFound(feature_id.to_string()))?;

            let previous = feature
                .apply_status(project, status, Utc::now())
                .ok_or_else(|| StoreError::ProjectNotFound {
                    feature: feature_id.to_string(),
                    project: project.to_string(),
                })?;

            debug!(feature = %feature_id, project, "status {previous} -> {status}");
            Ok(Transition {
                previous,
                feature: feature.clone(),
            })
        })
    }

    /// Cache git statistics on a feature
    pub fn record_stats(&self, feature_id: &str, stats: FeatureStats) -> Result<(), StoreError> {
        self.update(|document| {
            let feature = document
                .feature_mut(feature_id)
                .ok_or_else(|| StoreError::FeatureNotFound(feature_id.to_string()))?;
            feature.stats = Some(stats);
            feature.updated_at = Utc::now();
            Ok(())
        })
    }

    /// Remove a feature's record. Worktrees and branches are left alone.
    pub fn delete(&self, feature_id: &str) -> Result<Feature, StoreError> {
        self.update(|document| {
            let index = document
                .features
                .iter()
                .position(|f| f.id == feature_id)
                .ok_or_else(|| StoreError::FeatureNotFound(feature_id.to_string()))?;
            info!(feature = %feature_id, "deleted feature record");
            Ok(document.features.remove(index))
        })
    }

    /// Absolute path of a known repository
    pub fn project_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        let document = self.load()?;
        document
            .project_locations
            .get(name)
            .map(|relative| self.root.join(relative))
            .ok_or_else(|| StoreError::RepositoryNotFound(name.to_string()))
    }

    /// Names of every known repository, sorted
    pub fn available_projects(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.load()?.project_locations.into_keys().collect())
    }

    /// Absolute worktree path of one project of a feature
    pub fn worktree_path(&self, project: &ProjectStatus) -> PathBuf {
        self.root.join(&project.worktree_path)
    }

    /// Directory holding every worktree of a feature
    pub fn feature_dir(&self, feature_id: &str) -> PathBuf {
        Worktree::feature_dir(&self.root, &self.layout.features_dir, feature_id)
    }
}
