use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::feature::Feature;

/// Current document format version
pub const DOCUMENT_VERSION: u32 = 1;

/// The persisted workspace document.
///
/// Older documents carry no `version`; they load as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    pub workspace_root: PathBuf,
    #[serde(default)]
    pub features: Vec<Feature>,
    /// Repository name -> path relative to the workspace root
    #[serde(default)]
    pub project_locations: BTreeMap<String, String>,
}

impl WorkspaceDocument {
    pub fn new(workspace_root: PathBuf, project_locations: BTreeMap<String, String>) -> Self {
        Self {
            version: Some(DOCUMENT_VERSION),
            workspace_root,
            features: Vec::new(),
            project_locations,
        }
    }

    pub fn feature(&self, id: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    pub fn feature_mut(&mut self, id: &str) -> Option<&mut Feature> {
        self.features.iter_mut().find(|f| f.id == id)
    }

    /// Next id in the `feat-NNN` sequence; `None` once the sequence is exhausted
    pub fn next_feature_id(&self) -> Option<String> {
        let highest = self
            .features
            .iter()
            .filter_map(|f| f.id.strip_prefix("feat-"))
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        highest.checked_add(1).map(|next| format!("feat-{next:03}"))
    }
}
