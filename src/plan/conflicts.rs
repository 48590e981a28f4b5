//! Pairwise overlap detection between features

use serde::Serialize;

use crate::models::Feature;

/// Two features that touch at least one common repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub feature1: String,
    pub feature2: String,
    /// Shared repositories, in `feature1`'s project order
    pub conflicting_projects: Vec<String>,
}

/// Find every pair of features sharing a repository.
///
/// Pairs are visited as (i, j) with i < j in input order, so `feature1` is
/// always the earlier feature and the output is deterministic.
pub fn detect_conflicts(features: &[Feature]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for (i, first) in features.iter().enumerate() {
        for second in &features[i + 1..] {
            let shared: Vec<String> = first
                .repository_names()
                .filter(|repo| second.project(repo).is_some())
                .map(str::to_string)
                .collect();

            if !shared.is_empty() {
                conflicts.push(Conflict {
                    feature1: first.id.clone(),
                    feature2: second.id.clone(),
                    conflicting_projects: shared,
                });
            }
        }
    }

    conflicts
}
