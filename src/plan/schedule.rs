//! Execution batching for conflicting features

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::conflicts::{detect_conflicts, Conflict};
use crate::error::ErrorKind;
use crate::models::Feature;

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("circular dependency between features: {}", remaining.join(", "))]
    CircularDependency { remaining: Vec<String> },
}

impl ScheduleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScheduleError::CircularDependency { .. } => ErrorKind::CircularDependency,
        }
    }
}

/// Decides which of two conflicting features runs first.
///
/// `first` always precedes `second` in the input list. Returning `false`
/// makes `first` wait for `second`.
pub trait Precedence {
    fn runs_first(&self, first: &Feature, second: &Feature) -> bool;
}

impl<F> Precedence for F
where
    F: Fn(&Feature, &Feature) -> bool,
{
    fn runs_first(&self, first: &Feature, second: &Feature) -> bool {
        self(first, second)
    }
}

/// Built-in precedence policies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulePolicy {
    /// The feature listed first runs first
    #[default]
    ListOrder,
    /// The feature created earlier runs first; ties fall back to list order
    OldestFirst,
}

impl Precedence for SchedulePolicy {
    fn runs_first(&self, first: &Feature, second: &Feature) -> bool {
        match self {
            SchedulePolicy::ListOrder => true,
            SchedulePolicy::OldestFirst => first.created_at <= second.created_at,
        }
    }
}

impl fmt::Display for SchedulePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulePolicy::ListOrder => write!(f, "list-order"),
            SchedulePolicy::OldestFirst => write!(f, "oldest-first"),
        }
    }
}

impl FromStr for SchedulePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "list-order" => Ok(SchedulePolicy::ListOrder),
            "oldest-first" => Ok(SchedulePolicy::OldestFirst),
            other => Err(format!(
                "unknown schedule policy '{other}' (expected list-order or oldest-first)"
            )),
        }
    }
}

/// Ordered batches of feature ids, plus the conflicts that shaped them
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    /// Features within a batch share no repository and can proceed together
    pub batches: Vec<Vec<String>>,
    pub conflicts: Vec<Conflict>,
}

impl ExecutionPlan {
    pub fn is_conflict_free(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Order features into batches so conflicting features never share one.
///
/// Each conflict becomes an edge "loser waits for winner", with the winner
/// picked by `precedence`. Batches are peeled off with Kahn's algorithm; ids
/// within a batch keep input order. A cycle yields no partial plan.
pub fn build_execution_plan(
    features: &[Feature],
    precedence: &dyn Precedence,
) -> Result<ExecutionPlan, ScheduleError> {
    let conflicts = detect_conflicts(features);
    let index_of = |id: &str| features.iter().position(|f| f.id == id);

    // dependents[a] lists the features waiting for a
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); features.len()];
    let mut in_degree = vec![0usize; features.len()];

    for conflict in &conflicts {
        let (Some(a), Some(b)) = (index_of(&conflict.feature1), index_of(&conflict.feature2))
        else {
            continue;
        };
        let (before, after) = if precedence.runs_first(&features[a], &features[b]) {
            (a, b)
        } else {
            (b, a)
        };
        debug!(
            "{} waits for {}",
            features[after].id, features[before].id
        );
        dependents[before].push(after);
        in_degree[after] += 1;
    }

    let mut scheduled = vec![false; features.len()];
    let mut remaining = features.len();
    let mut batches = Vec::new();

    while remaining > 0 {
        let ready: Vec<usize> = (0..features.len())
            .filter(|&i| !scheduled[i] && in_degree[i] == 0)
            .collect();

        if ready.is_empty() {
            let stuck = (0..features.len())
                .filter(|&i| !scheduled[i])
                .map(|i| features[i].id.clone())
                .collect();
            return Err(ScheduleError::CircularDependency { remaining: stuck });
        }

        for &i in &ready {
            scheduled[i] = true;
            for &dependent in &dependents[i] {
                in_degree[dependent] -= 1;
            }
        }
        remaining -= ready.len();
        batches.push(ready.into_iter().map(|i| features[i].id.clone()).collect());
    }

    Ok(ExecutionPlan { batches, conflicts })
}
