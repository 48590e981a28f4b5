//! Worktree lifecycle for feature branches
//!
//! This module provides:
//! - `WorktreeManager`: idempotent provision/merge/remove over one repository
//! - `teardown`: the per-project finishing sequence with aggregated warnings

mod manager;
mod teardown;

pub use manager::{Provisioned, WorktreeManager, WorktreeOptions};
pub use teardown::{teardown, TeardownPlan, TeardownReport};
