//! Conflict detection and execution planning
//!
//! This module handles:
//! - Finding features that touch the same repositories
//! - Ordering conflicting features into safe execution batches

mod conflicts;
mod schedule;


pub use conflicts::{detect_conflicts, Conflict};
pub use schedule::{
    build_execution_plan, ExecutionPlan, Precedence, ScheduleError, SchedulePolicy,
};
