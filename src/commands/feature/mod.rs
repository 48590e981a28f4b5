//! Feature lifecycle commands

pub mod cleanup;
pub mod complete;
pub mod create;
pub mod prune;
pub mod run;
pub mod stats;
pub mod status;
pub mod update;
