pub mod commands;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fs;
pub mod git;
pub mod models;
pub mod plan;
pub mod process;
pub mod validation;
pub mod worktree;
