//! Integration tests for weft against real git repositories
//!
//! These tests exercise the repository handle, the worktree lifecycle and
//! the feature store end to end on temporary repositories.

pub mod helpers;
pub mod lifecycle;
pub mod repository;
pub mod workspace;
