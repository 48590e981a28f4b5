//! Crate-wide error taxonomy
//!
//! Each layer has its own error enum; `Error` unifies them for callers that
//! drive more than one layer and `ErrorKind` classifies any of them.

use std::fmt;

use crate::fs::StoreError;
use crate::git::GitError;
use crate::plan::ScheduleError;

/// Coarse classification shared by every weft error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A feature, project or repository key is absent
    NotFound,
    /// The thing being created is already there
    AlreadyExists,
    /// git failed or produced output we could not parse
    ExternalTool,
    /// A merge stopped on conflicts that need a human
    MergeConflict,
    /// Scheduling found a dependency cycle
    CircularDependency,
    /// The feature document could not be read or written
    Persistence,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::AlreadyExists => "already exists",
            ErrorKind::ExternalTool => "external tool error",
            ErrorKind::MergeConflict => "merge conflict",
            ErrorKind::CircularDependency => "circular dependency",
            ErrorKind::Persistence => "persistence error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Git(e) => e.kind(),
            Error::Store(e) => e.kind(),
            Error::Schedule(e) => e.kind(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
