pub mod feature;
pub mod workspace;
pub mod worktree;

pub use feature::{Feature, FeatureStats, Progress, ProjectStatus, Status};
pub use workspace::{WorkspaceDocument, DOCUMENT_VERSION};
pub use worktree::{Worktree, WorktreeState};
