//! Git repository and worktree resolution for canopy.
//!
//! Locates repository roots, computes the `<project>-worktrees` naming
//! convention, parses the porcelain worktree listing, and wraps the handful
//! of git operations the lifecycle orchestrator needs. Expected negative
//! outcomes (no repository, no worktrees, a transient git failure during a
//! read-only listing) are `Option`/empty results, never errors.

mod error;
mod workspace;

pub use error::{WorkspaceError, WorkspaceResult};
pub use workspace::{
    find_git_root, init_repo, resolve_main_repo, worktree_path_for, GitWorkspace, WorktreeEntry,
};
