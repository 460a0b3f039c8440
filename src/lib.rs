//! Git-backed isolation engine for concurrent multi-agent source editing.
//!
//! Gives each agent its own git-tracked, writable snapshot of a source
//! tree (a worktree on its own branch inside a git repo, or a throwaway
//! "shadow" repository over a plain directory), then supports reviewing
//! and selectively applying approved changes back. Callers consume three
//! surfaces: an isolated path per context, change/diff inspection, and
//! `ChangeApplier` for copy-back.

pub mod apply;
pub mod config;
pub mod error;
pub mod git;
pub mod isolation;

pub use apply::{ChangeApplier, ChangesSummary};
pub use config::{IsolationConfig, IsolationMode};
pub use error::{IsolationError, Result};
pub use git::{GitRunner, StatusEntry, WorktreeInfo};
pub use isolation::{
    BranchSummary, ChangeStatus, Context, ContextKind, FileChange, IsolationContextManager,
    ShadowRepo, WorktreeManager,
};
