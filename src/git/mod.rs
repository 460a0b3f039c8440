//! Git command execution.
//!
//! Provides `GitRunner`, a subprocess facade over the git subcommands the
//! isolation engine relies on: worktree lifecycle, branch management,
//! diffing, and the temporary-index plumbing behind baseline mirroring.

mod runner;

pub use runner::{GitRunner, StatusEntry, WorktreeInfo};
