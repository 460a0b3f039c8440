//! Source-tree isolation for concurrent agents.
//!
//! Each agent gets its own git-tracked writable snapshot of the tree:
//! - `IsolationContextManager`: mode selection and context lifecycle
//! - `WorktreeManager`: git worktree/branch primitives per repo root
//! - `ShadowRepo`: throwaway git repo over a non-git directory
//! - `Context`/`ContextKind`: the per-path isolation association

mod context;
mod manager;
mod shadow;
mod worktree;

pub use context::{ChangeStatus, Context, ContextKind, FileChange};
pub use manager::{BranchSummary, IsolationContextManager};
pub use shadow::ShadowRepo;
pub use worktree::WorktreeManager;

use crate::error::Result;
use crate::git::GitRunner;

/// Changed files in a checkout relative to its baseline commit: tracked
/// changes against HEAD plus untracked files, the scratch directory
/// filtered out of both.
pub(crate) async fn collect_changes(git: &GitRunner, exclude: &str) -> Result<Vec<FileChange>> {
    let mut changes: Vec<FileChange> = Vec::new();

    for (status, path) in git.diff_name_status(Some("HEAD")).await? {
        if is_excluded(&path, exclude) {
            continue;
        }
        changes.push(FileChange::new(path, ChangeStatus::from_diff_char(status)));
    }

    for path in git.list_untracked().await? {
        if is_excluded(&path, exclude) {
            continue;
        }
        changes.push(FileChange::new(path, ChangeStatus::Added));
    }

    changes.sort_by(|a, b| a.path.cmp(&b.path));
    changes.dedup_by(|a, b| a.path == b.path);
    Ok(changes)
}

pub(crate) fn is_excluded(path: &str, exclude: &str) -> bool {
    path == exclude || path.starts_with(&format!("{}/", exclude))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_excluded() {
        assert!(is_excluded(".massgen_scratch", ".massgen_scratch"));
        assert!(is_excluded(".massgen_scratch/notes.md", ".massgen_scratch"));
        assert!(!is_excluded("src/.massgen_scratch_like", ".massgen_scratch"));
        assert!(!is_excluded("src/main.rs", ".massgen_scratch"));
    }
}
