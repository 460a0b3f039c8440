use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::error::{IsolationError, Result};
use crate::git::{GitRunner, WorktreeInfo};
use crate::isolation::{FileChange, collect_changes};

/// Thin wrapper over git's worktree and branch primitives for one
/// repository root. N worktrees, each bound 1:1 to a branch.
pub struct WorktreeManager {
    repo_root: PathBuf,
}

impl WorktreeManager {
    /// Resolves the nearest enclosing git repository root.
    pub fn new(repo_path: &Path) -> Result<Self> {
        let repo = git2::Repository::discover(repo_path)
            .map_err(|_| IsolationError::NotAGitRepository(repo_path.to_path_buf()))?;
        let repo_root = repo
            .workdir()
            .ok_or_else(|| IsolationError::NotAGitRepository(repo_path.to_path_buf()))?
            .to_path_buf();

        Ok(Self { repo_root })
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    fn git(&self) -> GitRunner {
        GitRunner::new(&self.repo_root)
    }

    /// Creates `branch` at `base` and checks it out at `target`.
    pub async fn create_worktree(
        &self,
        target: &Path,
        branch: &str,
        base: &str,
    ) -> Result<PathBuf> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        self.git().worktree_add(target, branch, base).await?;

        info!(
            branch = %branch,
            path = %target.display(),
            "Created worktree"
        );

        Ok(target.to_path_buf())
    }

    /// Removes the worktree at `target`. When `delete_branch` is set, also
    /// deletes the branch bound to it; a refused branch delete (unmerged
    /// commits without `force`) is logged, not raised. Removing the
    /// checkout is the operation that must succeed.
    pub async fn remove_worktree(
        &self,
        target: &Path,
        force: bool,
        delete_branch: bool,
    ) -> Result<()> {
        let branch = if delete_branch {
            self.branch_for(target).await?
        } else {
            None
        };

        self.git().worktree_remove(target, force).await?;
        info!(path = %target.display(), "Removed worktree");

        if let Some(branch) = branch {
            if self.git().delete_branch(&branch, force).await? {
                info!(branch = %branch, "Deleted branch");
            }
        }

        Ok(())
    }

    pub async fn list_worktrees(&self) -> Result<Vec<WorktreeInfo>> {
        self.git().worktree_list().await
    }

    /// Clears stale worktree metadata left behind by external deletion,
    /// e.g. a crashed process that removed the directory directly.
    pub async fn prune(&self) -> Result<()> {
        self.git().worktree_prune().await
    }

    pub async fn delete_branch(&self, branch: &str, force: bool) -> Result<bool> {
        self.git().delete_branch(branch, force).await
    }

    /// Changed files in `checkout` relative to its baseline commit.
    pub async fn changes(&self, checkout: &Path, exclude: &str) -> Result<Vec<FileChange>> {
        collect_changes(&GitRunner::new(checkout), exclude).await
    }

    pub async fn diff(&self, checkout: &Path, staged: bool, exclude: &str) -> Result<String> {
        GitRunner::new(checkout).diff(staged, &[exclude]).await
    }

    async fn branch_for(&self, target: &Path) -> Result<Option<String>> {
        let wanted = canonical_or_self(target);
        for entry in self.list_worktrees().await? {
            if canonical_or_self(&entry.path) == wanted {
                return Ok(entry.branch);
            }
        }
        debug!(path = %target.display(), "No worktree entry found for path");
        Ok(None)
    }
}

fn canonical_or_self(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
