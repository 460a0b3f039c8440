use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How an initialized context is backed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextKind {
    /// No isolation; the original path was handed back unchanged.
    Legacy,
    /// Git worktree checkout on its own branch.
    Worktree {
        repo_root: PathBuf,
        /// Root of the physical checkout. Equals the isolated path unless
        /// the context covers a subtree of the repository, in which case
        /// the isolated path points inside this root.
        checkout_root: PathBuf,
        branch: String,
        base_ref: String,
    },
    /// Shadow repository over a non-git directory.
    Shadow,
}

/// One (original path, session) association with its isolated counterpart.
/// Fields are fixed at creation; in particular the kind never changes.
#[derive(Debug, Clone)]
pub struct Context {
    pub original_path: PathBuf,
    pub isolated_path: PathBuf,
    pub agent_id: String,
    pub kind: ContextKind,
    /// Set once `cleanup_round` has removed the physical checkout; later
    /// round cleanups become no-ops.
    pub round_cleaned: bool,
}

impl Context {
    pub fn branch(&self) -> Option<&str> {
        match &self.kind {
            ContextKind::Worktree { branch, .. } => Some(branch),
            _ => None,
        }
    }
}

/// Classification of one changed file relative to a context's baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Modified,
    Added,
    Deleted,
}

impl ChangeStatus {
    pub fn from_diff_char(c: char) -> Self {
        match c {
            'A' => Self::Added,
            'D' => Self::Deleted,
            _ => Self::Modified,
        }
    }

    pub fn code(&self) -> char {
        match self {
            Self::Modified => 'M',
            Self::Added => 'A',
            Self::Deleted => 'D',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub status: ChangeStatus,
}

impl FileChange {
    pub fn new(path: impl Into<String>, status: ChangeStatus) -> Self {
        Self {
            path: path.into(),
            status,
        }
    }
}
