//! Configuration for the isolation engine.
//!
//! Provides:
//! - `IsolationMode`: how a context gets its writable copy
//! - `IsolationConfig`: engine settings, loadable from TOML

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::warn;

use crate::error::Result;

/// How a context path is isolated from the shared source tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IsolationMode {
    /// Worktree if the path is inside a git repo, shadow otherwise.
    #[default]
    Auto,
    /// Git worktree; falls back to shadow on non-git paths.
    Worktree,
    /// Shadow repository unconditionally.
    Isolated,
    /// No isolation: the original path is handed back as-is. Concurrent
    /// writers to the same directory are the caller's problem in this mode.
    Legacy,
}

impl IsolationMode {
    /// Lenient parse for mode strings coming from external callers.
    /// Unrecognized values downgrade to `Legacy` with a warning rather
    /// than failing the turn.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Self::Auto,
            "worktree" => Self::Worktree,
            "isolated" => Self::Isolated,
            "legacy" => Self::Legacy,
            other => {
                warn!(mode = %other, "Unknown isolation mode, falling back to legacy");
                Self::Legacy
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationConfig {
    pub mode: IsolationMode,
    /// Prefix for generated branches; the random suffix is appended after `/`.
    pub branch_prefix: String,
    /// Name of the git-excluded scratch directory inside each isolated root.
    pub scratch_dir_name: String,
    /// Workspace directory hosting `.worktree/ctx_{n}` checkouts. When absent
    /// (e.g. containerized execution), checkouts land in the OS temp dir.
    pub workspace_dir: Option<PathBuf>,
}

impl Default for IsolationConfig {
    fn default() -> Self {
        Self {
            mode: IsolationMode::Auto,
            branch_prefix: String::from("massgen"),
            scratch_dir_name: String::from(".massgen_scratch"),
            workspace_dir: None,
        }
    }
}

impl IsolationConfig {
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        Ok(toml::from_str(&content)?)
    }

    pub fn with_mode(mut self, mode: IsolationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace_dir = Some(workspace.into());
        self
    }
}
