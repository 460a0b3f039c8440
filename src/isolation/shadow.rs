use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::task;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{IsolationError, Result};
use crate::git::GitRunner;
use crate::isolation::{FileChange, collect_changes};

const IDENTITY_NAME: &str = "MassGen";
const IDENTITY_EMAIL: &str = "massgen@localhost";

/// Throwaway git repository mirroring a plain (non-git) directory, so the
/// diff machinery works against a single baseline commit. Lives until
/// `cleanup` is called.
pub struct ShadowRepo {
    source_path: PathBuf,
    temp: Option<TempDir>,
}

impl ShadowRepo {
    pub fn new(source_path: &Path) -> Result<Self> {
        if !source_path.is_dir() {
            return Err(IsolationError::InvalidPath(source_path.to_path_buf()));
        }
        Ok(Self {
            source_path: source_path.to_path_buf(),
            temp: None,
        })
    }

    /// Materializes the shadow: temp dir, `git init`, local identity, full
    /// copy of the source (minus `.git`), one baseline commit. A failure
    /// mid-way removes the partial temp dir before returning.
    pub async fn initialize(&mut self) -> Result<PathBuf> {
        let temp = tempfile::Builder::new()
            .prefix("massgen_shadow_")
            .tempdir()?;

        match self.materialize(temp.path()).await {
            Ok(()) => {
                let root = temp.path().to_path_buf();
                info!(
                    source = %self.source_path.display(),
                    shadow = %root.display(),
                    "Initialized shadow repository"
                );
                self.temp = Some(temp);
                Ok(root)
            }
            Err(e) => {
                if let Err(close_err) = temp.close() {
                    warn!(error = %close_err, "Failed to remove partial shadow dir");
                }
                Err(IsolationError::ShadowRepo(format!(
                    "failed to initialize shadow of {}: {}",
                    self.source_path.display(),
                    e
                )))
            }
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.temp.as_ref().map(|t| t.path())
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Changed files relative to the baseline commit.
    pub async fn changes(&self, exclude: &str) -> Result<Vec<FileChange>> {
        let root = self.require_initialized()?;
        collect_changes(&GitRunner::new(root), exclude).await
    }

    pub async fn diff(&self, staged: bool, exclude: &str) -> Result<String> {
        let root = self.require_initialized()?;
        GitRunner::new(root).diff(staged, &[exclude]).await
    }

    /// Removes the temp directory. Safe to call repeatedly.
    pub async fn cleanup(&mut self) {
        if let Some(temp) = self.temp.take() {
            let path = temp.path().to_path_buf();
            if let Err(e) = temp.close() {
                warn!(path = %path.display(), error = %e, "Shadow cleanup failed");
            } else {
                info!(path = %path.display(), "Removed shadow repository");
            }
        }
    }

    async fn materialize(&self, root: &Path) -> Result<()> {
        let git = GitRunner::new(root);
        git.init().await?;
        git.set_identity(IDENTITY_NAME, IDENTITY_EMAIL).await?;

        let source = self.source_path.clone();
        let dest = root.to_path_buf();
        task::spawn_blocking(move || copy_tree(&source, &dest))
            .await
            .map_err(|e| IsolationError::ShadowRepo(e.to_string()))??;

        git.add_all().await?;
        // --allow-empty keeps an empty source directory valid
        git.commit_allow_empty("initial state").await?;
        Ok(())
    }

    fn require_initialized(&self) -> Result<&Path> {
        self.path()
            .ok_or_else(|| IsolationError::ShadowRepo("shadow repository not initialized".into()))
    }
}

/// Recursive copy preserving structure, skipping `.git` directories.
pub(crate) fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(source)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
    {
        let entry = entry.map_err(|e| IsolationError::ShadowRepo(e.to_string()))?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| IsolationError::ShadowRepo(e.to_string()))?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
