//! Change review and application.
//!
//! `ChangeApplier` computes what an isolated root changed relative to its
//! original counterpart and copies an approved subset back. Git-aware when
//! the source is a repository, with a byte-comparison fallback otherwise.
//! Application is per-file best-effort: partial success is an accepted
//! outcome, never rolled back.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tokio::fs;
use tokio::task;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{IsolationError, Result};
use crate::git::GitRunner;
use crate::isolation::{ChangeStatus, is_excluded};

/// Read-only classification of a source tree's pending changes, for
/// pre-apply review surfaces.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChangesSummary {
    pub modified: Vec<String>,
    pub added: Vec<String>,
    pub deleted: Vec<String>,
}

impl ChangesSummary {
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.added.is_empty() && self.deleted.is_empty()
    }

    pub fn total(&self) -> usize {
        self.modified.len() + self.added.len() + self.deleted.len()
    }
}

pub struct ChangeApplier {
    scratch_dir_name: String,
}

impl Default for ChangeApplier {
    fn default() -> Self {
        Self {
            scratch_dir_name: String::from(".massgen_scratch"),
        }
    }
}

impl ChangeApplier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scratch_dir(mut self, name: impl Into<String>) -> Self {
        self.scratch_dir_name = name.into();
        self
    }

    /// Copies approved changes from `source` back onto `target`. With
    /// `approved = None` everything is applied. Returns the relative paths
    /// that actually succeeded; individual file failures are logged and
    /// skipped rather than aborting the whole apply.
    pub async fn apply_changes(
        &self,
        source: &Path,
        target: &Path,
        approved: Option<&[String]>,
    ) -> Result<Vec<String>> {
        let change_map = match self.git_change_map(source).await {
            Ok(map) => map,
            Err(e) => {
                debug!(
                    source = %source.display(),
                    error = %e,
                    "Git inspection unavailable, using byte-compare fallback"
                );
                return self.apply_fallback(source, target, approved).await;
            }
        };

        let mut applied = Vec::new();
        for (rel, status) in change_map {
            if !is_approved(&rel, approved) {
                continue;
            }

            let target_file = target.join(&rel);
            let outcome = match status {
                ChangeStatus::Deleted => match fs::remove_file(&target_file).await {
                    Ok(()) => Ok(()),
                    // Already gone counts as applied
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(e),
                },
                ChangeStatus::Modified | ChangeStatus::Added => {
                    copy_file(&source.join(&rel), &target_file).await
                }
            };

            match outcome {
                Ok(()) => applied.push(rel),
                Err(e) => {
                    warn!(file = %rel, error = %e, "Skipping file that failed to apply");
                }
            }
        }

        applied.sort();
        debug!(count = applied.len(), "Applied changes");
        Ok(applied)
    }

    /// Read-only classification mirroring `apply_changes`' git path.
    /// A non-git source yields an empty summary: the fallback classifies
    /// files by comparing against a target, and a summary has none.
    pub async fn changes_summary(&self, source: &Path) -> Result<ChangesSummary> {
        let change_map = match self.git_change_map(source).await {
            Ok(map) => map,
            Err(e) => {
                warn!(
                    source = %source.display(),
                    error = %e,
                    "Cannot summarize changes without git inspection"
                );
                return Ok(ChangesSummary::default());
            }
        };

        let mut summary = ChangesSummary::default();
        for (rel, status) in change_map {
            match status {
                ChangeStatus::Modified => summary.modified.push(rel),
                ChangeStatus::Added => summary.added.push(rel),
                ChangeStatus::Deleted => summary.deleted.push(rel),
            }
        }
        Ok(summary)
    }

    /// Unstaged diffs unioned with untracked files, scratch filtered.
    async fn git_change_map(&self, source: &Path) -> Result<BTreeMap<String, ChangeStatus>> {
        let git = GitRunner::new(source);

        // Git resolves upward; make sure `source` is itself the repository
        // root rather than a plain subdirectory of some enclosing repo.
        let toplevel = git.toplevel().await?;
        let source_canonical = source.canonicalize()?;
        if toplevel.canonicalize().unwrap_or(toplevel) != source_canonical {
            return Err(IsolationError::NotAGitRepository(source_canonical));
        }

        let mut map = BTreeMap::new();

        for (status, path) in git.diff_name_status(None).await? {
            if is_excluded(&path, &self.scratch_dir_name) {
                continue;
            }
            map.insert(path, ChangeStatus::from_diff_char(status));
        }

        for path in git.list_untracked().await? {
            if is_excluded(&path, &self.scratch_dir_name) {
                continue;
            }
            map.entry(path).or_insert(ChangeStatus::Added);
        }

        Ok(map)
    }

    /// Walks `source` and copies every file that is new or byte-differs
    /// from its counterpart under `target`. Does not detect deletions;
    /// that asymmetry is inherent to a source-side walk.
    async fn apply_fallback(
        &self,
        source: &Path,
        target: &Path,
        approved: Option<&[String]>,
    ) -> Result<Vec<String>> {
        let source = source.to_path_buf();
        let target = target.to_path_buf();
        let scratch = self.scratch_dir_name.clone();
        let approved: Option<Vec<String>> = approved.map(|a| a.to_vec());

        let mut applied = task::spawn_blocking(move || {
            let mut applied = Vec::new();

            for entry in WalkDir::new(&source)
                .into_iter()
                .filter_entry(|e| e.file_name() != ".git" && e.file_name() != scratch.as_str())
            {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(error = %e, "Skipping unreadable entry");
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                let Ok(rel) = entry.path().strip_prefix(&source) else {
                    continue;
                };
                let Some(rel_str) = rel.to_str() else {
                    warn!(path = %rel.display(), "Skipping non-UTF8 path");
                    continue;
                };
                if !is_approved(rel_str, approved.as_deref()) {
                    continue;
                }

                let target_file = target.join(rel);
                match copy_if_differs(entry.path(), &target_file) {
                    Ok(true) => applied.push(rel_str.to_string()),
                    Ok(false) => {}
                    Err(e) => {
                        warn!(file = %rel_str, error = %e, "Skipping file that failed to apply");
                    }
                }
            }

            applied
        })
        .await
        .map_err(|e| IsolationError::ShadowRepo(e.to_string()))?;

        applied.sort();
        debug!(count = applied.len(), "Applied changes via fallback");
        Ok(applied)
    }
}

fn is_approved(rel: &str, approved: Option<&[String]>) -> bool {
    match approved {
        Some(list) => list.iter().any(|a| a == rel),
        None => true,
    }
}

async fn copy_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::copy(from, to).await?;
    Ok(())
}

/// Copies `from` over `to` when `to` is missing or byte-differs.
/// Returns whether a copy happened.
fn copy_if_differs(from: &Path, to: &Path) -> std::io::Result<bool> {
    if to.is_file() {
        let source_bytes = std::fs::read(from)?;
        let target_bytes = std::fs::read(to)?;
        if source_bytes == target_bytes {
            return Ok(false);
        }
    }
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(from, to)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_approved_without_list() {
        assert!(is_approved("a.txt", None));
    }

    #[test]
    fn test_is_approved_with_list() {
        let approved = vec!["a.txt".to_string(), "src/b.rs".to_string()];
        assert!(is_approved("a.txt", Some(&approved)));
        assert!(is_approved("src/b.rs", Some(&approved)));
        assert!(!is_approved("c.txt", Some(&approved)));
    }

    #[test]
    fn test_summary_counters() {
        let summary = ChangesSummary {
            modified: vec!["a".into()],
            added: vec!["b".into(), "c".into()],
            deleted: vec![],
        };
        assert!(!summary.is_empty());
        assert_eq!(summary.total(), 3);
        assert!(ChangesSummary::default().is_empty());
    }
}
