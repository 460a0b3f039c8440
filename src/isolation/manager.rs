use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tokio::task;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{IsolationConfig, IsolationMode};
use crate::error::{IsolationError, Result};
use crate::git::GitRunner;
use crate::isolation::shadow::copy_tree;
use crate::isolation::{Context, ContextKind, FileChange, ShadowRepo, WorktreeManager};

const SUMMARY_FILE_LIMIT: usize = 20;

/// Cross-agent view of what one branch changed relative to a base ref.
#[derive(Debug, Clone, Serialize)]
pub struct BranchSummary {
    pub branch: String,
    pub files_changed: usize,
    pub insertions: usize,
    pub deletions: usize,
    /// Status-coded file lines ("M src/lib.rs"), truncated.
    pub files: Vec<String>,
    pub truncated: bool,
}

/// Orchestrator for per-agent isolation: picks a mode per context path,
/// owns the WorktreeManagers (one per repo root) and ShadowRepos created
/// under one session, and drives round/session cleanup.
pub struct IsolationContextManager {
    session_id: String,
    config: IsolationConfig,
    contexts: HashMap<PathBuf, Context>,
    worktree_managers: HashMap<PathBuf, WorktreeManager>,
    shadows: HashMap<PathBuf, ShadowRepo>,
    /// (repo root, branch) pairs created this session; deleted at session end.
    created_branches: Vec<(PathBuf, String)>,
    /// (exclude file, line) pairs this session appended; removed at session
    /// end so a caller's repo keeps no residue.
    exclude_entries: Vec<(PathBuf, String)>,
    ctx_seq: usize,
}

impl IsolationContextManager {
    pub fn new(session_id: impl Into<String>, config: IsolationConfig) -> Self {
        Self {
            session_id: session_id.into(),
            config,
            contexts: HashMap::new(),
            worktree_managers: HashMap::new(),
            shadows: HashMap::new(),
            created_branches: Vec::new(),
            exclude_entries: Vec::new(),
            ctx_seq: 0,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Gives `agent_id` a writable isolated root for `context_path`.
    /// Idempotent: re-initializing the same canonical path this session
    /// returns the existing isolated path.
    pub async fn initialize_context(
        &mut self,
        context_path: &Path,
        agent_id: &str,
    ) -> Result<PathBuf> {
        let canonical = context_path
            .canonicalize()
            .map_err(|_| IsolationError::InvalidPath(context_path.to_path_buf()))?;

        if let Some(existing) = self.contexts.get(&canonical) {
            debug!(
                path = %canonical.display(),
                isolated = %existing.isolated_path.display(),
                "Context already initialized, reusing"
            );
            return Ok(existing.isolated_path.clone());
        }

        let git_manager = WorktreeManager::new(&canonical).ok();
        let use_worktree = match (self.config.mode, git_manager.is_some()) {
            (IsolationMode::Legacy, _) => {
                info!(path = %canonical.display(), "Legacy mode, no isolation");
                self.contexts.insert(
                    canonical.clone(),
                    Context {
                        original_path: canonical.clone(),
                        isolated_path: canonical.clone(),
                        agent_id: agent_id.to_string(),
                        kind: ContextKind::Legacy,
                        round_cleaned: false,
                    },
                );
                return Ok(canonical);
            }
            (IsolationMode::Isolated, _) => false,
            (IsolationMode::Auto, in_git) => in_git,
            (IsolationMode::Worktree, true) => true,
            (IsolationMode::Worktree, false) => {
                warn!(
                    path = %canonical.display(),
                    "Worktree mode requested outside a git repo, falling back to shadow"
                );
                false
            }
        };

        let isolated = if let (true, Some(manager)) = (use_worktree, git_manager) {
            self.initialize_worktree_context(&canonical, agent_id, manager)
                .await?
        } else {
            self.initialize_shadow_context(&canonical, agent_id).await?
        };

        Ok(isolated)
    }

    async fn initialize_worktree_context(
        &mut self,
        canonical: &Path,
        agent_id: &str,
        manager: WorktreeManager,
    ) -> Result<PathBuf> {
        let repo_root = manager.repo_root().to_path_buf();
        self.worktree_managers
            .entry(repo_root.clone())
            .or_insert(manager);

        let branch = generate_branch_name(&self.config.branch_prefix);
        let target = self.next_checkout_path(&branch);
        let base_ref = baseline_ref(&repo_root, canonical).await?;

        let manager = self
            .worktree_managers
            .get(&repo_root)
            .ok_or_else(|| IsolationError::NotAGitRepository(repo_root.clone()))?;
        let checkout_root = manager.create_worktree(&target, &branch, &base_ref).await?;

        // A context covering a subtree maps to the matching subtree of the
        // new checkout, so agents see exactly the content they were given.
        let rel = canonical
            .strip_prefix(&repo_root)
            .unwrap_or(Path::new(""))
            .to_path_buf();
        let isolated = checkout_root.join(&rel);

        self.provision_scratch(&isolated).await?;
        self.created_branches
            .push((repo_root.clone(), branch.clone()));

        info!(
            session = %self.session_id,
            agent = %agent_id,
            branch = %branch,
            isolated = %isolated.display(),
            "Initialized worktree context"
        );

        self.contexts.insert(
            canonical.to_path_buf(),
            Context {
                original_path: canonical.to_path_buf(),
                isolated_path: isolated.clone(),
                agent_id: agent_id.to_string(),
                kind: ContextKind::Worktree {
                    repo_root,
                    checkout_root,
                    branch,
                    base_ref,
                },
                round_cleaned: false,
            },
        );

        Ok(isolated)
    }

    async fn initialize_shadow_context(
        &mut self,
        canonical: &Path,
        agent_id: &str,
    ) -> Result<PathBuf> {
        let mut shadow = ShadowRepo::new(canonical)?;
        let isolated = shadow.initialize().await?;
        self.provision_scratch(&isolated).await?;
        self.shadows.insert(canonical.to_path_buf(), shadow);

        info!(
            session = %self.session_id,
            agent = %agent_id,
            isolated = %isolated.display(),
            "Initialized shadow context"
        );

        self.contexts.insert(
            canonical.to_path_buf(),
            Context {
                original_path: canonical.to_path_buf(),
                isolated_path: isolated.clone(),
                agent_id: agent_id.to_string(),
                kind: ContextKind::Shadow,
                round_cleaned: false,
            },
        );

        Ok(isolated)
    }

    /// Pure lookup; `None` when no context exists for the path.
    pub fn isolated_path(&self, original: &Path) -> Option<PathBuf> {
        let key = canonical_or_self(original);
        self.contexts.get(&key).map(|c| c.isolated_path.clone())
    }

    /// Changed files in the context's isolated root relative to its
    /// baseline. Legacy contexts have no baseline and report nothing.
    pub async fn changes(&self, context_path: &Path) -> Result<Vec<FileChange>> {
        let ctx = self.context_for(context_path)?;
        match &ctx.kind {
            ContextKind::Legacy => Ok(Vec::new()),
            ContextKind::Worktree { repo_root, .. } => {
                let manager = self.manager_for(repo_root)?;
                manager
                    .changes(&ctx.isolated_path, &self.config.scratch_dir_name)
                    .await
            }
            ContextKind::Shadow => {
                let shadow = self.shadow_for(&ctx.original_path)?;
                shadow.changes(&self.config.scratch_dir_name).await
            }
        }
    }

    pub async fn diff(&self, context_path: &Path, staged: bool) -> Result<String> {
        let ctx = self.context_for(context_path)?;
        match &ctx.kind {
            ContextKind::Legacy => Ok(String::new()),
            ContextKind::Worktree { repo_root, .. } => {
                let manager = self.manager_for(repo_root)?;
                manager
                    .diff(&ctx.isolated_path, staged, &self.config.scratch_dir_name)
                    .await
            }
            ContextKind::Shadow => {
                let shadow = self.shadow_for(&ctx.original_path)?;
                shadow.diff(staged, &self.config.scratch_dir_name).await
            }
        }
    }

    /// Archives the live scratch directory into
    /// `{workspace}/.scratch_archive/{label}/` and removes it, so the next
    /// round starts with a clean scratch while working notes survive.
    pub async fn move_scratch_to_workspace(
        &self,
        context_path: &Path,
        archive_label: Option<&str>,
    ) -> Result<Option<PathBuf>> {
        let ctx = self.context_for(context_path)?;
        let scratch = ctx.isolated_path.join(&self.config.scratch_dir_name);
        if !scratch.exists() {
            return Ok(None);
        }

        let Some(workspace) = &self.config.workspace_dir else {
            warn!("No workspace configured, scratch archive skipped");
            return Ok(None);
        };

        let label = match archive_label {
            Some(label) => label.to_string(),
            None => ctx
                .branch()
                .and_then(|b| b.rsplit('/').next())
                .unwrap_or(ctx.agent_id.as_str())
                .to_string(),
        };

        let dest = workspace.join(".scratch_archive").join(&label);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }

        if fs::rename(&scratch, &dest).await.is_err() {
            // Cross-device fallback
            let from = scratch.clone();
            let to = dest.clone();
            task::spawn_blocking(move || copy_tree(&from, &to))
                .await
                .map_err(|e| IsolationError::ShadowRepo(e.to_string()))??;
            fs::remove_dir_all(&scratch).await?;
        }

        info!(
            scratch = %scratch.display(),
            archive = %dest.display(),
            "Archived scratch directory"
        );
        Ok(Some(dest))
    }

    /// Read-only summaries of what each labeled branch changed against
    /// `base_ref`, for cross-agent visibility. Branches that cannot be
    /// summarized (unknown, diff failure) are skipped with a warning.
    pub async fn generate_branch_summaries(
        &self,
        branches: &HashMap<String, String>,
        base_ref: &str,
    ) -> HashMap<String, BranchSummary> {
        let mut summaries = HashMap::new();

        for (label, branch) in branches {
            match self.summarize_branch(branch, base_ref).await {
                Ok(Some(summary)) => {
                    summaries.insert(label.clone(), summary);
                }
                Ok(None) => {
                    warn!(label = %label, branch = %branch, "Branch not found in any known repo");
                }
                Err(e) => {
                    warn!(label = %label, branch = %branch, error = %e, "Branch summary failed");
                }
            }
        }

        summaries
    }

    async fn summarize_branch(&self, branch: &str, base_ref: &str) -> Result<Option<BranchSummary>> {
        for repo_root in self.worktree_managers.keys() {
            let git = GitRunner::new(repo_root);
            if !git.branch_exists(branch).await? {
                continue;
            }

            let range = format!("{}...{}", base_ref, branch);
            let name_status = git.diff_range_name_status(&range).await?;
            let shortstat = git.diff_range_shortstat(&range).await?;
            let (files_changed, insertions, deletions) = parse_shortstat(&shortstat);

            let truncated = name_status.len() > SUMMARY_FILE_LIMIT;
            let files = name_status
                .iter()
                .take(SUMMARY_FILE_LIMIT)
                .map(|(status, path)| format!("{} {}", status, path))
                .collect();

            return Ok(Some(BranchSummary {
                branch: branch.to_string(),
                files_changed,
                insertions,
                deletions,
                files,
                truncated,
            }));
        }
        Ok(None)
    }

    /// Ends one agent turn: commits pending work on the context's branch,
    /// removes the physical checkout, keeps the branch and its commits so
    /// other agents can diff or merge them later. Idempotent.
    pub async fn cleanup_round(&mut self, context_path: &Path) {
        let key = canonical_or_self(context_path);
        let Some(ctx) = self.contexts.get_mut(&key) else {
            debug!(path = %context_path.display(), "No context for round cleanup");
            return;
        };

        if ctx.round_cleaned {
            debug!(path = %key.display(), "Round already cleaned");
            return;
        }

        let ContextKind::Worktree {
            repo_root,
            checkout_root,
            ..
        } = &ctx.kind
        else {
            // Only worktree contexts have a physical checkout to retire
            debug!(path = %key.display(), "Round cleanup is a no-op for this context");
            return;
        };
        let repo_root = repo_root.clone();
        let checkout = checkout_root.clone();

        let git = GitRunner::new(&checkout);
        let message = format!(
            "massgen round snapshot {}",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
        );
        let committed = match git.add_all().await {
            Ok(()) => git.commit(&message).await,
            Err(e) => Err(e),
        };
        match committed {
            Ok(true) => debug!(path = %checkout.display(), "Committed round snapshot"),
            Ok(false) => debug!(path = %checkout.display(), "Round ended clean, nothing to commit"),
            Err(e) => {
                // Don't discard uncommitted work; leave the checkout on disk.
                warn!(path = %checkout.display(), error = %e, "Round snapshot commit failed, keeping checkout");
                return;
            }
        }

        let removed = match self.manager_for(&repo_root) {
            Ok(manager) => match manager.remove_worktree(&checkout, true, false).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(path = %checkout.display(), error = %e, "Worktree removal failed");
                    false
                }
            },
            Err(e) => {
                warn!(error = %e, "No worktree manager for round cleanup");
                false
            }
        };

        // A failed removal leaves the context live so a later round or the
        // session teardown retries it.
        if removed {
            if let Some(ctx) = self.contexts.get_mut(&key) {
                ctx.round_cleaned = true;
            }
        }
    }

    /// Full session teardown: every physical checkout removed, every branch
    /// this session created deleted, every shadow discarded, stale metadata
    /// pruned. Each step is best-effort; failures are logged, never raised.
    /// Irreversible.
    pub async fn cleanup_session(&mut self) {
        let contexts: Vec<Context> = self.contexts.drain().map(|(_, c)| c).collect();
        for ctx in &contexts {
            if ctx.round_cleaned {
                continue;
            }
            if let ContextKind::Worktree {
                repo_root,
                checkout_root,
                ..
            } = &ctx.kind
            {
                match self.manager_for(repo_root) {
                    Ok(manager) => {
                        if let Err(e) = manager.remove_worktree(checkout_root, true, false).await {
                            warn!(
                                path = %checkout_root.display(),
                                error = %e,
                                "Worktree removal failed during session cleanup"
                            );
                        }
                    }
                    Err(e) => warn!(error = %e, "No worktree manager during session cleanup"),
                }
            }
        }

        for (repo_root, branch) in self.created_branches.drain(..) {
            let git = GitRunner::new(&repo_root);
            // An in-place workspace branch is still checked out at its repo
            // root; git refuses the delete until HEAD moves off it.
            if let Ok(Some(current)) = git.current_branch().await {
                if current == branch {
                    if let Err(e) = git.detach_head().await {
                        warn!(branch = %branch, error = %e, "Detach before branch delete failed");
                    }
                }
            }
            match git.delete_branch(&branch, true).await {
                Ok(true) => info!(branch = %branch, "Deleted session branch"),
                Ok(false) => warn!(branch = %branch, "Session branch delete refused"),
                Err(e) => warn!(branch = %branch, error = %e, "Session branch delete failed"),
            }
        }

        // Strip the scratch exclude lines appended to shared exclude files.
        // Only lines this session wrote are removed; pre-existing user
        // entries stay untouched.
        for (file, line) in self.exclude_entries.drain(..) {
            let Ok(content) = fs::read_to_string(&file).await else {
                continue;
            };
            let filtered: String = content
                .lines()
                .filter(|l| l.trim() != line)
                .map(|l| format!("{}\n", l))
                .collect();
            if filtered != content {
                if let Err(e) = fs::write(&file, filtered).await {
                    warn!(file = %file.display(), error = %e, "Exclude entry cleanup failed");
                }
            }
        }

        for (_, mut shadow) in self.shadows.drain() {
            shadow.cleanup().await;
        }

        for manager in self.worktree_managers.values() {
            if let Err(e) = manager.prune().await {
                warn!(
                    repo = %manager.repo_root().display(),
                    error = %e,
                    "Worktree prune failed"
                );
            }
        }
        self.worktree_managers.clear();

        info!(session = %self.session_id, "Session cleanup complete");
    }

    /// Alias for `cleanup_session`, for call sites that tear down on drop
    /// paths and crash recovery.
    pub async fn cleanup_all(&mut self) {
        self.cleanup_session().await;
    }

    /// Crash-recovery sweep: deletes leftover generated branches in
    /// `repo_path` that are not checked out in any live worktree. Matches
    /// only `{branch_prefix}/*` names; user branches are never touched.
    pub async fn cleanup_orphaned_branches(
        repo_path: &Path,
        branch_prefix: &str,
    ) -> Result<Vec<String>> {
        let manager = WorktreeManager::new(repo_path)?;
        let git = GitRunner::new(manager.repo_root());

        let live: Vec<String> = manager
            .list_worktrees()
            .await?
            .into_iter()
            .filter_map(|w| w.branch)
            .collect();

        let pattern = format!("{}/", branch_prefix);
        let mut deleted = Vec::new();
        for branch in git.list_branches_with_prefix(&pattern).await? {
            if live.contains(&branch) {
                continue;
            }
            if git.delete_branch(&branch, true).await? {
                warn!(branch = %branch, "Deleted orphaned branch");
                deleted.push(branch);
            }
        }

        Ok(deleted)
    }

    /// For agents that own only their workspace with no external source
    /// tree: git-initializes the workspace in place (if needed), creates
    /// and checks out a labeled branch directly, and provisions scratch.
    /// Returns the branch name.
    pub async fn setup_workspace_scratch(
        &mut self,
        workspace: &Path,
        agent_id: &str,
    ) -> Result<String> {
        let workspace = workspace
            .canonicalize()
            .map_err(|_| IsolationError::InvalidPath(workspace.to_path_buf()))?;
        let git = GitRunner::new(&workspace);

        if WorktreeManager::new(&workspace).is_err() {
            git.init().await?;
            git.set_identity("MassGen", "massgen@localhost").await?;
        }
        if !git.has_commits().await? {
            git.add_all().await?;
            if !git.commit("workspace initial state").await? {
                git.commit_allow_empty("workspace initial state").await?;
            }
        }

        let branch = labeled_branch_name(agent_id);
        git.checkout_new_branch(&branch).await?;
        self.provision_scratch(&workspace).await?;
        self.created_branches.push((workspace.clone(), branch.clone()));

        info!(
            workspace = %workspace.display(),
            branch = %branch,
            "Workspace set up in place"
        );

        self.contexts.insert(
            workspace.clone(),
            Context {
                original_path: workspace.clone(),
                isolated_path: workspace.clone(),
                agent_id: agent_id.to_string(),
                kind: ContextKind::Worktree {
                    repo_root: workspace.clone(),
                    checkout_root: workspace.clone(),
                    branch: branch.clone(),
                    base_ref: "HEAD".to_string(),
                },
                // The workspace is not a linked checkout; nothing physical
                // to remove at round or session end.
                round_cleaned: true,
            },
        );
        if !self.worktree_managers.contains_key(&workspace) {
            self.worktree_managers
                .insert(workspace.clone(), WorktreeManager::new(&workspace)?);
        }

        Ok(branch)
    }

    /// Live contexts, for callers coordinating across agents.
    pub fn contexts(&self) -> impl Iterator<Item = &Context> {
        self.contexts.values()
    }

    fn context_for(&self, context_path: &Path) -> Result<&Context> {
        let key = canonical_or_self(context_path);
        self.contexts
            .get(&key)
            .ok_or(IsolationError::ContextNotFound(key))
    }

    fn manager_for(&self, repo_root: &Path) -> Result<&WorktreeManager> {
        self.worktree_managers
            .get(repo_root)
            .ok_or_else(|| IsolationError::NotAGitRepository(repo_root.to_path_buf()))
    }

    fn shadow_for(&self, original: &Path) -> Result<&ShadowRepo> {
        self.shadows
            .get(original)
            .ok_or_else(|| IsolationError::ContextNotFound(original.to_path_buf()))
    }

    fn next_checkout_path(&mut self, branch: &str) -> PathBuf {
        let target = match &self.config.workspace_dir {
            Some(workspace) => workspace
                .join(".worktree")
                .join(format!("ctx_{}", self.ctx_seq)),
            None => {
                // No workspace (e.g. containerized execution); the suffix
                // keeps concurrent sessions apart in the shared temp dir.
                let suffix = branch.rsplit('/').next().unwrap_or(branch);
                std::env::temp_dir().join(format!("massgen_ctx_{}", suffix))
            }
        };
        self.ctx_seq += 1;
        target
    }

    /// Creates `.massgen_scratch/` inside `root` and registers it in the
    /// checkout's local git exclude file, keeping it out of status, diffs,
    /// and change application. For a linked worktree that file is the main
    /// repository's shared `info/exclude`, so the appended line is recorded
    /// and removed again at session end. Pre-existing lines are never
    /// touched.
    async fn provision_scratch(&mut self, root: &Path) -> Result<()> {
        let scratch = root.join(&self.config.scratch_dir_name);
        fs::create_dir_all(&scratch).await?;

        let exclude_file = GitRunner::new(root).exclude_path().await?;
        if let Some(parent) = exclude_file.parent() {
            fs::create_dir_all(parent).await?;
        }

        let line = format!("{}/", self.config.scratch_dir_name);
        let existing = fs::read_to_string(&exclude_file).await.unwrap_or_default();
        if !existing.lines().any(|l| l.trim() == line) {
            let mut content = existing;
            if !content.is_empty() && !content.ends_with('\n') {
                content.push('\n');
            }
            content.push_str(&line);
            content.push('\n');
            fs::write(&exclude_file, content).await?;
            self.exclude_entries.push((exclude_file.clone(), line));
        }

        debug!(scratch = %scratch.display(), "Provisioned scratch directory");
        Ok(())
    }
}

/// Builds the worktree base commit. A plain `worktree add` checks out a
/// committed ref, so live uncommitted edits would be invisible to the new
/// checkout; when the tree is dirty under the context prefix, this
/// materializes that dirty state as a commit on a temporary index, leaving
/// the caller's real index, HEAD, and branches untouched. The commit is
/// intentionally left dangling; it becomes unreachable (and gc-able) once
/// the worktree branch is deleted.
async fn baseline_ref(repo_root: &Path, context_path: &Path) -> Result<String> {
    let git = GitRunner::new(repo_root);

    let rel = context_path
        .strip_prefix(repo_root)
        .unwrap_or_else(|_| Path::new(""));
    let prefix = match rel.to_str() {
        Some("") | None => ".",
        Some(p) => p,
    };

    if git.status_porcelain(Some(prefix)).await?.is_empty() {
        return git.head_commit().await;
    }

    let index_dir = tempfile::Builder::new().prefix("massgen_index_").tempdir()?;
    let index_file = index_dir.path().join("index");

    git.read_tree_into_index("HEAD", &index_file).await?;
    git.add_all_into_index(prefix, &index_file).await?;
    let tree = git.write_tree_from_index(&index_file).await?;
    let commit = git
        .commit_tree(&tree, "HEAD", "massgen baseline snapshot")
        .await?;

    debug!(commit = %commit, prefix = %prefix, "Mirrored dirty state into baseline commit");
    Ok(commit)
}

fn generate_branch_name(prefix: &str) -> String {
    format!("{}/{}", prefix, random_suffix())
}

fn labeled_branch_name(label: &str) -> String {
    format!("{}_{}", label, random_suffix())
}

/// Random 8-hex suffix. Randomness, not a counter, is what keeps
/// concurrent sessions sharing one repo from colliding.
fn random_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn canonical_or_self(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn parse_shortstat(raw: &str) -> (usize, usize, usize) {
    let mut files = 0;
    let mut insertions = 0;
    let mut deletions = 0;

    for segment in raw.split(',') {
        let segment = segment.trim();
        let Some(count) = segment
            .split_whitespace()
            .next()
            .and_then(|n| n.parse::<usize>().ok())
        else {
            continue;
        };
        if segment.contains("file") {
            files = count;
        } else if segment.contains("insertion") {
            insertions = count;
        } else if segment.contains("deletion") {
            deletions = count;
        }
    }

    (files, insertions, deletions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_name_shape() {
        let name = generate_branch_name("massgen");
        let suffix = name.strip_prefix("massgen/").unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_labeled_branch_name_shape() {
        let name = labeled_branch_name("agent_a");
        let suffix = name.strip_prefix("agent_a_").unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_branch_names_are_unique() {
        let a = generate_branch_name("massgen");
        let b = generate_branch_name("massgen");
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_shortstat_full() {
        let (files, ins, del) =
            parse_shortstat(" 3 files changed, 10 insertions(+), 2 deletions(-)");
        assert_eq!((files, ins, del), (3, 10, 2));
    }

    #[test]
    fn test_parse_shortstat_partial() {
        let (files, ins, del) = parse_shortstat(" 1 file changed, 5 deletions(-)");
        assert_eq!((files, ins, del), (1, 0, 5));
    }

    #[test]
    fn test_parse_shortstat_empty() {
        assert_eq!(parse_shortstat(""), (0, 0, 0));
    }
}
