use std::path::{Path, PathBuf};
use std::process::Output;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{IsolationError, Result};

/// One entry from `git worktree list --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeInfo {
    pub path: PathBuf,
    pub head: String,
    /// `None` for a detached HEAD.
    pub branch: Option<String>,
}

/// One entry from `git status --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Two-character XY status code.
    pub code: String,
    pub path: String,
}

pub struct GitRunner {
    working_dir: PathBuf,
}

impl GitRunner {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub async fn run(&self, args: &[&str]) -> Result<Output> {
        self.run_with_env(args, &[]).await
    }

    pub async fn run_with_env(&self, args: &[&str], envs: &[(&str, &str)]) -> Result<Output> {
        debug!(args = ?args, dir = %self.working_dir.display(), "Running git command");

        let mut command = Command::new("git");
        command.args(args).current_dir(&self.working_dir);
        for (key, value) in envs {
            command.env(key, value);
        }

        let output = command.output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(args = ?args, stderr = %stderr, "Git command failed");
        }

        Ok(output)
    }

    pub async fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IsolationError::GitCommand {
                args: args.iter().map(|s| s.to_string()).collect(),
                stderr: stderr.to_string(),
            });
        }

        Ok(output)
    }

    pub async fn init(&self) -> Result<()> {
        self.run_checked(&["init"]).await?;
        Ok(())
    }

    /// Sets a repo-local commit identity so commits work in environments
    /// without a global git config (CI, containers).
    pub async fn set_identity(&self, name: &str, email: &str) -> Result<()> {
        self.run_checked(&["config", "user.name", name]).await?;
        self.run_checked(&["config", "user.email", email]).await?;
        Ok(())
    }

    pub async fn add_all(&self) -> Result<()> {
        self.run_checked(&["add", "-A"]).await?;
        Ok(())
    }

    /// Returns `false` when there was nothing to commit.
    pub async fn commit(&self, message: &str) -> Result<bool> {
        let output = self.run(&["commit", "-m", message]).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            if stderr.contains("nothing to commit") || stdout.contains("nothing to commit") {
                return Ok(false);
            }
            return Err(IsolationError::GitCommand {
                args: vec!["commit".into()],
                stderr: format!("{}{}", stdout, stderr),
            });
        }

        Ok(true)
    }

    pub async fn commit_allow_empty(&self, message: &str) -> Result<()> {
        self.run_checked(&["commit", "--allow-empty", "-m", message])
            .await?;
        Ok(())
    }

    pub async fn toplevel(&self) -> Result<PathBuf> {
        let output = self.run_checked(&["rev-parse", "--show-toplevel"]).await?;
        Ok(PathBuf::from(stdout_str(&output).trim()))
    }

    pub async fn head_commit(&self) -> Result<String> {
        let output = self.run_checked(&["rev-parse", "HEAD"]).await?;
        Ok(stdout_str(&output).trim().to_string())
    }

    pub async fn has_commits(&self) -> Result<bool> {
        let output = self.run(&["rev-parse", "--verify", "HEAD"]).await?;
        Ok(output.status.success())
    }

    /// Porcelain status, optionally restricted to a pathspec prefix.
    pub async fn status_porcelain(&self, prefix: Option<&str>) -> Result<Vec<StatusEntry>> {
        let mut args = vec!["status", "--porcelain"];
        if let Some(prefix) = prefix {
            args.push("--");
            args.push(prefix);
        }
        let output = self.run_checked(&args).await?;
        Ok(parse_status_porcelain(&stdout_str(&output)))
    }

    /// Unified diff, restricted to the working directory and with paths
    /// shown relative to it. `exclude` entries become `:(exclude)`
    /// pathspecs.
    pub async fn diff(&self, staged: bool, exclude: &[&str]) -> Result<String> {
        let mut owned = Vec::new();
        let mut args = vec!["diff", "--relative"];
        if staged {
            args.push("--staged");
        }
        if !exclude.is_empty() {
            args.push("--");
            args.push(".");
            for pattern in exclude {
                owned.push(format!(":(exclude){}", pattern));
            }
            args.extend(owned.iter().map(|s| s.as_str()));
        }
        let output = self.run_checked(&args).await?;
        Ok(stdout_str(&output))
    }

    /// Name-status diff, restricted to the working directory with paths
    /// relative to it; `base = None` diffs the working tree against the
    /// index, `Some(ref)` diffs against that ref.
    pub async fn diff_name_status(&self, base: Option<&str>) -> Result<Vec<(char, String)>> {
        let mut args = vec!["diff", "--name-status", "--relative"];
        if let Some(base) = base {
            args.push(base);
        }
        let output = self.run_checked(&args).await?;
        Ok(parse_name_status(&stdout_str(&output)))
    }

    pub async fn diff_range_name_status(&self, range: &str) -> Result<Vec<(char, String)>> {
        let output = self
            .run_checked(&["diff", "--name-status", range])
            .await?;
        Ok(parse_name_status(&stdout_str(&output)))
    }

    pub async fn diff_range_shortstat(&self, range: &str) -> Result<String> {
        let output = self.run_checked(&["diff", "--shortstat", range]).await?;
        Ok(stdout_str(&output).trim().to_string())
    }

    /// Untracked files, honoring ignore rules and the local exclude file.
    pub async fn list_untracked(&self) -> Result<Vec<String>> {
        let output = self
            .run_checked(&["ls-files", "--others", "--exclude-standard"])
            .await?;
        Ok(stdout_str(&output)
            .lines()
            .map(str::to_string)
            .filter(|l| !l.is_empty())
            .collect())
    }

    pub async fn branch_exists(&self, branch: &str) -> Result<bool> {
        let output = self
            .run(&["rev-parse", "--verify", &format!("refs/heads/{}", branch)])
            .await?;
        Ok(output.status.success())
    }

    /// Returns whether the branch was actually deleted. A soft delete is
    /// refused by git on unmerged commits; that refusal is reported as
    /// `Ok(false)`, never as an error.
    pub async fn delete_branch(&self, branch: &str, force: bool) -> Result<bool> {
        let flag = if force { "-D" } else { "-d" };
        let output = self.run(&["branch", flag, branch]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(branch = %branch, stderr = %stderr.trim(), "Branch delete refused");
        }
        Ok(output.status.success())
    }

    pub async fn list_branches_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let output = self
            .run_checked(&["branch", "--list", &format!("{}*", prefix)])
            .await?;
        Ok(stdout_str(&output)
            .lines()
            .map(|l| l.trim().trim_start_matches("* ").trim_start_matches("+ ").to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }

    pub async fn checkout_new_branch(&self, branch: &str) -> Result<()> {
        self.run_checked(&["checkout", "-b", branch]).await?;
        Ok(())
    }

    /// The currently checked-out branch, `None` for a detached HEAD.
    pub async fn current_branch(&self) -> Result<Option<String>> {
        let output = self.run_checked(&["branch", "--show-current"]).await?;
        let name = stdout_str(&output).trim().to_string();
        Ok((!name.is_empty()).then_some(name))
    }

    pub async fn detach_head(&self) -> Result<()> {
        self.run_checked(&["checkout", "--detach"]).await?;
        Ok(())
    }

    pub async fn worktree_add(&self, path: &Path, branch: &str, base: &str) -> Result<()> {
        let path_str = path_str(path)?;
        let output = self
            .run(&["worktree", "add", "-b", branch, path_str, base])
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IsolationError::WorktreeCreation {
                message: stderr.trim().to_string(),
                path: path.to_path_buf(),
            });
        }

        Ok(())
    }

    pub async fn worktree_remove(&self, path: &Path, force: bool) -> Result<()> {
        let path_str = path_str(path)?;
        let mut args = vec!["worktree", "remove"];
        if force {
            args.push("--force");
        }
        args.push(path_str);

        self.run_checked(&args).await?;
        Ok(())
    }

    pub async fn worktree_list(&self) -> Result<Vec<WorktreeInfo>> {
        let output = self.run_checked(&["worktree", "list", "--porcelain"]).await?;
        Ok(parse_worktree_porcelain(&stdout_str(&output)))
    }

    pub async fn worktree_prune(&self) -> Result<()> {
        self.run_checked(&["worktree", "prune"]).await?;
        Ok(())
    }

    /// Resolves the local exclude file governing this checkout, wherever
    /// git keeps it for the repository (linked worktrees share the common
    /// dir's `info/exclude`).
    pub async fn exclude_path(&self) -> Result<PathBuf> {
        let output = self
            .run_checked(&["rev-parse", "--git-path", "info/exclude"])
            .await?;
        let raw = stdout_str(&output).trim().to_string();
        let path = PathBuf::from(raw);
        if path.is_absolute() {
            Ok(path)
        } else {
            Ok(self.working_dir.join(path))
        }
    }

    // Temporary-index plumbing. These run against a caller-supplied index
    // file so the repository's real index is never touched.

    pub async fn read_tree_into_index(&self, treeish: &str, index_file: &Path) -> Result<()> {
        let index = path_str(index_file)?;
        let output = self
            .run_with_env(&["read-tree", treeish], &[("GIT_INDEX_FILE", index)])
            .await?;
        check(output, &["read-tree"])
    }

    pub async fn add_all_into_index(&self, prefix: &str, index_file: &Path) -> Result<()> {
        let index = path_str(index_file)?;
        let output = self
            .run_with_env(&["add", "-A", "--", prefix], &[("GIT_INDEX_FILE", index)])
            .await?;
        check(output, &["add"])
    }

    pub async fn write_tree_from_index(&self, index_file: &Path) -> Result<String> {
        let index = path_str(index_file)?;
        let output = self
            .run_with_env(&["write-tree"], &[("GIT_INDEX_FILE", index)])
            .await?;
        let output = checked(output, &["write-tree"])?;
        Ok(stdout_str(&output).trim().to_string())
    }

    /// Identity is pinned via the environment so throwaway snapshot
    /// commits work even in repos without a configured user.
    pub async fn commit_tree(&self, tree: &str, parent: &str, message: &str) -> Result<String> {
        let output = self
            .run_with_env(
                &["commit-tree", tree, "-p", parent, "-m", message],
                &[
                    ("GIT_AUTHOR_NAME", "MassGen"),
                    ("GIT_AUTHOR_EMAIL", "massgen@localhost"),
                    ("GIT_COMMITTER_NAME", "MassGen"),
                    ("GIT_COMMITTER_EMAIL", "massgen@localhost"),
                ],
            )
            .await?;
        let output = checked(output, &["commit-tree"])?;
        Ok(stdout_str(&output).trim().to_string())
    }
}

fn stdout_str(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| IsolationError::InvalidPath(path.to_path_buf()))
}

fn check(output: Output, args: &[&str]) -> Result<()> {
    checked(output, args).map(|_| ())
}

fn checked(output: Output, args: &[&str]) -> Result<Output> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(IsolationError::GitCommand {
            args: args.iter().map(|s| s.to_string()).collect(),
            stderr,
        });
    }
    Ok(output)
}

fn parse_status_porcelain(raw: &str) -> Vec<StatusEntry> {
    raw.lines()
        .filter(|line| line.len() > 3)
        .map(|line| {
            let code = line[..2].to_string();
            let rest = line[3..].trim();
            // Renames are reported as "old -> new"; the new path is the one
            // that exists on disk.
            let path = match rest.split_once(" -> ") {
                Some((_, new)) => new,
                None => rest,
            };
            StatusEntry {
                code,
                path: unquote(path),
            }
        })
        .collect()
}

fn parse_name_status(raw: &str) -> Vec<(char, String)> {
    raw.lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let status = fields.next()?.chars().next()?;
            // R100/C75 lines carry old and new paths; keep the new one.
            let path = match status {
                'R' | 'C' => fields.nth(1)?,
                _ => fields.next()?,
            };
            Some((status, unquote(path)))
        })
        .collect()
}

fn parse_worktree_porcelain(raw: &str) -> Vec<WorktreeInfo> {
    let mut result = Vec::new();
    for block in raw.split("\n\n") {
        let mut path = None;
        let mut head = String::new();
        let mut branch = None;
        for line in block.lines() {
            if let Some(value) = line.strip_prefix("worktree ") {
                path = Some(PathBuf::from(value));
            } else if let Some(value) = line.strip_prefix("HEAD ") {
                head = value.to_string();
            } else if let Some(value) = line.strip_prefix("branch ") {
                branch = Some(
                    value
                        .strip_prefix("refs/heads/")
                        .unwrap_or(value)
                        .to_string(),
                );
            }
        }
        if let Some(path) = path {
            result.push(WorktreeInfo { path, head, branch });
        }
    }
    result
}

fn unquote(path: &str) -> String {
    // git quotes paths containing special characters
    path.trim_matches('"').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_worktree_porcelain() {
        let raw = "worktree /repo\n\
                   HEAD aaaa1111\n\
                   branch refs/heads/main\n\
                   \n\
                   worktree /tmp/ctx_0\n\
                   HEAD bbbb2222\n\
                   branch refs/heads/massgen/1a2b3c4d\n\
                   \n\
                   worktree /tmp/detached\n\
                   HEAD cccc3333\n\
                   detached\n";
        let parsed = parse_worktree_porcelain(raw);
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].branch.as_deref(), Some("main"));
        assert_eq!(parsed[1].path, PathBuf::from("/tmp/ctx_0"));
        assert_eq!(parsed[1].branch.as_deref(), Some("massgen/1a2b3c4d"));
        assert_eq!(parsed[2].branch, None);
    }

    #[test]
    fn test_parse_worktree_porcelain_empty() {
        assert!(parse_worktree_porcelain("").is_empty());
    }

    #[test]
    fn test_parse_status_porcelain() {
        let raw = " M src/lib.rs\n?? notes.txt\nD  gone.rs\nR  old.rs -> new.rs\n";
        let parsed = parse_status_porcelain(raw);
        assert_eq!(parsed.len(), 4);
        assert_eq!(parsed[0].code, " M");
        assert_eq!(parsed[0].path, "src/lib.rs");
        assert_eq!(parsed[1].code, "??");
        assert_eq!(parsed[3].path, "new.rs");
    }

    #[test]
    fn test_parse_name_status() {
        let raw = "M\ta.txt\nA\tb.txt\nD\tc.txt\nR100\told.txt\tnew.txt\n";
        let parsed = parse_name_status(raw);
        assert_eq!(parsed.len(), 4);
        assert_eq!(parsed[0], ('M', "a.txt".to_string()));
        assert_eq!(parsed[2], ('D', "c.txt".to_string()));
        assert_eq!(parsed[3], ('R', "new.txt".to_string()));
    }
}
