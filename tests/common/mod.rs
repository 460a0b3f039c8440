#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

pub fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Runs a git command in `dir`, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap_or_else(|e| panic!("failed to spawn git {:?}: {}", args, e));
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

pub fn read_file(root: &Path, rel: &str) -> String {
    std::fs::read_to_string(root.join(rel)).unwrap()
}

/// Git repo on branch `main` with two committed files:
/// `a.txt` = "alpha\n" and `src/lib.rs`.
pub fn git_repo_fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    git(root, &["init", "-b", "main"]);
    git(root, &["config", "user.name", "Test"]);
    git(root, &["config", "user.email", "test@example.com"]);
    write_file(root, "a.txt", "alpha\n");
    write_file(root, "src/lib.rs", "pub fn answer() -> u32 { 42 }\n");
    git(root, &["add", "-A"]);
    git(root, &["commit", "-m", "initial"]);
    dir
}

/// Plain (non-git) directory with `a.txt` = "v1".
pub fn plain_dir_fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.txt", "v1");
    dir
}

pub fn branch_names(repo: &Path) -> Vec<String> {
    git(repo, &["branch", "--list"])
        .lines()
        .map(|l| l.trim().trim_start_matches("* ").trim_start_matches("+ ").to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

pub fn current_branch(repo: &Path) -> String {
    git(repo, &["symbolic-ref", "--short", "HEAD"])
        .trim()
        .to_string()
}
