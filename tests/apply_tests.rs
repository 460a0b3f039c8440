mod common;

use massgen_isolation::ChangeApplier;

use common::*;

#[tokio::test]
async fn test_summary_then_allowlisted_apply() {
    init_logging();
    let source = git_repo_fixture();
    write_file(source.path(), "a.txt", "edited a\n");
    write_file(source.path(), "src/lib.rs", "pub fn answer() -> u32 { 43 }\n");

    let applier = ChangeApplier::new();
    let summary = applier.changes_summary(source.path()).await.unwrap();
    assert_eq!(summary.modified.len(), 2);
    assert!(summary.modified.contains(&"a.txt".to_string()));
    assert!(summary.modified.contains(&"src/lib.rs".to_string()));
    assert!(summary.added.is_empty());
    assert!(summary.deleted.is_empty());

    let target = tempfile::tempdir().unwrap();
    write_file(target.path(), "a.txt", "alpha\n");
    write_file(target.path(), "src/lib.rs", "pub fn answer() -> u32 { 42 }\n");

    let approved = vec!["a.txt".to_string()];
    let applied = applier
        .apply_changes(source.path(), target.path(), Some(&approved))
        .await
        .unwrap();

    // Only the approved file came back, even though both were modified
    assert_eq!(applied, vec!["a.txt".to_string()]);
    assert_eq!(read_file(target.path(), "a.txt"), "edited a\n");
    assert_eq!(
        read_file(target.path(), "src/lib.rs"),
        "pub fn answer() -> u32 { 42 }\n"
    );
}

#[tokio::test]
async fn test_apply_propagates_deletions() {
    init_logging();
    let source = git_repo_fixture();
    std::fs::remove_file(source.path().join("a.txt")).unwrap();

    let target = tempfile::tempdir().unwrap();
    write_file(target.path(), "a.txt", "alpha\n");

    let applied = ChangeApplier::new()
        .apply_changes(source.path(), target.path(), None)
        .await
        .unwrap();

    assert_eq!(applied, vec!["a.txt".to_string()]);
    assert!(!target.path().join("a.txt").exists());
}

/// The same edit set driven once through the git path and once through
/// the byte-compare fallback must produce the same result.
#[tokio::test]
async fn test_git_and_fallback_paths_agree() {
    init_logging();
    let applier = ChangeApplier::new();

    // Git path: committed v1, working tree v2 + new file
    let git_source = tempfile::tempdir().unwrap();
    git(git_source.path(), &["init", "-b", "main"]);
    git(git_source.path(), &["config", "user.name", "Test"]);
    git(git_source.path(), &["config", "user.email", "test@example.com"]);
    write_file(git_source.path(), "a.txt", "v1");
    git(git_source.path(), &["add", "-A"]);
    git(git_source.path(), &["commit", "-m", "initial"]);
    write_file(git_source.path(), "a.txt", "v2");
    write_file(git_source.path(), "b.txt", "new");

    let git_target = tempfile::tempdir().unwrap();
    write_file(git_target.path(), "a.txt", "v1");

    let from_git = applier
        .apply_changes(git_source.path(), git_target.path(), None)
        .await
        .unwrap();

    // Fallback path: plain directory with the same final content
    let plain_source = tempfile::tempdir().unwrap();
    write_file(plain_source.path(), "a.txt", "v2");
    write_file(plain_source.path(), "b.txt", "new");

    let plain_target = tempfile::tempdir().unwrap();
    write_file(plain_target.path(), "a.txt", "v1");

    let from_fallback = applier
        .apply_changes(plain_source.path(), plain_target.path(), None)
        .await
        .unwrap();

    assert_eq!(from_git, vec!["a.txt".to_string(), "b.txt".to_string()]);
    assert_eq!(from_git, from_fallback);
    assert_eq!(read_file(git_target.path(), "a.txt"), "v2");
    assert_eq!(read_file(plain_target.path(), "a.txt"), "v2");
    assert_eq!(read_file(plain_target.path(), "b.txt"), "new");
}

#[tokio::test]
async fn test_fallback_skips_unchanged_files() {
    init_logging();
    let source = tempfile::tempdir().unwrap();
    write_file(source.path(), "same.txt", "identical");
    write_file(source.path(), "diff.txt", "updated");

    let target = tempfile::tempdir().unwrap();
    write_file(target.path(), "same.txt", "identical");
    write_file(target.path(), "diff.txt", "stale");

    let applied = ChangeApplier::new()
        .apply_changes(source.path(), target.path(), None)
        .await
        .unwrap();

    assert_eq!(applied, vec!["diff.txt".to_string()]);
}

#[tokio::test]
async fn test_scratch_never_applied_on_git_path() {
    init_logging();
    let source = git_repo_fixture();
    write_file(source.path(), ".massgen_scratch/notes.md", "private");
    write_file(source.path(), "real.txt", "public");

    let target = tempfile::tempdir().unwrap();
    let applied = ChangeApplier::new()
        .apply_changes(source.path(), target.path(), None)
        .await
        .unwrap();

    assert_eq!(applied, vec!["real.txt".to_string()]);
    assert!(!target.path().join(".massgen_scratch").exists());
}

#[tokio::test]
async fn test_scratch_and_git_dir_skipped_by_fallback() {
    init_logging();
    // A directory named .git that is not a usable repo forces the fallback
    let source = tempfile::tempdir().unwrap();
    write_file(source.path(), ".git/not-a-repo", "junk");
    write_file(source.path(), ".massgen_scratch/notes.md", "private");
    write_file(source.path(), "real.txt", "public");

    let target = tempfile::tempdir().unwrap();
    let applied = ChangeApplier::new()
        .apply_changes(source.path(), target.path(), None)
        .await
        .unwrap();

    assert_eq!(applied, vec!["real.txt".to_string()]);
    assert!(!target.path().join(".git").exists());
    assert!(!target.path().join(".massgen_scratch").exists());
}

#[tokio::test]
async fn test_summary_of_plain_dir_is_empty() {
    init_logging();
    let source = tempfile::tempdir().unwrap();
    write_file(source.path(), "a.txt", "whatever");

    let summary = ChangeApplier::new()
        .changes_summary(source.path())
        .await
        .unwrap();
    assert!(summary.is_empty());
}

#[tokio::test]
async fn test_custom_scratch_dir_name_is_honored() {
    init_logging();
    let source = git_repo_fixture();
    write_file(source.path(), ".agent_scratch/tmp.md", "x");
    write_file(source.path(), "real.txt", "y");

    let target = tempfile::tempdir().unwrap();
    let applied = ChangeApplier::new()
        .with_scratch_dir(".agent_scratch")
        .apply_changes(source.path(), target.path(), None)
        .await
        .unwrap();

    assert_eq!(applied, vec!["real.txt".to_string()]);
}
