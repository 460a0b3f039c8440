use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IsolationError {
    #[error("Not a git repository: {0}")]
    NotAGitRepository(PathBuf),

    #[error("Worktree creation failed: {message}")]
    WorktreeCreation { message: String, path: PathBuf },

    #[error("Shadow repository error: {0}")]
    ShadowRepo(String),

    #[error("No isolation context for path: {0}")]
    ContextNotFound(PathBuf),

    #[error("Invalid context path: {0}")]
    InvalidPath(PathBuf),

    #[error("Git command {args:?} failed: {stderr}")]
    GitCommand { args: Vec<String>, stderr: String },

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, IsolationError>;
