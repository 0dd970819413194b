//! Worktree materialization behind a trait

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::git::{GitManager, worktree_dir_name};

/// Creates and removes worktrees for a repository. Calls block and are
/// made from a blocking thread.
pub trait WorktreeProvider: Send + Sync {
    /// Branch new worktrees are based on
    fn default_branch(&self, repo: &Path) -> Result<String>;

    /// Where the worktree for `branch` would be created
    fn worktree_path(&self, repo: &Path, branch: &str) -> PathBuf;

    /// Create `branch` from `base` in a fresh worktree; returns its path
    fn create(&self, repo: &Path, branch: &str, base: &str) -> Result<PathBuf>;

    /// Remove the worktree and delete its branch
    fn remove(&self, repo: &Path, worktree: &Path, branch: &str) -> Result<()>;
}

/// Worktrees managed with the `git` command line
#[derive(Debug, Clone)]
pub struct GitWorktrees {
    worktrees_dir: PathBuf,
}

impl GitWorktrees {
    /// `worktrees_dir` is relative to each repository root
    pub fn new(worktrees_dir: impl Into<PathBuf>) -> Self {
        Self {
            worktrees_dir: worktrees_dir.into(),
        }
    }

    fn manager(&self, repo: &Path) -> Result<GitManager> {
        GitManager::with_worktrees_dir(repo, &self.worktrees_dir)
    }
}

impl WorktreeProvider for GitWorktrees {
    fn default_branch(&self, repo: &Path) -> Result<String> {
        self.manager(repo)?.default_branch()
    }

    fn worktree_path(&self, repo: &Path, branch: &str) -> PathBuf {
        repo.join(&self.worktrees_dir).join(worktree_dir_name(branch))
    }

    fn create(&self, repo: &Path, branch: &str, base: &str) -> Result<PathBuf> {
        self.manager(repo)?.create_worktree(branch, base)
    }

    fn remove(&self, repo: &Path, worktree: &Path, branch: &str) -> Result<()> {
        self.manager(repo)?.remove_worktree(worktree, Some(branch))
    }
}
