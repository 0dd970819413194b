//! Git manager implementation

mod types;
mod worktree;


pub use types::{WorktreeInfo, parse_worktrees};

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Find the git repository root for a given path.
/// Returns None if the path is not inside a git repository.
pub fn find_git_root(path: &Path) -> Option<PathBuf> {
    let start_dir = if path.is_file() { path.parent()? } else { path };

    let output = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .current_dir(start_dir)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if root.is_empty() {
        None
    } else {
        Some(PathBuf::from(root))
    }
}

/// Shells out to `git` for the handful of operations wsmux needs:
/// worktree enumeration, creation and removal.
#[derive(Debug, Clone)]
pub struct GitManager {
    /// Root directory of the repository
    root: PathBuf,

    /// Base directory for worktrees
    pub(super) worktrees_dir: PathBuf,
}

impl GitManager {
    /// Create a git manager placing worktrees under `.wsmux/worktrees`
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_worktrees_dir(root, ".wsmux/worktrees")
    }

    /// Create a git manager with a custom worktree directory (relative to the root)
    pub fn with_worktrees_dir(root: impl Into<PathBuf>, worktrees_dir: impl AsRef<Path>) -> Result<Self> {
        let root = root.into();

        if !root.join(".git").exists() {
            bail!("Not a git repository: {}", root.display());
        }

        let worktrees_dir = root.join(worktrees_dir);

        Ok(Self {
            root,
            worktrees_dir,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check if the repository has at least one commit
    pub fn has_commits(&self) -> bool {
        Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(&self.root)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Get the current branch name
    pub fn current_branch(&self) -> Result<String> {
        self.git_stdout(&["rev-parse", "--abbrev-ref", "HEAD"])
            .context("Failed to get current branch")
    }

    /// Branch new worktrees start from: `origin/HEAD` if a remote is set up,
    /// otherwise whatever is checked out in the main worktree.
    pub fn default_branch(&self) -> Result<String> {
        if let Ok(remote_head) =
            self.git_stdout(&["symbolic-ref", "--short", "refs/remotes/origin/HEAD"])
        {
            if let Some(branch) = remote_head.strip_prefix("origin/") {
                if !branch.is_empty() {
                    return Ok(branch.to_string());
                }
            }
        }

        self.current_branch()
    }

    /// Check whether a local branch exists
    pub fn branch_exists(&self, branch: &str) -> bool {
        Command::new("git")
            .args(["show-ref", "--verify", "--quiet", &format!("refs/heads/{}", branch)])
            .current_dir(&self.root)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Run git in the repository root and return trimmed stdout
    fn git_stdout(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .with_context(|| format!("Failed to run git {}", args.join(" ")))?;

        if !output.status.success() {
            bail!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
