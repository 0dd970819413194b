//! Worktree operations for GitManager

use anyhow::{Context, Result, anyhow, bail};
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{GitManager, types::parse_worktrees, types::WorktreeInfo};
use crate::git::worktree_dir_name;

impl GitManager {
    /// Enumerate all worktrees of the repository, main worktree included.
    pub fn list_worktrees(&self) -> Result<Vec<WorktreeInfo>> {
        let output = Command::new("git")
            .args(["worktree", "list", "--porcelain"])
            .current_dir(self.root())
            .output()
            .context("Failed to run git worktree list")?;

        if !output.status.success() {
            bail!(
                "git worktree list failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let raw = String::from_utf8_lossy(&output.stdout);
        let main = self.root().canonicalize().unwrap_or_else(|_| self.root().to_path_buf());
        Ok(parse_worktrees(&raw, &main))
    }

    /// Where the worktree for `branch` lives
    pub fn worktree_path_for(&self, branch: &str) -> PathBuf {
        self.worktrees_dir.join(worktree_dir_name(branch))
    }

    /// Create `branch` from `base` and check it out in a new worktree under
    /// the worktrees directory. Returns the worktree path.
    pub fn create_worktree(&self, branch: &str, base: &str) -> Result<PathBuf> {
        if !self.has_commits() {
            bail!(
                "Cannot create worktree: repository has no commits. \
                Please make an initial commit first."
            );
        }

        std::fs::create_dir_all(&self.worktrees_dir).with_context(|| {
            format!("Failed to create {}", self.worktrees_dir.display())
        })?;

        let worktree_path = self.worktree_path_for(branch);
        if worktree_path.exists() {
            bail!("Worktree path already exists: {}", worktree_path.display());
        }
        if self.branch_exists(branch) {
            bail!("Branch already exists: {}", branch);
        }

        let worktree_path_str = worktree_path
            .to_str()
            .ok_or_else(|| anyhow!("Worktree path contains invalid UTF-8"))?;

        let output = Command::new("git")
            .args(["worktree", "add", "-b", branch, worktree_path_str, base])
            .current_dir(self.root())
            .output()
            .context("Failed to create worktree")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);

            // git may have created the branch before failing on the checkout
            let _ = Command::new("git")
                .args(["branch", "-D", branch])
                .current_dir(self.root())
                .output();

            bail!("Failed to create worktree: {}", stderr.trim());
        }

        tracing::debug!(branch, path = %worktree_path.display(), "worktree created");
        Ok(worktree_path)
    }

    /// Remove a worktree and, when given, delete its branch.
    ///
    /// Failures after the worktree is gone (e.g. branch deletion) are logged,
    /// not returned.
    pub fn remove_worktree(&self, worktree_path: &Path, branch: Option<&str>) -> Result<()> {
        if worktree_path.exists() {
            let worktree_path_str = worktree_path
                .to_str()
                .ok_or_else(|| anyhow!("Worktree path contains invalid UTF-8"))?;
            let output = Command::new("git")
                .args(["worktree", "remove", "--force", worktree_path_str])
                .current_dir(self.root())
                .output()
                .context("Failed to remove worktree")?;

            if !output.status.success() {
                bail!(
                    "Failed to remove worktree: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
        } else {
            // Directory vanished behind our back; drop git's bookkeeping for it
            let _ = Command::new("git")
                .args(["worktree", "prune"])
                .current_dir(self.root())
                .output();
        }

        if let Some(branch) = branch {
            let output = Command::new("git")
                .args(["branch", "-D", branch])
                .current_dir(self.root())
                .output()
                .context("Failed to delete branch")?;

            if !output.status.success() {
                tracing::warn!(
                    "Failed to delete branch {}: {}",
                    branch,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
        }

        Ok(())
    }
}
