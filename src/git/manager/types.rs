//! Git types and parsing helpers

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One entry of `git worktree list --porcelain`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorktreeInfo {
    /// Absolute path of the worktree
    pub path: PathBuf,
    /// Checked-out branch with `refs/heads/` stripped
    pub branch: Option<String>,
    /// HEAD commit
    pub commit: Option<String>,
    pub is_bare: bool,
    pub is_detached: bool,
    /// True for the repository's primary worktree
    pub is_main: bool,
}

#[derive(Default)]
struct Block {
    path: Option<PathBuf>,
    branch: Option<String>,
    commit: Option<String>,
    is_bare: bool,
    is_detached: bool,
}

impl Block {
    fn finish(self, main_repo_path: &Path) -> Option<WorktreeInfo> {
        let path = self.path?;
        let is_main = path == main_repo_path;
        Some(WorktreeInfo {
            path,
            branch: self.branch,
            commit: self.commit,
            is_bare: self.is_bare,
            is_detached: self.is_detached,
            is_main,
        })
    }
}

/// Parse the porcelain output of `git worktree list`.
///
/// Blocks are separated by blank lines. A block without a `worktree` line is
/// dropped (output may be truncated). The porcelain format does not flag the
/// primary worktree, so `is_main` is decided by comparing against
/// `main_repo_path`.
pub fn parse_worktrees(raw: &str, main_repo_path: &Path) -> Vec<WorktreeInfo> {
    let mut worktrees = Vec::new();
    let mut block = Block::default();

    for line in raw.lines() {
        let line = line.trim_end_matches('\r');

        if line.trim().is_empty() {
            if let Some(info) = std::mem::take(&mut block).finish(main_repo_path) {
                worktrees.push(info);
            }
            continue;
        }

        if let Some(path) = line.strip_prefix("worktree ") {
            if block.path.is_none() {
                block.path = Some(PathBuf::from(path));
            }
        } else if let Some(commit) = line.strip_prefix("HEAD ") {
            block.commit = Some(commit.to_string());
        } else if let Some(branch) = line.strip_prefix("branch ") {
            let name = branch.strip_prefix("refs/heads/").unwrap_or(branch);
            block.branch = Some(name.to_string());
        } else if line == "bare" {
            block.is_bare = true;
        } else if line == "detached" {
            block.is_detached = true;
        }
    }

    if let Some(info) = block.finish(main_repo_path) {
        worktrees.push(info);
    }

    worktrees
}
