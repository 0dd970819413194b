//! CLI command implementations

pub mod branch_name;
pub mod init;
pub mod remove;
pub mod run;
pub mod worktrees;

use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};

/// Repository root containing `work_dir`
pub fn repo_root(work_dir: &Path) -> Result<PathBuf> {
    wsmux::git::find_git_root(work_dir)
        .ok_or_else(|| anyhow!("Not inside a git repository: {}", work_dir.display()))
}
