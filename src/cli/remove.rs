//! Remove command implementation

use anyhow::{Context, Result};
use std::path::Path;

use wsmux::config::RepoConfig;
use wsmux::git::GitManager;

pub fn remove_command(work_dir: &Path, worktree: &Path) -> Result<()> {
    let root = super::repo_root(work_dir)?;
    let config = RepoConfig::from_dir(&root)?;
    let git = GitManager::with_worktrees_dir(&root, &config.settings.worktrees_dir)?;

    let target = if worktree.is_absolute() {
        worktree.to_path_buf()
    } else {
        work_dir.join(worktree)
    };
    let target = target.canonicalize().unwrap_or(target);

    // The branch is only known through git's listing
    let branch = git
        .list_worktrees()
        .context("Failed to list worktrees")?
        .into_iter()
        .find(|wt| !wt.is_main && wt.path == target)
        .and_then(|wt| wt.branch);

    git.remove_worktree(&target, branch.as_deref())?;

    match branch {
        Some(branch) => println!("Removed: {} ({})", target.display(), branch),
        None => println!("Removed: {}", target.display()),
    }
    Ok(())
}
