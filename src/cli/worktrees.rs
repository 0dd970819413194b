//! Worktrees command implementation

use anyhow::Result;
use std::path::Path;

use wsmux::config::RepoConfig;
use wsmux::git::GitManager;

pub fn worktrees_command(work_dir: &Path, json: bool) -> Result<()> {
    let root = super::repo_root(work_dir)?;
    let config = RepoConfig::from_dir(&root)?;
    let git = GitManager::with_worktrees_dir(&root, &config.settings.worktrees_dir)?;
    let worktrees = git.list_worktrees()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&worktrees)?);
        return Ok(());
    }

    for wt in &worktrees {
        let head = match (&wt.branch, &wt.commit) {
            (Some(branch), _) => branch.clone(),
            (None, Some(commit)) => format!("({})", short_commit(commit)),
            (None, None) => "-".to_string(),
        };
        let mut flags = Vec::new();
        if wt.is_main {
            flags.push("main");
        }
        if wt.is_bare {
            flags.push("bare");
        }
        if wt.is_detached {
            flags.push("detached");
        }

        if flags.is_empty() {
            println!("{}  {}", wt.path.display(), head);
        } else {
            println!("{}  {}  [{}]", wt.path.display(), head, flags.join(", "));
        }
    }

    Ok(())
}

/// First eight characters of a commit hash
fn short_commit(commit: &str) -> String {
    commit.chars().take(8).collect()
}
