//! Branch-name command implementation

use anyhow::Result;
use std::path::Path;

use wsmux::config::RepoConfig;
use wsmux::git::{derive_branch_name, unique_suffix};

pub fn branch_name_command(work_dir: &Path, name: &str, prefix: Option<String>) -> Result<()> {
    let prefix = match prefix {
        Some(prefix) => prefix,
        None => {
            let root = super::repo_root(work_dir)?;
            RepoConfig::from_dir(&root)?.settings.branch_prefix
        }
    };

    println!("{}", derive_branch_name(&prefix, name, unique_suffix()));
    Ok(())
}
