//! Init command implementation

use anyhow::{Result, bail};
use std::path::Path;

use wsmux::config::{DEFAULT_CONFIG, RepoConfig};

pub fn init_command(work_dir: &Path, force: bool) -> Result<()> {
    let root = super::repo_root(work_dir)?;
    let config_path = RepoConfig::path_in(&root);

    if config_path.exists() && !force {
        bail!(
            "Configuration already exists: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)?;
    println!("Created: {}", config_path.display());

    Ok(())
}
