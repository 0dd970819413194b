//! Configuration loading and management

mod settings;

pub use settings::Settings;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Location of the config file inside a repository
pub const CONFIG_FILE: &str = ".wsmux/config.toml";

/// What every new workspace of a repository gets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceDefaults {
    /// Shell snippet run inside a fresh worktree before it is marked active
    #[serde(default, alias = "setupScript")]
    pub setup_script: Option<String>,

    /// Extra environment for the setup script and every session
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl WorkspaceDefaults {
    /// The setup script, if one is set and not blank
    pub fn setup_script(&self) -> Option<&str> {
        self.setup_script
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoConfig {
    #[serde(default, alias = "workspaceDefaults")]
    pub workspace_defaults: Option<WorkspaceDefaults>,

    /// General settings
    #[serde(default)]
    pub settings: Settings,
}

impl RepoConfig {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: RepoConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load `.wsmux/config.toml` from a repository, or defaults if absent
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let path = Self::path_in(dir);
        if path.exists() {
            return Self::from_file(&path);
        }
        Ok(Self::default())
    }

    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE)
    }
}

/// Supplies per-repository workspace defaults to the orchestrator
pub trait RepoConfigSource: Send + Sync {
    fn workspace_defaults(&self, repo_path: &Path) -> Result<WorkspaceDefaults>;
}

/// Reads `.wsmux/config.toml` from the repository on every call, so edits
/// apply to the next workspace without a restart.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileConfigSource;

impl RepoConfigSource for FileConfigSource {
    fn workspace_defaults(&self, repo_path: &Path) -> Result<WorkspaceDefaults> {
        Ok(RepoConfig::from_dir(repo_path)?
            .workspace_defaults
            .unwrap_or_default())
    }
}

/// Fixed defaults, regardless of repository
#[derive(Debug, Default, Clone)]
pub struct StaticConfigSource(pub WorkspaceDefaults);

impl RepoConfigSource for StaticConfigSource {
    fn workspace_defaults(&self, _repo_path: &Path) -> Result<WorkspaceDefaults> {
        Ok(self.0.clone())
    }
}

/// Default configuration content for `wsmux init`
pub const DEFAULT_CONFIG: &str = r#"# wsmux configuration
# ====================
#
# Every workspace gets its own git worktree and branch. The settings below
# apply to all workspaces created from this repository.

[workspace_defaults]
# Runs inside each new worktree before it becomes active, e.g.
# setup_script = "npm install"

[workspace_defaults.env]
# Extra environment for the setup script and every terminal session
# RUST_LOG = "debug"

[settings]
# Worktrees live here, relative to the repository root
worktrees_dir = ".wsmux/worktrees"
# Generated branches look like <branch_prefix>/<name>-<timestamp>
branch_prefix = "wsmux"
# Shell for new sessions (defaults to $SHELL, then /bin/sh)
# shell = "/bin/zsh"
cols = 80
rows = 24
# Deepest allowed split nesting
max_split_depth = 8
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_parses() {
        let config: RepoConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        let defaults = config.workspace_defaults.unwrap();
        assert_eq!(defaults.setup_script(), None);
        assert!(defaults.env.is_empty());
        assert_eq!(config.settings, Settings::default());
    }

    #[test]
    fn camel_case_aliases() {
        let config: RepoConfig = toml::from_str(
            r#"
            [workspaceDefaults]
            setupScript = "make deps"
            env = { FOO = "bar" }
            "#,
        )
        .unwrap();
        let defaults = config.workspace_defaults.unwrap();
        assert_eq!(defaults.setup_script(), Some("make deps"));
        assert_eq!(defaults.env["FOO"], "bar");
    }

    #[test]
    fn blank_setup_script_counts_as_absent() {
        let defaults = WorkspaceDefaults {
            setup_script: Some("   ".to_string()),
            env: HashMap::new(),
        };
        assert_eq!(defaults.setup_script(), None);
    }

    #[test]
    fn missing_file_means_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = RepoConfig::from_dir(tmp.path()).unwrap();
        assert_eq!(config, RepoConfig::default());
        assert_eq!(
            FileConfigSource.workspace_defaults(tmp.path()).unwrap(),
            WorkspaceDefaults::default()
        );
    }

    #[test]
    fn file_source_reads_repository_config() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join(".wsmux")).unwrap();
        std::fs::write(
            RepoConfig::path_in(tmp.path()),
            "[workspace_defaults]\nsetup_script = \"true\"\n[settings]\ncols = 120\n",
        )
        .unwrap();

        let config = RepoConfig::from_dir(tmp.path()).unwrap();
        assert_eq!(config.settings.cols, 120);
        assert_eq!(config.settings.rows, 24);
        assert_eq!(
            FileConfigSource
                .workspace_defaults(tmp.path())
                .unwrap()
                .setup_script(),
            Some("true")
        );
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join(".wsmux")).unwrap();
        std::fs::write(RepoConfig::path_in(tmp.path()), "settings = [").unwrap();
        assert!(RepoConfig::from_dir(tmp.path()).is_err());
    }

    #[test]
    fn explicit_shell_wins() {
        let settings = Settings {
            shell: Some("/bin/bash".to_string()),
            ..Settings::default()
        };
        assert_eq!(settings.resolved_shell(), "/bin/bash");
        assert_eq!(settings.session_defaults().shell, "/bin/bash");
    }
}
