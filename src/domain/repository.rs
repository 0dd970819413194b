use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

use super::WorkspaceId;

/// Unique identifier for a repository
pub type RepositoryId = u64;

/// A source repository the user picked; workspaces are worktrees of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: RepositoryId,

    /// Display name (derived from the folder name)
    pub name: String,

    /// Root of the main worktree
    pub path: PathBuf,

    /// Branch new worktrees are created from
    pub default_branch: String,

    /// Workspaces created from this repository
    #[serde(default)]
    pub workspace_ids: BTreeSet<WorkspaceId>,

    pub created_at: DateTime<Utc>,
}

impl Repository {
    pub fn new(id: RepositoryId, path: PathBuf, default_branch: impl Into<String>) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("repository-{}", id));

        Self {
            id,
            name,
            path,
            default_branch: default_branch.into(),
            workspace_ids: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_comes_from_folder() {
        let repo = Repository::new(7, PathBuf::from("/src/my-app"), "main");
        assert_eq!(repo.name, "my-app");
        assert_eq!(repo.default_branch, "main");
        assert!(repo.workspace_ids.is_empty());
    }

    #[test]
    fn root_path_falls_back_to_id() {
        let repo = Repository::new(7, PathBuf::from("/"), "main");
        assert_eq!(repo.name, "repository-7");
    }
}
