//! In-memory store of repositories and their workspaces
//!
//! All identity checks run under one short-lived lock, so a rejected
//! mutation never leaves partial state behind. Long-running work on a
//! workspace (setup, spawning) is serialized per workspace by the
//! orchestrator, never while holding this lock.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::domain::{
    Repository, RepositoryId, SessionId, Workspace, WorkspaceId, WorkspaceStatus,
};


/// Error type for store mutations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Worktree path already tracked: {}", .0.display())]
    DuplicateWorktree(PathBuf),

    #[error("Branch {branch} is already used in repository {repository_id}")]
    DuplicateBranch {
        repository_id: RepositoryId,
        branch: String,
    },

    #[error("Repository already added: {}", .0.display())]
    DuplicateRepository(PathBuf),

    #[error("Invalid status transition for workspace {workspace_id}: {from} -> {to}")]
    InvalidTransition {
        workspace_id: WorkspaceId,
        from: WorkspaceStatus,
        to: WorkspaceStatus,
    },

    #[error("Unknown workspace: {0}")]
    UnknownWorkspace(WorkspaceId),

    #[error("Unknown repository: {0}")]
    UnknownRepository(RepositoryId),
}

/// Result of a status update
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub previous: WorkspaceStatus,
    pub workspace: Workspace,
}

impl StatusChange {
    /// False for self-transitions, which are accepted as no-ops
    pub fn changed(&self) -> bool {
        self.previous != self.workspace.status
    }
}

#[derive(Debug)]
struct StoreInner {
    repositories: HashMap<RepositoryId, Repository>,
    workspaces: HashMap<WorkspaceId, Workspace>,
    active_workspace: Option<WorkspaceId>,
    next_repository_id: RepositoryId,
    next_workspace_id: WorkspaceId,
    /// Worktree path -> workspace, for duplicate detection
    path_index: HashMap<PathBuf, WorkspaceId>,
}

impl StoreInner {
    fn check_available(
        &self,
        repository_id: RepositoryId,
        worktree_path: &Path,
        branch_name: &str,
    ) -> Result<&Repository, StoreError> {
        let repository = self
            .repositories
            .get(&repository_id)
            .ok_or(StoreError::UnknownRepository(repository_id))?;

        if self.path_index.contains_key(worktree_path) {
            return Err(StoreError::DuplicateWorktree(worktree_path.to_path_buf()));
        }

        let branch_taken = repository
            .workspace_ids
            .iter()
            .filter_map(|id| self.workspaces.get(id))
            .any(|ws| ws.branch_name == branch_name);
        if branch_taken {
            return Err(StoreError::DuplicateBranch {
                repository_id,
                branch: branch_name.to_string(),
            });
        }

        Ok(repository)
    }

    fn workspace_mut(&mut self, id: WorkspaceId) -> Result<&mut Workspace, StoreError> {
        self.workspaces
            .get_mut(&id)
            .ok_or(StoreError::UnknownWorkspace(id))
    }

    fn remove_workspace(&mut self, id: WorkspaceId) -> Option<Workspace> {
        let ws = self.workspaces.remove(&id)?;
        self.path_index.remove(&ws.worktree_path);
        if let Some(repo) = self.repositories.get_mut(&ws.repository_id) {
            repo.workspace_ids.remove(&id);
        }
        if self.active_workspace == Some(id) {
            self.active_workspace = None;
        }
        Some(ws)
    }
}

/// Owner of all repositories and workspaces
#[derive(Debug)]
pub struct WorkspaceStore {
    inner: Mutex<StoreInner>,
}

impl Default for WorkspaceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkspaceStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                repositories: HashMap::new(),
                workspaces: HashMap::new(),
                active_workspace: None,
                next_repository_id: 1,
                next_workspace_id: 1,
                path_index: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Repositories
    // ═══════════════════════════════════════════════════════════════════════

    pub fn add_repository(
        &self,
        path: PathBuf,
        default_branch: impl Into<String>,
    ) -> Result<Repository, StoreError> {
        let mut inner = self.lock();

        if inner.repositories.values().any(|r| r.path == path) {
            return Err(StoreError::DuplicateRepository(path));
        }

        let id = inner.next_repository_id;
        inner.next_repository_id += 1;

        let repository = Repository::new(id, path, default_branch);
        inner.repositories.insert(id, repository.clone());
        Ok(repository)
    }

    /// Remove a repository together with every workspace it owns.
    ///
    /// Worktree cleanup for the returned workspaces is the caller's job.
    pub fn remove_repository(
        &self,
        id: RepositoryId,
    ) -> Result<(Repository, Vec<Workspace>), StoreError> {
        let mut inner = self.lock();

        let repository = inner
            .repositories
            .remove(&id)
            .ok_or(StoreError::UnknownRepository(id))?;

        let removed = repository
            .workspace_ids
            .iter()
            .filter_map(|ws_id| inner.remove_workspace(*ws_id))
            .collect();

        Ok((repository, removed))
    }

    pub fn repository(&self, id: RepositoryId) -> Option<Repository> {
        self.lock().repositories.get(&id).cloned()
    }

    pub fn repository_by_path(&self, path: &Path) -> Option<Repository> {
        self.lock()
            .repositories
            .values()
            .find(|r| r.path == path)
            .cloned()
    }

    pub fn repositories(&self) -> Vec<Repository> {
        let mut repos: Vec<_> = self.lock().repositories.values().cloned().collect();
        repos.sort_by_key(|r| r.id);
        repos
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Workspaces
    // ═══════════════════════════════════════════════════════════════════════

    /// Check that a worktree path and branch are free without mutating anything.
    pub fn check_available(
        &self,
        repository_id: RepositoryId,
        worktree_path: &Path,
        branch_name: &str,
    ) -> Result<(), StoreError> {
        self.lock()
            .check_available(repository_id, worktree_path, branch_name)
            .map(|_| ())
    }

    /// Track a materialized worktree as a new workspace.
    ///
    /// Starts in `setting_up` when a setup script is configured, else `active`.
    pub fn add_workspace(
        &self,
        repository_id: RepositoryId,
        name: impl Into<String>,
        worktree_path: PathBuf,
        branch_name: impl Into<String>,
        setup_configured: bool,
    ) -> Result<Workspace, StoreError> {
        let branch_name = branch_name.into();
        let mut inner = self.lock();

        inner.check_available(repository_id, &worktree_path, &branch_name)?;

        let id = inner.next_workspace_id;
        inner.next_workspace_id += 1;

        let workspace = Workspace::new(
            id,
            repository_id,
            name,
            worktree_path.clone(),
            branch_name,
            WorkspaceStatus::initial(setup_configured),
        );

        inner.path_index.insert(worktree_path, id);
        inner.workspaces.insert(id, workspace.clone());
        if let Some(repo) = inner.repositories.get_mut(&repository_id) {
            repo.workspace_ids.insert(id);
        }

        Ok(workspace)
    }

    /// Move a workspace through the status state machine.
    pub fn update_status(
        &self,
        id: WorkspaceId,
        status: WorkspaceStatus,
    ) -> Result<StatusChange, StoreError> {
        let mut inner = self.lock();
        let ws = inner.workspace_mut(id)?;
        let previous = ws.status;

        if !previous.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                workspace_id: id,
                from: previous,
                to: status,
            });
        }

        if previous != status {
            ws.status = status;
            ws.touch();
        }

        Ok(StatusChange {
            previous,
            workspace: ws.clone(),
        })
    }

    pub fn rename_workspace(
        &self,
        id: WorkspaceId,
        name: impl Into<String>,
    ) -> Result<Workspace, StoreError> {
        let mut inner = self.lock();
        let ws = inner.workspace_mut(id)?;
        ws.name = name.into();
        ws.touch();
        Ok(ws.clone())
    }

    /// Remember that a session was created in this workspace
    pub fn record_session(
        &self,
        id: WorkspaceId,
        session_id: SessionId,
    ) -> Result<Workspace, StoreError> {
        let mut inner = self.lock();
        let ws = inner.workspace_mut(id)?;
        ws.record_session(session_id);
        Ok(ws.clone())
    }

    pub fn remove_workspace(&self, id: WorkspaceId) -> Result<Workspace, StoreError> {
        self.lock()
            .remove_workspace(id)
            .ok_or(StoreError::UnknownWorkspace(id))
    }

    pub fn workspace(&self, id: WorkspaceId) -> Option<Workspace> {
        self.lock().workspaces.get(&id).cloned()
    }

    pub fn contains(&self, id: WorkspaceId) -> bool {
        self.lock().workspaces.contains_key(&id)
    }

    /// All workspaces, oldest first
    pub fn workspaces(&self) -> Vec<Workspace> {
        let mut workspaces: Vec<_> = self.lock().workspaces.values().cloned().collect();
        workspaces.sort_by_key(|w| w.id);
        workspaces
    }

    pub fn workspaces_for_repository(&self, repository_id: RepositoryId) -> Vec<Workspace> {
        let inner = self.lock();
        inner
            .repositories
            .get(&repository_id)
            .map(|repo| {
                repo.workspace_ids
                    .iter()
                    .filter_map(|id| inner.workspaces.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Make a workspace the active one; returns the previously active id.
    pub fn set_active(&self, id: WorkspaceId) -> Result<Option<WorkspaceId>, StoreError> {
        let mut inner = self.lock();
        inner.workspace_mut(id)?.touch();
        Ok(inner.active_workspace.replace(id))
    }

    pub fn active_id(&self) -> Option<WorkspaceId> {
        self.lock().active_workspace
    }

    pub fn len(&self) -> usize {
        self.lock().workspaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().workspaces.is_empty()
    }
}
