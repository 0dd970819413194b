//! Repository and workspace lifecycle

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Orchestrator, OrchestratorError, Result};
use crate::domain::{Repository, RepositoryId, Workspace, WorkspaceId, WorkspaceStatus};
use crate::events::{Event, WorkspaceChanges};
use crate::git::{derive_branch_name, unique_suffix};
use crate::layout::Placement;
use crate::terminal::SessionError;
use crate::workspace::StoreError;

impl Orchestrator {
    // ═══════════════════════════════════════════════════════════════════════
    // Repositories
    // ═══════════════════════════════════════════════════════════════════════

    /// Register a repository. Its name comes from the directory, its default
    /// branch from git.
    pub async fn add_repository(&self, path: &Path) -> Result<Repository> {
        let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if self.store.repository_by_path(&path).is_some() {
            return Err(StoreError::DuplicateRepository(path).into());
        }

        let lookup = path.clone();
        let default_branch = self
            .with_worktrees(move |w| w.default_branch(&lookup))
            .await?;

        let repository = self.store.add_repository(path, default_branch)?;
        info!(
            repository_id = repository.id,
            path = %repository.path.display(),
            default_branch = %repository.default_branch,
            "Repository added"
        );
        self.bus.emit(Event::repository_added(repository.id));
        Ok(repository)
    }

    /// Tear down every workspace of a repository, then forget it.
    pub async fn remove_repository(&self, id: RepositoryId) -> Result<Repository> {
        let repository = self
            .store
            .repository(id)
            .ok_or(StoreError::UnknownRepository(id))?;

        let deletions = repository
            .workspace_ids
            .iter()
            .map(|ws_id| self.delete_workspace(*ws_id));
        for result in join_all(deletions).await {
            match result {
                Ok(()) | Err(OrchestratorError::Store(StoreError::UnknownWorkspace(_))) => {}
                Err(e) => warn!(repository_id = id, "Workspace teardown failed: {}", e),
            }
        }

        // Workspaces created while the deletions above were running
        let (repository, leftovers) = self.store.remove_repository(id)?;
        for workspace in leftovers {
            self.cancellations.cancel(workspace.id);
            let _guard = self.locks.lock(workspace.id).await;
            self.teardown(&workspace, &repository.path).await;
            self.locks.forget(workspace.id);
        }

        info!(repository_id = id, "Repository removed");
        self.bus.emit(Event::repository_removed(id));
        Ok(repository)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Workspaces
    // ═══════════════════════════════════════════════════════════════════════

    /// Materialize a new workspace and open its first terminal.
    ///
    /// When a setup script is configured the workspace starts in
    /// `setting_up`. A failing script moves it to `error` and no terminal is
    /// opened; [`Orchestrator::retry_setup`] picks up from there. A shell
    /// that cannot be spawned ends the same way.
    pub async fn create_workspace(&self, repository_id: RepositoryId, name: &str) -> Result<Workspace> {
        let repository = self
            .store
            .repository(repository_id)
            .ok_or(StoreError::UnknownRepository(repository_id))?;

        let branch = derive_branch_name(&self.settings.branch_prefix, name, unique_suffix());
        let planned_path = self.worktrees.worktree_path(&repository.path, &branch);
        self.store
            .check_available(repository_id, &planned_path, &branch)?;

        let defaults = self.workspace_defaults(&repository.path)?;

        let worktree_path = {
            let repo = repository.path.clone();
            let branch = branch.clone();
            let base = repository.default_branch.clone();
            self.with_worktrees(move |w| w.create(&repo, &branch, &base))
                .await?
        };
        info!(branch = %branch, path = %worktree_path.display(), "Worktree materialized");

        let workspace = match self.store.add_workspace(
            repository_id,
            name,
            worktree_path.clone(),
            branch.clone(),
            defaults.setup_script().is_some(),
        ) {
            Ok(workspace) => workspace,
            Err(err) => {
                // Lost a race with a concurrent create or a repository removal
                self.remove_worktree(&repository.path, &worktree_path, &branch)
                    .await;
                return Err(err.into());
            }
        };

        let token = self.cancellations.token(workspace.id);
        self.bus.emit(Event::workspace_created(workspace.id));
        info!(workspace_id = workspace.id, name, status = %workspace.status, "Workspace created");

        let _guard = self.locks.lock(workspace.id).await;
        if token.is_cancelled() || !self.store.contains(workspace.id) {
            return Err(OrchestratorError::Cancelled(workspace.id));
        }

        let ready = match defaults.setup_script() {
            Some(script) => {
                self.run_setup(&workspace, script, &defaults.env, &token)
                    .await?
            }
            None => true,
        };

        if ready {
            if token.is_cancelled() {
                return Err(OrchestratorError::Cancelled(workspace.id));
            }
            self.open_first_terminal(&workspace).await?;
        }

        self.store
            .workspace(workspace.id)
            .ok_or(OrchestratorError::Cancelled(workspace.id))
    }

    /// Rerun the setup script of a workspace in `error`.
    pub async fn retry_setup(&self, id: WorkspaceId) -> Result<Workspace> {
        let _guard = self.locks.lock(id).await;
        let workspace = self
            .store
            .workspace(id)
            .ok_or(StoreError::UnknownWorkspace(id))?;
        let defaults = self.workspace_defaults(&self.repo_path(workspace.repository_id)?)?;

        self.set_status(id, WorkspaceStatus::SettingUp)?;
        let token = self.cancellations.token(id);

        let ready = match defaults.setup_script() {
            Some(script) => self.run_setup(&workspace, script, &defaults.env, &token).await?,
            None => {
                self.set_status(id, WorkspaceStatus::Active)?;
                true
            }
        };

        if ready && self.sessions.ids_for_workspace(id).is_empty() {
            self.open_first_terminal(&workspace).await?;
        }

        self.store
            .workspace(id)
            .ok_or(OrchestratorError::Cancelled(id))
    }

    /// Open the first terminal of a ready workspace. A shell that fails to
    /// spawn moves the workspace to `error` instead of failing the call.
    async fn open_first_terminal(&self, workspace: &Workspace) -> Result<()> {
        match self
            .open_terminal_locked(workspace.id, Default::default(), Placement::Auto)
            .await
        {
            Ok(_) => Ok(()),
            Err(OrchestratorError::Session(SessionError::Spawn { message, .. })) => {
                warn!(workspace_id = workspace.id, "Terminal failed to start: {}", message);
                self.set_status(workspace.id, WorkspaceStatus::Error)?;
                self.bus.emit(Event::app_error(format!(
                    "Failed to start a terminal for workspace '{}': {}",
                    workspace.name, message
                )));
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Run the setup script; `Ok(false)` when it failed and the workspace
    /// moved to `error`.
    async fn run_setup(
        &self,
        workspace: &Workspace,
        script: &str,
        env: &HashMap<String, String>,
        token: &CancellationToken,
    ) -> Result<bool> {
        info!(workspace_id = workspace.id, "Running setup script");

        let outcome = tokio::select! {
            outcome = self.setup.run(script, &workspace.worktree_path, env) => outcome,
            _ = token.cancelled() => {
                debug!(workspace_id = workspace.id, "Setup cancelled");
                return Err(OrchestratorError::Cancelled(workspace.id));
            }
        };

        if !self.store.contains(workspace.id) {
            return Err(OrchestratorError::Cancelled(workspace.id));
        }

        if outcome.success {
            self.set_status(workspace.id, WorkspaceStatus::Active)?;
            info!(workspace_id = workspace.id, "Setup finished");
            return Ok(true);
        }

        let error = outcome
            .error
            .unwrap_or_else(|| "Setup script failed".to_string());
        warn!(workspace_id = workspace.id, "Setup failed: {}", error);
        self.set_status(workspace.id, WorkspaceStatus::Error)?;
        self.bus.emit(Event::app_error(format!(
            "Setup failed for workspace '{}': {}",
            workspace.name, error
        )));
        Ok(false)
    }

    /// Tear down a workspace: cancel in-flight work, close its panes,
    /// destroy its sessions, forget it and remove its worktree.
    pub async fn delete_workspace(&self, id: WorkspaceId) -> Result<()> {
        self.cancellations.cancel(id);
        let _guard = self.locks.lock(id).await;

        let workspace = self.store.remove_workspace(id)?;
        let repo_path = self.repo_path(workspace.repository_id)?;
        self.teardown(&workspace, &repo_path).await;
        self.locks.forget(id);
        Ok(())
    }

    /// Caller holds the workspace lock and has removed it from the store.
    async fn teardown(&self, workspace: &Workspace, repo_path: &Path) {
        let mut doomed = self.layouts.clear(workspace.id);
        for id in self.sessions.ids_for_workspace(workspace.id) {
            if !doomed.contains(&id) {
                doomed.push(id);
            }
        }
        for session_id in doomed {
            if self.sessions.destroy(session_id).is_ok() {
                debug!(workspace_id = workspace.id, session_id, "Session destroyed");
            }
        }

        self.remove_worktree(repo_path, &workspace.worktree_path, &workspace.branch_name)
            .await;

        info!(workspace_id = workspace.id, name = %workspace.name, "Workspace deleted");
        self.bus.emit(Event::workspace_deleted(workspace.id));
    }

    /// Failures are reported on the bus, not returned.
    async fn remove_worktree(&self, repo_path: &Path, worktree: &Path, branch: &str) {
        let repo: PathBuf = repo_path.to_path_buf();
        let path: PathBuf = worktree.to_path_buf();
        let branch = branch.to_string();

        if let Err(e) = self
            .with_worktrees(move |w| w.remove(&repo, &path, &branch))
            .await
        {
            warn!(path = %worktree.display(), "{}", e);
            self.bus.emit(Event::app_error(e.to_string()));
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Status, name, focus
    // ═══════════════════════════════════════════════════════════════════════

    /// Apply a status transition and announce it. No-op for `x -> x`.
    fn set_status(&self, id: WorkspaceId, status: WorkspaceStatus) -> Result<Workspace> {
        let change = self.store.update_status(id, status)?;
        if change.changed() {
            debug!(workspace_id = id, from = %change.previous, to = %status, "Status changed");
            self.bus
                .emit(Event::workspace_updated(id, WorkspaceChanges::status(status)));
        }
        Ok(change.workspace)
    }

    /// Move a workspace through the status state machine
    pub async fn update_status(&self, id: WorkspaceId, status: WorkspaceStatus) -> Result<Workspace> {
        let _guard = self.locks.lock(id).await;
        self.set_status(id, status)
    }

    pub async fn rename_workspace(&self, id: WorkspaceId, name: &str) -> Result<Workspace> {
        let _guard = self.locks.lock(id).await;
        let workspace = self.store.rename_workspace(id, name)?;
        self.bus
            .emit(Event::workspace_updated(id, WorkspaceChanges::name(name)));
        Ok(workspace)
    }

    /// Focus a workspace. An idle workspace becomes active again.
    pub async fn activate_workspace(&self, id: WorkspaceId) -> Result<Workspace> {
        let _guard = self.locks.lock(id).await;
        let previous = self.store.set_active(id)?;
        if previous != Some(id) {
            self.bus.emit(Event::workspace_activated(id, previous));
        }

        let workspace = self
            .store
            .workspace(id)
            .ok_or(StoreError::UnknownWorkspace(id))?;
        if workspace.status == WorkspaceStatus::Idle {
            return self.set_status(id, WorkspaceStatus::Active);
        }
        Ok(workspace)
    }
}
