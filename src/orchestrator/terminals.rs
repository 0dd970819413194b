//! Terminals inside a workspace: spawn + place, close + destroy

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::{Orchestrator, OrchestratorError, Result};
use crate::domain::{SessionHandle, SessionId, WorkspaceId};
use crate::layout::{LayoutError, PaneNode, Placement, SplitDirection};
use crate::terminal::{CreateOptions, SessionError};
use crate::workspace::StoreError;

/// Per-terminal overrides of the workspace defaults
#[derive(Debug, Clone, Default)]
pub struct TerminalOptions {
    /// Working directory, the worktree when absent
    pub cwd: Option<PathBuf>,
    /// Merged over the repository's `workspace_defaults.env`
    pub env: HashMap<String, String>,
    pub shell: Option<String>,
    pub args: Vec<String>,
    pub cols: Option<u16>,
    pub rows: Option<u16>,
}

impl From<CreateOptions> for TerminalOptions {
    fn from(options: CreateOptions) -> Self {
        Self {
            cwd: Some(options.cwd).filter(|p| !p.as_os_str().is_empty()),
            env: options.env,
            shell: options.shell,
            args: options.args,
            cols: options.cols,
            rows: options.rows,
        }
    }
}

impl Orchestrator {
    /// Spawn a terminal in a workspace and place it in the layout.
    pub async fn open_terminal(
        &self,
        workspace_id: WorkspaceId,
        options: TerminalOptions,
        placement: Placement,
    ) -> Result<SessionHandle> {
        let _guard = self.locks.lock(workspace_id).await;
        self.open_terminal_locked(workspace_id, options, placement)
            .await
    }

    /// Split `target` and start a new terminal in the freed half
    pub async fn split_terminal(
        &self,
        workspace_id: WorkspaceId,
        target: SessionId,
        direction: SplitDirection,
    ) -> Result<SessionHandle> {
        self.open_terminal(
            workspace_id,
            TerminalOptions::default(),
            Placement::Split { target, direction },
        )
        .await
    }

    /// Session-control `create`: a terminal auto-placed in its workspace
    pub async fn create_session(&self, options: CreateOptions) -> Result<SessionHandle> {
        let workspace_id = options.workspace_id;
        self.open_terminal(workspace_id, options.into(), Placement::Auto)
            .await
    }

    /// Caller holds the workspace lock.
    ///
    /// A session that cannot be placed is destroyed again, so the layout
    /// and the registry never disagree.
    pub(super) async fn open_terminal_locked(
        &self,
        workspace_id: WorkspaceId,
        options: TerminalOptions,
        placement: Placement,
    ) -> Result<SessionHandle> {
        let workspace = self
            .store
            .workspace(workspace_id)
            .ok_or(StoreError::UnknownWorkspace(workspace_id))?;

        if let Placement::Split { target, .. } = placement {
            let present = self
                .layouts
                .tree(workspace_id)
                .is_some_and(|tree| tree.contains(target));
            if !present {
                return Err(LayoutError::TargetNotFound(target).into());
            }
        }

        let defaults = self.workspace_defaults(&self.repo_path(workspace.repository_id)?)?;
        let mut env = defaults.env;
        env.extend(options.env);

        let handle = self
            .sessions
            .create(CreateOptions {
                workspace_id,
                cwd: options.cwd.unwrap_or(workspace.worktree_path),
                env,
                shell: options.shell,
                args: options.args,
                cols: options.cols,
                rows: options.rows,
            })
            .await?;

        if !self.store.contains(workspace_id) {
            let _ = self.sessions.destroy(handle.id);
            return Err(OrchestratorError::Cancelled(workspace_id));
        }

        if let Err(err) = self.layouts.place(workspace_id, handle.id, placement) {
            warn!(workspace_id, session_id = handle.id, "Layout rejected terminal: {}", err);
            let _ = self.sessions.destroy(handle.id);
            return Err(err.into());
        }

        // Exited before it was placed; the reactor found no pane to drop
        if !self.sessions.contains(handle.id) {
            self.layouts.close(workspace_id, handle.id);
            debug!(workspace_id, session_id = handle.id, "Terminal exited before placement");
        }

        self.store.record_session(workspace_id, handle.id)?;
        info!(workspace_id, session_id = handle.id, "Terminal opened");
        Ok(handle)
    }

    /// Close a terminal's pane, then destroy its session. Returns what is
    /// left of the layout. A session that already exited is not an error.
    pub async fn close_terminal(
        &self,
        workspace_id: WorkspaceId,
        terminal_id: SessionId,
    ) -> Result<Option<PaneNode>> {
        let _guard = self.locks.lock(workspace_id).await;
        if !self.store.contains(workspace_id) {
            return Err(StoreError::UnknownWorkspace(workspace_id).into());
        }

        let tree = self.layouts.close(workspace_id, terminal_id);
        match self.sessions.destroy(terminal_id) {
            Ok(()) => debug!(workspace_id, terminal_id, "Terminal closed"),
            Err(SessionError::UnknownSession(_)) => {
                debug!(workspace_id, terminal_id, "Terminal already gone")
            }
            Err(e) => return Err(e.into()),
        }
        Ok(tree)
    }

    /// Session-control `destroy`: find the session's workspace, close its
    /// pane and destroy it.
    pub async fn destroy_session(&self, terminal_id: SessionId) -> Result<()> {
        let session = self
            .sessions
            .get(terminal_id)
            .ok_or(SessionError::UnknownSession(terminal_id))?;

        let _guard = self.locks.lock(session.workspace_id).await;
        self.layouts.close(session.workspace_id, terminal_id);
        self.sessions.destroy(terminal_id)?;
        Ok(())
    }
}
