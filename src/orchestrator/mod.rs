//! Workspace orchestration
//!
//! The orchestrator sequences the other subsystems:
//!
//! ```text
//! create_workspace
//!   -> derive branch, check identity        (WorkspaceStore)
//!   -> materialize worktree                 (WorktreeProvider, blocking thread)
//!   -> track workspace, emit created        (WorkspaceStore, EventBus)
//!   -> run setup script, if configured      (SetupRunner, cancellable)
//!   -> spawn first terminal                 (SessionRegistry)
//!   -> place it                             (LayoutEngine)
//! ```
//!
//! Every operation that mutates a workspace takes that workspace's lock, so
//! steps for one workspace never interleave while independent workspaces
//! proceed in parallel. Deleting a workspace cancels its in-flight setup
//! before waiting for the lock.

mod error;
mod lifecycle;
mod locks;
mod reactor;
mod setup;
mod terminals;
mod worktrees;

#[cfg(test)]
pub(crate) mod testing;


pub use error::{OrchestratorError, Result};
pub use setup::{SetupOutcome, SetupRunner, ShellSetupRunner};
pub use terminals::TerminalOptions;
pub use worktrees::{GitWorktrees, WorktreeProvider};

use std::path::Path;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::{FileConfigSource, RepoConfigSource, Settings, WorkspaceDefaults};
use crate::domain::{RepositoryId, WorkspaceId};
use crate::events::{Event, EventBus};
use crate::layout::LayoutEngine;
use crate::terminal::{NativePtySpawner, PtySpawner, SessionRegistry};
use crate::workspace::{StoreError, WorkspaceStore};
use locks::{Cancellations, KeyedLocks};

/// External systems the orchestrator drives
#[derive(Clone)]
pub struct Collaborators {
    pub spawner: Arc<dyn PtySpawner>,
    pub worktrees: Arc<dyn WorktreeProvider>,
    pub setup: Arc<dyn SetupRunner>,
    pub config: Arc<dyn RepoConfigSource>,
}

impl Collaborators {
    /// Real PTYs, `git` worktrees, `sh -c` setup and `.wsmux/config.toml`
    pub fn native(settings: &Settings) -> Self {
        Self {
            spawner: Arc::new(NativePtySpawner),
            worktrees: Arc::new(GitWorktrees::new(&settings.worktrees_dir)),
            setup: Arc::new(ShellSetupRunner::default()),
            config: Arc::new(FileConfigSource),
        }
    }
}

pub struct Orchestrator {
    settings: Settings,
    bus: EventBus,
    store: WorkspaceStore,
    sessions: Arc<SessionRegistry>,
    layouts: LayoutEngine,
    worktrees: Arc<dyn WorktreeProvider>,
    setup: Arc<dyn SetupRunner>,
    config: Arc<dyn RepoConfigSource>,
    locks: KeyedLocks<WorkspaceId>,
    cancellations: Cancellations<WorkspaceId>,
}

impl Orchestrator {
    pub fn new(settings: Settings, collaborators: Collaborators) -> Self {
        let bus = EventBus::with_capacity(settings.event_capacity);
        let sessions = Arc::new(SessionRegistry::new(
            collaborators.spawner,
            bus.clone(),
            settings.session_defaults(),
        ));

        Self {
            layouts: LayoutEngine::new(settings.max_split_depth),
            store: WorkspaceStore::new(),
            sessions,
            bus,
            worktrees: collaborators.worktrees,
            setup: collaborators.setup,
            config: collaborators.config,
            locks: KeyedLocks::new(),
            cancellations: Cancellations::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    pub fn store(&self) -> &WorkspaceStore {
        &self.store
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn layouts(&self) -> &LayoutEngine {
        &self.layouts
    }

    /// Destroy every live session
    pub fn shutdown(&self) {
        self.sessions.shutdown();
    }

    fn repo_path(&self, repository_id: RepositoryId) -> Result<std::path::PathBuf> {
        self.store
            .repository(repository_id)
            .map(|r| r.path)
            .ok_or_else(|| StoreError::UnknownRepository(repository_id).into())
    }

    fn workspace_defaults(&self, repo_path: &Path) -> Result<WorkspaceDefaults> {
        self.config
            .workspace_defaults(repo_path)
            .map_err(OrchestratorError::Config)
    }

    /// Run a blocking worktree operation off the async threads
    async fn with_worktrees<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn WorktreeProvider) -> anyhow::Result<T> + Send + 'static,
    {
        let worktrees = self.worktrees.clone();
        tokio::task::spawn_blocking(move || f(worktrees.as_ref()))
            .await
            .map_err(|e| OrchestratorError::Worktree(e.into()))?
            .map_err(OrchestratorError::Worktree)
    }
}
