use thiserror::Error;

use crate::domain::WorkspaceId;
use crate::layout::LayoutError;
use crate::terminal::SessionError;
use crate::workspace::StoreError;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("Worktree operation failed: {0:#}")]
    Worktree(anyhow::Error),

    #[error("Failed to load repository config: {0:#}")]
    Config(anyhow::Error),

    #[error("Workspace {0} was removed while the operation was in flight")]
    Cancelled(WorkspaceId),
}

pub type Result<T, E = OrchestratorError> = std::result::Result<T, E>;
