//! Core domain types for wsmux

mod repository;
mod session;
mod workspace;

pub use repository::{Repository, RepositoryId};
pub use session::{SessionExit, SessionHandle, SessionId, SessionState, TerminalSession};
pub use workspace::{Workspace, WorkspaceId, WorkspaceStatus};
