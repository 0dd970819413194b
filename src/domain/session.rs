use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::WorkspaceId;

/// Unique identifier for a terminal session. Never reused.
pub type SessionId = u64;

/// Lifecycle of a terminal session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Registered, process not attached yet
    Starting,
    /// Process attached and producing output
    Running,
    /// Process gone (spawn failure, exit, or destroy). Terminal.
    Exited,
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (SessionState::Starting, SessionState::Running)
                | (SessionState::Starting, SessionState::Exited)
                | (SessionState::Running, SessionState::Exited)
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Starting => write!(f, "starting"),
            SessionState::Running => write!(f, "running"),
            SessionState::Exited => write!(f, "exited"),
        }
    }
}

/// How a session's process ended
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExit {
    pub exit_code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,
}

impl SessionExit {
    pub fn code(exit_code: u32) -> Self {
        Self {
            exit_code: Some(exit_code),
            signal: None,
        }
    }

    pub fn signalled(signal: impl Into<String>) -> Self {
        Self {
            exit_code: None,
            signal: Some(signal.into()),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && self.signal.is_none()
    }
}

/// A live, process-backed shell bound to one workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalSession {
    pub id: SessionId,
    pub workspace_id: WorkspaceId,
    /// Process id once attached
    pub pid: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub state: SessionState,
}

impl TerminalSession {
    pub fn new(id: SessionId, workspace_id: WorkspaceId) -> Self {
        Self {
            id,
            workspace_id,
            pid: None,
            created_at: Utc::now(),
            state: SessionState::Starting,
        }
    }
}

/// What a caller gets back from creating a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    pub id: SessionId,
    pub pid: Option<u32>,
}
