//! Event taxonomy shared by the coordinator and its observers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{RepositoryId, SessionExit, SessionId, WorkspaceId, WorkspaceStatus};

/// Fields that changed in a `workspace:updated` event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkspaceStatus>,
}

impl WorkspaceChanges {
    pub fn status(status: WorkspaceStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// The closed set of things that can happen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventPayload {
    #[serde(rename = "workspace:created", rename_all = "camelCase")]
    WorkspaceCreated { workspace_id: WorkspaceId },

    #[serde(rename = "workspace:deleted", rename_all = "camelCase")]
    WorkspaceDeleted { workspace_id: WorkspaceId },

    #[serde(rename = "workspace:updated", rename_all = "camelCase")]
    WorkspaceUpdated {
        workspace_id: WorkspaceId,
        changes: WorkspaceChanges,
    },

    #[serde(rename = "workspace:activated", rename_all = "camelCase")]
    WorkspaceActivated {
        workspace_id: WorkspaceId,
        previous_workspace_id: Option<WorkspaceId>,
    },

    #[serde(rename = "terminal:created", rename_all = "camelCase")]
    TerminalCreated {
        terminal_id: SessionId,
        workspace_id: WorkspaceId,
    },

    #[serde(rename = "terminal:output", rename_all = "camelCase")]
    TerminalOutput { terminal_id: SessionId, data: Vec<u8> },

    #[serde(rename = "terminal:resized", rename_all = "camelCase")]
    TerminalResized {
        terminal_id: SessionId,
        cols: u16,
        rows: u16,
    },

    #[serde(rename = "terminal:exited", rename_all = "camelCase")]
    TerminalExited {
        terminal_id: SessionId,
        #[serde(flatten)]
        exit: SessionExit,
    },

    #[serde(rename = "terminal:closed", rename_all = "camelCase")]
    TerminalClosed { terminal_id: SessionId },

    #[serde(rename = "repository:added", rename_all = "camelCase")]
    RepositoryAdded { repository_id: RepositoryId },

    #[serde(rename = "repository:removed", rename_all = "camelCase")]
    RepositoryRemoved { repository_id: RepositoryId },

    #[serde(rename = "app:error")]
    AppError {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        stack: Option<String>,
    },
}

/// An immutable notification with the time it was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn workspace_created(workspace_id: WorkspaceId) -> Self {
        Self::new(EventPayload::WorkspaceCreated { workspace_id })
    }

    pub fn workspace_deleted(workspace_id: WorkspaceId) -> Self {
        Self::new(EventPayload::WorkspaceDeleted { workspace_id })
    }

    pub fn workspace_updated(workspace_id: WorkspaceId, changes: WorkspaceChanges) -> Self {
        Self::new(EventPayload::WorkspaceUpdated {
            workspace_id,
            changes,
        })
    }

    pub fn workspace_activated(
        workspace_id: WorkspaceId,
        previous_workspace_id: Option<WorkspaceId>,
    ) -> Self {
        Self::new(EventPayload::WorkspaceActivated {
            workspace_id,
            previous_workspace_id,
        })
    }

    pub fn terminal_created(terminal_id: SessionId, workspace_id: WorkspaceId) -> Self {
        Self::new(EventPayload::TerminalCreated {
            terminal_id,
            workspace_id,
        })
    }

    pub fn terminal_output(terminal_id: SessionId, data: Vec<u8>) -> Self {
        Self::new(EventPayload::TerminalOutput { terminal_id, data })
    }

    pub fn terminal_resized(terminal_id: SessionId, cols: u16, rows: u16) -> Self {
        Self::new(EventPayload::TerminalResized {
            terminal_id,
            cols,
            rows,
        })
    }

    pub fn terminal_exited(terminal_id: SessionId, exit: SessionExit) -> Self {
        Self::new(EventPayload::TerminalExited { terminal_id, exit })
    }

    pub fn terminal_closed(terminal_id: SessionId) -> Self {
        Self::new(EventPayload::TerminalClosed { terminal_id })
    }

    pub fn repository_added(repository_id: RepositoryId) -> Self {
        Self::new(EventPayload::RepositoryAdded { repository_id })
    }

    pub fn repository_removed(repository_id: RepositoryId) -> Self {
        Self::new(EventPayload::RepositoryRemoved { repository_id })
    }

    pub fn app_error(error: impl Into<String>) -> Self {
        Self::new(EventPayload::AppError {
            error: error.into(),
            stack: None,
        })
    }

    /// Build an `app:error` from an error chain; the causes become the stack.
    pub fn from_error(err: &anyhow::Error) -> Self {
        let causes: Vec<String> = err.chain().skip(1).map(|c| c.to_string()).collect();
        Self::new(EventPayload::AppError {
            error: err.to_string(),
            stack: if causes.is_empty() {
                None
            } else {
                Some(causes.join("\n"))
            },
        })
    }

    /// Wire name of the event, e.g. `terminal:output`
    pub fn event_type(&self) -> &'static str {
        match &self.payload {
            EventPayload::WorkspaceCreated { .. } => "workspace:created",
            EventPayload::WorkspaceDeleted { .. } => "workspace:deleted",
            EventPayload::WorkspaceUpdated { .. } => "workspace:updated",
            EventPayload::WorkspaceActivated { .. } => "workspace:activated",
            EventPayload::TerminalCreated { .. } => "terminal:created",
            EventPayload::TerminalOutput { .. } => "terminal:output",
            EventPayload::TerminalResized { .. } => "terminal:resized",
            EventPayload::TerminalExited { .. } => "terminal:exited",
            EventPayload::TerminalClosed { .. } => "terminal:closed",
            EventPayload::RepositoryAdded { .. } => "repository:added",
            EventPayload::RepositoryRemoved { .. } => "repository:removed",
            EventPayload::AppError { .. } => "app:error",
        }
    }

    pub fn workspace_id(&self) -> Option<WorkspaceId> {
        match &self.payload {
            EventPayload::WorkspaceCreated { workspace_id }
            | EventPayload::WorkspaceDeleted { workspace_id }
            | EventPayload::WorkspaceUpdated { workspace_id, .. }
            | EventPayload::WorkspaceActivated { workspace_id, .. }
            | EventPayload::TerminalCreated { workspace_id, .. } => Some(*workspace_id),
            _ => None,
        }
    }

    pub fn terminal_id(&self) -> Option<SessionId> {
        match &self.payload {
            EventPayload::TerminalCreated { terminal_id, .. }
            | EventPayload::TerminalOutput { terminal_id, .. }
            | EventPayload::TerminalResized { terminal_id, .. }
            | EventPayload::TerminalExited { terminal_id, .. }
            | EventPayload::TerminalClosed { terminal_id } => Some(*terminal_id),
            _ => None,
        }
    }
}
