use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{RepositoryId, SessionId};

/// Unique identifier for a workspace
pub type WorkspaceId = u64;

/// The status of a workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceStatus {
    /// Worktree exists, setup script is running
    SettingUp,
    /// Ready and in use
    Active,
    /// Ready but no recent activity
    Idle,
    /// Setup or a session failed
    Error,
    /// Put away by the user
    Archived,
}

impl WorkspaceStatus {
    /// Status a freshly materialized workspace starts in.
    pub fn initial(setup_configured: bool) -> Self {
        if setup_configured {
            WorkspaceStatus::SettingUp
        } else {
            WorkspaceStatus::Active
        }
    }

    /// Whether moving from `self` to `next` is allowed.
    ///
    /// Self-transitions are always allowed and treated as no-ops by callers.
    pub fn can_transition_to(self, next: WorkspaceStatus) -> bool {
        use WorkspaceStatus::*;

        if self == next {
            return true;
        }

        match (self, next) {
            (_, Archived) => self != Archived,
            (_, Error) => true,
            (SettingUp, Active) => true,
            (Active, Idle) | (Idle, Active) => true,
            (Error, SettingUp) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceStatus::SettingUp => "setting_up",
            WorkspaceStatus::Active => "active",
            WorkspaceStatus::Idle => "idle",
            WorkspaceStatus::Error => "error",
            WorkspaceStatus::Archived => "archived",
        }
    }
}

impl std::fmt::Display for WorkspaceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit of isolated work, backed by exactly one worktree/branch pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    /// Unique identifier
    pub id: WorkspaceId,

    /// Human-readable name as entered by the user
    pub name: String,

    /// Repository this workspace was created from
    pub repository_id: RepositoryId,

    /// Path of the git worktree backing this workspace
    pub worktree_path: PathBuf,

    /// Branch checked out in the worktree
    pub branch_name: String,

    /// Current status
    pub status: WorkspaceStatus,

    /// Every terminal session ever created in this workspace, in creation order.
    /// The session registry owns the sessions themselves.
    #[serde(default)]
    pub session_ids: Vec<SessionId>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workspace {
    pub fn new(
        id: WorkspaceId,
        repository_id: RepositoryId,
        name: impl Into<String>,
        worktree_path: PathBuf,
        branch_name: impl Into<String>,
        status: WorkspaceStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            repository_id,
            worktree_path,
            branch_name: branch_name.into(),
            status,
            session_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a session id, keeping the list free of duplicates
    pub fn record_session(&mut self, session_id: SessionId) {
        if !self.session_ids.contains(&session_id) {
            self.session_ids.push(session_id);
            self.touch();
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use WorkspaceStatus::*;

    #[test]
    fn initial_status_depends_on_setup() {
        assert_eq!(WorkspaceStatus::initial(true), SettingUp);
        assert_eq!(WorkspaceStatus::initial(false), Active);
    }

    #[test]
    fn setup_outcomes() {
        assert!(SettingUp.can_transition_to(Active));
        assert!(SettingUp.can_transition_to(Error));
        assert!(!SettingUp.can_transition_to(Idle));
    }

    #[test]
    fn activity_toggles() {
        assert!(Active.can_transition_to(Idle));
        assert!(Idle.can_transition_to(Active));
    }

    #[test]
    fn error_only_leaves_via_retry_or_archive() {
        assert!(Error.can_transition_to(SettingUp));
        assert!(Error.can_transition_to(Archived));
        assert!(!Error.can_transition_to(Active));
        assert!(!Error.can_transition_to(Idle));
    }

    #[test]
    fn archived_is_sticky() {
        assert!(!Archived.can_transition_to(Active));
        assert!(!Archived.can_transition_to(SettingUp));
        assert!(Archived.can_transition_to(Error));
        assert!(Archived.can_transition_to(Archived));
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&SettingUp).unwrap();
        assert_eq!(json, "\"setting_up\"");
        assert_eq!(SettingUp.to_string(), "setting_up");
    }

    #[test]
    fn record_session_dedupes() {
        let mut ws = Workspace::new(1, 1, "feat", PathBuf::from("/wt"), "wsmux/feat", Active);
        ws.record_session(3);
        ws.record_session(3);
        ws.record_session(4);
        assert_eq!(ws.session_ids, vec![3, 4]);
    }
}
