//! Workspace management
//!
//! The workspace module provides:
//! - WorkspaceStore: repositories and the workspaces created from them
//! - StoreError: identity conflicts, unknown ids and rejected status transitions

mod store;

pub use store::{StatusChange, StoreError, WorkspaceStore};
