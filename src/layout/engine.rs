//! Per-workspace layout state
//!
//! Each workspace has its own lock, so mutations of one tree are
//! serialized while different workspaces proceed independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::node::{PaneNode, Rect, SplitDirection};
use super::ops::{self, DEFAULT_MAX_DEPTH, LayoutError};
use crate::domain::{SessionId, WorkspaceId};

type Slot = Arc<Mutex<Option<PaneNode>>>;

/// Where a newly created terminal goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Root of an empty layout, otherwise a horizontal split of the last pane
    Auto,
    /// Split an existing pane
    Split {
        target: SessionId,
        direction: SplitDirection,
    },
}

pub struct LayoutEngine {
    max_depth: usize,
    layouts: Mutex<HashMap<WorkspaceId, Slot>>,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl LayoutEngine {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            layouts: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, workspace_id: WorkspaceId) -> Slot {
        let mut layouts = self.layouts.lock().unwrap_or_else(|e| e.into_inner());
        layouts.entry(workspace_id).or_default().clone()
    }

    fn existing_slot(&self, workspace_id: WorkspaceId) -> Option<Slot> {
        let layouts = self.layouts.lock().unwrap_or_else(|e| e.into_inner());
        layouts.get(&workspace_id).cloned()
    }

    fn existing_slots(&self) -> Vec<(WorkspaceId, Slot)> {
        let layouts = self.layouts.lock().unwrap_or_else(|e| e.into_inner());
        layouts.iter().map(|(id, slot)| (*id, slot.clone())).collect()
    }

    /// Current tree for a workspace, `None` when empty
    pub fn tree(&self, workspace_id: WorkspaceId) -> Option<PaneNode> {
        let slot = self.existing_slot(workspace_id)?;
        let tree = slot.lock().unwrap_or_else(|e| e.into_inner());
        tree.clone()
    }

    /// Insert a new terminal into a workspace's layout
    pub fn place(
        &self,
        workspace_id: WorkspaceId,
        terminal_id: SessionId,
        placement: Placement,
    ) -> Result<PaneNode, LayoutError> {
        let slot = self.slot(workspace_id);
        let mut guard = slot.lock().unwrap_or_else(|e| e.into_inner());

        let next = match (guard.as_ref(), placement) {
            (None, Placement::Auto) => PaneNode::terminal(terminal_id),
            (None, Placement::Split { target, .. }) => {
                return Err(LayoutError::TargetNotFound(target));
            }
            (Some(tree), Placement::Auto) => {
                let last = tree.terminal_ids().last().copied();
                match last {
                    Some(target) => ops::split(
                        tree,
                        target,
                        SplitDirection::Horizontal,
                        terminal_id,
                        self.max_depth,
                    )?,
                    None => PaneNode::terminal(terminal_id),
                }
            }
            (Some(tree), Placement::Split { target, direction }) => {
                if !tree.contains(target) {
                    return Err(LayoutError::TargetNotFound(target));
                }
                ops::split(tree, target, direction, terminal_id, self.max_depth)?
            }
        };

        tracing::debug!(workspace_id, terminal_id, "placed terminal");
        *guard = Some(next.clone());
        Ok(next)
    }

    /// Split `target` in a workspace's layout. Absent target leaves the tree as is.
    pub fn split(
        &self,
        workspace_id: WorkspaceId,
        target: SessionId,
        direction: SplitDirection,
        new_terminal: SessionId,
    ) -> Result<Option<PaneNode>, LayoutError> {
        let Some(slot) = self.existing_slot(workspace_id) else {
            return Ok(None);
        };
        let mut guard = slot.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(tree) = guard.as_ref() {
            let next = ops::split(tree, target, direction, new_terminal, self.max_depth)?;
            *guard = Some(next);
        }
        Ok(guard.clone())
    }

    /// Remove a terminal's pane from a workspace; returns the remaining tree.
    pub fn close(&self, workspace_id: WorkspaceId, terminal_id: SessionId) -> Option<PaneNode> {
        let slot = self.existing_slot(workspace_id)?;
        let mut guard = slot.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(tree) = guard.as_ref() {
            *guard = ops::close(tree, terminal_id);
        }
        guard.clone()
    }

    /// Remove a terminal's pane from whichever workspace holds it.
    pub fn remove_terminal(&self, terminal_id: SessionId) -> Option<WorkspaceId> {
        for (workspace_id, slot) in self.existing_slots() {
            let mut guard = slot.lock().unwrap_or_else(|e| e.into_inner());
            let holds = guard.as_ref().is_some_and(|t| t.contains(terminal_id));
            if holds {
                let next = guard.as_ref().and_then(|t| ops::close(t, terminal_id));
                *guard = next;
                return Some(workspace_id);
            }
        }
        None
    }

    /// Screen regions of every terminal in a workspace
    pub fn bounds(&self, workspace_id: WorkspaceId) -> HashMap<SessionId, Rect> {
        self.tree(workspace_id)
            .map(|tree| ops::bounds(&tree))
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(super) fn slot_count(&self) -> usize {
        self.layouts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Drop a workspace's layout, returning the terminals it held.
    pub fn clear(&self, workspace_id: WorkspaceId) -> Vec<SessionId> {
        let slot = {
            let mut layouts = self.layouts.lock().unwrap_or_else(|e| e.into_inner());
            layouts.remove(&workspace_id)
        };

        slot.and_then(|slot| {
            let mut guard = slot.lock().unwrap_or_else(|e| e.into_inner());
            guard.take()
        })
        .map(|tree| tree.terminal_ids())
        .unwrap_or_default()
    }
}
