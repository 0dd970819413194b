//! Reacts to session exits so layouts never keep a dead pane

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::Orchestrator;
use crate::events::EventPayload;

impl Orchestrator {
    /// Watch the bus for `terminal:exited` and drop the exited terminal's
    /// pane. Stops once the orchestrator is gone.
    pub fn spawn_event_reactor(self: &Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        let orchestrator = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                let received = rx.recv().await;
                let Some(this) = orchestrator.upgrade() else {
                    break;
                };

                match received {
                    Ok(event) => {
                        if let EventPayload::TerminalExited { terminal_id, .. } = event.payload {
                            if let Some(workspace_id) = this.layouts.remove_terminal(terminal_id) {
                                debug!(workspace_id, terminal_id, "Removed pane of exited terminal");
                            }
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event reactor lagged, pruning layouts");
                        this.prune_dead_panes();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Drop every pane whose session no longer exists
    pub fn prune_dead_panes(&self) -> usize {
        let mut pruned = 0;
        for workspace in self.store.workspaces() {
            let Some(tree) = self.layouts.tree(workspace.id) else {
                continue;
            };
            for terminal_id in tree.terminal_ids() {
                if !self.sessions.contains(terminal_id) {
                    self.layouts.close(workspace.id, terminal_id);
                    pruned += 1;
                }
            }
        }
        pruned
    }
}
