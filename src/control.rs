//! Session control surface
//!
//! Front-ends never touch the coordinator's state directly. They hold a
//! cloneable [`ControlHandle`] and send requests over a channel to a single
//! service task; each request carries a oneshot for its reply. Output and
//! exits are pushed on the event bus, never polled through here.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::domain::{SessionHandle, SessionId};
use crate::orchestrator::Orchestrator;
use crate::terminal::CreateOptions;

/// Requests buffered before senders wait
pub const DEFAULT_QUEUE: usize = 256;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Control service stopped")]
    Stopped,

    #[error("{0}")]
    Rejected(String),
}

enum ControlRequest {
    Create {
        options: CreateOptions,
        reply: oneshot::Sender<Result<SessionHandle, ControlError>>,
    },
    Write {
        id: SessionId,
        data: Vec<u8>,
        reply: oneshot::Sender<bool>,
    },
    Resize {
        id: SessionId,
        cols: u16,
        rows: u16,
        reply: oneshot::Sender<bool>,
    },
    Destroy {
        id: SessionId,
        reply: oneshot::Sender<bool>,
    },
}

#[derive(Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<ControlRequest>,
}

impl ControlHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ControlRequest,
    ) -> Result<T, ControlError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| ControlError::Stopped)?;
        reply_rx.await.map_err(|_| ControlError::Stopped)
    }

    /// Spawn a session and place it in its workspace
    pub async fn create(&self, options: CreateOptions) -> Result<SessionHandle, ControlError> {
        self.request(|reply| ControlRequest::Create { options, reply })
            .await?
    }

    pub async fn write(&self, id: SessionId, data: impl Into<Vec<u8>>) -> bool {
        let data = data.into();
        self.request(|reply| ControlRequest::Write { id, data, reply })
            .await
            .unwrap_or(false)
    }

    pub async fn resize(&self, id: SessionId, cols: u16, rows: u16) -> bool {
        self.request(|reply| ControlRequest::Resize {
            id,
            cols,
            rows,
            reply,
        })
        .await
        .unwrap_or(false)
    }

    pub async fn destroy(&self, id: SessionId) -> bool {
        self.request(|reply| ControlRequest::Destroy { id, reply })
            .await
            .unwrap_or(false)
    }
}

/// Start the control service. It stops once every handle is dropped.
pub fn spawn(orchestrator: Arc<Orchestrator>, queue: usize) -> (ControlHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(queue.max(1));
    let task = tokio::spawn(serve(orchestrator, rx));
    (ControlHandle { tx }, task)
}

async fn serve(orchestrator: Arc<Orchestrator>, mut rx: mpsc::Receiver<ControlRequest>) {
    while let Some(request) = rx.recv().await {
        match request {
            // Slow paths get their own task so writes keep flowing
            ControlRequest::Create { options, reply } => {
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move {
                    let result = orchestrator
                        .create_session(options)
                        .await
                        .map_err(|e| ControlError::Rejected(e.to_string()));
                    let _ = reply.send(result);
                });
            }
            ControlRequest::Destroy { id, reply } => {
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move {
                    let ok = orchestrator.destroy_session(id).await.is_ok();
                    let _ = reply.send(ok);
                });
            }
            ControlRequest::Write { id, data, reply } => {
                let ok = match orchestrator.sessions().write(id, &data) {
                    Ok(()) => true,
                    Err(e) => {
                        debug!(session_id = id, "Write rejected: {}", e);
                        false
                    }
                };
                let _ = reply.send(ok);
            }
            ControlRequest::Resize {
                id,
                cols,
                rows,
                reply,
            } => {
                let ok = orchestrator.sessions().resize(id, cols, rows).is_ok();
                let _ = reply.send(ok);
            }
        }
    }
    debug!("Control service stopped");
}
