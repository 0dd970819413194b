//! Output delivery for one session
//!
//! A reader thread pulls bytes off the PTY and pushes them into a bounded
//! channel. When the channel is full the reader blocks, which back-pressures
//! the process through the PTY instead of buffering without limit. A single
//! task drains the channel, merges whatever chunks are already queued into
//! one `terminal:output` event, and finally reports the exit once the
//! reader has seen end of stream.

use std::io::Read;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use super::pty::ExitWaiter;
use super::registry::SessionRegistry;
use crate::domain::{SessionExit, SessionId};
use crate::events::{Event, EventBus};

const READ_BUF_SIZE: usize = 8192;

#[derive(Debug)]
pub(super) enum PtyMessage {
    Output(Vec<u8>),
    Exited(SessionExit),
}

/// Open while the session may still emit events. Closed exactly once, by
/// whoever retires the session first.
#[derive(Debug)]
pub(super) struct EmitGate(Mutex<bool>);

impl EmitGate {
    pub(super) fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(true)))
    }

    /// Emit only while the gate is open
    pub(super) fn emit(&self, bus: &EventBus, event: Event) -> bool {
        let open = self.0.lock().unwrap_or_else(|e| e.into_inner());
        if *open {
            bus.emit(event);
        }
        *open
    }

    /// Emit `last` and close the gate. Returns false if it was already closed.
    pub(super) fn close_with(&self, bus: &EventBus, last: Vec<Event>) -> bool {
        let mut open = self.0.lock().unwrap_or_else(|e| e.into_inner());
        if !*open {
            return false;
        }
        for event in last {
            bus.emit(event);
        }
        *open = false;
        true
    }
}

/// Start the reader and waiter threads plus the delivery task.
pub(super) fn start(
    registry: Arc<SessionRegistry>,
    id: SessionId,
    output: Box<dyn Read + Send>,
    waiter: Box<dyn ExitWaiter>,
    gate: Arc<EmitGate>,
    queue_chunks: usize,
    coalesce_bytes: usize,
) {
    let (tx, rx) = mpsc::channel(queue_chunks);

    let reader_tx = tx.clone();
    let reader = std::thread::spawn(move || read_output(output, reader_tx));

    std::thread::spawn(move || {
        let exit = waiter.wait();
        // Deliver all output before the exit
        let _ = reader.join();
        let _ = tx.blocking_send(PtyMessage::Exited(exit));
    });

    tokio::spawn(deliver(registry, id, rx, gate, coalesce_bytes));
}

fn read_output(mut output: Box<dyn Read + Send>, tx: mpsc::Sender<PtyMessage>) {
    let mut buf = [0u8; READ_BUF_SIZE];
    loop {
        match output.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.blocking_send(PtyMessage::Output(buf[..n].to_vec())).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            // EIO once the child side is closed
            Err(_) => break,
        }
    }
}

async fn deliver(
    registry: Arc<SessionRegistry>,
    id: SessionId,
    mut rx: mpsc::Receiver<PtyMessage>,
    gate: Arc<EmitGate>,
    coalesce_bytes: usize,
) {
    let bus = registry.bus().clone();

    while let Some(message) = rx.recv().await {
        let mut data = match message {
            PtyMessage::Output(data) => data,
            PtyMessage::Exited(exit) => {
                registry.finish(id, exit);
                return;
            }
        };

        let mut exit = None;
        while data.len() < coalesce_bytes {
            match rx.try_recv() {
                Ok(PtyMessage::Output(more)) => data.extend_from_slice(&more),
                Ok(PtyMessage::Exited(e)) => {
                    exit = Some(e);
                    break;
                }
                Err(_) => break,
            }
        }

        // Destroyed sessions keep draining so the reader never blocks forever
        gate.emit(&bus, Event::terminal_output(id, data));

        if let Some(exit) = exit {
            registry.finish(id, exit);
            return;
        }
    }
}
