//! Terminal sessions
//!
//! - SessionRegistry: create/write/resize/destroy, session state machine
//! - PtySpawner: how processes are started (real PTY or a test fake)
//! - output: per-session delivery of bytes and exit notifications

mod output;
mod pty;
mod registry;

#[cfg(test)]
pub(crate) mod testing;


pub use pty::{
    ExitWaiter, NativePtySpawner, PtyProcess, PtySpawner, SpawnRequest, SpawnedProcess, TermSize,
};
pub use registry::{CreateOptions, SessionDefaults, SessionError, SessionRegistry};
