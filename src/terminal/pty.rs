//! Process spawning behind a trait, with a `portable-pty` implementation
//!
//! The registry never touches a PTY directly. It asks a [`PtySpawner`] for a
//! process and gets back three independently owned halves: the control
//! handle, the output stream and the exit waiter. Each half can then live
//! on the thread or task that needs it.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use portable_pty::{Child, ChildKiller, CommandBuilder, MasterPty, PtySize, native_pty_system};

use crate::domain::SessionExit;

/// Terminal dimensions in character cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermSize {
    pub cols: u16,
    pub rows: u16,
}

impl TermSize {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols: cols.max(1),
            rows: rows.max(1),
        }
    }

    fn pty_size(self) -> PtySize {
        PtySize {
            rows: self.rows,
            cols: self.cols,
            pixel_width: 0,
            pixel_height: 0,
        }
    }
}

/// Everything needed to start one session process
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: HashMap<String, String>,
    pub size: TermSize,
}

/// Control half of a running process
pub trait PtyProcess: Send {
    fn pid(&self) -> Option<u32>;
    fn write(&mut self, data: &[u8]) -> std::io::Result<()>;
    fn resize(&mut self, size: TermSize) -> std::io::Result<()>;
    fn kill(&mut self) -> std::io::Result<()>;
}

/// Blocks until the process is gone
pub trait ExitWaiter: Send {
    fn wait(self: Box<Self>) -> SessionExit;
}

/// A freshly spawned process, split into its halves
pub struct SpawnedProcess {
    pub process: Box<dyn PtyProcess>,
    pub output: Box<dyn Read + Send>,
    pub waiter: Box<dyn ExitWaiter>,
}

/// Starts session processes. Called from a blocking thread.
pub trait PtySpawner: Send + Sync {
    fn spawn(&self, request: &SpawnRequest) -> Result<SpawnedProcess>;
}

/// Spawns processes inside a real pseudo-terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct NativePtySpawner;

impl PtySpawner for NativePtySpawner {
    fn spawn(&self, request: &SpawnRequest) -> Result<SpawnedProcess> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(request.size.pty_size())
            .context("Failed to open PTY")?;

        let mut cmd = CommandBuilder::new(&request.program);
        cmd.args(&request.args);
        cmd.cwd(&request.cwd);
        cmd.env("TERM", "xterm-256color");
        for (key, value) in &request.env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .with_context(|| format!("Failed to spawn {} in PTY", request.program))?;
        // Only the child may hold the slave side, or reads never see EOF
        drop(pair.slave);

        let output = pair
            .master
            .try_clone_reader()
            .context("Failed to clone PTY reader")?;
        let writer = pair
            .master
            .take_writer()
            .context("Failed to acquire PTY writer")?;

        let process = NativePty {
            pid: child.process_id(),
            killer: child.clone_killer(),
            master: pair.master,
            writer,
        };

        Ok(SpawnedProcess {
            process: Box::new(process),
            output,
            waiter: Box::new(NativeWaiter { child }),
        })
    }
}

struct NativePty {
    pid: Option<u32>,
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    killer: Box<dyn ChildKiller + Send + Sync>,
}

impl PtyProcess for NativePty {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn write(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(data)?;
        self.writer.flush()
    }

    fn resize(&mut self, size: TermSize) -> std::io::Result<()> {
        self.master
            .resize(size.pty_size())
            .map_err(std::io::Error::other)
    }

    fn kill(&mut self) -> std::io::Result<()> {
        self.killer.kill()
    }
}

struct NativeWaiter {
    child: Box<dyn Child + Send + Sync>,
}

impl ExitWaiter for NativeWaiter {
    fn wait(mut self: Box<Self>) -> SessionExit {
        match self.child.wait() {
            Ok(status) => match status.signal() {
                Some(signal) => SessionExit::signalled(signal),
                None => SessionExit::code(status.exit_code()),
            },
            Err(e) => {
                tracing::warn!("Failed to wait for session process: {}", e);
                SessionExit::default()
            }
        }
    }
}
