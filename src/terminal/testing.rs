//! In-process stand-in for a PTY, used by unit tests across the crate

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};

use super::pty::{ExitWaiter, PtyProcess, PtySpawner, SpawnRequest, SpawnedProcess, TermSize};
use crate::domain::SessionExit;

#[derive(Default)]
struct FakeState {
    written: Vec<u8>,
    sizes: Vec<TermSize>,
    killed: bool,
}

/// Test-side handle on one spawned fake process
#[derive(Clone)]
pub(crate) struct FakeControl {
    pub request: SpawnRequest,
    pub pid: u32,
    state: Arc<Mutex<FakeState>>,
    exit_tx: mpsc::Sender<SessionExit>,
}

impl FakeControl {
    pub fn exit(&self, code: u32) {
        self.exit_with(SessionExit::code(code));
    }

    pub fn exit_with(&self, exit: SessionExit) {
        let _ = self.exit_tx.send(exit);
    }

    pub fn written(&self) -> Vec<u8> {
        self.state.lock().unwrap().written.clone()
    }

    pub fn sizes(&self) -> Vec<TermSize> {
        self.state.lock().unwrap().sizes.clone()
    }

    pub fn killed(&self) -> bool {
        self.state.lock().unwrap().killed
    }
}

struct FakeProcess {
    pid: u32,
    state: Arc<Mutex<FakeState>>,
    exit_tx: mpsc::Sender<SessionExit>,
}

impl PtyProcess for FakeProcess {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn write(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.state.lock().unwrap().written.extend_from_slice(data);
        Ok(())
    }

    fn resize(&mut self, size: TermSize) -> std::io::Result<()> {
        self.state.lock().unwrap().sizes.push(size);
        Ok(())
    }

    fn kill(&mut self) -> std::io::Result<()> {
        self.state.lock().unwrap().killed = true;
        let _ = self.exit_tx.send(SessionExit::signalled("SIGKILL"));
        Ok(())
    }
}

struct FakeWaiter(mpsc::Receiver<SessionExit>);

impl ExitWaiter for FakeWaiter {
    fn wait(self: Box<Self>) -> SessionExit {
        self.0.recv().unwrap_or_default()
    }
}

/// Emits canned output, then waits until the test (or a kill) ends it
pub(crate) struct FakeSpawner {
    output: Vec<u8>,
    failing: AtomicBool,
    exit_at_once: AtomicBool,
    next_pid: AtomicU32,
    spawned: Mutex<Vec<FakeControl>>,
}

impl FakeSpawner {
    pub fn new() -> Arc<Self> {
        Self::with_output(Vec::new())
    }

    pub fn with_output(output: impl Into<Vec<u8>>) -> Arc<Self> {
        Arc::new(Self {
            output: output.into(),
            failing: AtomicBool::new(false),
            exit_at_once: AtomicBool::new(false),
            next_pid: AtomicU32::new(1000),
            spawned: Mutex::new(Vec::new()),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Processes exit with code 0 as soon as they are spawned
    pub fn set_exit_at_once(&self, exit_at_once: bool) {
        self.exit_at_once.store(exit_at_once, Ordering::SeqCst);
    }

    pub fn spawned(&self) -> Vec<FakeControl> {
        self.spawned.lock().unwrap().clone()
    }

    pub fn last(&self) -> FakeControl {
        self.spawned.lock().unwrap().last().cloned().unwrap()
    }
}

impl PtySpawner for FakeSpawner {
    fn spawn(&self, request: &SpawnRequest) -> Result<SpawnedProcess> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("No such file or directory: {}", request.program);
        }

        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        let state = Arc::new(Mutex::new(FakeState::default()));
        let (exit_tx, exit_rx) = mpsc::channel();
        if self.exit_at_once.load(Ordering::SeqCst) {
            let _ = exit_tx.send(SessionExit::code(0));
        }

        self.spawned.lock().unwrap().push(FakeControl {
            request: request.clone(),
            pid,
            state: state.clone(),
            exit_tx: exit_tx.clone(),
        });

        Ok(SpawnedProcess {
            process: Box::new(FakeProcess {
                pid,
                state,
                exit_tx,
            }),
            output: Box::new(Cursor::new(self.output.clone())),
            waiter: Box::new(FakeWaiter(exit_rx)),
        })
    }
}
