//! Session registry
//!
//! Owns every live session, keyed by id. Each session sits behind its own
//! lock, so operations on one session never wait on another; the map lock
//! is only held to look up, insert or remove an entry.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::output::{self, EmitGate};
use super::pty::{PtyProcess, PtySpawner, SpawnRequest, SpawnedProcess, TermSize};
use crate::config::Settings;
use crate::domain::{
    SessionExit, SessionHandle, SessionId, SessionState, TerminalSession, WorkspaceId,
};
use crate::events::{Event, EventBus};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Unknown session: {0}")]
    UnknownSession(SessionId),

    #[error("Failed to spawn session {id}: {message}")]
    Spawn { id: SessionId, message: String },

    #[error("I/O error on session {id}: {source}")]
    Io {
        id: SessionId,
        #[source]
        source: std::io::Error,
    },
}

/// Values used when a create request leaves something out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDefaults {
    pub shell: String,
    pub cols: u16,
    pub rows: u16,
    /// Largest merged output payload
    pub coalesce_bytes: usize,
    /// Output chunks buffered per session before the reader blocks
    pub queue_chunks: usize,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Settings::default().session_defaults()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub workspace_id: WorkspaceId,
    pub cwd: PathBuf,
    pub env: HashMap<String, String>,
    pub shell: Option<String>,
    /// Arguments passed to the shell; empty starts it interactively
    pub args: Vec<String>,
    pub cols: Option<u16>,
    pub rows: Option<u16>,
}

impl CreateOptions {
    pub fn new(workspace_id: WorkspaceId, cwd: impl Into<PathBuf>) -> Self {
        Self {
            workspace_id,
            cwd: cwd.into(),
            ..Self::default()
        }
    }
}

struct SessionEntry {
    record: TerminalSession,
    process: Option<Box<dyn PtyProcess>>,
    gate: Arc<EmitGate>,
}

type Entry = Arc<Mutex<SessionEntry>>;

fn lock(entry: &Entry) -> MutexGuard<'_, SessionEntry> {
    entry.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct SessionRegistry {
    spawner: Arc<dyn PtySpawner>,
    bus: EventBus,
    defaults: SessionDefaults,
    next_id: AtomicU64,
    sessions: Mutex<HashMap<SessionId, Entry>>,
}

impl SessionRegistry {
    pub fn new(spawner: Arc<dyn PtySpawner>, bus: EventBus, defaults: SessionDefaults) -> Self {
        Self {
            spawner,
            bus,
            defaults,
            next_id: AtomicU64::new(1),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SessionId, Entry>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn entry(&self, id: SessionId) -> Result<Entry, SessionError> {
        self.sessions()
            .get(&id)
            .cloned()
            .ok_or(SessionError::UnknownSession(id))
    }

    fn request_for(&self, options: &CreateOptions) -> SpawnRequest {
        let program = options
            .shell
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.defaults.shell.clone());

        SpawnRequest {
            program,
            args: options.args.clone(),
            cwd: options.cwd.clone(),
            env: options.env.clone(),
            size: TermSize::new(
                options.cols.unwrap_or(self.defaults.cols),
                options.rows.unwrap_or(self.defaults.rows),
            ),
        }
    }

    /// Spawn a session process.
    ///
    /// The session is registered as `starting` before the spawn, which runs
    /// on a blocking thread. If it is destroyed while the spawn is in flight
    /// the new process is killed and the id stays retired.
    pub async fn create(
        self: &Arc<Self>,
        options: CreateOptions,
    ) -> Result<SessionHandle, SessionError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let gate = EmitGate::new();
        let entry = Arc::new(Mutex::new(SessionEntry {
            record: TerminalSession::new(id, options.workspace_id),
            process: None,
            gate: gate.clone(),
        }));
        self.sessions().insert(id, entry.clone());

        let request = self.request_for(&options);
        debug!(session_id = id, program = %request.program, cwd = %request.cwd.display(), "Spawning session");

        let spawner = self.spawner.clone();
        let spawned = tokio::task::spawn_blocking(move || spawner.spawn(&request))
            .await
            .map_err(anyhow::Error::from)
            .and_then(|result| result);

        let SpawnedProcess {
            mut process,
            output,
            waiter,
        } = match spawned {
            Ok(spawned) => spawned,
            Err(err) => {
                self.sessions().remove(&id);
                lock(&entry).record.state = SessionState::Exited;
                warn!(session_id = id, "Failed to spawn session: {:#}", err);
                return Err(SessionError::Spawn {
                    id,
                    message: format!("{:#}", err),
                });
            }
        };

        let pid = process.pid();
        {
            let mut guard = lock(&entry);
            if guard.record.state != SessionState::Starting {
                drop(guard);
                debug!(session_id = id, "Session destroyed while starting");
                if let Err(e) = process.kill() {
                    debug!(session_id = id, "Failed to kill orphaned process: {}", e);
                }
                drop(output);
                tokio::task::spawn_blocking(move || waiter.wait());
                return Err(SessionError::UnknownSession(id));
            }

            guard.record.state = SessionState::Running;
            guard.record.pid = pid;
            guard.process = Some(process);
            gate.emit(
                &self.bus,
                Event::terminal_created(id, options.workspace_id),
            );
        }

        info!(
            session_id = id,
            workspace_id = options.workspace_id,
            pid = ?pid,
            "Session started"
        );

        output::start(
            self.clone(),
            id,
            output,
            waiter,
            gate,
            self.defaults.queue_chunks,
            self.defaults.coalesce_bytes,
        );

        Ok(SessionHandle { id, pid })
    }

    /// Send input to a session. A session that is still starting has no
    /// process yet and is treated as unknown.
    pub fn write(&self, id: SessionId, data: &[u8]) -> Result<(), SessionError> {
        let entry = self.entry(id)?;
        let mut guard = lock(&entry);
        let process = guard
            .process
            .as_mut()
            .ok_or(SessionError::UnknownSession(id))?;
        process
            .write(data)
            .map_err(|source| SessionError::Io { id, source })
    }

    pub fn resize(&self, id: SessionId, cols: u16, rows: u16) -> Result<(), SessionError> {
        let entry = self.entry(id)?;
        let mut guard = lock(&entry);
        let size = TermSize::new(cols, rows);

        let process = guard
            .process
            .as_mut()
            .ok_or(SessionError::UnknownSession(id))?;
        process
            .resize(size)
            .map_err(|source| SessionError::Io { id, source })?;

        guard
            .gate
            .emit(&self.bus, Event::terminal_resized(id, size.cols, size.rows));
        Ok(())
    }

    /// Kill a session and retire its id. Emits `terminal:closed` and
    /// nothing after it.
    pub fn destroy(&self, id: SessionId) -> Result<(), SessionError> {
        let entry = self
            .sessions()
            .remove(&id)
            .ok_or(SessionError::UnknownSession(id))?;

        let mut guard = lock(&entry);
        let was_running = guard.record.state == SessionState::Running;
        guard.record.state = SessionState::Exited;

        if let Some(mut process) = guard.process.take() {
            if let Err(e) = process.kill() {
                debug!(session_id = id, "Kill failed, process likely gone: {}", e);
            }
        }

        let last = if was_running {
            vec![Event::terminal_closed(id)]
        } else {
            Vec::new()
        };
        guard.gate.close_with(&self.bus, last);

        info!(session_id = id, "Session destroyed");
        Ok(())
    }

    /// Destroy every session of a workspace; returns the ids destroyed.
    pub fn destroy_workspace(&self, workspace_id: WorkspaceId) -> Vec<SessionId> {
        let ids = self.ids_for_workspace(workspace_id);
        ids.into_iter()
            .filter(|id| self.destroy(*id).is_ok())
            .collect()
    }

    /// Destroy everything
    pub fn shutdown(&self) {
        let ids: Vec<SessionId> = self.sessions().keys().copied().collect();
        for id in ids {
            let _ = self.destroy(id);
        }
    }

    /// Called once the process has exited and all its output was delivered
    pub(super) fn finish(&self, id: SessionId, exit: SessionExit) {
        let Some(entry) = self.sessions().remove(&id) else {
            return;
        };

        let mut guard = lock(&entry);
        guard.record.state = SessionState::Exited;
        guard.process = None;

        info!(
            session_id = id,
            exit_code = ?exit.exit_code,
            signal = ?exit.signal,
            "Session exited"
        );
        guard.gate.close_with(
            &self.bus,
            vec![Event::terminal_exited(id, exit), Event::terminal_closed(id)],
        );
    }

    /// Snapshot of a live session
    pub fn get(&self, id: SessionId) -> Option<TerminalSession> {
        let entry = self.sessions().get(&id).cloned()?;
        let record = lock(&entry).record.clone();
        Some(record)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions().contains_key(&id)
    }

    /// Live sessions ordered by id
    pub fn list(&self) -> Vec<TerminalSession> {
        let entries: Vec<Entry> = self.sessions().values().cloned().collect();
        let mut records: Vec<TerminalSession> =
            entries.iter().map(|e| lock(e).record.clone()).collect();
        records.sort_by_key(|r| r.id);
        records
    }

    pub fn ids_for_workspace(&self, workspace_id: WorkspaceId) -> Vec<SessionId> {
        self.list()
            .into_iter()
            .filter(|r| r.workspace_id == workspace_id)
            .map(|r| r.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
