//! Run command implementation
//!
//! Creates a workspace through the orchestrator, then mirrors one of its
//! terminals: output to stdout, stdin to the session.

use anyhow::{Result, bail};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use wsmux::config::RepoConfig;
use wsmux::domain::{SessionExit, SessionId, WorkspaceStatus};
use wsmux::events::EventPayload;
use wsmux::orchestrator::{Collaborators, Orchestrator};
use wsmux::terminal::{CreateOptions, SessionRegistry};

/// Returns the exit code of the mirrored session
pub async fn run_command(
    work_dir: &Path,
    name: &str,
    command: Vec<String>,
    cleanup: bool,
) -> Result<i32> {
    let root = super::repo_root(work_dir)?;
    let settings = RepoConfig::from_dir(&root)?.settings;

    let orchestrator = Arc::new(Orchestrator::new(
        settings.clone(),
        Collaborators::native(&settings),
    ));
    let _reactor = orchestrator.spawn_event_reactor();
    // Subscribed before anything spawns so no early output is missed
    let mut events = orchestrator.subscribe();

    let repository = orchestrator.add_repository(&root).await?;
    let workspace = orchestrator.create_workspace(repository.id, name).await?;
    println!(
        "Workspace '{}' on {} at {}",
        workspace.name,
        workspace.branch_name,
        workspace.worktree_path.display()
    );

    if workspace.status == WorkspaceStatus::Error {
        if cleanup {
            orchestrator.delete_workspace(workspace.id).await?;
        }
        bail!("Workspace '{}' failed to start", workspace.name);
    }

    let terminal_id = if command.is_empty() {
        match workspace.session_ids.first() {
            Some(id) => *id,
            None => bail!("Workspace '{}' has no terminal", workspace.name),
        }
    } else {
        for id in &workspace.session_ids {
            orchestrator.close_terminal(workspace.id, *id).await?;
        }
        let handle = orchestrator
            .create_session(CreateOptions {
                workspace_id: workspace.id,
                args: vec!["-c".to_string(), command.join(" ")],
                ..CreateOptions::default()
            })
            .await?;
        handle.id
    };
    info!(workspace_id = workspace.id, terminal_id, "Streaming terminal");

    forward_stdin(orchestrator.sessions().clone(), terminal_id);
    let exit = stream_output(&orchestrator, &mut events, terminal_id).await?;

    if cleanup {
        orchestrator.delete_workspace(workspace.id).await?;
        println!("Removed workspace '{}'", workspace.name);
    }
    orchestrator.shutdown();

    Ok(match exit {
        Some(exit) if exit.signal.is_some() => 128,
        Some(exit) => exit.exit_code.map(|c| c as i32).unwrap_or(1),
        None => 130,
    })
}

/// Copy terminal output to stdout until the session closes. `None` when
/// interrupted before the process exited.
async fn stream_output(
    orchestrator: &Orchestrator,
    events: &mut tokio::sync::broadcast::Receiver<wsmux::events::Event>,
    terminal_id: SessionId,
) -> Result<Option<SessionExit>> {
    let mut stdout = tokio::io::stdout();
    let mut exit = None;

    loop {
        let received = tokio::select! {
            received = events.recv() => received,
            _ = tokio::signal::ctrl_c() => {
                debug!(terminal_id, "Interrupted");
                let _ = orchestrator.destroy_session(terminal_id).await;
                break;
            }
        };

        match received {
            Ok(event) => match event.payload {
                EventPayload::TerminalOutput { terminal_id: id, data } if id == terminal_id => {
                    stdout.write_all(&data).await?;
                    stdout.flush().await?;
                }
                EventPayload::TerminalExited { terminal_id: id, exit: e } if id == terminal_id => {
                    exit = Some(e);
                }
                EventPayload::TerminalClosed { terminal_id: id } if id == terminal_id => break,
                EventPayload::AppError { error, .. } => warn!("{}", error),
                _ => {}
            },
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Output fell behind, events dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }

    Ok(exit)
}

/// Feed stdin to the session from a plain thread; stdin reads block.
fn forward_stdin(sessions: Arc<SessionRegistry>, terminal_id: SessionId) {
    std::thread::spawn(move || {
        let mut stdin = std::io::stdin();
        let mut buf = [0u8; 4096];
        loop {
            match stdin.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if sessions.write(terminal_id, &buf[..n]).is_err() {
                        break;
                    }
                }
            }
        }
    });
}
