//! Orchestrator end to end: real git worktrees, real PTYs, real setup scripts

#![cfg(unix)]

mod common;

use std::sync::Arc;

use common::{branches, create_test_repo, wait_for, write_config};
use wsmux::config::Settings;
use wsmux::domain::WorkspaceStatus;
use wsmux::events::EventPayload;
use wsmux::orchestrator::{Collaborators, Orchestrator};
use wsmux::terminal::CreateOptions;

fn orchestrator() -> Arc<Orchestrator> {
    let settings = Settings {
        shell: Some("/bin/sh".to_string()),
        ..Settings::default()
    };
    let collaborators = Collaborators::native(&settings);
    Arc::new(Orchestrator::new(settings, collaborators))
}

#[tokio::test(flavor = "multi_thread")]
async fn workspace_lifecycle_against_git() {
    let repo = create_test_repo();
    let orchestrator = orchestrator();
    let mut rx = orchestrator.subscribe();

    let repository = orchestrator.add_repository(repo.path()).await.unwrap();
    assert_eq!(repository.default_branch, "main");

    let ws = orchestrator
        .create_workspace(repository.id, "Feature One")
        .await
        .unwrap();
    assert_eq!(ws.status, WorkspaceStatus::Active);
    assert!(ws.branch_name.starts_with("wsmux/feature-one-"));
    assert!(ws.worktree_path.join("test.txt").exists());
    assert!(branches(&repository.path).contains(&ws.branch_name));
    assert_eq!(ws.session_ids.len(), 1);

    wait_for(&mut rx, |e| {
        matches!(e.payload, EventPayload::TerminalCreated { workspace_id, .. } if workspace_id == ws.id)
    })
    .await;

    orchestrator.delete_workspace(ws.id).await.unwrap();
    assert!(!ws.worktree_path.exists());
    assert!(!branches(&repository.path).contains(&ws.branch_name));
    assert!(orchestrator.sessions().is_empty());

    wait_for(&mut rx, |e| {
        matches!(e.payload, EventPayload::WorkspaceDeleted { workspace_id } if workspace_id == ws.id)
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn command_output_reaches_the_bus() {
    let repo = create_test_repo();
    let orchestrator = orchestrator();
    let repository = orchestrator.add_repository(repo.path()).await.unwrap();
    let ws = orchestrator.create_workspace(repository.id, "echo").await.unwrap();

    let mut rx = orchestrator.subscribe();
    let handle = orchestrator
        .create_session(CreateOptions {
            workspace_id: ws.id,
            args: vec!["-c".to_string(), "printf from-$WSMUX_TEST; exit 4".to_string()],
            env: [("WSMUX_TEST".to_string(), "pty".to_string())].into(),
            ..CreateOptions::default()
        })
        .await
        .unwrap();
    assert!(handle.pid.is_some());

    let mut output = Vec::new();
    let exited = wait_for(&mut rx, |e| match &e.payload {
        EventPayload::TerminalOutput { terminal_id, data } if *terminal_id == handle.id => {
            output.extend_from_slice(data);
            false
        }
        EventPayload::TerminalExited { terminal_id, .. } => *terminal_id == handle.id,
        _ => false,
    })
    .await;

    assert!(String::from_utf8_lossy(&output).contains("from-pty"));
    match exited.payload {
        EventPayload::TerminalExited { exit, .. } => assert_eq!(exit.exit_code, Some(4)),
        other => panic!("unexpected {:?}", other),
    }

    orchestrator.delete_workspace(ws.id).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn setup_script_runs_in_the_worktree() {
    let repo = create_test_repo();
    write_config(
        repo.path(),
        r#"
[workspace_defaults]
setup_script = "printf $GREETING > setup.out"

[workspace_defaults.env]
GREETING = "ready"
"#,
    );
    let orchestrator = orchestrator();
    let repository = orchestrator.add_repository(repo.path()).await.unwrap();

    let ws = orchestrator.create_workspace(repository.id, "setup").await.unwrap();
    assert_eq!(ws.status, WorkspaceStatus::Active);
    assert_eq!(
        std::fs::read_to_string(ws.worktree_path.join("setup.out")).unwrap(),
        "ready"
    );
    assert_eq!(ws.session_ids.len(), 1);

    orchestrator.delete_workspace(ws.id).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_setup_reports_and_keeps_the_worktree() {
    let repo = create_test_repo();
    write_config(
        repo.path(),
        "[workspace_defaults]\nsetup_script = \"echo broken >&2; exit 7\"\n",
    );
    let orchestrator = orchestrator();
    let mut rx = orchestrator.subscribe();
    let repository = orchestrator.add_repository(repo.path()).await.unwrap();

    let ws = orchestrator.create_workspace(repository.id, "broken").await.unwrap();
    assert_eq!(ws.status, WorkspaceStatus::Error);
    assert!(ws.session_ids.is_empty());
    assert!(ws.worktree_path.exists());

    let event = wait_for(&mut rx, |e| matches!(e.payload, EventPayload::AppError { .. })).await;
    match event.payload {
        EventPayload::AppError { error, .. } => {
            assert!(error.contains("Setup failed for workspace 'broken'"), "{}", error);
            assert!(error.contains("exit code 7"), "{}", error);
        }
        other => panic!("unexpected {:?}", other),
    }

    orchestrator.delete_workspace(ws.id).await.unwrap();
    assert!(!ws.worktree_path.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn exited_terminal_leaves_the_layout() {
    let repo = create_test_repo();
    let orchestrator = orchestrator();
    let _reactor = orchestrator.spawn_event_reactor();
    let repository = orchestrator.add_repository(repo.path()).await.unwrap();
    let ws = orchestrator.create_workspace(repository.id, "short").await.unwrap();

    let mut rx = orchestrator.subscribe();
    let handle = orchestrator
        .create_session(CreateOptions {
            workspace_id: ws.id,
            args: vec!["-c".to_string(), "exit 0".to_string()],
            ..CreateOptions::default()
        })
        .await
        .unwrap();

    wait_for(&mut rx, |e| {
        matches!(e.payload, EventPayload::TerminalClosed { terminal_id } if terminal_id == handle.id)
    })
    .await;

    // The reactor runs on its own task
    for _ in 0..100 {
        let tree = orchestrator.layouts().tree(ws.id).unwrap();
        if !tree.contains(handle.id) {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    let tree = orchestrator.layouts().tree(ws.id).unwrap();
    assert!(!tree.contains(handle.id));
    assert_eq!(tree.terminal_ids(), ws.session_ids);

    orchestrator.delete_workspace(ws.id).await.unwrap();
}
