//! Shared test utilities for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::broadcast;
use wsmux::events::Event;

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap_or_else(|e| panic!("failed to run git {:?}: {}", args, e));
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Creates a temporary git repository on `main` with one commit
pub fn create_test_repo() -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let repo_path = temp_dir.path();

    git(repo_path, &["init"]);
    git(repo_path, &["config", "user.email", "test@test.com"]);
    git(repo_path, &["config", "user.name", "Test User"]);

    fs::write(repo_path.join("test.txt"), "initial content\n")
        .expect("Failed to write initial file");
    git(repo_path, &["add", "."]);
    git(repo_path, &["commit", "-m", "Initial commit"]);
    git(repo_path, &["branch", "-m", "main"]);

    temp_dir
}

/// Write `.wsmux/config.toml` into the repository
pub fn write_config(repo: &Path, toml: &str) {
    let dir = repo.join(".wsmux");
    fs::create_dir_all(&dir).expect("Failed to create .wsmux");
    fs::write(dir.join("config.toml"), toml).expect("Failed to write config");
}

/// Local branches of the repository
pub fn branches(repo: &Path) -> Vec<String> {
    let output = Command::new("git")
        .args(["branch", "--format=%(refname:short)"])
        .current_dir(repo)
        .output()
        .expect("Failed to list branches");
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

/// Receive until `pred` matches, failing after ten seconds
pub async fn wait_for(
    rx: &mut broadcast::Receiver<Event>,
    mut pred: impl FnMut(&Event) -> bool,
) -> Event {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}
