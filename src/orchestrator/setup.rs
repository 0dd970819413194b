//! Setup scripts run inside a fresh worktree

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

/// Lines of stderr kept in a failure message
const STDERR_TAIL_LINES: usize = 20;

/// Result of a setup run. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl SetupOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[async_trait]
pub trait SetupRunner: Send + Sync {
    /// Run `script` in `cwd`. Dropping the future must stop the script.
    async fn run(&self, script: &str, cwd: &Path, env: &HashMap<String, String>) -> SetupOutcome;
}

/// Runs setup scripts with `sh -c`
#[derive(Debug, Clone)]
pub struct ShellSetupRunner {
    shell: String,
}

impl Default for ShellSetupRunner {
    fn default() -> Self {
        Self::new("/bin/sh")
    }
}

impl ShellSetupRunner {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

#[async_trait]
impl SetupRunner for ShellSetupRunner {
    async fn run(&self, script: &str, cwd: &Path, env: &HashMap<String, String>) -> SetupOutcome {
        tracing::debug!(cwd = %cwd.display(), "Running setup script");

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(script)
            .current_dir(cwd)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => SetupOutcome::succeeded(),
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let lines: Vec<&str> = stderr.trim_end().lines().collect();
                let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
                let status = match output.status.code() {
                    Some(code) => format!("exit code {}", code),
                    None => "a signal".to_string(),
                };
                if tail.is_empty() {
                    SetupOutcome::failed(format!("Setup script failed with {}", status))
                } else {
                    SetupOutcome::failed(format!("Setup script failed with {}: {}", status, tail))
                }
            }
            Err(e) => SetupOutcome::failed(format!("Failed to run setup script: {}", e)),
        }
    }
}
