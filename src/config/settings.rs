//! Settings configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::terminal::SessionDefaults;

/// General settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Where worktrees are created, relative to the repository root
    #[serde(default = "default_worktrees_dir")]
    pub worktrees_dir: PathBuf,

    /// Namespace for generated branch names (`<prefix>/<slug>-<suffix>`)
    #[serde(default = "default_branch_prefix")]
    pub branch_prefix: String,

    /// Shell for new sessions; falls back to `$SHELL`, then `/bin/sh`
    #[serde(default)]
    pub shell: Option<String>,

    #[serde(default = "default_cols")]
    pub cols: u16,

    #[serde(default = "default_rows")]
    pub rows: u16,

    /// Deepest allowed split nesting per workspace layout
    #[serde(default = "default_max_split_depth")]
    pub max_split_depth: usize,

    /// Events buffered per observer before it is told it lagged
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Upper bound for one coalesced `terminal:output` payload
    #[serde(default = "default_output_coalesce_bytes")]
    pub output_coalesce_bytes: usize,

    /// Chunks queued between a PTY reader and its delivery task
    #[serde(default = "default_output_queue_chunks")]
    pub output_queue_chunks: usize,
}

fn default_worktrees_dir() -> PathBuf {
    PathBuf::from(".wsmux/worktrees")
}

fn default_branch_prefix() -> String {
    "wsmux".to_string()
}

fn default_cols() -> u16 {
    80
}

fn default_rows() -> u16 {
    24
}

fn default_max_split_depth() -> usize {
    crate::layout::DEFAULT_MAX_DEPTH
}

fn default_event_capacity() -> usize {
    crate::events::DEFAULT_CAPACITY
}

fn default_output_coalesce_bytes() -> usize {
    64 * 1024
}

fn default_output_queue_chunks() -> usize {
    256
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            worktrees_dir: default_worktrees_dir(),
            branch_prefix: default_branch_prefix(),
            shell: None,
            cols: default_cols(),
            rows: default_rows(),
            max_split_depth: default_max_split_depth(),
            event_capacity: default_event_capacity(),
            output_coalesce_bytes: default_output_coalesce_bytes(),
            output_queue_chunks: default_output_queue_chunks(),
        }
    }
}

impl Settings {
    /// Shell to launch when a session does not name one
    pub fn resolved_shell(&self) -> String {
        self.shell
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| std::env::var("SHELL").ok().filter(|s| !s.is_empty()))
            .unwrap_or_else(|| "/bin/sh".to_string())
    }

    /// Defaults handed to the session registry
    pub fn session_defaults(&self) -> SessionDefaults {
        SessionDefaults {
            shell: self.resolved_shell(),
            cols: self.cols,
            rows: self.rows,
            coalesce_bytes: self.output_coalesce_bytes.max(1),
            queue_chunks: self.output_queue_chunks.max(1),
        }
    }
}
