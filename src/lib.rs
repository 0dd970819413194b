//! wsmux - workspace multiplexer
//!
//! wsmux gives every piece of parallel work its own git worktree and branch,
//! then runs terminal sessions inside it, arranged in a tiled pane layout.
//!
//! ## Components
//!
//! - `git`: worktree enumeration, creation and removal
//! - `workspace`: repositories and workspaces with their status machine
//! - `terminal`: PTY-backed sessions and their output pipelines
//! - `layout`: per-workspace pane trees
//! - `orchestrator`: sequences the above and reports on the event bus
//! - `control`: request/response surface for front-ends

pub mod config;
pub mod control;
pub mod domain;
pub mod events;
pub mod git;
pub mod layout;
pub mod orchestrator;
pub mod terminal;
pub mod workspace;

pub use domain::*;
