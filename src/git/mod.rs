//! Git operations and worktree management

mod branch;
mod manager;

pub use branch::{derive_branch_name, sanitize_branch_name, unique_suffix, worktree_dir_name};
pub use manager::{GitManager, WorktreeInfo, find_git_root, parse_worktrees};
