//! Worktree provider against a real repository

mod common;

use common::{branches, create_test_repo};
use wsmux::git::GitManager;
use wsmux::orchestrator::{GitWorktrees, WorktreeProvider};

#[test]
fn provider_creates_lists_and_removes() {
    let repo = create_test_repo();
    let root = repo.path().canonicalize().unwrap();
    let provider = GitWorktrees::new(".wsmux/worktrees");

    assert_eq!(provider.default_branch(&root).unwrap(), "main");

    let planned = provider.worktree_path(&root, "wsmux/alpha-1");
    let path = provider.create(&root, "wsmux/alpha-1", "main").unwrap();
    assert_eq!(path, planned);
    assert!(path.join("test.txt").exists());

    let listed = GitManager::new(&root).unwrap().list_worktrees().unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed[0].is_main);
    let linked = listed.iter().find(|wt| !wt.is_main).unwrap();
    assert_eq!(linked.path.canonicalize().unwrap(), path.canonicalize().unwrap());
    assert_eq!(linked.branch.as_deref(), Some("wsmux/alpha-1"));

    provider.remove(&root, &path, "wsmux/alpha-1").unwrap();
    assert!(!path.exists());
    assert!(!branches(&root).contains(&"wsmux/alpha-1".to_string()));
    assert_eq!(GitManager::new(&root).unwrap().list_worktrees().unwrap().len(), 1);
}

#[test]
fn provider_rejects_unknown_base() {
    let repo = create_test_repo();
    let provider = GitWorktrees::new(".wsmux/worktrees");

    let result = provider.create(repo.path(), "wsmux/beta-1", "does-not-exist");
    assert!(result.is_err());
    assert!(!branches(repo.path()).contains(&"wsmux/beta-1".to_string()));
}

#[test]
fn removing_vanished_worktree_prunes_and_deletes_branch() {
    let repo = create_test_repo();
    let root = repo.path().canonicalize().unwrap();
    let provider = GitWorktrees::new(".wsmux/worktrees");

    let path = provider.create(&root, "wsmux/gone-1", "main").unwrap();
    std::fs::remove_dir_all(&path).unwrap();

    provider.remove(&root, &path, "wsmux/gone-1").unwrap();
    assert!(!branches(&root).contains(&"wsmux/gone-1".to_string()));
    assert_eq!(GitManager::new(&root).unwrap().list_worktrees().unwrap().len(), 1);
}
