//! Fakes for orchestration tests

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use async_trait::async_trait;

use super::{Collaborators, SetupOutcome, SetupRunner, WorktreeProvider};
use crate::config::{StaticConfigSource, WorkspaceDefaults};
use crate::terminal::testing::FakeSpawner;

/// Records worktree calls without touching git
#[derive(Default)]
pub(crate) struct FakeWorktrees {
    pub fail_create: AtomicBool,
    pub fail_remove: AtomicBool,
    pub created: Mutex<Vec<(PathBuf, String, String)>>,
    pub removed: Mutex<Vec<(PathBuf, String)>>,
}

impl FakeWorktrees {
    pub fn created_branches(&self) -> Vec<String> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .map(|(_, branch, _)| branch.clone())
            .collect()
    }

    pub fn removed_paths(&self) -> Vec<PathBuf> {
        self.removed
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }
}

impl WorktreeProvider for FakeWorktrees {
    fn default_branch(&self, _repo: &Path) -> Result<String> {
        Ok("main".to_string())
    }

    fn worktree_path(&self, repo: &Path, branch: &str) -> PathBuf {
        repo.join(".wsmux/worktrees")
            .join(crate::git::worktree_dir_name(branch))
    }

    fn create(&self, repo: &Path, branch: &str, base: &str) -> Result<PathBuf> {
        if self.fail_create.load(Ordering::SeqCst) {
            bail!("fatal: invalid reference: {}", base);
        }
        let path = self.worktree_path(repo, branch);
        self.created
            .lock()
            .unwrap()
            .push((path.clone(), branch.to_string(), base.to_string()));
        Ok(path)
    }

    fn remove(&self, _repo: &Path, worktree: &Path, branch: &str) -> Result<()> {
        if self.fail_remove.load(Ordering::SeqCst) {
            bail!("fatal: '{}' is not a working tree", worktree.display());
        }
        self.removed
            .lock()
            .unwrap()
            .push((worktree.to_path_buf(), branch.to_string()));
        Ok(())
    }
}

/// Setup runner with a scripted result, or one that never finishes
pub(crate) struct FakeSetup {
    outcome: Mutex<SetupOutcome>,
    hang: AtomicBool,
    pub calls: Mutex<Vec<(String, PathBuf, HashMap<String, String>)>>,
}

impl FakeSetup {
    pub fn new() -> Self {
        Self {
            outcome: Mutex::new(SetupOutcome::succeeded()),
            hang: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_outcome(&self, outcome: SetupOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub fn set_hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SetupRunner for FakeSetup {
    async fn run(&self, script: &str, cwd: &Path, env: &HashMap<String, String>) -> SetupOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((script.to_string(), cwd.to_path_buf(), env.clone()));
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.outcome.lock().unwrap().clone()
    }
}

pub(crate) struct Fakes {
    pub spawner: Arc<FakeSpawner>,
    pub worktrees: Arc<FakeWorktrees>,
    pub setup: Arc<FakeSetup>,
}

impl Fakes {
    pub fn new() -> Self {
        Self {
            spawner: FakeSpawner::new(),
            worktrees: Arc::new(FakeWorktrees::default()),
            setup: Arc::new(FakeSetup::new()),
        }
    }

    pub fn collaborators(&self, defaults: WorkspaceDefaults) -> Collaborators {
        Collaborators {
            spawner: self.spawner.clone(),
            worktrees: self.worktrees.clone(),
            setup: self.setup.clone(),
            config: Arc::new(StaticConfigSource(defaults)),
        }
    }
}
