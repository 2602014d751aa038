// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git worktree manipulation, modeled as a `WorktreeManager` trait so the
//! wave orchestrator and session lifecycle never shell out directly.
//! Grounded on `kasmos_adapters::subprocess`'s timeout-wrapped `Command`
//! pattern.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

use kasmos_adapters::subprocess::{run_with_timeout, GIT_WORKTREE_TIMEOUT};

#[derive(Debug, Error)]
pub enum WorktreeError {
    #[error("{0}")]
    CommandFailed(String),
}

#[async_trait]
pub trait WorktreeManager: Clone + Send + Sync + 'static {
    /// Create (or reuse, if already present) a worktree at `worktree_path`
    /// checked out on `branch`, creating `branch` if it doesn't exist yet.
    async fn materialize(
        &self,
        repo_root: &Path,
        branch: &str,
        worktree_path: &Path,
    ) -> Result<(), WorktreeError>;

    /// Remove a worktree. The caller is responsible for first checking
    /// `is_checked_out` if sibling sessions might still be using it —
    /// see §4.4's `kill()` contract.
    async fn remove(&self, repo_root: &Path, worktree_path: &Path) -> Result<(), WorktreeError>;

    /// Whether `branch` currently has a live worktree checkout anywhere
    /// under `repo_root`.
    async fn is_checked_out(&self, repo_root: &Path, branch: &str) -> Result<bool, WorktreeError>;

    /// Push `branch` to the configured remote from `worktree_path`.
    async fn push_branch(&self, worktree_path: &Path, branch: &str) -> Result<(), WorktreeError>;
}

/// Shells out to the system `git`.
#[derive(Clone, Default)]
pub struct GitWorktreeManager;

#[async_trait]
impl WorktreeManager for GitWorktreeManager {
    async fn materialize(
        &self,
        repo_root: &Path,
        branch: &str,
        worktree_path: &Path,
    ) -> Result<(), WorktreeError> {
        if worktree_path.exists() {
            return Ok(());
        }
        let mut cmd = Command::new("git");
        cmd.current_dir(repo_root).args([
            "worktree",
            "add",
            "-B",
            branch,
            &worktree_path.to_string_lossy(),
        ]);
        let output = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT, "git worktree add")
            .await
            .map_err(WorktreeError::CommandFailed)?;
        if !output.status.success() {
            return Err(WorktreeError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        Ok(())
    }

    async fn remove(&self, repo_root: &Path, worktree_path: &Path) -> Result<(), WorktreeError> {
        let mut cmd = Command::new("git");
        cmd.current_dir(repo_root).args([
            "worktree",
            "remove",
            "--force",
            &worktree_path.to_string_lossy(),
        ]);
        let output = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT, "git worktree remove")
            .await
            .map_err(WorktreeError::CommandFailed)?;
        if !output.status.success() {
            return Err(WorktreeError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        Ok(())
    }

    async fn is_checked_out(&self, repo_root: &Path, branch: &str) -> Result<bool, WorktreeError> {
        let mut cmd = Command::new("git");
        cmd.current_dir(repo_root).args(["worktree", "list", "--porcelain"]);
        let output = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT, "git worktree list")
            .await
            .map_err(WorktreeError::CommandFailed)?;
        if !output.status.success() {
            return Err(WorktreeError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        let text = String::from_utf8_lossy(&output.stdout);
        let branch_ref = format!("refs/heads/{branch}");
        Ok(text.lines().any(|l| l.trim() == format!("branch {branch_ref}")))
    }

    async fn push_branch(&self, worktree_path: &Path, branch: &str) -> Result<(), WorktreeError> {
        let mut cmd = Command::new("git");
        cmd.current_dir(worktree_path).args(["push", "-u", "origin", branch]);
        let output = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT, "git push")
            .await
            .map_err(WorktreeError::CommandFailed)?;
        if !output.status.success() {
            return Err(WorktreeError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::Arc;

    /// In-memory worktree bookkeeping for tests: tracks which branches are
    /// "checked out" without touching a real git repo.
    #[derive(Clone, Default)]
    pub struct FakeWorktreeManager {
        checked_out: Arc<Mutex<HashSet<String>>>,
        pushed: Arc<Mutex<Vec<(PathBuf, String)>>>,
    }

    impl FakeWorktreeManager {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn pushed_branches(&self) -> Vec<(PathBuf, String)> {
            self.pushed.lock().clone()
        }
    }

    #[async_trait]
    impl WorktreeManager for FakeWorktreeManager {
        async fn materialize(
            &self,
            _repo_root: &Path,
            branch: &str,
            worktree_path: &Path,
        ) -> Result<(), WorktreeError> {
            std::fs::create_dir_all(worktree_path)
                .map_err(|e| WorktreeError::CommandFailed(e.to_string()))?;
            self.checked_out.lock().insert(branch.to_string());
            Ok(())
        }

        async fn remove(&self, _repo_root: &Path, _worktree_path: &Path) -> Result<(), WorktreeError> {
            Ok(())
        }

        async fn is_checked_out(&self, _repo_root: &Path, branch: &str) -> Result<bool, WorktreeError> {
            Ok(self.checked_out.lock().contains(branch))
        }

        async fn push_branch(&self, worktree_path: &Path, branch: &str) -> Result<(), WorktreeError> {
            self.pushed.lock().push((worktree_path.to_path_buf(), branch.to_string()));
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeWorktreeManager;
