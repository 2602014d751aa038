// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle (C4): wraps a [`SessionAdapter`] pane handle and a
//! [`WorktreeManager`], driving an [`Instance`] record through the stages
//! described in spec §4.4.
//!
//! Every method here performs blocking I/O (a tmux call, a git shell-out,
//! a sleep) and must only be invoked from a worker task, never inline in
//! the reducer (§5).

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use kasmos_adapters::permission::{self, PermissionPrompt};
use kasmos_adapters::procstat::{CpuSampler, ResourceSample};
use kasmos_adapters::{git, SessionAdapter};
use kasmos_core::{DiffStats, Instance, InstanceOpts, InstanceStatus};

use crate::error::EngineError;
use crate::worktree::WorktreeManager;

/// Delay between typing a prompt and pressing Enter, giving slow agent
/// CLIs time to render the paste before Enter lands (spec §4.4
/// `send_prompt`).
const PROMPT_SEND_DELAY: Duration = Duration::from_millis(150);

/// How many lines of pane history the metadata tick captures per session.
const CAPTURE_LINES: u32 = 200;

/// A read-only snapshot of one session's pane, gathered by the metadata
/// tick (§4.8). Carries no side effects of its own — [`Session::apply_snapshot`]
/// folds it into the owning `Instance`.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub captured: String,
    pub changed: bool,
    pub permission_prompt: Option<PermissionPrompt>,
    pub diff_stats: DiffStats,
    pub cpu_percent: f32,
    pub mem_mb: f32,
    pub pane_alive: bool,
    pub exit_code: Option<i32>,
}

/// One agent process in one multiplexer pane, optionally bound to a
/// worktree. Wraps [`Instance`] with the adapter calls that drive it
/// through spawn / pause / resume / kill.
pub struct Session<A: SessionAdapter, W: WorktreeManager> {
    pub instance: Instance,
    adapter: A,
    worktree: W,
    cpu_sampler: CpuSampler,
}

impl<A: SessionAdapter, W: WorktreeManager> Session<A, W> {
    pub fn new(opts: InstanceOpts, adapter: A, worktree: W) -> Self {
        Self {
            instance: Instance::new(opts),
            adapter,
            worktree,
            cpu_sampler: CpuSampler::new(),
        }
    }

    /// Spawn the pane in the main working copy; no worktree is created.
    /// Used for planners, which read the repo as it stands.
    pub async fn start_on_main(&mut self, env: &[(String, String)]) -> Result<(), EngineError> {
        let name = self.instance.multiplexer_name();
        let id = self
            .adapter
            .spawn(&name, &self.instance.path, &self.instance.program, env)
            .await?;
        self.instance.session_id = Some(id);
        self.instance.status = InstanceStatus::Loading;
        Ok(())
    }

    /// Create a dedicated worktree on `branch` at `worktree_path` and
    /// spawn the pane inside it.
    pub async fn start_on_branch(
        &mut self,
        repo_root: &Path,
        branch: &str,
        worktree_path: &Path,
        env: &[(String, String)],
    ) -> Result<(), EngineError> {
        self.worktree
            .materialize(repo_root, branch, worktree_path)
            .await
            .map_err(|e| EngineError::Worktree(e.to_string()))?;
        self.spawn_in(worktree_path, branch, env).await
    }

    /// Attach to a worktree a sibling task in this wave already
    /// materialized. Does not call `materialize` again — the caller
    /// (the wave orchestrator) guarantees the directory already exists.
    pub async fn start_in_shared_worktree(
        &mut self,
        shared_path: &Path,
        branch: &str,
        env: &[(String, String)],
    ) -> Result<(), EngineError> {
        self.spawn_in(shared_path, branch, env).await
    }

    async fn spawn_in(
        &mut self,
        worktree_path: &Path,
        branch: &str,
        env: &[(String, String)],
    ) -> Result<(), EngineError> {
        let name = self.instance.multiplexer_name();
        let id = self
            .adapter
            .spawn(&name, worktree_path, &self.instance.program, env)
            .await?;
        self.instance.session_id = Some(id);
        self.instance.branch = Some(branch.to_string());
        self.instance.worktree_path = Some(worktree_path.to_path_buf());
        self.instance.status = InstanceStatus::Loading;
        Ok(())
    }

    /// Kill the pane, keep the worktree and metadata. `status` becomes
    /// `paused`; `session_id` is cleared since the underlying tmux
    /// session no longer exists.
    pub async fn pause(&mut self) -> Result<(), EngineError> {
        if let Some(id) = self.instance.session_id.take() {
            self.adapter.kill(&id).await?;
        }
        self.instance.status = InstanceStatus::Paused;
        Ok(())
    }

    /// Respawn the pane in the existing worktree (or the original path,
    /// for a main-working-copy session).
    pub async fn resume(&mut self, env: &[(String, String)]) -> Result<(), EngineError> {
        let cwd = self
            .instance
            .worktree_path
            .clone()
            .unwrap_or_else(|| self.instance.path.clone());
        let name = self.instance.multiplexer_name();
        let id = self
            .adapter
            .spawn(&name, &cwd, &self.instance.program, env)
            .await?;
        self.instance.session_id = Some(id);
        self.instance.status = InstanceStatus::Loading;
        self.instance.exited = false;
        Ok(())
    }

    /// Pause, then remove the worktree unless `shared` — a sibling in
    /// the same wave may still be using it (§4.4: "after verifying it is
    /// not otherwise checked out"). Callers with sibling bookkeeping (the
    /// wave orchestrator) pass `shared = true` until the last sibling is
    /// gone; a solo coder or reviewer always passes `false`.
    pub async fn kill(&mut self, repo_root: &Path, shared: bool) -> Result<(), EngineError> {
        self.pause().await?;
        if shared {
            return Ok(());
        }
        if let Some(path) = self.instance.worktree_path.take() {
            self.worktree
                .remove(repo_root, &path)
                .await
                .map_err(|e| EngineError::Worktree(e.to_string()))?;
        }
        Ok(())
    }

    /// Deliver `text` to the pane as keystrokes, with a short delay
    /// before the trailing Enter so slow agent CLIs finish rendering
    /// first. Callers must clear `instance.queued_prompt` before
    /// invoking this (§4.4's ordering invariant) — `Session` itself does
    /// not read that field.
    pub async fn send_prompt(&self, text: &str) -> Result<(), EngineError> {
        let id = self.session_id()?;
        self.adapter.send_literal(id, text).await?;
        tokio::time::sleep(PROMPT_SEND_DELAY).await;
        self.adapter.send_enter(id).await?;
        Ok(())
    }

    /// One Enter press, used to dismiss idle confirmation prompts some
    /// agents show.
    pub async fn tap_enter(&self) -> Result<(), EngineError> {
        let id = self.session_id()?;
        self.adapter.send_enter(id).await?;
        Ok(())
    }

    /// Forward raw bytes to the pane — focus/insert-mode keystrokes
    /// routed through the embedded terminal.
    pub async fn send_key(&self, bytes: &[u8]) -> Result<(), EngineError> {
        let id = self.session_id()?;
        let text = String::from_utf8_lossy(bytes);
        self.adapter.send_literal(id, &text).await?;
        Ok(())
    }

    /// Resize the pane to match the embedded terminal's viewport.
    pub async fn resize(&self, cols: u16, rows: u16) -> Result<(), EngineError> {
        let id = self.session_id()?;
        self.adapter.resize(id, cols, rows).await?;
        Ok(())
    }

    /// A read-only snapshot: pane capture plus change bit, permission
    /// prompt tail check, diff stats against `base_branch`, CPU/RSS, and
    /// liveness. Safe to call from a worker task — does not mutate
    /// `self.instance`; call [`Session::apply_snapshot`] with the result
    /// back on the reducer thread.
    pub async fn collect_metadata(&mut self, base_branch: &str) -> SessionSnapshot {
        let Some(id) = self.instance.session_id.clone() else {
            return SessionSnapshot {
                pane_alive: false,
                ..Default::default()
            };
        };
        let pane_alive = self.adapter.is_alive(&id).await.unwrap_or(false);
        let captured = self
            .adapter
            .capture_output(&id, CAPTURE_LINES)
            .await
            .unwrap_or_default();
        let changed = captured != self.instance.cached_content;
        let permission_prompt = permission::detect_permission_prompt(&captured);
        let diff_stats = match &self.instance.worktree_path {
            Some(path) => git::diff_stat(path, base_branch).await.unwrap_or_default(),
            None => DiffStats::default(),
        };
        let sample = match self.adapter.pane_pid(&id).await.unwrap_or(None) {
            Some(pid) => self.cpu_sampler.sample(pid).unwrap_or_default(),
            None => ResourceSample::default(),
        };
        let exit_code = self.adapter.get_exit_code(&id).await.unwrap_or(None);
        SessionSnapshot {
            captured,
            changed,
            permission_prompt,
            diff_stats,
            cpu_percent: sample.cpu_percent,
            mem_mb: sample.mem_mb,
            pane_alive,
            exit_code,
        }
    }

    /// Fold a snapshot into `self.instance`, including the one-shot
    /// `exited` transition (§4.4: "`pane-alive=false` while
    /// `exited=false` triggers a one-shot transition to `exited=true`").
    ///
    /// `prompt_detected` is set whenever the captured pane changed; this
    /// is the heuristic half of the open question in spec §9 on wave-task
    /// completion (`prompt_detected && !awaiting_work`, see
    /// `Instance::wave_task_complete`) — the sentinel half is handled
    /// separately by the signal plane.
    pub fn apply_snapshot(&mut self, snap: &SessionSnapshot) {
        let i = &mut self.instance;
        if snap.changed {
            i.cached_content = snap.captured.clone();
            i.last_activity = Some(Instant::now());
            i.prompt_detected = true;
            i.awaiting_work = false;
        }
        i.diff_stats = snap.diff_stats;
        i.cpu_percent = snap.cpu_percent;
        i.mem_mb = snap.mem_mb;
        if !snap.pane_alive && !i.exited {
            i.exited = true;
        }
        if i.status == InstanceStatus::Loading && snap.pane_alive {
            i.status = InstanceStatus::Running;
        }
        if i.status == InstanceStatus::Running && i.wave_task_complete() {
            i.status = InstanceStatus::Ready;
        }
    }

    /// Mark that a prompt was just queued for delivery: clears
    /// `prompt_detected` and sets `awaiting_work`, per §4.4's ordering
    /// invariant. Called by the reducer before scheduling the
    /// `send_prompt` worker task, not by the worker task itself.
    pub fn mark_prompt_queued(&mut self) {
        self.instance.prompt_detected = false;
        self.instance.awaiting_work = true;
        if self.instance.status == InstanceStatus::Ready {
            self.instance.status = InstanceStatus::Running;
        }
    }

    pub fn worktree_path(&self) -> Option<&PathBuf> {
        self.instance.worktree_path.as_ref()
    }

    fn session_id(&self) -> Result<&str, EngineError> {
        self.instance
            .session_id
            .as_deref()
            .ok_or_else(|| EngineError::InstanceNotFound(self.instance.title.clone()))
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
