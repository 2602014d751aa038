// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker-task side of the engine: everything `kasmos-app`'s `Cmd`s
//! need to actually perform I/O, but that the reducer itself must never
//! touch directly (§5). `AppModel` owns plain `Instance` records; `Ctx`
//! owns the adapter-bound `Session` handles those records correspond to,
//! plus the one live `EmbeddedTerminal` slot and the collaborators wired
//! in from `main.rs`.
//!
//! A handful of `Cmd` variants (`SpawnOnMain`, `SpawnOnBranch`,
//! `SpawnWaveTasks`, `RespawnWaveTasks`) name only an id — the data they
//! need to act (an `InstanceOpts`, a wave number, a shared worktree path)
//! lives in the reducer's `AppModel`, which this module never sees.
//! `main.rs` reads that data out of the model synchronously at dispatch
//! time and passes it down as plain arguments instead.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex as AsyncMutex};

use kasmos_adapters::session::TmuxAdapter;
use kasmos_adapters::TracedSession;
use kasmos_app::{Message, MetadataTickResult, MarkdownRenderer, PassthroughMarkdownRenderer};
use kasmos_core::{Instance, InstanceId, InstanceOpts, PlanEntry, PlanFile, Task};
use kasmos_engine::{
    collect_tick_context, spawn_retry_tasks, spawn_wave_tasks, GitWorktreeManager, RemotePlanStore,
    Session, WaveOrchestrator, WorktreeManager,
};
use kasmos_storage::{AppState, AuditEntry, AuditSink};
use kasmos_terminal::{EmbeddedTerminal, TmuxPaneReader};

/// The concrete adapter stack this binary wires up. A dedicated type alias
/// keeps every `Session`/`EmbeddedTerminal` signature below readable.
pub type Adapter = TracedSession<TmuxAdapter>;
pub type Worktree = GitWorktreeManager;
pub type EngineSession = Session<Adapter, Worktree>;
pub type Terminal = EmbeddedTerminal<Adapter, TmuxPaneReader>;

/// Everything a `Cmd` executor needs that isn't already plain data on the
/// `Cmd` itself. Cheap to clone (an `Arc` around each piece) so every
/// spawned worker task gets its own handle.
#[derive(Clone)]
pub struct Ctx {
    pub repo_root: PathBuf,
    pub plans_dir: PathBuf,
    pub program: String,
    pub base_branch: String,
    pub namespace_prefix: String,
    pub env: Vec<(String, String)>,
    pub tx: mpsc::UnboundedSender<Message>,
    pub sessions: Arc<AsyncMutex<HashMap<InstanceId, EngineSession>>>,
    /// Terminals built by an in-flight `SpawnTerminal` command, keyed by
    /// the generation stamped on the request. The main loop drains the
    /// entry matching `TerminalReady`'s generation and discards any
    /// other (stale) entry left behind by a superseded selection.
    pub pending_terminals: Arc<parking_lot::Mutex<HashMap<u64, Terminal>>>,
    pub remote: Arc<dyn RemotePlanStore>,
    pub audit: Arc<dyn AuditSink>,
    pub app_state_path: Option<PathBuf>,
    pub adapter: Adapter,
    pub worktree: Worktree,
}

impl Ctx {
    /// Relative path of `plans_dir` under `repo_root`, used to find a
    /// worktree's mirrored `.signals/` directory (§4.3: "the scanner runs
    /// ... against every active worktree's plans dir").
    fn plans_dir_relative(&self) -> PathBuf {
        self.plans_dir
            .strip_prefix(&self.repo_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| self.plans_dir.clone())
    }

    async fn active_worktree_signal_dirs(&self) -> Vec<PathBuf> {
        let rel = self.plans_dir_relative();
        let sessions = self.sessions.lock().await;
        sessions
            .values()
            .filter_map(|s| s.worktree_path())
            .map(|p| p.join(&rel).join(".signals"))
            .collect()
    }

    pub(crate) fn load_plan_file(&self, plan_file: &str) -> Result<PlanFile, String> {
        let path = self.plans_dir.join(plan_file);
        let text = std::fs::read_to_string(&path).map_err(|e| e.to_string())?;
        kasmos_core::parse_plan_file(&text).map_err(|e| e.to_string())
    }
}

/// Spawn a session in the main working copy (planners, solo agents with
/// no dedicated branch). `opts` is the reducer's already-constructed
/// `InstanceOpts` for `instance` — the matching `Instance` record already
/// lives in `AppModel::sessions` by the time this runs.
pub fn spawn_on_main(ctx: Ctx, instance: InstanceId, opts: InstanceOpts) {
    tokio::spawn(async move {
        let mut session = Session::new(opts, ctx.adapter.clone(), ctx.worktree.clone());
        let result = session.start_on_main(&ctx.env).await;
        finish_spawn(&ctx, instance, session, result).await;
    });
}

/// Spawn a session in a dedicated worktree on `branch` (reviewers,
/// revision coders). The worktree path follows the same
/// `.kasmos/worktrees/<slug>` convention the wave orchestrator uses for
/// its shared worktrees, just scoped to one branch instead of one wave.
pub fn spawn_on_branch(ctx: Ctx, instance: InstanceId, branch: String, opts: InstanceOpts) {
    tokio::spawn(async move {
        let worktree_path = ctx
            .repo_root
            .join(".kasmos")
            .join("worktrees")
            .join(branch.replace('/', "-"));
        let mut session = Session::new(opts, ctx.adapter.clone(), ctx.worktree.clone());
        let result = session
            .start_on_branch(&ctx.repo_root, &branch, &worktree_path, &ctx.env)
            .await;
        finish_spawn(&ctx, instance, session, result).await;
    });
}

async fn finish_spawn(
    ctx: &Ctx,
    instance: InstanceId,
    session: EngineSession,
    result: Result<(), kasmos_engine::EngineError>,
) {
    let msg = match result {
        Ok(()) => {
            let session_id = session.instance.session_id.clone().unwrap_or_default();
            ctx.sessions.lock().await.insert(instance.clone(), session);
            Message::InstanceStarted { instance, result: Ok(session_id) }
        }
        Err(err) => Message::InstanceStarted { instance, result: Err(err.to_string()) },
    };
    let _ = ctx.tx.send(msg);
}

/// Rebuild a throwaway orchestrator fast-forwarded to `wave_number`.
/// `spawn_wave_tasks`/`spawn_retry_tasks` only ever read
/// `current_wave_number()`/`worktree_path()` off their orchestrator
/// argument — the real orchestrator's per-task state machine stays in
/// `AppModel`, which never crosses into a worker task. `start_next_wave`
/// advances `wave_index` by exactly one per call and wave numbers run
/// 1..=N in order, so calling it `wave_number` times lands the throwaway
/// copy at the same wave the reducer already advanced to.
fn fast_forward(plan_file: &str, plan: PlanFile, wave_number: u32) -> WaveOrchestrator {
    let mut orch = WaveOrchestrator::new(plan_file.to_string(), plan);
    for _ in 0..wave_number {
        orch.start_next_wave();
    }
    orch
}

/// Fan out the current wave's coder tasks into a shared worktree.
/// `wave_number` and `display_name` are read out of `AppModel` by
/// `main.rs` before this is scheduled; `branch` is the plan's dedicated
/// branch, shared by every task in the wave.
pub fn spawn_wave(ctx: Ctx, plan_file: String, wave_number: u32, branch: String, display_name: String) {
    tokio::spawn(async move {
        let instances = match ctx.load_plan_file(&plan_file) {
            Ok(plan) => {
                let mut orch = fast_forward(&plan_file, plan.clone(), wave_number);
                spawn_sessions(
                    spawn_wave_tasks(
                        &mut orch,
                        &plan,
                        &display_name,
                        &ctx.repo_root,
                        &branch,
                        &ctx.program,
                        ctx.adapter.clone(),
                        ctx.worktree.clone(),
                        &ctx.env,
                    )
                    .await,
                    &ctx,
                )
                .await
            }
            Err(err) => Err(err),
        };
        let _ = ctx.tx.send(Message::WaveTasksSpawned { plan_file, instances });
    });
}

/// Re-spawn a subset of the current wave's tasks into the wave's existing
/// shared worktree, after the operator chose "retry" on a wave-failed
/// dialog. `worktree_path` is the path the original `spawn_wave_tasks`
/// call materialized, read back out of `AppModel`'s orchestrator.
#[allow(clippy::too_many_arguments)]
pub fn respawn_wave(
    ctx: Ctx,
    plan_file: String,
    wave_number: u32,
    branch: String,
    display_name: String,
    worktree_path: PathBuf,
    task_numbers: Vec<u32>,
) {
    tokio::spawn(async move {
        let instances = match ctx.load_plan_file(&plan_file) {
            Ok(plan) => {
                let mut orch = fast_forward(&plan_file, plan.clone(), wave_number);
                orch.set_worktree_path(worktree_path);
                let tasks: Vec<Task> = plan
                    .wave(wave_number)
                    .map(|w| {
                        w.tasks
                            .iter()
                            .filter(|t| task_numbers.contains(&t.number))
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default();
                spawn_sessions(
                    spawn_retry_tasks(
                        &orch,
                        &plan,
                        &display_name,
                        &ctx.repo_root,
                        &branch,
                        &ctx.program,
                        ctx.adapter.clone(),
                        ctx.worktree.clone(),
                        &ctx.env,
                        &tasks,
                    )
                    .await,
                    &ctx,
                )
                .await
            }
            Err(err) => Err(err),
        };
        let _ = ctx.tx.send(Message::WaveTasksSpawned { plan_file, instances });
    });
}

async fn spawn_sessions(
    result: Result<Vec<EngineSession>, kasmos_engine::EngineError>,
    ctx: &Ctx,
) -> Result<Vec<Instance>, String> {
    let sessions = result.map_err(|e| e.to_string())?;
    let mut registry = ctx.sessions.lock().await;
    let mut instances = Vec::with_capacity(sessions.len());
    for session in sessions {
        instances.push(session.instance.clone());
        registry.insert(session.instance.id.clone(), session);
    }
    Ok(instances)
}

pub fn pause(ctx: Ctx, instance: InstanceId) {
    tokio::spawn(async move {
        let mut sessions = ctx.sessions.lock().await;
        if let Some(session) = sessions.get_mut(&instance) {
            if let Err(err) = session.pause().await {
                tracing::warn!(%err, instance = instance.as_str(), "pause failed");
            }
        }
    });
}

pub fn resume(ctx: Ctx, instance: InstanceId) {
    tokio::spawn(async move {
        let mut sessions = ctx.sessions.lock().await;
        if let Some(session) = sessions.get_mut(&instance) {
            if let Err(err) = session.resume(&ctx.env).await {
                tracing::warn!(%err, instance = instance.as_str(), "resume failed");
            }
        }
    });
}

pub fn kill(ctx: Ctx, instance: InstanceId, shared: bool) {
    tokio::spawn(async move {
        let mut sessions = ctx.sessions.lock().await;
        if let Some(mut session) = sessions.remove(&instance) {
            if let Err(err) = session.kill(&ctx.repo_root, shared).await {
                tracing::warn!(%err, instance = instance.as_str(), "kill failed");
            }
        }
        drop(sessions);
        let _ = ctx.tx.send(Message::KillInstance { instance });
    });
}

/// The reducer clears `queued_prompt` itself (see `reducer::deliver_queued_prompt`)
/// before scheduling this, so it only ever carries the text to type.
pub fn deliver_prompt(ctx: Ctx, instance: InstanceId, text: String) {
    tokio::spawn(async move {
        let sessions = ctx.sessions.lock().await;
        if let Some(session) = sessions.get(&instance) {
            if let Err(err) = session.send_prompt(&text).await {
                tracing::warn!(%err, instance = instance.as_str(), "send_prompt failed");
            }
        }
    });
}

pub fn tap_enter(ctx: Ctx, instance: InstanceId) {
    tokio::spawn(async move {
        let sessions = ctx.sessions.lock().await;
        if let Some(session) = sessions.get(&instance) {
            let _ = session.tap_enter().await;
        }
    });
}

pub fn send_key(ctx: Ctx, instance: InstanceId, bytes: Vec<u8>) {
    tokio::spawn(async move {
        let sessions = ctx.sessions.lock().await;
        if let Some(session) = sessions.get(&instance) {
            let _ = session.send_key(&bytes).await;
        }
    });
}

pub fn resize_session(ctx: Ctx, instance: InstanceId, cols: u16, rows: u16) {
    tokio::spawn(async move {
        let sessions = ctx.sessions.lock().await;
        if let Some(session) = sessions.get(&instance) {
            let _ = session.resize(cols, rows).await;
        }
    });
}

pub fn push_branch(ctx: Ctx, instance: InstanceId) {
    tokio::spawn(async move {
        let (worktree_path, branch, plan_file) = {
            let sessions = ctx.sessions.lock().await;
            let Some(session) = sessions.get(&instance) else {
                return;
            };
            let Some(path) = session.worktree_path().cloned() else {
                return;
            };
            let Some(branch) = session.instance.branch.clone() else {
                return;
            };
            (path, branch, session.instance.plan_file.clone())
        };
        match ctx.worktree.push_branch(&worktree_path, &branch).await {
            Ok(()) => {
                if let Some(plan_file) = plan_file {
                    let _ = ctx.tx.send(Message::CoderComplete { instance, plan_file });
                }
            }
            Err(err) => {
                tracing::warn!(%err, branch, "push_branch failed");
            }
        }
    });
}

pub fn spawn_terminal(ctx: Ctx, instance: InstanceId, generation: u64, cols: u16, rows: u16) {
    tokio::spawn(async move {
        let pane_id = {
            let sessions = ctx.sessions.lock().await;
            sessions
                .get(&instance)
                .and_then(|s| s.instance.session_id.clone())
        };
        let Some(pane_id) = pane_id else { return };
        let terminal = EmbeddedTerminal::new(pane_id, cols, rows, ctx.adapter.clone(), TmuxPaneReader);
        ctx.pending_terminals.lock().insert(generation, terminal);
        let _ = ctx.tx.send(Message::TerminalReady { instance, generation });
    });
}

pub fn run_metadata_tick(ctx: Ctx) {
    tokio::spawn(async move {
        let mut snapshots = Vec::new();
        {
            let mut sessions = ctx.sessions.lock().await;
            for (id, session) in sessions.iter_mut() {
                let snap = session.collect_metadata(&ctx.base_branch).await;
                session.apply_snapshot(&snap);
                snapshots.push((id.clone(), snap));
            }
        }
        let worktree_dirs = ctx.active_worktree_signal_dirs().await;
        match collect_tick_context(&ctx.plans_dir, &worktree_dirs, &ctx.namespace_prefix).await {
            Ok(context) => {
                let _ = ctx.tx.send(Message::MetadataTick(MetadataTickResult { snapshots, context }));
            }
            Err(err) => {
                tracing::warn!(%err, "metadata tick context collection failed, skipping this tick");
            }
        }
    });
}

pub fn import_tasks(ctx: Ctx) {
    tokio::spawn(async move {
        // No `TaskImporter` is wired up by default (ClickUp import is an
        // out-of-scope external collaborator); the overlay that would
        // trigger this is never opened without one configured.
        let _ = ctx.tx.send(Message::ClickUpImportResult {
            result: Err("task import is not configured".to_string()),
        });
    });
}

pub fn send_permission_response(ctx: Ctx, instance: InstanceId, pattern: String, allow: bool, always: bool) {
    tokio::spawn(async move {
        let sessions = ctx.sessions.lock().await;
        let Some(session) = sessions.get(&instance) else { return };
        let response = if allow {
            if always { "allow always\n" } else { "allow\n" }
        } else {
            "deny\n"
        };
        if let Err(err) = session.send_key(response.as_bytes()).await {
            tracing::warn!(%err, pattern, "failed to deliver permission response");
        }
    });
}

pub fn render_markdown(ctx: Ctx, plan_file: String, markdown: String) {
    tokio::spawn(async move {
        let html = PassthroughMarkdownRenderer.render(&markdown);
        let _ = ctx.tx.send(Message::PlanRendered { plan_file, html });
    });
}

pub fn save_user_state(ctx: Ctx, app_state: AppState) {
    tokio::spawn(async move {
        let Some(path) = ctx.app_state_path.clone() else { return };
        if let Err(err) = app_state.save(&path) {
            tracing::warn!(%err, path = %path.display(), "failed to save app state");
        }
    });
}

pub fn record_audit(ctx: Ctx, entry: AuditEntry) {
    ctx.audit.record(entry);
}

pub fn mirror_plan_state(ctx: Ctx, file: String, entry: PlanEntry) {
    tokio::spawn(async move {
        let result = kasmos_engine::with_timeout(kasmos_engine::remote::TIMEOUT, ctx.remote.mirror_plan(&file, &entry))
            .await
            .map_err(|e| e.to_string())
            .and_then(|inner| inner.map_err(|e| e.to_string()));
        let _ = ctx.tx.send(Message::RemoteMirrorResult { file, result });
    });
}
