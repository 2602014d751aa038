// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The wave orchestrator (C6): a per-plan state machine that fans a plan
//! file's `## Wave <n>` sections out to parallel coder sessions, wave by
//! wave, and decides when a wave — and the whole plan — is done.
//!
//! This module is deliberately synchronous and side-effect-free (it owns
//! no adapter, no tokio handle) so the state machine itself stays a plain
//! unit-testable/property-testable value, matching the FSM's (`kasmos-fsm`)
//! "pure function plus thin wrapper" shape. The async work of actually
//! materializing a shared worktree and spawning one `Session` per task
//! lives in [`spawn_wave_tasks`] below, which *uses* an orchestrator's
//! output but does not itself hold orchestrator state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::EngineError;
use crate::session::Session;
use crate::worktree::WorktreeManager;
use kasmos_adapters::SessionAdapter;
use kasmos_core::{AgentType, InstanceOpts, PlanFile, Task, Wave};

/// State of one task within the currently running wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Complete,
    Failed,
}

/// Overall state of the orchestrator, per spec §3/§4.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    NotStarted,
    Running,
    WaveComplete,
    AllComplete,
}

/// How a surviving session's wave task should be adopted during
/// rehydration (§4.6 "Rehydration on startup").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurvivingTaskState {
    /// The user paused this task's session — counts as failed (§4.6 rule 4).
    Paused,
    /// Any other live status: still running.
    Other,
}

/// Per-plan wave fan-out state machine (C6).
#[derive(Debug, Clone)]
pub struct WaveOrchestrator {
    plan_file: String,
    waves: Vec<Wave>,
    /// 1-based index into `waves` of the current wave; 0 before start.
    wave_index: usize,
    task_states: BTreeMap<u32, TaskState>,
    /// One-shot "a dialog should be shown for the wave that just
    /// completed" latch. See `needs_confirm`/`reset_confirm`.
    confirm_latch: bool,
    worktree_path: Option<PathBuf>,
}

impl WaveOrchestrator {
    /// Build a fresh orchestrator for `plan_file`, parsed into `plan`.
    /// `current_wave` starts at 0 (not started); task state is empty
    /// until [`WaveOrchestrator::start_next_wave`] is called.
    pub fn new(plan_file: impl Into<String>, plan: PlanFile) -> Self {
        let mut waves = plan.waves;
        waves.sort_by_key(|w| w.number);
        Self {
            plan_file: plan_file.into(),
            waves,
            wave_index: 0,
            task_states: BTreeMap::new(),
            confirm_latch: false,
            worktree_path: None,
        }
    }

    pub fn plan_file(&self) -> &str {
        &self.plan_file
    }

    pub fn worktree_path(&self) -> Option<&Path> {
        self.worktree_path.as_deref()
    }

    pub fn set_worktree_path(&mut self, path: PathBuf) {
        self.worktree_path = Some(path);
    }

    /// Advance to the next wave, marking every one of its tasks `running`
    /// and returning them. Returns an empty vec once every wave in the
    /// plan has been started — the caller reads `state()` to learn this
    /// is `all-complete` rather than "stuck".
    pub fn start_next_wave(&mut self) -> Vec<Task> {
        if self.wave_index >= self.waves.len() {
            return Vec::new();
        }
        self.wave_index += 1;
        self.task_states.clear();
        let wave = &self.waves[self.wave_index - 1];
        for t in &wave.tasks {
            self.task_states.insert(t.number, TaskState::Running);
        }
        wave.tasks.clone()
    }

    pub fn mark_task_complete(&mut self, task_number: u32) {
        if let Some(s) = self.task_states.get_mut(&task_number) {
            *s = TaskState::Complete;
        }
        self.arm_confirm_if_wave_done();
    }

    pub fn mark_task_failed(&mut self, task_number: u32) {
        if let Some(s) = self.task_states.get_mut(&task_number) {
            *s = TaskState::Failed;
        }
        self.arm_confirm_if_wave_done();
    }

    fn arm_confirm_if_wave_done(&mut self) {
        if self.wave_index > 0
            && !self.task_states.is_empty()
            && self
                .task_states
                .values()
                .all(|s| matches!(s, TaskState::Complete | TaskState::Failed))
        {
            self.confirm_latch = true;
        }
    }

    /// The tasks belonging to the current wave, in plan-file order.
    pub fn current_wave_tasks(&self) -> &[Task] {
        if self.wave_index == 0 {
            &[]
        } else {
            &self.waves[self.wave_index - 1].tasks
        }
    }

    pub fn current_wave_number(&self) -> u32 {
        if self.wave_index == 0 {
            0
        } else {
            self.waves[self.wave_index - 1].number
        }
    }

    pub fn total_waves(&self) -> usize {
        self.waves.len()
    }

    pub fn total_tasks(&self) -> usize {
        self.waves.iter().map(|w| w.tasks.len()).sum()
    }

    pub fn completed_task_count(&self) -> usize {
        self.task_states.values().filter(|s| matches!(s, TaskState::Complete)).count()
    }

    pub fn failed_task_count(&self) -> usize {
        self.task_states.values().filter(|s| matches!(s, TaskState::Failed)).count()
    }

    pub fn task_state(&self, task_number: u32) -> Option<TaskState> {
        self.task_states.get(&task_number).copied()
    }

    /// A wave is complete once every one of its tasks is `complete` or
    /// `failed` — never `pending` while `running` (§8 invariant).
    pub fn state(&self) -> OrchestratorState {
        if self.wave_index == 0 {
            return OrchestratorState::NotStarted;
        }
        let wave_done = !self.task_states.is_empty()
            && self
                .task_states
                .values()
                .all(|s| matches!(s, TaskState::Complete | TaskState::Failed));
        if !wave_done {
            return OrchestratorState::Running;
        }
        if self.wave_index == self.waves.len() {
            OrchestratorState::AllComplete
        } else {
            OrchestratorState::WaveComplete
        }
    }

    /// One-shot latch: true exactly once per wave completion, unless
    /// [`WaveOrchestrator::reset_confirm`] re-arms it (the user cancelled
    /// the confirmation dialog and should be asked again next tick).
    pub fn needs_confirm(&mut self) -> bool {
        if self.confirm_latch {
            self.confirm_latch = false;
            true
        } else {
            false
        }
    }

    /// Re-arm the latch so the next `needs_confirm()` call fires true
    /// again — used when the operator dismisses the confirmation dialog
    /// with Esc/cancel instead of answering it.
    pub fn reset_confirm(&mut self) {
        self.confirm_latch = true;
    }

    /// Re-arm every failed task in the current wave as `running` and
    /// return them, for the operator's "retry" choice in the
    /// three-way wave-failed dialog.
    pub fn retry_failed_tasks(&mut self) -> Vec<Task> {
        let failed: Vec<u32> = self
            .task_states
            .iter()
            .filter(|(_, s)| matches!(s, TaskState::Failed))
            .map(|(n, _)| *n)
            .collect();
        for n in &failed {
            self.task_states.insert(*n, TaskState::Running);
        }
        self.current_wave_tasks()
            .iter()
            .filter(|t| failed.contains(&t.number))
            .cloned()
            .collect()
    }

    /// Rebuild an orchestrator after a restart for a plan whose status is
    /// still `implementing` (§4.6 "Rehydration on startup"): fast-forward
    /// through `completed_waves` fully-finished waves, then adopt the
    /// current wave's task states from the surviving sessions the caller
    /// found. A task number with no surviving session is marked failed
    /// ("their session was never found", §4.6 rule 3).
    pub fn rehydrate(
        plan_file: impl Into<String>,
        plan: PlanFile,
        completed_waves: u32,
        surviving_current_wave: &[(u32, SurvivingTaskState)],
    ) -> Self {
        let mut orch = Self::new(plan_file, plan);
        for _ in 0..completed_waves {
            let tasks = orch.start_next_wave();
            for t in tasks {
                orch.mark_task_complete(t.number);
            }
        }
        orch.confirm_latch = false;
        if orch.wave_index < orch.waves.len() {
            let tasks = orch.start_next_wave();
            for t in tasks {
                match surviving_current_wave.iter().find(|(n, _)| *n == t.number) {
                    Some((_, SurvivingTaskState::Paused)) => orch.mark_task_complete(t.number),
                    Some((_, SurvivingTaskState::Other)) => {}
                    None => orch.mark_task_failed(t.number),
                }
            }
            orch.confirm_latch = false;
        }
        orch
    }
}

/// Assemble the prompt for one task in a wave: the plan's header context,
/// the task's own body, and — when the wave has two or more tasks — a
/// "parallel execution" clause naming the other siblings and forbidding
/// wide-radius git/formatter operations against the shared worktree
/// (§4.6 rule 2, §5 "shared-resource policy").
pub fn build_task_prompt(plan: &PlanFile, wave: &Wave, task: &Task) -> String {
    let mut prompt = format!(
        "# {title}\n\n**Goal:** {goal}\n\n## Your task (Wave {wave_n}, Task {task_n}): {task_title}\n\n{body}\n",
        title = plan.title,
        goal = plan.goal,
        wave_n = wave.number,
        task_n = task.number,
        task_title = task.title,
        body = task.body,
    );
    if wave.tasks.len() >= 2 {
        let siblings: Vec<String> = wave
            .tasks
            .iter()
            .filter(|t| t.number != task.number)
            .map(|t| format!("- Task {}: {}", t.number, t.title))
            .collect();
        prompt.push_str(&format!(
            "\n## Parallel execution\n\nYou are working in this wave alongside:\n{}\n\n\
             This worktree is shared with those tasks. Make surgical, narrowly-scoped edits \
             to the files your task names. Do not run repository-wide git operations \
             (`git add -A`, `git commit -a`, `git reset`, rebase/merge) or repo-wide \
             formatters/linters — they would race or clobber a sibling's in-progress edits.\n",
            siblings.join("\n"),
        ));
    }
    prompt
}

/// Materialize (or reuse) the plan's shared worktree and spawn one
/// `Session` per task returned by [`WaveOrchestrator::start_next_wave`],
/// titled `<plan-display>-W<wave>-T<task>` per §4.6 rule 2.
#[allow(clippy::too_many_arguments)]
pub async fn spawn_wave_tasks<A: SessionAdapter, W: WorktreeManager>(
    orchestrator: &mut WaveOrchestrator,
    plan: &PlanFile,
    plan_display_name: &str,
    repo_root: &Path,
    branch: &str,
    program: &str,
    adapter: A,
    worktree: W,
    env: &[(String, String)],
) -> Result<Vec<Session<A, W>>, EngineError> {
    let wave_number = orchestrator.current_wave_number();
    let Some(wave) = plan.wave(wave_number).cloned() else {
        return Ok(Vec::new());
    };
    let worktree_path = repo_root.join(".kasmos").join("worktrees").join(branch.replace('/', "-"));
    worktree
        .materialize(repo_root, branch, &worktree_path)
        .await
        .map_err(|e| EngineError::Worktree(e.to_string()))?;
    orchestrator.set_worktree_path(worktree_path.clone());

    let mut sessions = Vec::with_capacity(wave.tasks.len());
    for task in &wave.tasks {
        let title = format!("{plan_display_name}-W{wave_number}-T{}", task.number);
        let opts = InstanceOpts {
            title,
            program: program.to_string(),
            path: repo_root.to_path_buf(),
            agent_type: AgentType::Coder,
            plan_file: Some(orchestrator.plan_file().to_string()),
            wave_number,
            task_number: task.number,
            solo_agent: false,
        };
        let mut session = Session::new(opts, adapter.clone(), worktree.clone());
        session
            .start_in_shared_worktree(&worktree_path, branch, env)
            .await?;
        session.instance.queued_prompt = Some(build_task_prompt(plan, &wave, task));
        sessions.push(session);
    }
    Ok(sessions)
}

/// Respawn a specific set of tasks (the operator's "retry" choice from the
/// three-way wave-failed dialog, §4.6 scenario 2) against the orchestrator's
/// already-materialized shared worktree, without disturbing the rest of the
/// wave. Mirrors [`spawn_wave_tasks`] but iterates an explicit task list
/// instead of `start_next_wave`'s full set.
#[allow(clippy::too_many_arguments)]
pub async fn spawn_retry_tasks<A: SessionAdapter, W: WorktreeManager>(
    orchestrator: &WaveOrchestrator,
    plan: &PlanFile,
    plan_display_name: &str,
    repo_root: &Path,
    branch: &str,
    program: &str,
    adapter: A,
    worktree: W,
    env: &[(String, String)],
    tasks: &[Task],
) -> Result<Vec<Session<A, W>>, EngineError> {
    let wave_number = orchestrator.current_wave_number();
    let worktree_path = orchestrator
        .worktree_path()
        .ok_or_else(|| EngineError::Worktree("no worktree materialized for retry".to_string()))?
        .to_path_buf();
    let Some(wave) = plan.wave(wave_number).cloned() else {
        return Ok(Vec::new());
    };

    let mut sessions = Vec::with_capacity(tasks.len());
    for task in tasks {
        let title = format!("{plan_display_name}-W{wave_number}-T{}", task.number);
        let opts = InstanceOpts {
            title,
            program: program.to_string(),
            path: repo_root.to_path_buf(),
            agent_type: AgentType::Coder,
            plan_file: Some(orchestrator.plan_file().to_string()),
            wave_number,
            task_number: task.number,
            solo_agent: false,
        };
        let mut session = Session::new(opts, adapter.clone(), worktree.clone());
        session
            .start_in_shared_worktree(&worktree_path, branch, env)
            .await?;
        session.instance.queued_prompt = Some(build_task_prompt(plan, &wave, task));
        sessions.push(session);
    }
    Ok(sessions)
}

#[cfg(test)]
#[path = "wave_tests.rs"]
mod tests;
