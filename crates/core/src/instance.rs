// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine's lifecycle record for one agent instance (one pane, one
//! agent process, optionally bound to a worktree).

use crate::agent::{AgentType, InstanceStatus};
use crate::session::InstanceId;
use std::path::PathBuf;
use std::time::Instant;

/// Per-pane diff statistics against the instance's base branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub files_changed: u32,
    pub insertions: u32,
    pub deletions: u32,
}

/// Options used to construct a new [`Instance`]. Mirrors the fields
/// `Session::new(opts)` needs from the spec — split out so call sites don't
/// have to hand-build a half-initialized `Instance`.
#[derive(Debug, Clone)]
pub struct InstanceOpts {
    pub title: String,
    pub program: String,
    pub path: PathBuf,
    pub agent_type: AgentType,
    pub plan_file: Option<String>,
    pub wave_number: u32,
    pub task_number: u32,
    pub solo_agent: bool,
}

/// One agent process in one multiplexer pane.
#[derive(Debug, Clone)]
pub struct Instance {
    pub id: InstanceId,
    /// Unique across all instances; used as the multiplexer session name
    /// suffix (`kas_<title>`).
    pub title: String,
    pub program: String,
    pub path: PathBuf,
    pub agent_type: AgentType,
    pub plan_file: Option<String>,
    /// Both 0 when this instance is not a wave task.
    pub wave_number: u32,
    pub task_number: u32,
    pub status: InstanceStatus,
    /// Opts this instance out of plan lifecycle flows (planner-finished
    /// dialogs, wave bookkeeping, reviewer auto-spawn, ...).
    pub solo_agent: bool,
    pub implementation_complete: bool,
    pub is_reviewer: bool,
    pub exited: bool,
    pub prompt_detected: bool,
    pub awaiting_work: bool,
    pub notified: bool,
    pub cached_content: String,
    pub queued_prompt: Option<String>,
    pub last_activity: Option<Instant>,
    pub diff_stats: DiffStats,
    pub cpu_percent: f32,
    pub mem_mb: f32,
    pub branch: Option<String>,
    /// Underlying session-adapter handle (a tmux session name, opaque to
    /// everyone above the adapter boundary).
    pub session_id: Option<String>,
    /// Worktree path, set once the instance is bound to one.
    pub worktree_path: Option<PathBuf>,
}

impl Instance {
    pub fn new(opts: InstanceOpts) -> Self {
        Self {
            id: InstanceId::new(uuid::Uuid::new_v4().to_string()),
            title: opts.title,
            program: opts.program,
            path: opts.path,
            agent_type: opts.agent_type,
            plan_file: opts.plan_file,
            wave_number: opts.wave_number,
            task_number: opts.task_number,
            status: InstanceStatus::Loading,
            solo_agent: opts.solo_agent,
            implementation_complete: false,
            is_reviewer: matches!(opts.agent_type, AgentType::Reviewer),
            exited: false,
            prompt_detected: false,
            awaiting_work: false,
            notified: false,
            cached_content: String::new(),
            queued_prompt: None,
            last_activity: None,
            diff_stats: DiffStats::default(),
            cpu_percent: 0.0,
            mem_mb: 0.0,
            branch: None,
            session_id: None,
            worktree_path: None,
        }
    }

    /// Whether this instance is a member of a wave (as opposed to a
    /// planner, reviewer, or solo agent).
    pub fn is_wave_task(&self) -> bool {
        self.wave_number != 0 && self.task_number != 0
    }

    /// `kas_<title>` — the multiplexer session name this instance should
    /// bind to.
    pub fn multiplexer_name(&self) -> String {
        format!("kas_{}", self.title)
    }

    /// A wave task is complete once the agent has produced output and then
    /// gone idle again: `prompt_detected && !awaiting_work`. See the open
    /// question in the spec about whether a sentinel would be more
    /// reliable — this implementation uses the heuristic.
    pub fn wave_task_complete(&self) -> bool {
        self.prompt_detected && !self.awaiting_work
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
