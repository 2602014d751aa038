// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Cmd`: the event-loop-local analogue of the teacher's `Effect` enum
//! (§4.7) — every blocking operation the reducer can ask for, carried as
//! plain data so it stays `Send + 'static` across the channel boundary
//! without needing a closure. `main.rs` (in the `cli` crate) owns the
//! match over this enum that actually spawns a worker task per variant.

use kasmos_core::{InstanceId, PlanEntry};
use kasmos_storage::AuditEntry;

#[derive(Debug, Clone)]
pub enum Cmd {
    SpawnOnMain { instance: InstanceId },
    SpawnOnBranch { instance: InstanceId, branch: String },
    SpawnWaveTasks { plan_file: String },
    /// The operator's "retry" choice from the three-way wave-failed
    /// dialog: respawn only `task_numbers`, leaving completed siblings
    /// alone (§4.6 scenario 2).
    RespawnWaveTasks { plan_file: String, task_numbers: Vec<u32> },
    Pause { instance: InstanceId },
    Resume { instance: InstanceId },
    Kill { instance: InstanceId, shared: bool },
    /// Deliver `text` to the pane. The reducer clears `queued_prompt`
    /// before returning this (§5's per-session ordering invariant) — the
    /// worker task executing it must not re-read or re-derive the prompt.
    DeliverPrompt { instance: InstanceId, text: String },
    TapEnter { instance: InstanceId },
    SendKey { instance: InstanceId, bytes: Vec<u8> },
    ResizeSession { instance: InstanceId, cols: u16, rows: u16 },
    PushBranch { instance: InstanceId },
    SpawnTerminal {
        instance: InstanceId,
        /// The generation stamped on `AppState` when this was enqueued;
        /// the resulting `TerminalReady` message is discarded if it no
        /// longer matches (§4.5 stale-attach invariant).
        generation: u64,
        cols: u16,
        rows: u16,
    },
    ResizeTerminal { cols: u16, rows: u16 },
    RunMetadataTick,
    ImportTasks,
    SendPermissionResponse {
        instance: InstanceId,
        pattern: String,
        allow: bool,
        always: bool,
    },
    RenderMarkdown { plan_file: String, markdown: String },
    SaveUserState,
    RecordAudit(AuditEntry),
    /// Best-effort mirror of a local plan-state write to the remote store
    /// (§4.1), wrapped in the §5 30s deadline. Disabled (`NoopRemoteStore`)
    /// by default.
    MirrorPlanState { file: String, entry: PlanEntry },
}
