// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Message`: the only way a side effect's result (or a raw UI event)
//! enters the reducer (§4.7). One variant per message kind named in the
//! spec.

use std::path::PathBuf;

use kasmos_core::{Instance, InstanceId};
use kasmos_engine::{SessionSnapshot, TickContext};

use crate::overlay::ImportedTask;

/// The metadata tick's fan-in (§4.8): per-session pane snapshots
/// (gathered by the caller, since only it holds the live session table)
/// plus the plan-state/signal/namespace-count context [`kasmos_engine`]
/// collects on its own.
#[derive(Debug)]
pub struct MetadataTickResult {
    pub snapshots: Vec<(InstanceId, SessionSnapshot)>,
    pub context: TickContext,
}

#[derive(Debug)]
pub enum Message {
    Key(crossterm::event::KeyEvent),
    Mouse(crossterm::event::MouseEvent),
    /// A reported terminal size. Equal to the previous size means this is
    /// a synthetic redraw, not an actual resize (§4.7) — overlays must not
    /// be resized in that case.
    Resize { cols: u16, rows: u16 },

    MetadataTick(MetadataTickResult),

    WaveAdvance { plan_file: String },
    WaveRetry { plan_file: String },
    WaveAbort { plan_file: String },
    WaveAllComplete { plan_file: String },
    /// A (solo or wave-representative) coder's branch push completed, per
    /// §4.8's coder-exit flow and §4.6's all-complete flow: the reducer
    /// performs the `implement_finished` FSM transition and spawns a
    /// reviewer. Only sent on a *successful* push — a failed push surfaces
    /// a toast at the call site and leaves the plan in its prior state
    /// (§7), with no message round-trip needed.
    CoderComplete { instance: InstanceId, plan_file: String },
    PlannerComplete { plan_file: String },

    InstanceStarted {
        instance: InstanceId,
        result: Result<String, String>,
    },
    /// One or more coder sessions were spawned for a wave (fresh start or
    /// retry) — the reducer did not create their `Instance` records itself
    /// since materializing the shared worktree is worker-task I/O; this is
    /// how they enter `AppModel::sessions`.
    WaveTasksSpawned {
        plan_file: String,
        instances: Result<Vec<Instance>, String>,
    },
    KillInstance { instance: InstanceId },
    TerminalReady { instance: InstanceId, generation: u64 },
    PlanRendered { plan_file: String, html: String },
    FolderPicked { path: PathBuf },
    ClickUpImportResult { result: Result<Vec<ImportedTask>, String> },
    /// Best-effort remote plan-store mirror call finished; failure is
    /// surfaced as a toast (§4.1), the local file stays authoritative.
    RemoteMirrorResult { file: String, result: Result<(), String> },

    /// The operator answered the permission modal.
    PermissionResponse {
        instance: InstanceId,
        pattern: String,
        allow: bool,
        always: bool,
    },
}
