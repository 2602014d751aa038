// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The kasmos orchestration engine: session lifecycle (C4), the wave
//! orchestrator (C6), the plan-state/signal half of the metadata tick
//! (C8), and the permission arbiter (C9). `kasmos-app` owns the single
//! reducer thread that drives these from `Message`s; everything here is
//! meant to run inside worker tasks it spawns (§5).

mod error;
mod metadata;
mod permission_arbiter;
pub mod remote;
mod session;
mod wave;
mod worktree;

pub use error::EngineError;
pub use metadata::{collect_tick_context, TickContext};
pub use permission_arbiter::{PermissionAction, PermissionArbiter};
pub use remote::{with_timeout, NoopRemoteStore, RemotePlanStore, RemoteStoreError, TimeoutError};
pub use session::{Session, SessionSnapshot};
pub use wave::{
    build_task_prompt, spawn_retry_tasks, spawn_wave_tasks, OrchestratorState, SurvivingTaskState,
    TaskState, WaveOrchestrator,
};
pub use worktree::{GitWorktreeManager, WorktreeManager};

#[cfg(any(test, feature = "test-support"))]
pub use worktree::FakeWorktreeManager;
