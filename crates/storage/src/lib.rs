// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable on-disk state for kasmos: the plan/topic document, per-user app
//! state, the per-repo permission cache, and the audit log. Every document
//! here is written with the same temp-file-plus-rename discipline (see
//! [`atomic`]) so a crash mid-write never corrupts what's on disk.

mod app_state;
mod atomic;
mod audit;
mod permission_cache;
mod plan_state;

pub use app_state::{default_app_state_path, AppState, RECENT_REPOS_CAPACITY};
pub use atomic::{atomic_write_json, read_json_or_default};
pub use audit::{read_entries, AuditEntry, AuditKind, AuditSink, FileAuditSink, NoopAuditSink};
pub use permission_cache::PermissionCache;
pub use plan_state::{PlanStateError, PlanStateStore};
