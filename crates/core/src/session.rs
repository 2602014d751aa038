// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance identifier type for tracking agent sessions.
//!
//! InstanceId identifies the engine's lifecycle record for one agent
//! invocation. It is distinct from the lower-level session id the
//! `SessionAdapter` hands back (a tmux session name), which is hidden
//! inside the adapter boundary.

crate::define_id! {
    /// Unique identifier for an agent instance (one pane, one agent process).
    pub struct InstanceId;
}
